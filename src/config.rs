//! Typed, `serde`-(de)serializable configuration for the filter (§4.10).
//!
//! A caller assembles one of these (from TOML, JSON, or plain code) and hands
//! it to [`crate::controller::Rbpf::new`]; the core crate never reads a
//! config file itself.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pose::Pose;

/// Which phases of a tick run (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// predict -> predict-scan -> ICP -> weight -> resample. No mapping.
    Localize,
    /// Poses forced to ground truth; mapping only.
    MapOnly,
    /// Full predict -> ... -> resample -> mapping.
    Slam,
}

/// Occupancy-grid geometry and value-range configuration (§3, §4.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridConfig {
    /// Meters per cell.
    pub resolution: f64,
    /// Map width, meters.
    pub width: f64,
    /// Map height, meters.
    pub height: f64,
    pub v_min: u8,
    pub v_max: u8,
    pub v_step: u8,
    pub v_thr: u8,
    /// Value new cells are initialized to (typically the midpoint, "unknown").
    pub v_init: u8,
}

impl GridConfig {
    pub fn width_cells(&self) -> usize {
        (self.width / self.resolution).floor() as usize
    }

    pub fn height_cells(&self) -> usize {
        (self.height / self.resolution).floor() as usize
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution <= 0.0 {
            return Err(ConfigError::NonPositiveResolution(self.resolution));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(ConfigError::NonPositiveMapExtent {
                width: self.width,
                height: self.height,
            });
        }
        if self.v_min >= self.v_max {
            return Err(ConfigError::InvalidValueRange {
                v_min: self.v_min,
                v_max: self.v_max,
            });
        }
        if self.v_thr < self.v_min || self.v_thr > self.v_max {
            return Err(ConfigError::ThresholdOutOfRange {
                v_thr: self.v_thr,
                v_min: self.v_min,
                v_max: self.v_max,
            });
        }
        Ok(())
    }
}

/// Iterative Closest Point parameters (§4.5 / §3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IcpParams {
    pub max_iter: usize,
    pub tolerance: f64,
    pub discard_fraction: f64,
}

impl Default for IcpParams {
    fn default() -> Self {
        IcpParams { max_iter: 20, tolerance: 1e-3, discard_fraction: 0.1 }
    }
}

/// Inverse sensor model parameters (§4.8).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InverseSensorParams {
    /// Object thickness, in cell units.
    pub alpha: f64,
    /// Beam width, radians.
    pub beta: f64,
}

impl Default for InverseSensorParams {
    fn default() -> Self {
        InverseSensorParams { alpha: 1.0, beta: 0.1 }
    }
}

/// Motion noise standard deviations (§3 `R`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MotionNoise {
    pub sigma_x: f64,
    pub sigma_y: f64,
    pub sigma_theta: f64,
}

impl MotionNoise {
    pub fn norm(&self) -> f64 {
        (self.sigma_x * self.sigma_x + self.sigma_y * self.sigma_y).sqrt()
    }
}

/// Top-level filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub n_particles: usize,
    pub initial_pose: Pose,
    pub motion_noise: MotionNoise,
    pub icp: IcpParams,
    pub inverse_sensor: InverseSensorParams,
    pub grid: GridConfig,
    pub mode: Mode,
    /// Sensor field of view, degrees (full angular span). Held here so
    /// construction can validate the sensor's angle column (§7) against it
    /// on the first tick; set from the sensor's own `fov_deg()`.
    pub fov_deg: f64,
    pub sigma_r: f64,
    /// Master seed used to derive one private RNG stream per particle
    /// (§9 Random number streams). `None` seeds from OS entropy.
    pub rng_seed: Option<u64>,
}

impl FilterConfig {
    /// Validates the configuration against the sensor's angle column (§7).
    /// `angles` must be non-empty and strictly monotonic -- both are
    /// checked here, not just a beam count, since a non-monotonic column
    /// would silently corrupt [`crate::sensor::Scan::nearest_beam`].
    pub(crate) fn validate(&self, angles: &[f64]) -> Result<(), ConfigError> {
        if self.n_particles == 0 {
            return Err(ConfigError::NonPositiveParticleCount(0));
        }
        if self.sigma_r <= 0.0 {
            return Err(ConfigError::NonPositiveSigmaR(self.sigma_r));
        }
        if self.motion_noise.sigma_x < 0.0
            || self.motion_noise.sigma_y < 0.0
            || self.motion_noise.sigma_theta < 0.0
        {
            return Err(ConfigError::NegativeMotionNoise(
                self.motion_noise.sigma_x,
                self.motion_noise.sigma_y,
                self.motion_noise.sigma_theta,
            ));
        }
        if !(0.0..1.0).contains(&self.icp.discard_fraction) {
            return Err(ConfigError::InvalidDiscardFraction(self.icp.discard_fraction));
        }
        if angles.is_empty() || !angles.windows(2).all(|w| w[0] < w[1]) {
            return Err(ConfigError::InconsistentAngleColumn);
        }
        self.grid.validate()
    }
}
