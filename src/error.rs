//! Error taxonomy (§7): fatal construction errors and the single fatal
//! runtime invariant violation. Everything else documented in §7 is a
//! locally-recovered condition reported through `tracing`, not a `Result`.

use thiserror::Error;

/// Fatal at filter construction.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("particle count must be positive, got {0}")]
    NonPositiveParticleCount(i64),
    #[error("map resolution must be positive, got {0}")]
    NonPositiveResolution(f64),
    #[error("map width/height must be positive, got {width} x {height}")]
    NonPositiveMapExtent { width: f64, height: f64 },
    #[error("sensor range noise sigma_r must be positive, got {0}")]
    NonPositiveSigmaR(f64),
    #[error("grid value range is inconsistent: v_min={v_min} >= v_max={v_max}")]
    InvalidValueRange { v_min: u8, v_max: u8 },
    #[error("v_thr={v_thr} must lie within [v_min={v_min}, v_max={v_max}]")]
    ThresholdOutOfRange { v_thr: u8, v_min: u8, v_max: u8 },
    #[error("motion noise sigma must be non-negative, got ({0}, {1}, {2})")]
    NegativeMotionNoise(f64, f64, f64),
    #[error("ICP discard_fraction must lie in [0, 1), got {0}")]
    InvalidDiscardFraction(f64),
    #[error("sensor angle column must be non-empty and strictly monotonic")]
    InconsistentAngleColumn,
}

/// The single fatal condition that can escape a tick (§4.8 step 8 / §7).
#[derive(Debug, Error, PartialEq)]
pub enum TickError {
    #[error(
        "inverse sensor model fell through all branches at cell ({ix}, {iy}): \
         pixel_distance={pixel_distance}, detected_range={detected_range} -- this is a geometry bug"
    )]
    InverseSensorModelInconsistent {
        ix: i64,
        iy: i64,
        pixel_distance: f64,
        detected_range: f64,
    },
}
