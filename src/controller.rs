//! The top-level filter controller (§4.9): owns the particle set and wires
//! the per-tick phases together according to the configured [`Mode`].

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::config::{FilterConfig, Mode};
use crate::error::{ConfigError, TickError};
use crate::grid::OccupancyGrid;
use crate::icp;
use crate::inverse_sensor;
use crate::motion;
use crate::particle::Particle;
use crate::pose::Pose;
use crate::resample::systematic_resample;
use crate::scan_predictor::predict_scan;
use crate::sensor::{OdometryTick, Scan};
use crate::weighting::weight_particles;

/// Particle counts at or above this are worth handing to `rayon` rather than
/// walking serially; below it the parallel-dispatch overhead dominates.
const PARALLEL_THRESHOLD: usize = 8;

/// Rao-Blackwellized particle filter for 2D occupancy-grid SLAM (§4.9).
pub struct Rbpf {
    config: FilterConfig,
    particles: Vec<Particle>,
    t_prev: f64,
    master_rng: StdRng,
}

impl Rbpf {
    /// Builds a filter with `n_particles` copies of `config.initial_pose`,
    /// each with its own RNG stream derived from `config.rng_seed` (§9).
    ///
    /// `angles` is the sensor's angle column (constant for the session),
    /// validated against the rest of the configuration (§7): it must be
    /// non-empty and strictly monotonic.
    pub fn new(config: FilterConfig, angles: &[f64]) -> Result<Self, ConfigError> {
        config.validate(angles)?;
        let n_beams = angles.len();

        let mut master_rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let shared_map = Arc::new(OccupancyGrid::new(&config.grid));
        let uniform_weight = 1.0 / config.n_particles as f64;
        let particles = (0..config.n_particles)
            .map(|_| {
                let seed = master_rng.gen();
                let mut particle =
                    Particle::new(config.initial_pose, n_beams, Arc::clone(&shared_map), seed);
                particle.weight = uniform_weight;
                particle
            })
            .collect();

        Ok(Rbpf { config, particles, t_prev: 0.0, master_rng })
    }

    /// Runs one full tick (§4.9): prediction, correction, and (depending on
    /// mode) mapping, using `odom` and `scan` as the inputs observed this
    /// tick. `ground_truth` is consulted only in [`Mode::MapOnly`].
    pub fn tick(
        &mut self,
        odom: OdometryTick,
        scan: &Scan,
        ground_truth: Option<Pose>,
    ) -> Result<(), TickError> {
        let dt = odom.t - self.t_prev;
        self.t_prev = odom.t;

        match self.config.mode {
            Mode::Localize => {
                self.predict(odom, dt);
                self.predict_scans(scan);
                self.correct_with_icp(scan);
                self.weight(scan);
                self.resample();
            }
            Mode::MapOnly => {
                let pose = ground_truth.expect("MapOnly mode requires a ground-truth pose");
                for particle in &mut self.particles {
                    particle.pose = pose;
                }
                self.map(scan)?;
            }
            Mode::Slam => {
                self.predict(odom, dt);
                self.predict_scans(scan);
                self.correct_with_icp(scan);
                self.weight(scan);
                self.resample();
                self.map(scan)?;
            }
        }
        Ok(())
    }

    fn predict(&mut self, odom: OdometryTick, dt: f64) {
        motion::predict(&mut self.particles, odom, dt, &self.config.motion_noise);
    }

    fn predict_scans(&mut self, scan: &Scan) {
        if self.particles.len() >= PARALLEL_THRESHOLD {
            self.particles.par_iter_mut().for_each(|p| predict_scan(p, scan));
        } else {
            for particle in &mut self.particles {
                predict_scan(particle, scan);
            }
        }
    }

    fn correct_with_icp(&mut self, scan: &Scan) {
        let params = self.config.icp;
        let noise = self.config.motion_noise;
        let apply = |particle: &mut Particle| {
            let pose = particle.pose;
            let predicted: icp::Cloud = particle
                .predicted_ranges
                .iter()
                .zip(scan.angles())
                .map(|(&r, a)| beam_endpoint(pose, a, r))
                .collect();
            let measured: icp::Cloud =
                scan.beams.iter().map(|b| beam_endpoint(pose, b.angle, b.range)).collect();

            let correction = icp::icp(&predicted, &measured, &params, &noise);
            particle.pose.apply_correction(correction.dx, correction.dy, correction.dtheta);
        };

        if self.particles.len() >= PARALLEL_THRESHOLD {
            self.particles.par_iter_mut().for_each(apply);
        } else {
            self.particles.iter_mut().for_each(apply);
        }
    }

    fn weight(&mut self, scan: &Scan) {
        weight_particles(&mut self.particles, scan);
    }

    fn resample(&mut self) {
        systematic_resample(&mut self.particles, &mut self.master_rng);
    }

    fn map(&mut self, scan: &Scan) -> Result<(), TickError> {
        let params = self.config.inverse_sensor;
        if self.particles.len() >= PARALLEL_THRESHOLD {
            self.particles
                .par_iter_mut()
                .try_for_each(|p| inverse_sensor::map_particle(p, scan, &params))
        } else {
            self.particles.iter_mut().try_for_each(|p| inverse_sensor::map_particle(p, scan, &params))
        }
    }

    /// The map of the highest-weight particle, ties broken by lowest index
    /// (§4.9).
    pub fn best_map(&self) -> &OccupancyGrid {
        let mut best = 0;
        for (i, particle) in self.particles.iter().enumerate().skip(1) {
            if particle.weight > self.particles[best].weight {
                best = i;
            }
        }
        &self.particles[best].map
    }

    /// Exports the best map as a self-contained 8-bit raster (§6); callers
    /// own persistence (e.g. writing it out as a PGM file).
    pub fn export_pgm(&self) -> Vec<u8> {
        self.best_map().as_bytes().to_vec()
    }

    /// Current pose and weight of every particle (§6).
    pub fn particles(&self) -> impl Iterator<Item = (Pose, f64)> + '_ {
        self.particles.iter().map(|p| (p.pose, p.weight))
    }
}

/// World-frame endpoint of a beam cast from `pose` at `angle` (robot frame)
/// for `range` meters, used to build the point clouds ICP aligns (§4.5).
fn beam_endpoint(pose: Pose, angle: f64, range: f64) -> nalgebra::Vector2<f64> {
    let world_angle = pose.theta + angle;
    pose.position() + range * nalgebra::Vector2::new(world_angle.cos(), world_angle.sin())
}
