//! Odometry-driven motion prediction (§4.3).

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::MotionNoise;
use crate::particle::Particle;
use crate::pose::wrap;
use crate::sensor::OdometryTick;

/// Advances every particle's pose by one odometry tick, in place.
///
/// Each particle draws its own three noise samples from its own RNG stream
/// (§9 "Random number streams"), so results stay reproducible under a fixed
/// seeding discipline even when particles are predicted in parallel.
pub fn predict(particles: &mut [Particle], tick: OdometryTick, dt: f64, noise: &MotionNoise) {
    let nx = Normal::new(0.0, noise.sigma_x).expect("sigma_x must be non-negative");
    let ny = Normal::new(0.0, noise.sigma_y).expect("sigma_y must be non-negative");
    let ntheta = Normal::new(0.0, noise.sigma_theta).expect("sigma_theta must be non-negative");

    for particle in particles.iter_mut() {
        predict_one(particle, tick, dt, &nx, &ny, &ntheta);
    }
}

fn predict_one(
    particle: &mut Particle,
    tick: OdometryTick,
    dt: f64,
    nx: &Normal<f64>,
    ny: &Normal<f64>,
    ntheta: &Normal<f64>,
) {
    let pose = &mut particle.pose;
    let rng = &mut particle.rng;

    pose.x += dt * tick.v * pose.theta.cos();
    pose.y += dt * tick.v * pose.theta.sin();
    pose.theta += dt * tick.omega;

    pose.x += sample(rng, nx);
    pose.y += sample(rng, ny);
    pose.theta = wrap(pose.theta + sample(rng, ntheta));
}

fn sample(rng: &mut impl Rng, dist: &Normal<f64>) -> f64 {
    dist.sample(rng)
}
