//! Measurement-likelihood weighting (§4.6).

use std::f64::consts::TAU;

use crate::particle::Particle;
use crate::sensor::Scan;

const DEGENERACY_THRESHOLD: f64 = 1e-3;

/// Gaussian beam likelihood, unnormalized by beam count on purpose -- see
/// §9 "Weight normalization divisor".
fn beam_likelihood(measured: f64, predicted: f64, sigma_r: f64) -> f64 {
    let s = (measured - predicted).abs();
    (-0.5 * (s / sigma_r).powi(2)).exp() / (sigma_r * TAU.sqrt())
}

/// Weights every particle against `scan`, normalizing so weights sum to 1
/// (or resetting to uniform if the raw sum is degenerate, §4.6 / §7).
pub fn weight_particles(particles: &mut [Particle], scan: &Scan) {
    let n_particles = particles.len() as f64;

    for particle in particles.iter_mut() {
        let sum_likelihood: f64 = scan
            .ranges()
            .zip(particle.predicted_ranges.iter())
            .map(|(measured, &predicted)| beam_likelihood(measured, predicted, scan.sigma_r))
            .sum();
        // Normalized by particle count, matching the reference behavior
        // (§9 "Weight normalization divisor"): not a true likelihood, but
        // uniform across particles so it doesn't bias resampling.
        particle.weight = sum_likelihood / n_particles;
    }

    let sum_of_weights: f64 = particles.iter().map(|p| p.weight).sum();
    if sum_of_weights < DEGENERACY_THRESHOLD {
        tracing::info!(sum_of_weights, "degenerate weights, resetting to uniform");
        for particle in particles.iter_mut() {
            particle.weight = 1.0 / n_particles;
        }
    } else {
        for particle in particles.iter_mut() {
            particle.weight /= sum_of_weights;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::grid::OccupancyGrid;
    use crate::pose::Pose;
    use crate::sensor::Beam;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn grid() -> Arc<OccupancyGrid> {
        Arc::new(OccupancyGrid::new(&GridConfig {
            resolution: 0.1,
            width: 2.0,
            height: 2.0,
            v_min: 0,
            v_max: 100,
            v_step: 10,
            v_thr: 50,
            v_init: 100,
        }))
    }

    fn scan_with_ranges(ranges: &[f64]) -> Scan {
        Scan {
            beams: ranges.iter().map(|&r| Beam { angle: 0.0, range: r }).collect(),
            fov_deg: 240.0,
            r_max: 5.0,
            sigma_r: 0.05,
        }
    }

    #[test]
    fn weights_sum_to_one_when_not_degenerate() {
        let mut particles = vec![
            Particle::new(Pose::default(), 3, grid(), 1),
            Particle::new(Pose::default(), 3, grid(), 2),
        ];
        particles[0].predicted_ranges = vec![1.0, 2.0, 3.0];
        particles[1].predicted_ranges = vec![1.01, 2.0, 3.0];
        let scan = scan_with_ranges(&[1.0, 2.0, 3.0]);

        weight_particles(&mut particles, &scan);

        let sum: f64 = particles.iter().map(|p| p.weight).sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_sum_resets_to_uniform() {
        let mut particles = vec![
            Particle::new(Pose::default(), 1, grid(), 1),
            Particle::new(Pose::default(), 1, grid(), 2),
        ];
        // Predicted ranges wildly off from measurement -> near-zero likelihood.
        particles[0].predicted_ranges = vec![100.0];
        particles[1].predicted_ranges = vec![100.0];
        let scan = scan_with_ranges(&[1.0]);

        weight_particles(&mut particles, &scan);

        for p in &particles {
            assert_relative_eq!(p.weight, 0.5, epsilon = 1e-9);
        }
    }
}
