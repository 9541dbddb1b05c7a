//! Systematic resampling (§4.7): low-variance resampling with a single
//! uniform draw and N evenly spaced thresholds.

use rand::Rng;

use crate::particle::Particle;

/// Resamples `particles` in place: poses (and their maps, via cheap `Arc`
/// clones, §5) are copied from selected survivors into the original slots,
/// and every weight is reset to `1/N`.
///
/// `rng` draws the single `u ~ [0, 1/N)` offset; pass any particle's RNG (or
/// a dedicated filter-level stream) -- resampling is a serial phase (§5).
pub fn systematic_resample(particles: &mut [Particle], rng: &mut impl Rng) {
    let n = particles.len();
    if n == 0 {
        return;
    }

    let mut cum_sum = Vec::with_capacity(n);
    let mut sum = 0.0;
    for p in particles.iter() {
        sum += p.weight;
        cum_sum.push(sum);
    }

    let u: f64 = rng.gen_range(0.0..1.0) / n as f64;

    let mut selected = Vec::with_capacity(n);
    for k in 0..n {
        let tau = u + k as f64 / n as f64;
        let mut idx = cum_sum.partition_point(|&c| c < tau);
        if idx >= n {
            idx = n - 1;
        }
        selected.push(idx);
    }

    let new_poses: Vec<_> = selected.iter().map(|&i| particles[i].pose).collect();
    let new_maps: Vec<_> = selected.iter().map(|&i| particles[i].map.clone()).collect();

    for (particle, (pose, map)) in particles.iter_mut().zip(new_poses.into_iter().zip(new_maps)) {
        particle.pose = pose;
        particle.map = map;
        particle.weight = 1.0 / n as f64;
    }
}
