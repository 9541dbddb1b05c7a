//! Per-particle synthesis of the scan each particle's map predicts it would
//! observe from its current pose (§4.4).

use crate::coords::{map2world, world2map_distance, world2map_index};
use crate::grid::OccupancyGrid;
use crate::particle::Particle;
use crate::pose::wrap;
use crate::sensor::Scan;

/// Recomputes `particle.predicted_ranges` from `particle.map` and
/// `particle.pose`, using `scan`'s angle column and `r_max`.
pub fn predict_scan(particle: &mut Particle, scan: &Scan) {
    let rho = particle.map.resolution();
    let n = scan.n_beams();
    particle.predicted_ranges.clear();
    particle.predicted_ranges.resize(n, scan.r_max);

    let ix_r = world2map_index(particle.pose.x, rho);
    let iy_r = world2map_index(particle.pose.y, rho);
    let xc_r = ix_r as f64 + 0.5;
    let yc_r = iy_r as f64 + 0.5;
    let theta_r = particle.pose.theta;

    let k = world2map_distance(scan.r_max, rho).floor() as i64;
    let v_thr = particle.map.v_thr();

    for iy in (iy_r - k)..=(iy_r + k) {
        let Some(row) = particle.map.row(iy) else { continue };
        let lo = (ix_r - k).max(0);
        let hi = (ix_r + k).min(particle.map.width() as i64 - 1);
        if hi < lo {
            continue;
        }
        for ix in lo..=hi {
            let value = row[ix as usize];
            if value >= v_thr {
                continue;
            }

            let xc_px = ix as f64 + 0.5;
            let yc_px = iy as f64 + 0.5;

            let mut alpha_min = f64::INFINITY;
            let mut alpha_max = f64::NEG_INFINITY;
            for di in [-0.5, 0.0, 0.5] {
                for dj in [-0.5, 0.0, 0.5] {
                    let a = wrap(
                        ((yc_px + dj) - yc_r).atan2((xc_px + di) - xc_r) - theta_r,
                    );
                    alpha_min = alpha_min.min(a);
                    alpha_max = alpha_max.max(a);
                }
            }

            let pixel_distance = ((xc_px - xc_r).powi(2) + (yc_px - yc_r).powi(2)).sqrt();
            if pixel_distance >= k as f64 {
                continue;
            }

            let wraps_back = alpha_min < -std::f64::consts::FRAC_PI_2
                && alpha_max > std::f64::consts::FRAC_PI_2;

            for (beam_id, beam_angle) in scan.angles().enumerate() {
                let hits = if wraps_back {
                    beam_angle <= alpha_min || beam_angle >= alpha_max
                } else {
                    beam_angle >= alpha_min && beam_angle <= alpha_max
                };
                if hits {
                    let candidate = map2world(pixel_distance, rho);
                    if candidate < particle.predicted_ranges[beam_id] {
                        particle.predicted_ranges[beam_id] = candidate;
                    }
                }
            }
        }
    }
}

/// Used by tests to build a grid with a single occupied cell, for
/// deterministic predicted-scan checks.
#[cfg(test)]
pub(crate) fn occupy_cell(grid: &mut OccupancyGrid, ix: i64, iy: i64) {
    grid.set(ix, iy, grid.v_min());
}
