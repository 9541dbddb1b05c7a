//! Inverse sensor model and occupancy-grid mapping (§4.8).

use crate::config::InverseSensorParams;
use crate::coords::{world2map_distance, world2map_index};
use crate::error::TickError;
use crate::particle::Particle;
use crate::pose::wrap;
use crate::sensor::Scan;

/// Occupancy delta (as a signed multiple of the grid's value step) for a
/// single cell, given the particle's pose and the current real scan (§4.8
/// steps 1-8).
///
/// Returns `Err` only for the fatal "fell through all branches" case (§7),
/// which indicates a geometry bug rather than a sensing condition.
fn cell_delta(
    ix: i64,
    iy: i64,
    ix_r: i64,
    iy_r: i64,
    theta_r: f64,
    rho: f64,
    k: i64,
    scan: &Scan,
    params: &InverseSensorParams,
) -> Result<i32, TickError> {
    let xc_px = ix as f64 + 0.5;
    let yc_px = iy as f64 + 0.5;
    let xc_r = ix_r as f64 + 0.5;
    let yc_r = iy_r as f64 + 0.5;

    let dx = xc_px - xc_r;
    let dy = yc_px - yc_r;
    let pixel_distance = (dx * dx + dy * dy).sqrt();
    let phi = wrap(dy.atan2(dx) - theta_r);

    let half_fov_rad = scan.fov_deg.to_radians() / 2.0;
    if phi.abs() > half_fov_rad {
        return Ok(0);
    }

    let beam_id = scan.nearest_beam(phi);
    let beam = scan.beams[beam_id];

    let r_det = world2map_distance(beam.range, rho);
    let r_eff = (k as f64).min(r_det + params.alpha / 2.0);

    if (phi - beam.angle).abs() > params.beta / 2.0 || pixel_distance >= r_eff {
        Ok(0)
    } else if r_det < k as f64 && (pixel_distance - r_det).abs() < params.alpha / 2.0 {
        Ok(-1)
    } else if pixel_distance <= r_det {
        Ok(1)
    } else {
        Err(TickError::InverseSensorModelInconsistent {
            ix,
            iy,
            pixel_distance,
            detected_range: r_det,
        })
    }
}

/// Updates `particle.map` from `scan` using the inverse sensor model, over
/// the `±k` square around the particle's mapped pose (§4.8).
pub fn map_particle(
    particle: &mut Particle,
    scan: &Scan,
    params: &InverseSensorParams,
) -> Result<(), TickError> {
    let rho = particle.map.resolution();
    let ix_r = world2map_index(particle.pose.x, rho);
    let iy_r = world2map_index(particle.pose.y, rho);
    let theta_r = particle.pose.theta;
    let k = world2map_distance(scan.r_max, rho).floor() as i64;

    let mut deltas = Vec::new();
    for iy in (iy_r - k)..=(iy_r + k) {
        for ix in (ix_r - k)..=(ix_r + k) {
            if !particle.map.in_bounds(ix, iy) {
                continue;
            }
            let unit = cell_delta(ix, iy, ix_r, iy_r, theta_r, rho, k, scan, params)?;
            if unit != 0 {
                deltas.push((ix, iy, unit));
            }
        }
    }

    let grid = particle.map_mut();
    let step = grid.v_step() as i32;
    for (ix, iy, unit) in deltas {
        grid.bump(ix, iy, unit * step);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::grid::OccupancyGrid;
    use crate::pose::Pose;
    use crate::sensor::Beam;
    use std::sync::Arc;

    fn grid_config() -> GridConfig {
        GridConfig {
            resolution: 0.05,
            width: 5.0,
            height: 5.0,
            v_min: 0,
            v_max: 100,
            v_step: 10,
            v_thr: 50,
            v_init: 50,
        }
    }

    fn single_beam_scan(range: f64) -> Scan {
        Scan {
            beams: vec![Beam { angle: 0.0, range }],
            fov_deg: 240.0,
            r_max: 5.0,
            sigma_r: 0.05,
        }
    }

    #[test]
    fn boundary_scenario_from_spec() {
        // Robot at origin facing +x, single beam reporting r=2m, rho=0.05
        // (§8 scenario 6): cell 40 sees occupied evidence, cells strictly
        // inside the beam see free evidence, cells well beyond see none.
        let grid = Arc::new(OccupancyGrid::new(&grid_config()));
        let mut particle = Particle::new(Pose::new(0.0, 0.0, 0.0), 1, grid, 1);
        let scan = single_beam_scan(2.0);
        let params = InverseSensorParams::default();

        map_particle(&mut particle, &scan, &params).unwrap();

        let occupied_value = particle.map.get(40, 0).unwrap();
        assert!(occupied_value < grid_config().v_init, "expected occupied evidence at cell 40");

        let free_value = particle.map.get(20, 0).unwrap();
        assert!(free_value > grid_config().v_init, "expected free evidence at cell 20");

        let far_value = particle.map.get(80, 0).unwrap();
        assert_eq!(far_value, grid_config().v_init, "expected no evidence far beyond the beam");
    }

    #[test]
    fn mapped_values_stay_within_grid_bounds() {
        let grid = Arc::new(OccupancyGrid::new(&grid_config()));
        let mut particle = Particle::new(Pose::new(0.0, 0.0, 0.0), 1, grid, 1);
        let scan = single_beam_scan(2.0);
        let params = InverseSensorParams::default();

        for _ in 0..20 {
            map_particle(&mut particle, &scan, &params).unwrap();
        }

        for iy in 0..particle.map.height() as i64 {
            for ix in 0..particle.map.width() as i64 {
                let v = particle.map.get(ix, iy).unwrap();
                assert!(v >= particle.map.v_min() && v <= particle.map.v_max());
            }
        }
    }
}
