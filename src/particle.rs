//! A single filter hypothesis: pose, weight, its own map, predicted-scan
//! buffer, and a private RNG stream (§3, §9).

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::grid::OccupancyGrid;
use crate::pose::Pose;

/// One particle of the filter.
///
/// `map` is reference-counted and shared across siblings until one of them
/// mutates it (mapping, §4.8); [`Particle::map_mut`] performs the
/// copy-on-write via [`Arc::make_mut`], so resampling itself never pays for
/// a deep copy -- only the first divergent write does (§5).
pub struct Particle {
    pub pose: Pose,
    pub weight: f64,
    pub map: Arc<OccupancyGrid>,
    /// Predicted range for each beam, same indexing as the sensor's angle
    /// column (§4.4). Initialized to `r_max` for every beam at the start of
    /// each scan-prediction phase.
    pub predicted_ranges: Vec<f64>,
    pub rng: StdRng,
}

impl Particle {
    /// Creates a particle with a fresh grid initialized from `config`,
    /// seeded deterministically from `seed` (derived from the filter's
    /// master seed, §9).
    pub fn new(pose: Pose, n_beams: usize, map: Arc<OccupancyGrid>, seed: u64) -> Self {
        Particle {
            pose,
            weight: 0.0,
            map,
            predicted_ranges: vec![0.0; n_beams],
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Mutable access to this particle's map, cloning the underlying grid
    /// the first time it diverges from a sibling's (copy-on-write).
    pub fn map_mut(&mut self) -> &mut OccupancyGrid {
        Arc::make_mut(&mut self.map)
    }
}
