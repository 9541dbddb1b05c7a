//! External interfaces (§6, §9): a real range scan plus the narrow,
//! read-only capability traits the core uses to pull odometry and
//! ground truth from an otherwise unknown "robot" collaborator.
//!
//! The core never holds an identity for the robot -- only these traits --
//! which breaks the cyclic header dependency the reference implementation
//! has between its filter and its robot/sensor classes.

/// A single range-finder beam: angle (radians, robot frame) and measured
/// range (meters). Absent returns carry `r_max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beam {
    pub angle: f64,
    pub range: f64,
}

/// One full sweep from the range sensor (§3).
///
/// The angle column (`beams[i].angle` for every `i`) is assumed constant
/// across ticks within a session; the filter captures it once at
/// construction and never mutates it (§9).
#[derive(Debug, Clone, PartialEq)]
pub struct Scan {
    pub beams: Vec<Beam>,
    pub fov_deg: f64,
    pub r_max: f64,
    pub sigma_r: f64,
}

impl Scan {
    pub fn n_beams(&self) -> usize {
        self.beams.len()
    }

    pub fn angles(&self) -> impl Iterator<Item = f64> + '_ {
        self.beams.iter().map(|b| b.angle)
    }

    pub fn ranges(&self) -> impl Iterator<Item = f64> + '_ {
        self.beams.iter().map(|b| b.range)
    }

    /// Index of the beam whose angle is closest to `angle`.
    ///
    /// Panics if the scan has no beams; callers must not construct an empty
    /// `Scan` (rejected by [`crate::config::FilterConfig::validate`]).
    pub fn nearest_beam(&self, angle: f64) -> usize {
        self.beams
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (a.angle - angle)
                    .abs()
                    .partial_cmp(&(b.angle - angle).abs())
                    .unwrap()
            })
            .map(|(i, _)| i)
            .expect("scan must have at least one beam")
    }
}

/// A single odometry sample (§3 Velocity command).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdometryTick {
    pub v: f64,
    pub omega: f64,
    pub t: f64,
}
