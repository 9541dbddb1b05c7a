//! Rao-Blackwellized particle filter for 2D occupancy-grid SLAM.
//!
//! Each particle carries its own trajectory hypothesis and its own
//! occupancy-grid map; the filter predicts motion, scores particles against
//! real range scans via scan-matched ICP corrections and a Gaussian
//! measurement likelihood, resamples, and (outside `Mode::Localize`) folds
//! the scan into every particle's map with an inverse sensor model.
//!
//! [`controller::Rbpf`] is the entry point.

pub mod config;
pub mod controller;
pub mod coords;
pub mod error;
pub mod grid;
pub mod icp;
pub mod inverse_sensor;
pub mod motion;
pub mod particle;
pub mod pose;
pub mod resample;
pub mod scan_predictor;
pub mod sensor;
pub mod weighting;

pub use config::{FilterConfig, GridConfig, IcpParams, InverseSensorParams, Mode, MotionNoise};
pub use controller::Rbpf;
pub use error::{ConfigError, TickError};
pub use grid::OccupancyGrid;
pub use particle::Particle;
pub use pose::Pose;
pub use sensor::{Beam, OdometryTick, Scan};
