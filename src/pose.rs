//! 2D robot pose and the angle-wrapping convention used throughout the filter.

use nalgebra::{Matrix2, Vector2, Vector3};

/// Wraps an angle (radians) into `[-pi, pi)`.
///
/// `wrap(wrap(x)) == wrap(x)` for all finite `x`.
pub fn wrap(theta: f64) -> f64 {
    use std::f64::consts::PI;
    theta - 2.0 * PI * ((theta + PI) / (2.0 * PI)).floor()
}

/// A robot pose in the world frame: position in meters, heading in radians.
///
/// `theta` is always kept in `[-pi, pi)`; every constructor and mutator wraps it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Pose { x, y, theta: wrap(theta) }
    }

    pub fn as_vector3(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.theta)
    }

    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    /// Rotation matrix taking the robot (local) frame to the world frame.
    pub fn rotation(&self) -> Matrix2<f64> {
        let (s, c) = self.theta.sin_cos();
        Matrix2::new(c, -s, s, c)
    }

    /// Applies an additive pose correction `(dx, dy, dtheta)`, re-wrapping theta.
    pub fn apply_correction(&mut self, dx: f64, dy: f64, dtheta: f64) {
        self.x += dx;
        self.y += dy;
        self.theta = wrap(self.theta + dtheta);
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose { x: 0.0, y: 0.0, theta: 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn wrap_is_idempotent() {
        for x in [-10.0, -PI - 0.1, -PI, 0.0, 1.0, PI, 3.0 * PI, 100.0] {
            let once = wrap(x);
            assert_relative_eq!(wrap(once), once, epsilon = 1e-9);
            assert!(once >= -PI && once < PI);
        }
    }

    #[test]
    fn new_wraps_theta() {
        let p = Pose::new(0.0, 0.0, 3.0 * PI);
        assert!(p.theta >= -PI && p.theta < PI);
    }

    #[test]
    fn correction_rewraps() {
        let mut p = Pose::new(0.0, 0.0, PI - 0.01);
        p.apply_correction(0.0, 0.0, 1.0);
        assert!(p.theta >= -PI && p.theta < PI);
    }
}
