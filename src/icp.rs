//! Iterative Closest Point scan matcher (§4.5): rigid 2D alignment of a
//! predicted point cloud onto a measured one, via Horn's method (SVD).

use nalgebra::{Matrix2, Vector2};

use crate::config::{IcpParams, MotionNoise};

/// A 2D point cloud in the world frame.
pub type Cloud = Vec<Vector2<f64>>;

/// A rigid 2D transform: rotation + translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    pub rotation: Matrix2<f64>,
    pub translation: Vector2<f64>,
}

impl Transform2D {
    pub fn identity() -> Self {
        Transform2D { rotation: Matrix2::identity(), translation: Vector2::zeros() }
    }

    pub fn apply(&self, p: Vector2<f64>) -> Vector2<f64> {
        self.rotation * p + self.translation
    }

    /// `atan2(R_10, R_00)`, the heading this rotation corresponds to.
    pub fn angle(&self) -> f64 {
        self.rotation[(1, 0)].atan2(self.rotation[(0, 0)])
    }
}

/// The pose correction ICP returns: `(dx, dy, dtheta)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseCorrection {
    pub dx: f64,
    pub dy: f64,
    pub dtheta: f64,
}

/// Removes the `discard_fraction` worst-matched rows (by squared distance,
/// paired index-for-index) from both clouds jointly (§4.5 step 1).
fn trim_outliers(a: &Cloud, b: &Cloud, discard_fraction: f64) -> (Cloud, Cloud) {
    let n = a.len();
    let n_discard = ((n as f64) * discard_fraction).floor() as usize;
    if n_discard == 0 {
        return (a.clone(), b.clone());
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        let di = (a[i] - b[i]).norm_squared();
        let dj = (a[j] - b[j]).norm_squared();
        dj.partial_cmp(&di).unwrap()
    });
    let discard: std::collections::HashSet<usize> = order.into_iter().take(n_discard).collect();

    let mut ta = Cloud::with_capacity(n - n_discard);
    let mut tb = Cloud::with_capacity(n - n_discard);
    for i in 0..n {
        if !discard.contains(&i) {
            ta.push(a[i]);
            tb.push(b[i]);
        }
    }
    (ta, tb)
}

struct NearestNeighbors {
    /// For each point in `a`, the index of its nearest neighbor in `b`.
    indices: Vec<usize>,
    /// The corresponding squared distances.
    distances: Vec<f64>,
}

/// Brute-force nearest-neighbor pairing, `a` onto `b` (§4.5 step 2a).
fn nearest_neighbor(a: &Cloud, b: &Cloud) -> NearestNeighbors {
    let mut indices = Vec::with_capacity(a.len());
    let mut distances = Vec::with_capacity(a.len());
    for pa in a {
        let mut best_idx = 0;
        let mut best_dist = f64::INFINITY;
        for (j, pb) in b.iter().enumerate() {
            let d = (pa - pb).norm_squared();
            if d < best_dist {
                best_dist = d;
                best_idx = j;
            }
        }
        indices.push(best_idx);
        distances.push(best_dist);
    }
    NearestNeighbors { indices, distances }
}

/// Best-fit rigid transform from `p` (source) onto `q` (target), via Horn's
/// method (§4.5 "Best-fit rigid transform"). Returns identity if `p.len() <
/// 2`; falls back to `R = I` (translation-only) if the cross-covariance is
/// degenerate (zero singular value).
fn fit_transform(p: &Cloud, q: &Cloud) -> Transform2D {
    let n = p.len();
    if n < 2 {
        return Transform2D::identity();
    }

    let centroid_p = p.iter().fold(Vector2::zeros(), |acc, v| acc + v) / n as f64;
    let centroid_q = q.iter().fold(Vector2::zeros(), |acc, v| acc + v) / n as f64;

    let mut h = Matrix2::zeros();
    for i in 0..n {
        let pp = p[i] - centroid_p;
        let qq = q[i] - centroid_q;
        h += pp * qq.transpose();
    }

    let svd = nalgebra::linalg::SVD::new(h, true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Transform2D::identity();
    };
    if svd.singular_values.iter().any(|s| s.abs() < 1e-12) {
        // Degenerate cross-covariance: fall back to R = I rather than
        // discarding the translation too (§4.5 edge cases).
        return Transform2D { rotation: Matrix2::identity(), translation: centroid_q - centroid_p };
    }

    let mut v = v_t.transpose();
    let mut rotation = v * u.transpose();
    if rotation.determinant() < 0.0 {
        v[(0, 1)] = -v[(0, 1)];
        v[(1, 1)] = -v[(1, 1)];
        rotation = v * u.transpose();
    }

    let translation = centroid_q - rotation * centroid_p;
    Transform2D { rotation, translation }
}

/// Runs ICP, returning a gated pose correction (§4.5).
///
/// `predicted` (A) and `measured` (B) must have equal length; both are in
/// the world frame already, so the returned correction is a world-frame
/// delta that can be added directly to the particle's pose (§9 "Coordinate-
/// frame confusion in ICP call").
pub fn icp(predicted: &Cloud, measured: &Cloud, params: &IcpParams, r: &MotionNoise) -> PoseCorrection {
    assert_eq!(predicted.len(), measured.len(), "ICP requires equal-length clouds");

    let (mut a, b) = trim_outliers(predicted, measured, params.discard_fraction);
    if a.len() < 2 {
        tracing::debug!(n = a.len(), "degenerate ICP cloud after trimming, returning zero correction");
        return PoseCorrection::default();
    }

    let mut prev_mean: Option<f64> = None;
    for _ in 0..params.max_iter {
        let nn = nearest_neighbor(&a, &b);
        let b_ordered: Cloud = nn.indices.iter().map(|&j| b[j]).collect();

        let t = fit_transform(&a, &b_ordered);
        a = a.iter().map(|p| t.apply(*p)).collect();

        let mean = nn.distances.iter().sum::<f64>() / nn.distances.len() as f64;
        if let Some(prev) = prev_mean {
            if (prev - mean).abs() < params.tolerance {
                break;
            }
        }
        prev_mean = Some(mean);
    }

    let t_final = fit_transform(&a, &b);

    let gate = 3.0 * (r.sigma_x * r.sigma_x + r.sigma_y * r.sigma_y).sqrt();
    let correction_norm = t_final.translation.norm();
    if correction_norm >= gate {
        tracing::debug!(correction_norm, gate, "ICP correction rejected by 3-sigma gate");
        return PoseCorrection::default();
    }

    PoseCorrection {
        dx: t_final.translation.x,
        dy: t_final.translation.y,
        dtheta: t_final.angle(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn default_params() -> IcpParams {
        IcpParams { max_iter: 30, tolerance: 1e-6, discard_fraction: 0.0 }
    }

    fn default_r() -> MotionNoise {
        MotionNoise { sigma_x: 0.2, sigma_y: 0.2, sigma_theta: 0.1 }
    }

    fn circle_cloud(n: usize, radius: f64) -> Cloud {
        (0..n)
            .map(|i| {
                let a = 2.0 * PI * i as f64 / n as f64;
                Vector2::new(radius * a.cos(), radius * a.sin())
            })
            .collect()
    }

    #[test]
    fn identical_clouds_give_zero_correction() {
        let cloud = circle_cloud(60, 3.0);
        let result = icp(&cloud, &cloud, &default_params(), &default_r());
        assert_relative_eq!(result.dx, 0.0, epsilon = 1e-6);
        assert_relative_eq!(result.dy, 0.0, epsilon = 1e-6);
        assert_relative_eq!(result.dtheta, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn recovers_pure_translation() {
        let a = circle_cloud(60, 3.0);
        let b: Cloud = a.iter().map(|p| p + Vector2::new(0.3, 0.1)).collect();
        let result = icp(&a, &b, &default_params(), &default_r());
        assert_relative_eq!(result.dx, 0.3, epsilon = 1e-2);
        assert_relative_eq!(result.dy, 0.1, epsilon = 1e-2);
        assert_relative_eq!(result.dtheta, 0.0, epsilon = 1e-2);
    }

    #[test]
    fn recovers_pure_rotation() {
        let a = circle_cloud(60, 3.0);
        let theta = 0.2;
        let rot = Matrix2::new(theta.cos(), -theta.sin(), theta.sin(), theta.cos());
        let b: Cloud = a.iter().map(|p| rot * p).collect();
        let result = icp(&a, &b, &default_params(), &default_r());
        assert_relative_eq!(result.dx, 0.0, epsilon = 1e-2);
        assert_relative_eq!(result.dy, 0.0, epsilon = 1e-2);
        assert_relative_eq!(result.dtheta, theta, epsilon = 1e-2);
    }

    #[test]
    fn reflection_is_guarded_against() {
        let a = circle_cloud(60, 3.0);
        // Mirror image across the x-axis: a proper reflection, not a rigid motion.
        let b: Cloud = a.iter().map(|p| Vector2::new(p.x, -p.y)).collect();
        let result = icp(&a, &b, &default_params(), &default_r());
        assert!(result.dx.is_finite());
        assert!(result.dy.is_finite());
        assert!(result.dtheta.is_finite());

        let t = fit_transform(&a, &b);
        assert_relative_eq!(t.rotation.determinant(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn out_of_gate_correction_is_discarded() {
        let a = circle_cloud(60, 3.0);
        // A translation far larger than 3*sigma should be rejected.
        let b: Cloud = a.iter().map(|p| p + Vector2::new(5.0, 5.0)).collect();
        let tight_r = MotionNoise { sigma_x: 0.01, sigma_y: 0.01, sigma_theta: 0.01 };
        let result = icp(&a, &b, &default_params(), &tight_r);
        assert_eq!(result, PoseCorrection::default());
    }

    #[test]
    fn degenerate_cloud_returns_identity() {
        let a = vec![Vector2::new(0.0, 0.0)];
        let b = vec![Vector2::new(1.0, 1.0)];
        let result = icp(&a, &b, &default_params(), &default_r());
        assert_eq!(result, PoseCorrection::default());
    }
}
