//! Fitted displacement field, evaluable at arbitrary source points.

use serde::{Deserialize, Serialize};

use crate::kernel::gaussian_kernel;
use crate::normalize::NormalizationParams;
use crate::parallel::map_indexed;

/// Kernel expansion `f(x) = Σ_j exp(-β ||x - c_j||²) w_j` in the normalized
/// source frame, plus the normalizations that connect it to caller
/// coordinates.
///
/// A source point `p` is mapped to `target_normalization.undo(x + f(x))`
/// where `x = source_normalization.apply(p)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorField {
    /// Kernel centers, normalized source frame.
    pub centers: Vec<[f64; 2]>,
    /// Expansion weight of each center.
    pub weights: Vec<[f64; 2]>,
    /// Kernel width β.
    pub bandwidth: f64,
    /// Source-side normalization.
    pub source_normalization: NormalizationParams,
    /// Target-side normalization.
    pub target_normalization: NormalizationParams,
}

impl VectorField {
    /// Displacement in the normalized frame at normalized point `x`.
    pub fn displacement_normalized(&self, x: [f64; 2]) -> [f64; 2] {
        self.centers
            .iter()
            .zip(&self.weights)
            .fold([0.0, 0.0], |acc, (&c, w)| {
                let k = gaussian_kernel(x, c, self.bandwidth);
                [acc[0] + k * w[0], acc[1] + k * w[1]]
            })
    }

    /// Predicted target position of source point `p` (caller coordinates).
    pub fn transform(&self, p: [f64; 2]) -> [f64; 2] {
        let x = self.source_normalization.apply(p);
        let f = self.displacement_normalized(x);
        self.target_normalization.undo([x[0] + f[0], x[1] + f[1]])
    }

    /// Predicted motion `transform(p) - p` (caller coordinates).
    pub fn displacement(&self, p: [f64; 2]) -> [f64; 2] {
        let t = self.transform(p);
        [t[0] - p[0], t[1] - p[1]]
    }

    /// [`transform`](Self::transform) over a slice, order preserved.
    pub fn transform_points(&self, points: &[[f64; 2]]) -> Vec<[f64; 2]> {
        map_indexed(points.len(), |i| self.transform(points[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(cx: f64, cy: f64, scale: f64) -> NormalizationParams {
        NormalizationParams {
            centroid: [cx, cy],
            scale,
        }
    }

    #[test]
    fn zero_weights_map_between_normalized_frames() {
        let field = VectorField {
            centers: vec![[0.0, 0.0], [1.0, 1.0]],
            weights: vec![[0.0, 0.0]; 2],
            bandwidth: 0.1,
            source_normalization: params(10.0, 20.0, 5.0),
            target_normalization: params(13.0, 18.0, 10.0),
        };
        // x = (p - (10, 20)) / 5, t = 10 x + (13, 18)
        let t = field.transform([15.0, 30.0]);
        assert_relative_eq!(t[0], 23.0, epsilon = 1e-12);
        assert_relative_eq!(t[1], 38.0, epsilon = 1e-12);

        let d = field.displacement([15.0, 30.0]);
        assert_relative_eq!(d[0], 8.0, epsilon = 1e-12);
        assert_relative_eq!(d[1], 8.0, epsilon = 1e-12);
    }

    #[test]
    fn single_center_displacement_decays_with_distance() {
        let field = VectorField {
            centers: vec![[0.0, 0.0]],
            weights: vec![[0.5, -0.25]],
            bandwidth: 2.0,
            source_normalization: NormalizationParams::identity(),
            target_normalization: NormalizationParams::identity(),
        };
        let at_center = field.displacement_normalized([0.0, 0.0]);
        assert_relative_eq!(at_center[0], 0.5, epsilon = 1e-15);
        assert_relative_eq!(at_center[1], -0.25, epsilon = 1e-15);

        let off = field.displacement([1.0, 0.0]);
        assert_relative_eq!(off[0], 0.5 * (-2.0f64).exp(), epsilon = 1e-15);
        assert_relative_eq!(off[1], -0.25 * (-2.0f64).exp(), epsilon = 1e-15);

        let batch = field.transform_points(&[[0.0, 0.0], [1.0, 0.0]]);
        assert_eq!(batch, vec![field.transform([0.0, 0.0]), field.transform([1.0, 0.0])]);
    }
}
