//! Isotropic point normalization.
//!
//! Each point set is translated to its centroid and scaled so the mean
//! squared distance to the origin is 1. Source and target sets are
//! normalized independently; the fitted field lives in the normalized frame
//! and [`NormalizationParams`] maps back to caller coordinates.

use serde::{Deserialize, Serialize};

use crate::correspondence::CorrespondenceSet;

/// Centroid and isotropic scale of one point set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    /// Centroid subtracted before scaling.
    pub centroid: [f64; 2],
    /// Divisor applied after centering (always > 0).
    pub scale: f64,
}

impl NormalizationParams {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            centroid: [0.0, 0.0],
            scale: 1.0,
        }
    }

    /// Map a point into the normalized frame.
    pub fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        [
            (p[0] - self.centroid[0]) / self.scale,
            (p[1] - self.centroid[1]) / self.scale,
        ]
    }

    /// Map a normalized point back into caller coordinates.
    pub fn undo(&self, p: [f64; 2]) -> [f64; 2] {
        [
            p[0] * self.scale + self.centroid[0],
            p[1] * self.scale + self.centroid[1],
        ]
    }
}

/// One normalized point set.
#[derive(Debug, Clone)]
pub struct NormalizedPoints {
    /// Points in the normalized frame, input order.
    pub points: Vec<[f64; 2]>,
    /// Transform that produced `points`.
    pub params: NormalizationParams,
    /// All input points coincided; `params.scale` fell back to 1.
    pub degenerate: bool,
}

/// Normalize a point set to zero centroid and unit mean squared radius.
///
/// An empty slice yields the identity transform. When every point
/// coincides the scale would be zero; the identity scale is used instead and
/// `degenerate` is set. Any finite input, however large or small, yields
/// finite normalized points.
pub fn normalize_points(points: &[[f64; 2]]) -> NormalizedPoints {
    if points.is_empty() {
        return NormalizedPoints {
            points: Vec::new(),
            params: NormalizationParams::identity(),
            degenerate: true,
        };
    }

    // The centroid is accumulated over points divided by the largest
    // coordinate magnitude, and offsets are kept halved, so no sum or
    // difference can overflow whatever the input range.
    let extent = points
        .iter()
        .flat_map(|p| p.iter())
        .fold(0.0f64, |m, v| m.max(v.abs()));
    if extent == 0.0 {
        return NormalizedPoints {
            points: points.to_vec(),
            params: NormalizationParams::identity(),
            degenerate: true,
        };
    }

    let n = points.len() as f64;
    let mean_scaled = |axis: usize| points.iter().map(|p| p[axis] / extent).sum::<f64>() / n;
    let half_offsets = |c: [f64; 2]| -> Vec<[f64; 2]> {
        points
            .iter()
            .map(|p| [p[0] / 2.0 - c[0] / 2.0, p[1] / 2.0 - c[1] / 2.0])
            .collect()
    };

    // One correction pass removes the rounding residue of the first mean.
    let rough = [mean_scaled(0) * extent, mean_scaled(1) * extent];
    let residue = half_offsets(rough)
        .iter()
        .fold([0.0, 0.0], |acc, h| [acc[0] + h[0] / n, acc[1] + h[1] / n]);
    let centroid = [rough[0] + 2.0 * residue[0], rough[1] + 2.0 * residue[1]];
    let halves = half_offsets(centroid);

    let max_half = halves
        .iter()
        .flat_map(|h| h.iter())
        .fold(0.0f64, |m, v| m.max(v.abs()));
    let half_rms = if max_half > 0.0 {
        let mean_sq = halves
            .iter()
            .map(|h| (h[0] / max_half).powi(2) + (h[1] / max_half).powi(2))
            .sum::<f64>()
            / n;
        max_half * mean_sq.sqrt()
    } else {
        0.0
    };

    // Centroid rounding leaves a residue of a few ulps of |c|.
    let floor = 32.0 * f64::EPSILON * centroid[0].abs().max(centroid[1].abs());
    if half_rms <= floor {
        let params = NormalizationParams {
            centroid,
            scale: 1.0,
        };
        return NormalizedPoints {
            points: points.iter().map(|&p| params.apply(p)).collect(),
            params,
            degenerate: true,
        };
    }

    NormalizedPoints {
        points: halves
            .iter()
            .map(|h| [h[0] / half_rms, h[1] / half_rms])
            .collect(),
        params: NormalizationParams {
            centroid,
            scale: 2.0 * half_rms,
        },
        degenerate: false,
    }
}

/// Normalized source and target sets of one correspondence list.
#[derive(Debug, Clone)]
pub struct NormalizedPair {
    /// Normalized source points.
    pub source: NormalizedPoints,
    /// Normalized target points.
    pub target: NormalizedPoints,
}

impl NormalizedPair {
    /// Normalize both sides of a validated correspondence set.
    pub fn from_set(set: &CorrespondenceSet) -> Self {
        let source = normalize_points(set.source());
        let target = normalize_points(set.target());
        if source.degenerate {
            tracing::warn!("all source points coincide; using identity scale");
        }
        if target.degenerate {
            tracing::warn!("all target points coincide; using identity scale");
        }
        Self { source, target }
    }

    /// Normalized displacements `target_i - source_i`.
    pub fn displacements(&self) -> Vec<[f64; 2]> {
        self.source
            .points
            .iter()
            .zip(self.target.points.iter())
            .map(|(s, t)| [t[0] - s[0], t[1] - s[1]])
            .collect()
    }
}
