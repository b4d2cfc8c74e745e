use serde::{Deserialize, Serialize};

use crate::error::VfcError;

/// Kernel basis used to represent the vector field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldBasis {
    /// Kernel columns at a random landmark subset (sparse VFC).
    Landmarks,
    /// Full N×N Gram matrix (classic VFC).
    Full,
    /// Leading eigenpairs of the Gram matrix (fast VFC).
    LowRank {
        /// Number of eigenpairs kept.
        rank: usize,
    },
}

/// Density of the uniform outlier component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutlierDensity {
    /// `a = 1 / area`, with `area` measured in the normalized target frame.
    UniformArea {
        /// Support area of the outlier distribution.
        area: f64,
    },
    /// `a = 1 / area` of the bounding box of the normalized target points.
    TargetExtent,
}

impl Default for OutlierDensity {
    fn default() -> Self {
        Self::UniformArea { area: 4.0 }
    }
}

/// Configuration for VFC estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfcConfig {
    /// Gaussian kernel width β in `exp(-β ||x - y||²)`, normalized units.
    pub bandwidth: f64,
    /// Smoothness weight λ of the RKHS penalty.
    pub regularization: f64,
    /// Landmark count M. `None` selects `min(N, 15)`.
    pub landmark_count: Option<usize>,
    /// Initial inlier fraction γ₀.
    pub prior_inlier_ratio: f64,
    /// Upper bound on EM iterations.
    pub max_iterations: usize,
    /// Stop when the relative change of σ² falls below this value.
    pub convergence_tolerance: f64,
    /// Posterior at or above which a correspondence is an inlier.
    pub classification_threshold: f64,
    /// Landmark sampling seed. `None` draws a fresh seed per call; the seed
    /// actually used is reported in the diagnostics.
    pub seed: Option<u64>,
    /// Field representation.
    pub basis: FieldBasis,
    /// Outlier density `a` of the mixture.
    pub outlier_density: OutlierDensity,
    /// Lower bound on σ².
    pub min_variance: f64,
    /// Lower bound on posteriors inverted by the full-basis solve.
    pub min_posterior: f64,
}

impl Default for VfcConfig {
    fn default() -> Self {
        Self {
            bandwidth: 0.1,
            regularization: 3.0,
            landmark_count: None,
            prior_inlier_ratio: 0.9,
            max_iterations: 500,
            convergence_tolerance: 1e-5,
            classification_threshold: 0.75,
            seed: None,
            basis: FieldBasis::Landmarks,
            outlier_density: OutlierDensity::default(),
            min_variance: 1e-8,
            min_posterior: 1e-5,
        }
    }
}

fn positive_finite(field: &'static str, value: f64) -> Result<(), VfcError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(VfcError::invalid_config(
            field,
            format!("must be finite and > 0, got {}", value),
        ))
    }
}

impl VfcConfig {
    /// Check every value against its domain.
    pub fn validate(&self) -> Result<(), VfcError> {
        positive_finite("bandwidth", self.bandwidth)?;
        positive_finite("regularization", self.regularization)?;
        positive_finite("convergence_tolerance", self.convergence_tolerance)?;
        positive_finite("min_variance", self.min_variance)?;

        if self.landmark_count == Some(0) {
            return Err(VfcError::invalid_config("landmark_count", "must be >= 1"));
        }
        if !(self.prior_inlier_ratio > 0.0 && self.prior_inlier_ratio < 1.0) {
            return Err(VfcError::invalid_config(
                "prior_inlier_ratio",
                format!("must lie in (0, 1), got {}", self.prior_inlier_ratio),
            ));
        }
        if self.max_iterations == 0 {
            return Err(VfcError::invalid_config("max_iterations", "must be >= 1"));
        }
        if !(0.0..=1.0).contains(&self.classification_threshold) {
            return Err(VfcError::invalid_config(
                "classification_threshold",
                format!("must lie in [0, 1], got {}", self.classification_threshold),
            ));
        }
        if !(self.min_posterior > 0.0 && self.min_posterior <= 1.0) {
            return Err(VfcError::invalid_config(
                "min_posterior",
                format!("must lie in (0, 1], got {}", self.min_posterior),
            ));
        }
        if let FieldBasis::LowRank { rank } = self.basis {
            if rank == 0 {
                return Err(VfcError::invalid_config("basis", "low-rank rank must be >= 1"));
            }
        }
        if let OutlierDensity::UniformArea { area } = self.outlier_density {
            positive_finite("outlier_density", area)?;
        }
        Ok(())
    }
}
