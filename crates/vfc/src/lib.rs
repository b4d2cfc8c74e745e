//! vfc: Vector Field Consensus mismatch removal for 2D point correspondences.
//!
//! Given putative matches `s_i -> t_i` between two views, VFC fits a smooth
//! displacement field in a Gaussian RKHS while treating each match as either
//! an inlier (Gaussian residual) or an outlier (uniform density). The EM loop
//! alternates between posterior inlier probabilities and a regularized field
//! refit; matches whose final posterior reaches the classification threshold
//! are reported as correct.
//!
//! The stages are:
//!
//! 1. **Normalize** – independent centroid/scale normalization of both sets.
//! 2. **Basis** – landmark subset (default), full Gram matrix, or low-rank
//!    eigen-approximation of the kernel.
//! 3. **EM** – E-step posteriors, M-step field/σ²/γ refit, until σ² settles.
//! 4. **Classify** – threshold the posteriors.
//!
//! # Public API
//! - [`Vfc`] handle (`set_data` / `configure` / `optimize` /
//!   `obtain_correct_match`) and the one-shot [`filter_matches`]
//! - [`VfcConfig`] for tuning, [`EstimationResult`] with the fitted
//!   [`VectorField`] and [`Diagnostics`]
//! - [`CorrespondenceSet`] builders, including keypoint/match index glue

mod api;
mod classify;
mod correspondence;
mod error;
mod estimator;
mod field;
mod kernel;
mod landmarks;
mod normalize;
mod parallel;

pub use api::{filter_matches, Vfc};
pub use classify::classify_matches;
pub use correspondence::{Correspondence, CorrespondenceSet, MIN_CORRESPONDENCES};
pub use error::VfcError;
pub use estimator::{
    estimate_vfc, Diagnostics, EstimationResult, FieldBasis, Interrupt, MixtureParams,
    OutlierDensity, StopReason, VfcConfig,
};
pub use field::VectorField;
pub use landmarks::{LandmarkSet, DEFAULT_LANDMARK_CAP};
pub use normalize::NormalizationParams;

#[cfg(test)]
pub(crate) mod test_utils;
