use serde::{Deserialize, Serialize};

use crate::classify::classify_matches;
use crate::field::VectorField;
use crate::landmarks::LandmarkSet;

/// Why the EM loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Relative σ² change fell below the tolerance.
    Converged,
    /// `max_iterations` reached first.
    IterationCap,
    /// An [`Interrupt`](super::Interrupt) fired.
    Cancelled,
}

/// Gaussian/uniform mixture parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixtureParams {
    /// Inlier noise variance σ², normalized target units.
    pub sigma2: f64,
    /// Inlier fraction γ.
    pub gamma: f64,
}

/// Convergence and numerical diagnostics of one estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Completed EM iterations.
    pub iterations: usize,
    /// `|σ²_new - σ²_old| / σ²_old` of the last iteration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_sigma2_change: Option<f64>,
    /// Objective change over the last iteration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_objective_delta: Option<f64>,
    /// Negative log posterior after each M-step.
    pub objective_trace: Vec<f64>,
    pub stop_reason: StopReason,
    /// Linear solves that needed jitter, LU, or failed outright.
    pub jittered_solves: usize,
    /// Largest diagonal jitter applied.
    pub max_jitter: f64,
    /// M-steps that kept the previous field coefficients.
    pub rejected_field_updates: usize,
    /// All source points coincided.
    pub degenerate_source: bool,
    /// All target points coincided.
    pub degenerate_target: bool,
    /// Landmark sampling seed actually used.
    pub seed: u64,
    /// Landmark positions (kernel centers for the landmark basis).
    pub landmarks: LandmarkSet,
    /// Outlier density `a` used by the mixture.
    pub outlier_density: f64,
}

/// Result of one VFC estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    /// Original index of each correspondence, input order.
    pub indices: Vec<usize>,
    /// Inlier posterior of each correspondence, input order.
    pub posteriors: Vec<f64>,
    /// Original indices classified as inliers, ascending.
    pub inliers: Vec<usize>,
    /// Fitted field.
    pub field: VectorField,
    /// Final mixture parameters.
    pub mixture: MixtureParams,
    pub diagnostics: Diagnostics,
}

impl EstimationResult {
    /// Original indices classified as inliers, ascending.
    pub fn inliers(&self) -> &[usize] {
        &self.inliers
    }

    /// Re-threshold the stored posteriors; returns original indices, ascending.
    pub fn classify(&self, threshold: f64) -> Vec<usize> {
        let mut out: Vec<usize> = classify_matches(&self.posteriors, threshold)
            .into_iter()
            .map(|pos| self.indices[pos])
            .collect();
        out.sort_unstable();
        out
    }

    /// Number of correspondences classified as inliers.
    pub fn inlier_count(&self) -> usize {
        self.inliers.len()
    }
}
