use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::classify::classify_matches;
use crate::correspondence::CorrespondenceSet;
use crate::error::VfcError;
use crate::field::VectorField;
use crate::kernel::{full_kernel, landmark_kernel, low_rank_kernel, KernelMatrices};
use crate::landmarks::{default_landmark_count, select_landmarks, LandmarkSet};
use crate::normalize::NormalizedPair;

use super::config::{FieldBasis, OutlierDensity, VfcConfig};
use super::em::{e_step, m_step, objective};
use super::interrupt::Interrupt;
use super::result::{Diagnostics, EstimationResult, MixtureParams, StopReason};

/// Area used when the target bounding box is too thin to define a density.
const FALLBACK_OUTLIER_AREA: f64 = 4.0;

/// Run VFC on a correspondence set.
///
/// Validates `config`, normalizes both point sets, and runs EM until the
/// relative σ² change drops below `config.convergence_tolerance` or
/// `config.max_iterations` is reached.
pub fn estimate_vfc(
    set: &CorrespondenceSet,
    config: &VfcConfig,
) -> Result<EstimationResult, VfcError> {
    config.validate()?;
    let pair = NormalizedPair::from_set(set);
    Ok(run_em(set, &pair, config, &Interrupt::none()))
}

fn outlier_density_value(density: OutlierDensity, targets: &[[f64; 2]]) -> f64 {
    let area = match density {
        OutlierDensity::UniformArea { area } => area,
        OutlierDensity::TargetExtent => {
            let (lo, hi) = targets.iter().fold(
                ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]),
                |(lo, hi), p| {
                    (
                        [lo[0].min(p[0]), lo[1].min(p[1])],
                        [hi[0].max(p[0]), hi[1].max(p[1])],
                    )
                },
            );
            let area = (hi[0] - lo[0]) * (hi[1] - lo[1]);
            if area.is_finite() && area > 1e-6 {
                area
            } else {
                tracing::warn!(
                    "target extent area {:.3e} too small; using outlier area {}",
                    area,
                    FALLBACK_OUTLIER_AREA
                );
                FALLBACK_OUTLIER_AREA
            }
        }
    };
    1.0 / area
}

fn build_kernel(
    points: &[[f64; 2]],
    config: &VfcConfig,
    rng: &mut StdRng,
) -> (KernelMatrices, LandmarkSet) {
    let n = points.len();
    match config.basis {
        FieldBasis::Landmarks => {
            let count = config
                .landmark_count
                .unwrap_or_else(|| default_landmark_count(n));
            let landmarks = select_landmarks(n, count, rng);
            (landmark_kernel(points, &landmarks, config.bandwidth), landmarks)
        }
        FieldBasis::Full => (full_kernel(points, config.bandwidth), LandmarkSet::all(n)),
        FieldBasis::LowRank { rank } => (
            low_rank_kernel(points, rank.min(n), config.bandwidth),
            LandmarkSet::all(n),
        ),
    }
}

/// EM loop over pre-normalized data. `config` must already be validated.
pub(crate) fn run_em(
    set: &CorrespondenceSet,
    pair: &NormalizedPair,
    config: &VfcConfig,
    interrupt: &Interrupt<'_>,
) -> EstimationResult {
    let n = set.len();
    let seed = config.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);

    let (kernel, landmarks) = build_kernel(&pair.source.points, config, &mut rng);
    let displacements = pair.displacements();
    let y = DMatrix::from_fn(n, 2, |i, c| displacements[i][c]);
    let a = outlier_density_value(config.outlier_density, &pair.target.points);

    tracing::debug!(
        n,
        basis_len = kernel.basis_len(),
        seed,
        outlier_density = a,
        "vfc start"
    );

    // Initial state: zero field, σ² from the raw displacements, P = 1.
    let mut coefficients = DMatrix::<f64>::zeros(kernel.basis_len(), 2);
    let mut residual_sq: Vec<f64> = displacements
        .iter()
        .map(|d| d[0] * d[0] + d[1] * d[1])
        .collect();
    let mut sigma2 = (residual_sq.iter().sum::<f64>() / (2.0 * n as f64)).max(config.min_variance);
    let mut gamma = config.prior_inlier_ratio;
    let mut posteriors = vec![1.0; n];

    let mut objective_trace = Vec::new();
    let mut iterations = 0usize;
    let mut final_sigma2_change = None;
    let mut stop_reason = StopReason::IterationCap;
    let mut jittered_solves = 0usize;
    let mut max_jitter = 0.0f64;
    let mut rejected_field_updates = 0usize;

    for iteration in 1..=config.max_iterations {
        if interrupt.is_triggered() {
            stop_reason = StopReason::Cancelled;
            break;
        }

        let e = e_step(&residual_sq, sigma2, gamma, a);
        let m = m_step(&kernel, &y, &e.posteriors, sigma2, &coefficients, config);
        if m.solve.is_unstable() {
            jittered_solves += 1;
            max_jitter = max_jitter.max(m.solve.jitter());
        }
        if !m.field_updated {
            rejected_field_updates += 1;
        }
        let obj = objective(&kernel, &m, a, config.regularization);
        let change = (m.sigma2 - sigma2).abs() / sigma2;

        tracing::trace!(
            iteration,
            sigma2 = m.sigma2,
            gamma = m.gamma,
            objective = obj,
            "vfc iteration"
        );

        posteriors = e.posteriors;
        coefficients = m.coefficients;
        sigma2 = m.sigma2;
        gamma = m.gamma;
        residual_sq = m.residual_sq;
        objective_trace.push(obj);
        iterations = iteration;
        final_sigma2_change = Some(change);

        if change < config.convergence_tolerance {
            stop_reason = StopReason::Converged;
            break;
        }
    }

    if jittered_solves > 0 {
        tracing::warn!(
            jittered_solves,
            max_jitter,
            "ill-conditioned M-step systems needed regularization"
        );
    }

    let final_objective_delta = match objective_trace.as_slice() {
        [.., prev, last] => Some(last - prev),
        _ => None,
    };

    let positions = classify_matches(&posteriors, config.classification_threshold);
    let inliers = set.original_indices(&positions);

    tracing::info!(
        iterations,
        stop_reason = ?stop_reason,
        sigma2,
        gamma,
        "{} of {} correspondences classified as inliers",
        inliers.len(),
        n
    );

    let weights = kernel.expansion_weights(&coefficients);
    let field = VectorField {
        centers: kernel.centers.clone(),
        weights: (0..weights.nrows())
            .map(|j| [weights[(j, 0)], weights[(j, 1)]])
            .collect(),
        bandwidth: config.bandwidth,
        source_normalization: pair.source.params,
        target_normalization: pair.target.params,
    };

    EstimationResult {
        indices: set.indices().to_vec(),
        posteriors,
        inliers,
        field,
        mixture: MixtureParams { sigma2, gamma },
        diagnostics: Diagnostics {
            iterations,
            final_sigma2_change,
            final_objective_delta,
            objective_trace,
            stop_reason,
            jittered_solves,
            max_jitter,
            rejected_field_updates,
            degenerate_source: pair.source.degenerate,
            degenerate_target: pair.target.degenerate,
            seed,
            landmarks,
            outlier_density: a,
        },
    }
}
