//! Pure EM transition functions.
//!
//! Mixture model per correspondence residual `r_i` (2D):
//!
//!   p(r_i) = γ N(r_i; 0, σ² I₂) + (1 - γ) a
//!
//! All densities are evaluated in log space so that tiny variances or large
//! residuals never underflow to `0 / 0`.

use nalgebra::DMatrix;

use super::config::VfcConfig;
use super::solve::{solve_spd, SolveMethod};
use crate::kernel::{KernelMatrices, SolveForm};
use crate::parallel::map_indexed;

/// γ is kept inside this range so neither mixture component dies out.
pub(crate) const GAMMA_MIN: f64 = 1e-4;
pub(crate) const GAMMA_MAX: f64 = 1.0 - 1e-4;

const LN_2PI: f64 = 1.837_877_066_409_345_3;

#[derive(Debug, Clone)]
pub(crate) struct EStep {
    pub posteriors: Vec<f64>,
    /// `Σ_i log p(r_i)`.
    pub log_likelihood: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct MStep {
    /// M×2 field coefficients.
    pub coefficients: DMatrix<f64>,
    pub sigma2: f64,
    pub gamma: f64,
    /// `||r_i||²` under the new coefficients.
    pub residual_sq: Vec<f64>,
    pub solve: SolveMethod,
    /// `false` when the previous coefficients were kept.
    pub field_updated: bool,
}

/// Log inlier density, log outlier density.
#[inline]
fn log_components(r2: f64, sigma2: f64, gamma: f64, ln_outlier: f64) -> (f64, f64) {
    let log_in = gamma.ln() - LN_2PI - sigma2.ln() - r2 / (2.0 * sigma2);
    let log_out = (1.0 - gamma).ln() + ln_outlier;
    (log_in, log_out)
}

#[inline]
fn log_add(a: f64, b: f64) -> f64 {
    let hi = a.max(b);
    hi + ((a - hi).exp() + (b - hi).exp()).ln()
}

/// Posterior inlier probability of every residual, plus the mixture
/// log-likelihood under the same parameters.
pub(crate) fn e_step(residual_sq: &[f64], sigma2: f64, gamma: f64, outlier_density: f64) -> EStep {
    let ln_outlier = outlier_density.ln();
    let per_point = map_indexed(residual_sq.len(), |i| {
        let (log_in, log_out) = log_components(residual_sq[i], sigma2, gamma, ln_outlier);
        let log_mix = log_add(log_in, log_out);
        ((log_in - log_mix).exp().clamp(0.0, 1.0), log_mix)
    });

    let mut posteriors = Vec::with_capacity(per_point.len());
    let mut log_likelihood = 0.0;
    for (p, log_mix) in per_point {
        posteriors.push(p);
        log_likelihood += log_mix;
    }
    EStep {
        posteriors,
        log_likelihood,
    }
}

/// `||y_i - (U C)_i||²` for every correspondence.
pub(crate) fn residual_norms(
    kernel: &KernelMatrices,
    displacements: &DMatrix<f64>,
    coefficients: &DMatrix<f64>,
) -> Vec<f64> {
    let fitted = &kernel.design * coefficients;
    (0..displacements.nrows())
        .map(|i| {
            let dx = displacements[(i, 0)] - fitted[(i, 0)];
            let dy = displacements[(i, 1)] - fitted[(i, 1)];
            dx * dx + dy * dy
        })
        .collect()
}

fn normal_equations(
    kernel: &KernelMatrices,
    displacements: &DMatrix<f64>,
    posteriors: &[f64],
    sigma2: f64,
    config: &VfcConfig,
) -> (DMatrix<f64>, DMatrix<f64>) {
    let damping = config.regularization * sigma2;
    match kernel.form {
        SolveForm::Projected => {
            // (Uᵀ P U + λσ² R) C = Uᵀ P Y
            let mut weighted = kernel.design.clone();
            for (i, mut row) in weighted.row_iter_mut().enumerate() {
                row *= posteriors[i];
            }
            let wt = weighted.transpose();
            let mut lhs = &wt * &kernel.design;
            lhs += &kernel.regularizer * damping;
            let rhs = wt * displacements;
            (lhs, rhs)
        }
        SolveForm::Gram => {
            // (K + λσ² P⁻¹) C = Y
            let mut lhs = kernel.design.clone();
            for (i, &p) in posteriors.iter().enumerate() {
                lhs[(i, i)] += damping / p.max(config.min_posterior);
            }
            (lhs, displacements.clone())
        }
    }
}

/// `Σ P_i ||r_i||² / (2σ²) + (λ/2) tr(Cᵀ R C)`: the part of the expected
/// complete-data objective that depends on `C`. Also returns `||r_i||²`.
fn field_surrogate(
    kernel: &KernelMatrices,
    displacements: &DMatrix<f64>,
    posteriors: &[f64],
    sigma2: f64,
    coefficients: &DMatrix<f64>,
    regularization: f64,
) -> (f64, Vec<f64>) {
    let residual_sq = residual_norms(kernel, displacements, coefficients);
    let data: f64 = posteriors
        .iter()
        .zip(&residual_sq)
        .map(|(p, r2)| p * r2)
        .sum();
    let value = data / (2.0 * sigma2) + smoothness_penalty(kernel, coefficients, regularization);
    (value, residual_sq)
}

/// Refit the field, then σ², then γ, from fixed posteriors.
///
/// The new coefficients are accepted only if they do not increase the field
/// surrogate relative to `previous`; an inexact solve of an ill-conditioned
/// system is otherwise able to raise the objective. A failed solve also
/// keeps `previous`.
pub(crate) fn m_step(
    kernel: &KernelMatrices,
    displacements: &DMatrix<f64>,
    posteriors: &[f64],
    sigma2: f64,
    previous: &DMatrix<f64>,
    config: &VfcConfig,
) -> MStep {
    let (lhs, rhs) = normal_equations(kernel, displacements, posteriors, sigma2, config);
    let outcome = solve_spd(&lhs, &rhs);

    let lambda = config.regularization;
    let (previous_value, previous_residuals) =
        field_surrogate(kernel, displacements, posteriors, sigma2, previous, lambda);
    let candidate = outcome.solution.map(|c| {
        let (value, residuals) =
            field_surrogate(kernel, displacements, posteriors, sigma2, &c, lambda);
        (c, value, residuals)
    });
    let (coefficients, residual_sq, field_updated) = match candidate {
        Some((c, value, residuals)) if value <= previous_value => (c, residuals, true),
        _ => (previous.clone(), previous_residuals, false),
    };

    let sum_p: f64 = posteriors.iter().sum();
    let weighted: f64 = posteriors
        .iter()
        .zip(&residual_sq)
        .map(|(p, r2)| p * r2)
        .sum();

    // With every posterior at zero there is no inlier evidence; keep σ².
    let sigma2_new = if sum_p > f64::MIN_POSITIVE {
        weighted / (2.0 * sum_p)
    } else {
        sigma2
    };
    let gamma = (sum_p / posteriors.len() as f64).clamp(GAMMA_MIN, GAMMA_MAX);

    MStep {
        coefficients,
        sigma2: sigma2_new.max(config.min_variance),
        gamma,
        residual_sq,
        solve: outcome.method,
        field_updated,
    }
}

/// `(λ/2) tr(Cᵀ R C)`.
pub(crate) fn smoothness_penalty(
    kernel: &KernelMatrices,
    coefficients: &DMatrix<f64>,
    regularization: f64,
) -> f64 {
    let quad = coefficients.transpose() * &kernel.regularizer * coefficients;
    0.5 * regularization * quad.trace()
}

/// Negative log posterior `-Σ log p(r_i) + (λ/2) tr(Cᵀ R C)`.
pub(crate) fn objective(
    kernel: &KernelMatrices,
    step: &MStep,
    outlier_density: f64,
    regularization: f64,
) -> f64 {
    let ll = e_step(&step.residual_sq, step.sigma2, step.gamma, outlier_density).log_likelihood;
    -ll + smoothness_penalty(kernel, &step.coefficients, regularization)
}
