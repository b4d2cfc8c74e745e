//! Gaussian kernel matrices for the field basis.
//!
//! The field is `f(x) = Σ_j k(x, c_j) a_j` with `k(x, y) = exp(-β ||x - y||²)`.
//! Every basis is reduced to the same linear-algebra shape used by the
//! M-step: a design matrix `U` (N×M) that maps coefficients to field values
//! at the correspondences, and a regularization matrix `R` (M×M) so that the
//! RKHS norm of the field is `tr(Cᵀ R C)`.

use nalgebra::{DMatrix, SymmetricEigen};

use crate::landmarks::LandmarkSet;
use crate::parallel::map_indexed;

/// Eigenvalues below this fraction of the largest are dropped by the
/// low-rank basis; their inverse would dominate the regularizer.
const LOW_RANK_EIGEN_FLOOR: f64 = 1e-12;

/// How the M-step solves for the coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveForm {
    /// `(Uᵀ P U + λσ² R) C = Uᵀ P Y`, size M×M.
    Projected,
    /// `(K + λσ² P⁻¹) C = Y`, size N×N, with `U = R = K`.
    Gram,
}

/// Kernel matrices for one estimation call.
#[derive(Debug, Clone)]
pub struct KernelMatrices {
    /// Field values at the correspondences are `design * C` (N×M).
    pub design: DMatrix<f64>,
    /// RKHS penalty matrix (M×M, symmetric positive semi-definite).
    pub regularizer: DMatrix<f64>,
    /// Kernel centers of the off-sample expansion, normalized source frame.
    pub centers: Vec<[f64; 2]>,
    /// Maps `C` to expansion weights over `centers`; `None` means identity.
    pub expansion: Option<DMatrix<f64>>,
    /// Linear system used by the M-step.
    pub form: SolveForm,
}

impl KernelMatrices {
    /// Number of basis functions (M).
    pub fn basis_len(&self) -> usize {
        self.design.ncols()
    }

    /// Expansion weights over `centers` for coefficients `c` (M×2).
    pub fn expansion_weights(&self, c: &DMatrix<f64>) -> DMatrix<f64> {
        match &self.expansion {
            Some(t) => t * c,
            None => c.clone(),
        }
    }
}

#[inline]
fn squared_distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

/// Gaussian kernel `exp(-β ||a - b||²)`.
#[inline]
pub fn gaussian_kernel(a: [f64; 2], b: [f64; 2], beta: f64) -> f64 {
    (-beta * squared_distance(a, b)).exp()
}

/// Dense kernel matrix between `points` (rows) and `centers` (columns).
pub fn kernel_matrix(points: &[[f64; 2]], centers: &[[f64; 2]], beta: f64) -> DMatrix<f64> {
    let rows = map_indexed(points.len(), |i| {
        centers
            .iter()
            .map(|&c| gaussian_kernel(points[i], c, beta))
            .collect::<Vec<f64>>()
    });
    let data: Vec<f64> = rows.into_iter().flatten().collect();
    DMatrix::from_row_slice(points.len(), centers.len(), &data)
}

/// Sparse basis: kernel columns at the landmark points only.
pub fn landmark_kernel(points: &[[f64; 2]], landmarks: &LandmarkSet, beta: f64) -> KernelMatrices {
    let centers: Vec<[f64; 2]> = landmarks.indices().iter().map(|&i| points[i]).collect();
    let design = kernel_matrix(points, &centers, beta);
    let regularizer = DMatrix::from_fn(centers.len(), centers.len(), |a, b| {
        design[(landmarks.indices()[a], b)]
    });
    KernelMatrices {
        design,
        regularizer,
        centers,
        expansion: None,
        form: SolveForm::Projected,
    }
}

/// Full Gram matrix over every correspondence.
pub fn full_kernel(points: &[[f64; 2]], beta: f64) -> KernelMatrices {
    let gram = kernel_matrix(points, points, beta);
    KernelMatrices {
        regularizer: gram.clone(),
        design: gram,
        centers: points.to_vec(),
        expansion: None,
        form: SolveForm::Gram,
    }
}

/// Low-rank basis from the leading eigenpairs of the full Gram matrix.
///
/// With `K ≈ Q Λ Qᵀ` the field at the correspondences is `Q w` and its RKHS
/// norm is `wᵀ Λ⁻¹ w`. Off-sample evaluation uses the kernel expansion with
/// weights `Q Λ⁻¹ w`, which reproduces `Q w` exactly at the correspondences.
/// The effective rank may be smaller than requested when the spectrum decays
/// below [`LOW_RANK_EIGEN_FLOOR`].
pub fn low_rank_kernel(points: &[[f64; 2]], rank: usize, beta: f64) -> KernelMatrices {
    let n = points.len();
    let eig = SymmetricEigen::new(kernel_matrix(points, points, beta));

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));
    let lambda_max = order.first().map_or(0.0, |&i| eig.eigenvalues[i]);
    let kept: Vec<usize> = order
        .into_iter()
        .take(rank.max(1))
        .filter(|&i| eig.eigenvalues[i] > LOW_RANK_EIGEN_FLOOR * lambda_max)
        .collect();
    if kept.len() < rank {
        tracing::debug!(
            "low-rank basis truncated from {} to {} eigenpairs",
            rank,
            kept.len()
        );
    }

    let k = kept.len();
    let design = DMatrix::from_fn(n, k, |i, c| eig.eigenvectors[(i, kept[c])]);
    let inv_values: Vec<f64> = kept.iter().map(|&i| 1.0 / eig.eigenvalues[i]).collect();
    let regularizer = DMatrix::from_fn(k, k, |a, b| if a == b { inv_values[a] } else { 0.0 });
    let expansion = DMatrix::from_fn(n, k, |i, c| design[(i, c)] * inv_values[c]);

    KernelMatrices {
        design,
        regularizer,
        centers: points.to_vec(),
        expansion: Some(expansion),
        form: SolveForm::Projected,
    }
}
