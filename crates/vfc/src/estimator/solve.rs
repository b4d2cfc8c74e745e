use nalgebra::DMatrix;

/// Cholesky retries with diagonal jitter before falling back to LU.
const MAX_JITTER_RETRIES: usize = 8;
/// First jitter, relative to the mean diagonal.
const INITIAL_RELATIVE_JITTER: f64 = 1e-10;

/// Path taken by [`solve_spd`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SolveMethod {
    Cholesky,
    /// Cholesky succeeded after adding this much to the diagonal.
    JitteredCholesky(f64),
    Lu,
    /// No finite solution; the caller keeps its previous iterate.
    Failed,
}

impl SolveMethod {
    /// Anything other than a plain Cholesky solve.
    pub(crate) fn is_unstable(self) -> bool {
        !matches!(self, Self::Cholesky)
    }

    pub(crate) fn jitter(self) -> f64 {
        match self {
            Self::JitteredCholesky(j) => j,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SolveOutcome {
    pub solution: Option<DMatrix<f64>>,
    pub method: SolveMethod,
}

fn all_finite(m: &DMatrix<f64>) -> bool {
    m.iter().all(|v| v.is_finite())
}

fn cholesky_solve(a: DMatrix<f64>, b: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let x = a.cholesky()?.solve(b);
    all_finite(&x).then_some(x)
}

/// Solve `a x = b` for symmetric positive (semi-)definite `a`.
///
/// Tries plain Cholesky, then Cholesky with a diagonal jitter starting at
/// `1e-10 * mean(diag(a))` and growing 10x per retry, then LU on the
/// unmodified matrix.
pub(crate) fn solve_spd(a: &DMatrix<f64>, b: &DMatrix<f64>) -> SolveOutcome {
    if let Some(x) = cholesky_solve(a.clone(), b) {
        return SolveOutcome {
            solution: Some(x),
            method: SolveMethod::Cholesky,
        };
    }

    let n = a.nrows().max(1);
    let mean_diag = a.diagonal().iter().map(|v| v.abs()).sum::<f64>() / n as f64;
    let base = if mean_diag.is_finite() && mean_diag > 0.0 {
        mean_diag
    } else {
        1.0
    };

    let mut jitter = INITIAL_RELATIVE_JITTER * base;
    for _ in 0..MAX_JITTER_RETRIES {
        let mut shifted = a.clone();
        for i in 0..shifted.nrows() {
            shifted[(i, i)] += jitter;
        }
        if let Some(x) = cholesky_solve(shifted, b) {
            tracing::debug!("cholesky needed diagonal jitter {:.3e}", jitter);
            return SolveOutcome {
                solution: Some(x),
                method: SolveMethod::JitteredCholesky(jitter),
            };
        }
        jitter *= 10.0;
    }

    match a.clone().lu().solve(b).filter(all_finite) {
        Some(x) => {
            tracing::debug!("cholesky failed after {} retries; solved by LU", MAX_JITTER_RETRIES);
            SolveOutcome {
                solution: Some(x),
                method: SolveMethod::Lu,
            }
        }
        None => {
            tracing::debug!("linear solve failed; keeping previous coefficients");
            SolveOutcome {
                solution: None,
                method: SolveMethod::Failed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn well_conditioned_system_uses_plain_cholesky() {
        let a = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let b = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let out = solve_spd(&a, &b);

        assert_eq!(out.method, SolveMethod::Cholesky);
        assert!(!out.method.is_unstable());
        let x = out.solution.unwrap();
        assert_relative_eq!(&a * &x, b, epsilon = 1e-12);
    }

    #[test]
    fn singular_psd_system_is_rescued_by_jitter() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let b = DMatrix::from_row_slice(2, 1, &[2.0, 2.0]);
        let out = solve_spd(&a, &b);

        assert!(matches!(out.method, SolveMethod::JitteredCholesky(_)));
        assert!(out.method.jitter() > 0.0);
        let x = out.solution.unwrap();
        assert_relative_eq!(&a * &x, b, epsilon = 1e-6);
    }

    #[test]
    fn indefinite_system_falls_back_to_lu() {
        let a = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let b = DMatrix::from_row_slice(2, 1, &[3.0, 5.0]);
        let out = solve_spd(&a, &b);

        assert_eq!(out.method, SolveMethod::Lu);
        let x = out.solution.unwrap();
        assert_relative_eq!(x[0], 5.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn non_finite_system_reports_failure() {
        let a = DMatrix::from_row_slice(2, 2, &[f64::NAN, 0.0, 0.0, 1.0]);
        let b = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let out = solve_spd(&a, &b);

        assert_eq!(out.method, SolveMethod::Failed);
        assert!(out.solution.is_none());
        assert!(out.method.is_unstable());
    }
}
