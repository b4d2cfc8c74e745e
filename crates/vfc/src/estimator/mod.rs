//! VFC field estimation: EM over a Gaussian-inlier / uniform-outlier mixture.
//!
//! Displacements `y_i = t_i - s_i` (normalized frames) are modelled as
//!
//!   y_i = f(s_i) + ε_i,   ε_i ~ γ N(0, σ² I₂) + (1 - γ) U(a)
//!
//! with `f` in a Gaussian RKHS. Each iteration computes inlier posteriors
//! (E-step), then refits `f`, σ² and γ with the posteriors held fixed
//! (M-step). The posteriors returned with the result are the ones the final
//! field was fitted from.

mod config;
mod em;
mod interrupt;
mod result;
mod run;
mod solve;

pub use config::{FieldBasis, OutlierDensity, VfcConfig};
pub use interrupt::Interrupt;
pub use result::{Diagnostics, EstimationResult, MixtureParams, StopReason};
pub use run::estimate_vfc;

pub(crate) use run::run_em;
