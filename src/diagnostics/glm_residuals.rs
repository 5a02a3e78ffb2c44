//! GLM residuals for count families.
//!
//! # Residual Types
//!
//! - **Response**: `y - μ`
//! - **Pearson**: `(y - μ) / sqrt(V(μ))`
//! - **Deviance**: `sign(y - μ) * sqrt(d_i)` where `d_i` is the unit deviance
//! - **Working**: `(y - μ) * (dη/dμ)`, the IRLS working residual
//!
//! # Reference
//!
//! McCullagh, P. and Nelder, J.A. (1989). Generalized Linear Models, 2nd ed.

use crate::core::GlmFamily;
use faer::Col;

/// Response residuals: y - μ.
pub fn response_residuals(y: &Col<f64>, mu: &Col<f64>) -> Col<f64> {
    Col::from_fn(y.nrows(), |i| y[i] - mu[i])
}

/// Pearson residuals: (y - μ) / sqrt(V(μ)).
pub fn pearson_residuals<F: GlmFamily>(y: &Col<f64>, mu: &Col<f64>, family: &F) -> Col<f64> {
    Col::from_fn(y.nrows(), |i| {
        let v = family.variance(mu[i]);
        if v < 1e-14 {
            0.0
        } else {
            (y[i] - mu[i]) / v.sqrt()
        }
    })
}

/// Deviance residuals: sign(y - μ) * sqrt(d_i).
///
/// The squared residuals sum to the model deviance.
pub fn deviance_residuals<F: GlmFamily>(y: &Col<f64>, mu: &Col<f64>, family: &F) -> Col<f64> {
    Col::from_fn(y.nrows(), |i| {
        let d_i = family.unit_deviance(y[i], mu[i]).max(0.0);
        let sign = if y[i] >= mu[i] { 1.0 } else { -1.0 };
        sign * d_i.sqrt()
    })
}

/// Working residuals: (y - μ) * (dη/dμ).
pub fn working_residuals<F: GlmFamily>(y: &Col<f64>, mu: &Col<f64>, family: &F) -> Col<f64> {
    Col::from_fn(y.nrows(), |i| (y[i] - mu[i]) * family.link_derivative(mu[i]))
}

/// Pearson's chi-squared statistic: Σ (y - μ)² / V(μ).
pub fn pearson_chi_squared<F: GlmFamily>(y: &[f64], mu: &[f64], family: &F) -> f64 {
    y.iter()
        .zip(mu.iter())
        .map(|(&yi, &mui)| {
            let v = family.variance(mui);
            if v < 1e-14 {
                0.0
            } else {
                (yi - mui).powi(2) / v
            }
        })
        .sum()
}

/// Pearson dispersion estimate φ̂ = X² / (n - p).
///
/// Values well above 1 for a Poisson fit indicate overdispersion.
pub fn estimate_dispersion_pearson<F: GlmFamily>(
    y: &[f64],
    mu: &[f64],
    family: &F,
    n_params: usize,
) -> f64 {
    let n = y.len();
    if n <= n_params {
        return f64::NAN;
    }

    pearson_chi_squared(y, mu, family) / (n - n_params) as f64
}
