//! Negative Binomial (NB2) family for overdispersed count data.
//!
//! This module provides the NB2 family with a fixed dispersion α, used by
//! the GLM solver, and the per-observation likelihood derivatives used by
//! the full maximum likelihood solver where α is estimated jointly with β.
//!
//! # Example
//!
//! ```ignore
//! use countreg::NegativeBinomialFamily;
//!
//! // Variance at mu = 5 with alpha = 0.5: V(5) = 5 + 0.5 * 25 = 17.5
//! let nb = NegativeBinomialFamily::new(0.5);
//! let var = nb.variance(5.0);
//! ```

use super::family::GlmFamily;
use crate::utils::trigamma;
use statrs::function::gamma::{digamma, ln_gamma};

/// Negative Binomial family for overdispersed count data.
///
/// # Variance Function
///
/// V(μ) = μ + αμ²
///
/// As α → 0, this approaches the Poisson variance V(μ) = μ.
///
/// # Unit Deviance
///
/// d(y, μ) = 2[y·log(y/μ) - (y + 1/α)·log((1 + αy)/(1 + αμ))]
///
/// with d(0, μ) = (2/α)·log(1 + αμ).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NegativeBinomialFamily {
    /// The dispersion parameter α (the reciprocal of R's `theta`).
    pub alpha: f64,
}

impl Default for NegativeBinomialFamily {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl NegativeBinomialFamily {
    /// Create a new negative binomial family with the specified α.
    ///
    /// # Panics
    ///
    /// Panics if `alpha` is not strictly positive.
    pub fn new(alpha: f64) -> Self {
        assert!(alpha > 0.0, "alpha must be positive");
        Self { alpha }
    }

    /// Compute the overdispersion ratio V(μ)/μ = 1 + αμ at the given mean.
    pub fn overdispersion_ratio(&self, mu: f64) -> f64 {
        1.0 + self.alpha * mu
    }
}

impl GlmFamily for NegativeBinomialFamily {
    fn variance(&self, mu: f64) -> f64 {
        let mu_safe = mu.max(1e-10);
        mu_safe + self.alpha * mu_safe * mu_safe
    }

    fn variance_derivative(&self, mu: f64) -> f64 {
        1.0 + 2.0 * self.alpha * mu.max(1e-10)
    }

    fn unit_deviance(&self, y: f64, mu: f64) -> f64 {
        let mu_safe = mu.max(1e-10);
        let a = self.alpha;

        if y < 1e-10 {
            2.0 / a * (1.0 + a * mu_safe).ln()
        } else {
            let term1 = y * (y / mu_safe).ln();
            let term2 = (y + 1.0 / a) * ((1.0 + a * y) / (1.0 + a * mu_safe)).ln();
            2.0 * (term1 - term2)
        }
    }

    fn loglike_obs(&self, y: f64, mu: f64) -> f64 {
        nb2_loglike_obs(y, mu, self.alpha)
    }

    fn name(&self) -> &'static str {
        "NegativeBinomial"
    }
}

/// NB2 log-likelihood of a single observation.
///
/// ℓ = ln Γ(y + 1/α) - ln Γ(1/α) - ln Γ(y + 1) - (1/α + y)·ln(1 + αμ) + y·ln(αμ)
pub fn nb2_loglike_obs(y: f64, mu: f64, alpha: f64) -> f64 {
    let mu_safe = mu.max(1e-300);
    let size = 1.0 / alpha;
    let log1p_amu = (alpha * mu_safe).ln_1p();

    let mut ll = ln_gamma(y + size) - ln_gamma(size) - ln_gamma(y + 1.0) - (size + y) * log1p_amu;
    if y > 0.0 {
        ll += y * (alpha * mu_safe).ln();
    }
    ll
}

/// First and second derivatives of the NB2 log-likelihood of one observation.
///
/// Derivatives with respect to β are expressed through η = xᵀβ, so the
/// caller multiplies `d_eta` by xᵢ and `d2_eta_eta` by xᵢxᵢᵀ.
#[derive(Debug, Clone, Copy)]
pub struct Nb2Derivatives {
    /// Log-likelihood contribution.
    pub loglike: f64,
    /// ∂ℓ/∂η.
    pub d_eta: f64,
    /// ∂ℓ/∂α.
    pub d_alpha: f64,
    /// ∂²ℓ/∂η².
    pub d2_eta_eta: f64,
    /// ∂²ℓ/∂η∂α.
    pub d2_eta_alpha: f64,
    /// ∂²ℓ/∂α².
    pub d2_alpha_alpha: f64,
}

/// Evaluate the NB2 log-likelihood and its derivatives for one observation.
pub fn nb2_derivatives(y: f64, mu: f64, alpha: f64) -> Nb2Derivatives {
    let a = alpha;
    let size = 1.0 / a;
    let q = 1.0 + a * mu;
    let resid = y - mu;

    let d_eta = resid / q;

    // A = ln(1 + αμ) - ψ(y + 1/α) + ψ(1/α)
    let big_a = q.ln() - digamma(y + size) + digamma(size);
    let d_alpha = big_a / (a * a) + resid / (a * q);

    let d2_eta_eta = -mu * (1.0 + a * y) / (q * q);
    let d2_eta_alpha = -resid * mu / (q * q);

    let d_big_a = mu / q + (trigamma(y + size) - trigamma(size)) / (a * a);
    let d2_alpha_alpha = -2.0 * big_a / (a * a * a) + d_big_a / (a * a)
        - resid * (1.0 + 2.0 * a * mu) / (a * a * q * q);

    Nb2Derivatives {
        loglike: nb2_loglike_obs(y, mu, alpha),
        d_eta,
        d_alpha,
        d2_eta_eta,
        d2_eta_alpha,
        d2_alpha_alpha,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variance() {
        let fam = NegativeBinomialFamily::new(0.5);
        // V(μ) = μ + αμ² = 5 + 0.5 * 25 = 17.5
        assert!((fam.variance(5.0) - 17.5).abs() < 1e-10);
        assert!((fam.variance_derivative(5.0) - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_approaches_poisson() {
        let fam = NegativeBinomialFamily::new(1e-8);
        for mu in [0.5, 1.0, 5.0, 10.0] {
            assert!((fam.variance(mu) - mu).abs() < 1e-5);
        }
    }

    #[test]
    fn test_unit_deviance_perfect_fit() {
        let fam = NegativeBinomialFamily::new(0.5);
        assert!(fam.unit_deviance(5.0, 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_unit_deviance_zero() {
        let fam = NegativeBinomialFamily::new(0.5);
        let dev = fam.unit_deviance(0.0, 2.0);
        assert!((dev - 4.0 * 2.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn test_loglike_geometric_case() {
        // α = 1 gives the geometric distribution: P(y) = μ^y / (1 + μ)^(y + 1)
        let mu: f64 = 2.0;
        for y in [0.0, 1.0, 3.0] {
            let expected = y * mu.ln() - (y + 1.0) * (1.0 + mu).ln();
            assert!((nb2_loglike_obs(y, mu, 1.0) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_overdispersion_ratio() {
        let fam = NegativeBinomialFamily::new(0.25);
        assert!((fam.overdispersion_ratio(4.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_glm_weight_matches_full_likelihood() {
        // With α held fixed, the GLM observed Hessian weight equals ∂²ℓ/∂η².
        let fam = NegativeBinomialFamily::new(0.7);
        let (y, mu) = (3.0, 1.8);
        let d = nb2_derivatives(y, mu, 0.7);
        assert!((fam.observed_hessian_weight(y, mu) - d.d2_eta_eta).abs() < 1e-12);
    }

    #[test]
    fn test_derivatives_against_finite_differences() {
        let (y, eta, alpha) = (4.0_f64, 0.9_f64, 0.6_f64);
        let h = 1e-5;
        let ll = |e: f64, a: f64| nb2_loglike_obs(y, e.exp(), a);
        let d = nb2_derivatives(y, eta.exp(), alpha);

        let fd_eta = (ll(eta + h, alpha) - ll(eta - h, alpha)) / (2.0 * h);
        let fd_alpha = (ll(eta, alpha + h) - ll(eta, alpha - h)) / (2.0 * h);
        assert!((d.d_eta - fd_eta).abs() < 1e-7);
        assert!((d.d_alpha - fd_alpha).abs() < 1e-7);

        let grad = |e: f64, a: f64| {
            let g = nb2_derivatives(y, e.exp(), a);
            (g.d_eta, g.d_alpha)
        };
        let fd_ee = (grad(eta + h, alpha).0 - grad(eta - h, alpha).0) / (2.0 * h);
        let fd_ea = (grad(eta, alpha + h).0 - grad(eta, alpha - h).0) / (2.0 * h);
        let fd_aa = (grad(eta, alpha + h).1 - grad(eta, alpha - h).1) / (2.0 * h);
        assert!((d.d2_eta_eta - fd_ee).abs() < 1e-6);
        assert!((d.d2_eta_alpha - fd_ea).abs() < 1e-6);
        assert!((d.d2_alpha_alpha - fd_aa).abs() < 1e-6);
    }
}
