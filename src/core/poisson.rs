//! Poisson family for count data regression.
//!
//! # Example
//!
//! ```ignore
//! use countreg::PoissonFamily;
//!
//! let poisson = PoissonFamily::new();
//! assert_eq!(poisson.variance(3.0), 3.0);
//! ```

use super::family::GlmFamily;
use statrs::function::gamma::ln_gamma;

/// Poisson family with log link.
///
/// # Variance Function
///
/// V(μ) = μ
///
/// # Unit Deviance
///
/// d(y, μ) = 2[y·log(y/μ) - (y - μ)], with d(0, μ) = 2μ.
///
/// # Log-likelihood
///
/// ℓ(y, μ) = y·ln(μ) - μ - ln Γ(y + 1)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoissonFamily;

impl PoissonFamily {
    /// Create a Poisson family.
    pub fn new() -> Self {
        Self
    }
}

impl GlmFamily for PoissonFamily {
    fn variance(&self, mu: f64) -> f64 {
        mu.max(1e-10)
    }

    fn variance_derivative(&self, _mu: f64) -> f64 {
        1.0
    }

    fn unit_deviance(&self, y: f64, mu: f64) -> f64 {
        let mu_clamped = mu.max(1e-10);

        if y < 1e-10 {
            2.0 * mu_clamped
        } else {
            2.0 * (y * (y / mu_clamped).ln() - (y - mu_clamped))
        }
    }

    fn loglike_obs(&self, y: f64, mu: f64) -> f64 {
        let mu_clamped = mu.max(1e-300);
        y * mu_clamped.ln() - mu_clamped - ln_gamma(y + 1.0)
    }

    fn name(&self) -> &'static str {
        "Poisson"
    }

    // Canonical link: observed and expected information coincide.
    fn observed_hessian_weight(&self, _y: f64, mu: f64) -> f64 {
        -mu
    }
}
