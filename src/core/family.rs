//! GLM family definitions for count-data models.
//!
//! All families here use the log link `g(μ) = ln(μ)`, so `dμ/dη = μ`.
//!
//! # Reference
//!
//! - McCullagh, P. and Nelder, J.A. (1989). Generalized Linear Models, 2nd ed.
//! - Cameron, A.C. and Trivedi, P.K. (2013). Regression Analysis of Count Data, 2nd ed.

/// A GLM family with log link for count data.
pub trait GlmFamily {
    /// Variance function V(μ).
    fn variance(&self, mu: f64) -> f64;

    /// Derivative of the variance function dV/dμ.
    fn variance_derivative(&self, mu: f64) -> f64;

    /// Unit deviance d(y, μ).
    fn unit_deviance(&self, y: f64, mu: f64) -> f64;

    /// Log-likelihood contribution of a single observation at scale 1.
    fn loglike_obs(&self, y: f64, mu: f64) -> f64;

    /// Short family name used in summaries.
    fn name(&self) -> &'static str;

    /// Log link: g(μ) = ln(μ).
    fn link(&self, mu: f64) -> f64 {
        mu.max(1e-10).ln()
    }

    /// Inverse log link, clamped to keep μ finite and positive.
    fn link_inverse(&self, eta: f64) -> f64 {
        if eta > 700.0 {
            700.0_f64.exp()
        } else {
            eta.exp().max(1e-300)
        }
    }

    /// Derivative of the link: dη/dμ = 1/μ.
    fn link_derivative(&self, mu: f64) -> f64 {
        1.0 / mu.max(1e-10)
    }

    /// IRLS weight w = (dμ/dη)² / V(μ) = μ² / V(μ).
    fn irls_weight(&self, mu: f64) -> f64 {
        let mu_safe = mu.max(1e-10);
        mu_safe * mu_safe / self.variance(mu_safe)
    }

    /// Total deviance Σ d(yᵢ, μᵢ).
    fn deviance(&self, y: &[f64], mu: &[f64]) -> f64 {
        y.iter()
            .zip(mu.iter())
            .map(|(&yi, &mui)| self.unit_deviance(yi, mui))
            .sum()
    }

    /// Deviance of the intercept-only model without offset.
    fn null_deviance(&self, y: &[f64]) -> f64 {
        let y_mean = y.iter().sum::<f64>() / y.len() as f64;
        let mu = vec![y_mean; y.len()];
        self.deviance(y, &mu)
    }

    /// Starting values for IRLS: (y + ȳ) / 2.
    fn initialize_mu(&self, y: &[f64]) -> Vec<f64> {
        let y_mean = (y.iter().sum::<f64>() / y.len() as f64).max(1e-3);
        y.iter().map(|&yi| ((yi + y_mean) / 2.0).max(1e-3)).collect()
    }

    /// Total log-likelihood at scale 1.
    fn loglike(&self, y: &[f64], mu: &[f64]) -> f64 {
        y.iter()
            .zip(mu.iter())
            .map(|(&yi, &mui)| self.loglike_obs(yi, mui))
            .sum()
    }

    /// Derivative of the per-observation score with respect to η, without the x factor.
    ///
    /// The score of observation i is `xᵢ (y − μ) μ / V(μ)`; differentiating with
    /// respect to η (using dμ/dη = μ) gives the observed Hessian weight.
    fn observed_hessian_weight(&self, y: f64, mu: f64) -> f64 {
        let v = self.variance(mu);
        let dv = self.variance_derivative(mu);
        let resid = y - mu;
        (-mu * mu + resid * mu) / v - resid * mu * mu * dv / (v * v)
    }
}
