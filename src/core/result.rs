//! Regression result structures.

use crate::inference::{se_cov, CoefficientInference, CovType, RobustCovariance};
use faer::{Col, Mat};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Complete result from a count regression fit.
///
/// Parameters are stored in design-column order. For models with an extra
/// dispersion parameter (NB2) it is appended as the last entry.
#[derive(Debug, Clone)]
pub struct RegressionResult {
    // ========== Core Results ==========
    /// Estimated parameters.
    pub params: Col<f64>,

    /// Fitted means μ on the training data.
    pub fitted_values: Col<f64>,

    /// Whether the optimizer met its tolerance.
    pub converged: bool,

    /// Number of optimizer iterations.
    pub iterations: usize,

    // ========== Dimensions ==========
    /// Number of observations.
    pub n_observations: usize,

    /// Number of estimated parameters (including α for NB2).
    pub n_parameters: usize,

    /// Number of columns in the design matrix.
    pub n_exog: usize,

    /// Whether the design matrix contains a column of ones.
    pub has_constant: bool,

    // ========== Likelihood ==========
    /// Log-likelihood at the estimate.
    pub log_likelihood: f64,

    /// Log-likelihood of the constant-only model with the same offset.
    pub log_likelihood_null: f64,

    /// Akaike Information Criterion.
    pub aic: f64,

    /// Bayesian Information Criterion.
    pub bic: f64,

    // ========== Inference Statistics (Optional) ==========
    /// Covariance estimator that produced `cov_params`.
    pub cov_type: CovType,

    /// Human readable description of the covariance estimator.
    pub cov_description: String,

    /// Parameter covariance matrix.
    pub cov_params: Option<Mat<f64>>,

    /// Standard errors of the parameters.
    pub std_errors: Option<Col<f64>>,

    /// z- or t-statistics, depending on `use_t`.
    pub statistics: Option<Col<f64>>,

    /// Two-sided p-values.
    pub p_values: Option<Col<f64>>,

    /// Lower bounds of confidence intervals.
    pub conf_interval_lower: Option<Col<f64>>,

    /// Upper bounds of confidence intervals.
    pub conf_interval_upper: Option<Col<f64>>,

    /// Whether inference uses the t distribution.
    pub use_t: bool,

    /// Degrees of freedom for t-based inference.
    pub df_inference: f64,

    /// Confidence level used for intervals.
    pub confidence_level: f64,
}

impl RegressionResult {
    /// Create a new empty result (used internally by solvers).
    pub(crate) fn empty(n_parameters: usize, n_observations: usize) -> Self {
        Self {
            params: Col::zeros(n_parameters),
            fitted_values: Col::zeros(n_observations),
            converged: false,
            iterations: 0,
            n_observations,
            n_parameters,
            n_exog: n_parameters,
            has_constant: false,
            log_likelihood: f64::NAN,
            log_likelihood_null: f64::NAN,
            aic: f64::NAN,
            bic: f64::NAN,
            cov_type: CovType::NonRobust,
            cov_description: String::new(),
            cov_params: None,
            std_errors: None,
            statistics: None,
            p_values: None,
            conf_interval_lower: None,
            conf_interval_upper: None,
            use_t: false,
            df_inference: f64::INFINITY,
            confidence_level: 0.95,
        }
    }

    /// Fill in the information criteria from the log-likelihood.
    pub(crate) fn set_information_criteria(&mut self) {
        let k = self.n_parameters as f64;
        let n = self.n_observations as f64;
        self.aic = 2.0 * k - 2.0 * self.log_likelihood;
        self.bic = k * n.ln() - 2.0 * self.log_likelihood;
    }

    /// Replace the covariance and recompute every statistic derived from it.
    pub(crate) fn apply_covariance(&mut self, robust: RobustCovariance) {
        let se = se_cov(&robust.cov);

        let stats = CoefficientInference::statistics(&self.params, &se);
        let df = if robust.use_t {
            robust.df_inference
        } else {
            f64::INFINITY
        };
        let p_values = CoefficientInference::p_values(&stats, df);
        let (lower, upper) =
            CoefficientInference::confidence_intervals(&self.params, &se, df, self.confidence_level);

        self.cov_type = robust.cov_type;
        self.cov_description = robust.description;
        self.use_t = robust.use_t;
        self.df_inference = robust.df_inference;
        self.cov_params = Some(robust.cov);
        self.std_errors = Some(se);
        self.statistics = Some(stats);
        self.p_values = Some(p_values);
        self.conf_interval_lower = Some(lower);
        self.conf_interval_upper = Some(upper);
    }

    /// Estimated parameters.
    pub fn params(&self) -> &Col<f64> {
        &self.params
    }

    /// Standard errors, if inference was computed.
    pub fn bse(&self) -> Option<&Col<f64>> {
        self.std_errors.as_ref()
    }

    /// Parameter covariance matrix, if inference was computed.
    pub fn cov_params(&self) -> Option<&Mat<f64>> {
        self.cov_params.as_ref()
    }

    /// Confidence interval bounds `(lower, upper)`.
    pub fn conf_int(&self) -> Option<(&Col<f64>, &Col<f64>)> {
        match (&self.conf_interval_lower, &self.conf_interval_upper) {
            (Some(lower), Some(upper)) => Some((lower, upper)),
            _ => None,
        }
    }

    /// Residual degrees of freedom (n - k).
    pub fn residual_df(&self) -> usize {
        self.n_observations.saturating_sub(self.n_parameters)
    }

    /// Model degrees of freedom: design columns minus the constant.
    pub fn model_df(&self) -> usize {
        if self.has_constant {
            self.n_exog.saturating_sub(1)
        } else {
            self.n_exog
        }
    }

    /// Likelihood-ratio statistic against the constant-only model.
    pub fn llr(&self) -> f64 {
        2.0 * (self.log_likelihood - self.log_likelihood_null)
    }

    /// Chi-squared p-value of the likelihood-ratio test.
    pub fn llr_pvalue(&self) -> f64 {
        let df = self.model_df() as f64;
        if df <= 0.0 || !self.llr().is_finite() {
            return f64::NAN;
        }
        ChiSquared::new(df)
            .map(|d| 1.0 - d.cdf(self.llr().max(0.0)))
            .unwrap_or(f64::NAN)
    }

    /// McFadden's pseudo R²: 1 - llf / llnull.
    pub fn pseudo_r_squared(&self) -> f64 {
        if self.log_likelihood_null == 0.0 {
            f64::NAN
        } else {
            1.0 - self.log_likelihood / self.log_likelihood_null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> RegressionResult {
        let mut result = RegressionResult::empty(2, 10);
        result.params = Col::from_fn(2, |j| if j == 0 { 0.5 } else { 2.0 });
        result.has_constant = true;
        result.n_exog = 2;
        result.log_likelihood = -20.0;
        result.log_likelihood_null = -25.0;
        result.set_information_criteria();
        result
    }

    #[test]
    fn test_information_criteria() {
        let result = sample_result();
        assert!((result.aic - 44.0).abs() < 1e-12);
        assert!((result.bic - (2.0 * 10.0_f64.ln() + 40.0)).abs() < 1e-12);
    }

    #[test]
    fn test_likelihood_ratio() {
        let result = sample_result();
        assert_eq!(result.model_df(), 1);
        assert!((result.llr() - 10.0).abs() < 1e-12);
        assert!((result.pseudo_r_squared() - 0.2).abs() < 1e-12);
        // P(χ²₁ > 10) ≈ 0.001565
        assert!((result.llr_pvalue() - 0.001565).abs() < 1e-5);
    }

    #[test]
    fn test_apply_covariance() {
        let mut result = sample_result();
        let cov = Mat::from_fn(2, 2, |i, j| if i == j { 0.25 } else { 0.0 });
        result.apply_covariance(RobustCovariance {
            cov,
            cov_type: CovType::HC0,
            use_t: false,
            df_inference: 8.0,
            description: "HC0".to_string(),
        });

        let se = result.bse().unwrap();
        assert!((se[0] - 0.5).abs() < 1e-12);
        let stats = result.statistics.as_ref().unwrap();
        assert!((stats[1] - 4.0).abs() < 1e-12);
        let (lower, upper) = result.conf_int().unwrap();
        assert!(lower[0] < 0.5 && upper[0] > 0.5);
        assert_eq!(result.cov_type, CovType::HC0);
    }

    #[test]
    fn test_residual_df() {
        let result = sample_result();
        assert_eq!(result.residual_df(), 8);
    }
}
