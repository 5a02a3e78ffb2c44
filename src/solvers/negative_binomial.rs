//! Negative Binomial (NB2) regression solver.
//!
//! Estimates β and the dispersion α jointly by maximum likelihood:
//!
//! - `E[Y] = μ = exp(Xβ + offset)`
//! - `Var[Y] = μ + αμ²`
//!
//! The optimizer works on `(β, ln α)` so that α stays positive; the reported
//! parameters, Hessian and scores use α itself, appended after β.
//!
//! # Example
//!
//! ```rust,ignore
//! use countreg::solvers::{NegativeBinomialRegressor, Regressor, FittedRegressor};
//!
//! let fitted = NegativeBinomialRegressor::builder()
//!     .exposure(service)
//!     .build()
//!     .fit(&x, &y)?;
//!
//! println!("alpha = {}", fitted.alpha());
//! ```

use crate::core::{
    nb2_derivatives, nb2_loglike_obs, RegressionOptions, RegressionOptionsBuilder,
    RegressionResult,
};
use crate::inference::{robust_covariance, CovType};
use crate::solvers::newton;
use crate::solvers::poisson::PoissonRegressor;
use crate::solvers::traits::{FittedRegressor, LikelihoodModel, RegressionError, Regressor};
use crate::solvers::validation::{resolve_offset, validate_counts};
use crate::utils::{find_constant_column, linear_predictor};
use faer::{Col, Mat};

/// Starting value for α.
const ALPHA_START: f64 = 0.1;

/// NB2 log-likelihood model; parameters are `[β..., α]`.
#[derive(Debug, Clone)]
pub struct NegativeBinomialModel {
    exog: Mat<f64>,
    endog: Col<f64>,
    offset: Option<Col<f64>>,
}

impl NegativeBinomialModel {
    /// Create an NB2 model from validated data.
    pub fn new(exog: Mat<f64>, endog: Col<f64>, offset: Option<Col<f64>>) -> Self {
        Self {
            exog,
            endog,
            offset,
        }
    }

    /// Offset entering the linear predictor, if any.
    pub fn offset(&self) -> Option<&Col<f64>> {
        self.offset.as_ref()
    }

    /// Number of regression coefficients (excluding α).
    pub fn k_exog(&self) -> usize {
        self.exog.ncols()
    }

    /// Fitted means for coefficients `beta`.
    pub fn mean(&self, beta: &[f64]) -> Col<f64> {
        let eta = linear_predictor(&self.exog, beta, self.offset.as_ref());
        Col::from_fn(eta.nrows(), |i| eta[i].exp())
    }

    fn loglike_slice(&self, beta: &[f64], alpha: f64) -> f64 {
        let mu = self.mean(beta);
        (0..self.endog.nrows())
            .map(|i| nb2_loglike_obs(self.endog[i], mu[i], alpha))
            .sum()
    }

    /// Gradient and Hessian with respect to `(β, α)`.
    fn derivatives_slice(&self, beta: &[f64], alpha: f64) -> (Vec<f64>, Mat<f64>) {
        let k = self.k_exog();
        let mu = self.mean(beta);
        let mut grad = vec![0.0; k + 1];
        let mut hess = Mat::zeros(k + 1, k + 1);

        for i in 0..self.exog.nrows() {
            let d = nb2_derivatives(self.endog[i], mu[i], alpha);
            for a in 0..k {
                let xa = self.exog[(i, a)];
                grad[a] += xa * d.d_eta;
                hess[(a, k)] += xa * d.d2_eta_alpha;
                for b in 0..k {
                    hess[(a, b)] += xa * self.exog[(i, b)] * d.d2_eta_eta;
                }
            }
            grad[k] += d.d_alpha;
            hess[(k, k)] += d.d2_alpha_alpha;
        }
        for a in 0..k {
            hess[(k, a)] = hess[(a, k)];
        }

        (grad, hess)
    }

    /// Gradient and Hessian with respect to `(β, ln α)`.
    fn derivatives_log_alpha(&self, p: &[f64]) -> (Vec<f64>, Mat<f64>) {
        let k = self.k_exog();
        let alpha = p[k].exp();
        let (mut grad, mut hess) = self.derivatives_slice(&p[..k], alpha);

        let g_alpha = grad[k];
        grad[k] = g_alpha * alpha;
        for a in 0..k {
            hess[(a, k)] *= alpha;
            hess[(k, a)] *= alpha;
        }
        hess[(k, k)] = hess[(k, k)] * alpha * alpha + g_alpha * alpha;

        (grad, hess)
    }

    fn split(params: &Col<f64>) -> (Vec<f64>, f64) {
        let k = params.nrows() - 1;
        ((0..k).map(|j| params[j]).collect(), params[k])
    }
}

impl LikelihoodModel for NegativeBinomialModel {
    fn exog(&self) -> &Mat<f64> {
        &self.exog
    }

    fn endog(&self) -> &Col<f64> {
        &self.endog
    }

    fn loglike(&self, params: &Col<f64>) -> f64 {
        let (beta, alpha) = Self::split(params);
        self.loglike_slice(&beta, alpha)
    }

    fn score_obs(&self, params: &Col<f64>) -> Mat<f64> {
        let (beta, alpha) = Self::split(params);
        let k = self.k_exog();
        let mu = self.mean(&beta);
        let mut scores = Mat::zeros(self.exog.nrows(), k + 1);

        for i in 0..self.exog.nrows() {
            let d = nb2_derivatives(self.endog[i], mu[i], alpha);
            for j in 0..k {
                scores[(i, j)] = self.exog[(i, j)] * d.d_eta;
            }
            scores[(i, k)] = d.d_alpha;
        }

        scores
    }

    fn hessian(&self, params: &Col<f64>) -> Mat<f64> {
        let (beta, alpha) = Self::split(params);
        self.derivatives_slice(&beta, alpha).1
    }
}

/// Negative Binomial (NB2) regression estimator.
#[derive(Debug, Clone)]
pub struct NegativeBinomialRegressor {
    options: RegressionOptions,
    offset: Option<Col<f64>>,
    exposure: Option<Col<f64>>,
    fit_null: bool,
}

impl NegativeBinomialRegressor {
    /// Create a new NB2 regressor with the given options.
    pub fn new(options: RegressionOptions) -> Self {
        Self {
            options,
            offset: None,
            exposure: None,
            fit_null: true,
        }
    }

    /// Create a builder for NB2 regression.
    pub fn builder() -> NegativeBinomialRegressorBuilder {
        NegativeBinomialRegressorBuilder::default()
    }

    fn fit_newton(
        &self,
        model: NegativeBinomialModel,
    ) -> Result<FittedNegativeBinomial, RegressionError> {
        let n_samples = model.exog.nrows();
        let k = model.k_exog();

        // Poisson estimates for β, then a small α.
        let mut poisson = PoissonRegressor::builder()
            .compute_inference(false)
            .max_iterations(self.options.max_iterations)
            .tolerance(self.options.tolerance);
        if let Some(off) = model.offset() {
            poisson = poisson.offset(off.clone());
        }
        let poisson_fit = poisson.build().fit(&model.exog, &model.endog)?;

        let mut start: Vec<f64> = poisson_fit.params().iter().copied().collect();
        start.push(ALPHA_START.ln());

        let outcome = newton::maximize(
            start,
            self.options.max_iterations,
            self.options.tolerance,
            self.options.rank_tolerance,
            |p| model.loglike_slice(&p[..k], p[k].exp()),
            |p| model.derivatives_log_alpha(p),
        );

        if !outcome.converged {
            return Err(RegressionError::ConvergenceFailed {
                iterations: outcome.iterations,
            });
        }

        let alpha = outcome.params[k].exp();
        let params = Col::from_fn(k + 1, |j| if j < k { outcome.params[j] } else { alpha });

        let log_likelihood_null = if self.fit_null {
            self.null_loglike(&model)
        } else {
            f64::NAN
        };

        let mut result = RegressionResult::empty(k + 1, n_samples);
        result.fitted_values = model.mean(&outcome.params[..k]);
        result.params = params;
        result.converged = true;
        result.iterations = outcome.iterations;
        result.n_exog = k;
        result.has_constant = find_constant_column(&model.exog).is_some();
        result.log_likelihood = outcome.loglike;
        result.log_likelihood_null = log_likelihood_null;
        result.confidence_level = self.options.confidence_level;
        result.set_information_criteria();

        let mut fitted = FittedNegativeBinomial {
            model,
            result,
            options: self.options.clone(),
        };

        if self.options.compute_inference {
            fitted.with_cov_type(self.options.cov_type.clone())?;
        }

        Ok(fitted)
    }

    /// Log-likelihood of the constant-only NB2 model with the same offset.
    fn null_loglike(&self, model: &NegativeBinomialModel) -> f64 {
        let n_samples = model.exog.nrows();
        let ones = Mat::from_fn(n_samples, 1, |_, _| 1.0);
        let null_model = NegativeBinomialModel::new(ones, model.endog.clone(), model.offset.clone());

        let regressor = NegativeBinomialRegressor {
            options: RegressionOptions {
                compute_inference: false,
                ..self.options.clone()
            },
            offset: None,
            exposure: None,
            fit_null: false,
        };

        match regressor.fit_newton(null_model) {
            Ok(null_fit) => null_fit.llf(),
            Err(err) => {
                log::warn!("negative binomial: constant-only fit failed: {err}");
                f64::NAN
            }
        }
    }
}

impl Regressor for NegativeBinomialRegressor {
    type Fitted = FittedNegativeBinomial;

    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError> {
        self.options.validate()?;
        validate_counts(x, y, x.ncols() + 1)?;
        let offset = resolve_offset(
            x.nrows(),
            self.offset.as_ref(),
            self.exposure.as_ref(),
        )?;

        self.fit_newton(NegativeBinomialModel::new(x.clone(), y.clone(), offset))
    }
}

/// Fitted NB2 model.
#[derive(Debug, Clone)]
pub struct FittedNegativeBinomial {
    model: NegativeBinomialModel,
    result: RegressionResult,
    options: RegressionOptions,
}

impl FittedNegativeBinomial {
    /// Replace the covariance of this fit and recompute the inference statistics.
    pub fn with_cov_type(&mut self, cov_type: CovType) -> Result<&mut Self, RegressionError> {
        let robust = robust_covariance(
            &self.model,
            &self.result.params,
            &cov_type,
            self.options.rank_tolerance,
        )?;
        self.result.apply_covariance(robust);
        Ok(self)
    }

    /// Estimated dispersion α.
    pub fn alpha(&self) -> f64 {
        self.result.params[self.model.k_exog()]
    }

    /// Regression coefficients without α.
    pub fn coefficients(&self) -> Col<f64> {
        Col::from_fn(self.model.k_exog(), |j| self.result.params[j])
    }

    /// Predicted counts for new rows with the given offset.
    pub fn predict_with_offset(&self, x: &Mat<f64>, offset: &Col<f64>) -> Col<f64> {
        let beta: Vec<f64> = self.coefficients().iter().copied().collect();
        let eta = linear_predictor(x, &beta, Some(offset));
        Col::from_fn(eta.nrows(), |i| eta[i].exp())
    }
}

impl FittedRegressor for FittedNegativeBinomial {
    type Model = NegativeBinomialModel;

    fn predict(&self, x: &Mat<f64>) -> Col<f64> {
        let beta: Vec<f64> = self.coefficients().iter().copied().collect();
        let eta = linear_predictor(x, &beta, None);
        Col::from_fn(eta.nrows(), |i| eta[i].exp())
    }

    fn result(&self) -> &RegressionResult {
        &self.result
    }

    fn model(&self) -> &NegativeBinomialModel {
        &self.model
    }
}

/// Builder for `NegativeBinomialRegressor`.
#[derive(Debug, Clone, Default)]
pub struct NegativeBinomialRegressorBuilder {
    options_builder: RegressionOptionsBuilder,
    offset: Option<Col<f64>>,
    exposure: Option<Col<f64>>,
}

impl NegativeBinomialRegressorBuilder {
    /// Set whether to compute inference statistics.
    pub fn compute_inference(mut self, compute: bool) -> Self {
        self.options_builder = self.options_builder.compute_inference(compute);
        self
    }

    /// Set the confidence level for confidence intervals.
    pub fn confidence_level(mut self, level: f64) -> Self {
        self.options_builder = self.options_builder.confidence_level(level);
        self
    }

    /// Set the maximum Newton iterations.
    pub fn max_iterations(mut self, max_iter: usize) -> Self {
        self.options_builder = self.options_builder.max_iterations(max_iter);
        self
    }

    /// Set the convergence tolerance.
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.options_builder = self.options_builder.tolerance(tol);
        self
    }

    /// Set the covariance estimator applied at fit time.
    pub fn cov_type(mut self, cov_type: CovType) -> Self {
        self.options_builder = self.options_builder.cov_type(cov_type);
        self
    }

    /// Set the offset term.
    pub fn offset(mut self, offset: Col<f64>) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set the exposure; enters the model as offset = ln(exposure).
    pub fn exposure(mut self, exposure: Col<f64>) -> Self {
        self.exposure = Some(exposure);
        self
    }

    /// Build the regressor.
    pub fn build(self) -> NegativeBinomialRegressor {
        NegativeBinomialRegressor {
            options: self.options_builder.build_unchecked(),
            offset: self.offset,
            exposure: self.exposure,
            fit_null: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::add_constant;

    fn create_overdispersed_data(n: usize) -> (Mat<f64>, Col<f64>) {
        let x = Mat::from_fn(n, 1, |i, _| (i % 10) as f64 / 2.0);
        let y = Col::from_fn(n, |i| {
            let mu = (0.5 + 0.3 * x[(i, 0)]).exp();
            let spread = [0.1, 2.5, 0.4, 1.8, 0.2, 1.0, 3.0, 0.0, 1.2, 0.6];
            (mu * spread[(i / 10) % 10]).round()
        });
        (add_constant(&x, false), y)
    }

    #[test]
    fn test_negative_binomial_fit() {
        let (x, y) = create_overdispersed_data(100);
        let fitted = NegativeBinomialRegressor::builder().build().fit(&x, &y).unwrap();

        assert!(fitted.result().converged);
        assert_eq!(fitted.params().nrows(), 3);
        assert!(fitted.alpha() > 0.0);
        assert!(fitted.llf().is_finite());
        assert!(fitted.llnull().is_finite());
        assert!(fitted.llf() >= fitted.llnull() - 1e-8);
    }

    #[test]
    fn test_score_vanishes_at_estimate() {
        let (x, y) = create_overdispersed_data(100);
        let fitted = NegativeBinomialRegressor::builder().build().fit(&x, &y).unwrap();

        let score = fitted.model().score(fitted.params());
        for j in 0..score.nrows() {
            assert!(score[j].abs() < 1e-5, "score[{j}] = {}", score[j]);
        }
    }

    #[test]
    fn test_improves_on_poisson_with_overdispersion() {
        let (x, y) = create_overdispersed_data(100);
        let nb = NegativeBinomialRegressor::builder().build().fit(&x, &y).unwrap();
        let poisson = PoissonRegressor::builder().build().fit(&x, &y).unwrap();

        assert!(nb.llf() > poisson.llf());
    }

    #[test]
    fn test_hessian_matches_finite_differences() {
        let (x, y) = create_overdispersed_data(40);
        let model = NegativeBinomialModel::new(x, y, None);
        let params = Col::from_fn(3, |j| [0.4, 0.2, 0.7][j]);

        let hess = model.hessian(&params);
        let h = 1e-6;
        for j in 0..3 {
            let mut up = params.clone();
            let mut down = params.clone();
            up[j] += h;
            down[j] -= h;
            let s_up = model.score(&up);
            let s_down = model.score(&down);
            for i in 0..3 {
                let numeric = (s_up[i] - s_down[i]) / (2.0 * h);
                assert!(
                    (numeric - hess[(i, j)]).abs() < 1e-4 * (1.0 + numeric.abs()),
                    "H[{i},{j}]: numeric {numeric}, analytic {}",
                    hess[(i, j)]
                );
            }
        }
    }

    #[test]
    fn test_cluster_covariance_includes_alpha() {
        let (x, y) = create_overdispersed_data(100);
        let groups: Vec<i64> = (0..100).map(|i| (i % 7) as i64).collect();

        let fitted = NegativeBinomialRegressor::builder()
            .cov_type(CovType::cluster(groups))
            .build()
            .fit(&x, &y)
            .unwrap();

        let se = fitted.bse().unwrap();
        assert_eq!(se.nrows(), 3);
        assert!(se.iter().all(|s| s.is_finite() && *s > 0.0));
        assert_eq!(fitted.result().cov_type.name(), "cluster");
    }

    #[test]
    fn test_aic_counts_alpha() {
        let (x, y) = create_overdispersed_data(60);
        let fitted = NegativeBinomialRegressor::builder().build().fit(&x, &y).unwrap();
        let expected = 2.0 * 3.0 - 2.0 * fitted.llf();
        assert!((fitted.result().aic - expected).abs() < 1e-10);
    }

    #[test]
    fn test_invalid_response() {
        let x = add_constant(&Mat::from_fn(10, 1, |i, _| i as f64), false);
        let y = Col::from_fn(10, |i| if i == 4 { -3.0 } else { 2.0 });

        let result = NegativeBinomialRegressor::builder().build().fit(&x, &y);
        assert!(matches!(result, Err(RegressionError::InvalidResponse { index: 4, .. })));
    }
}
