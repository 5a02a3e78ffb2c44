//! Poisson regression solver.
//!
//! Fits the Poisson model by maximum likelihood with damped Newton-Raphson.
//! The design matrix is used as given: add a constant column with
//! [`add_constant`](crate::utils::add_constant) if the model needs one.
//!
//! # Example
//!
//! ```rust,ignore
//! use countreg::solvers::{PoissonRegressor, Regressor, FittedRegressor};
//! use countreg::inference::CovType;
//!
//! let fitted = PoissonRegressor::builder()
//!     .exposure(service)
//!     .cov_type(CovType::cluster(groups))
//!     .build()
//!     .fit(&x, &y)?;
//!
//! println!("llf = {}", fitted.llf());
//! ```

use crate::core::{RegressionOptions, RegressionOptionsBuilder, RegressionResult};
use crate::inference::{robust_covariance, CovType};
use crate::solvers::newton;
use crate::solvers::traits::{FittedRegressor, LikelihoodModel, RegressionError, Regressor};
use crate::solvers::validation::{resolve_offset, validate_counts};
use crate::utils::{find_constant_column, linear_predictor};
use faer::{Col, Mat};
use statrs::function::gamma::ln_gamma;

/// Poisson log-likelihood model with optional offset.
///
/// - `E[Y] = μ = exp(Xβ + offset)`
/// - `Var[Y] = μ`
#[derive(Debug, Clone)]
pub struct PoissonModel {
    exog: Mat<f64>,
    endog: Col<f64>,
    offset: Option<Col<f64>>,
}

impl PoissonModel {
    /// Create a Poisson model from validated data.
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

    /// Fitted means at `params`.
    pub fn mean(&self, params: &[f64]) -> Col<f64> {
        let eta = linear_predictor(&self.exog, params, self.offset.as_ref());
        Col::from_fn(eta.nrows(), |i| eta[i].exp())
    }

    fn loglike_slice(&self, params: &[f64]) -> f64 {
        let eta = linear_predictor(&self.exog, params, self.offset.as_ref());
        (0..self.endog.nrows())
            .map(|i| {
                let y = self.endog[i];
                y * eta[i] - eta[i].exp() - ln_gamma(y + 1.0)
            })
            .sum()
    }

    fn derivatives_slice(&self, params: &[f64]) -> (Vec<f64>, Mat<f64>) {
        let mu = self.mean(params);
        let k = self.exog.ncols();
        let mut grad = vec![0.0; k];
        let mut hess = Mat::zeros(k, k);

        for i in 0..self.exog.nrows() {
            let resid = self.endog[i] - mu[i];
            for a in 0..k {
                let xa = self.exog[(i, a)];
                grad[a] += xa * resid;
                for b in 0..k {
                    hess[(a, b)] -= mu[i] * xa * self.exog[(i, b)];
                }
            }
        }

        (grad, hess)
    }
}

impl LikelihoodModel for PoissonModel {
    fn exog(&self) -> &Mat<f64> {
        &self.exog
    }

    fn endog(&self) -> &Col<f64> {
        &self.endog
    }

    fn loglike(&self, params: &Col<f64>) -> f64 {
        let p: Vec<f64> = params.iter().copied().collect();
        self.loglike_slice(&p)
    }

    fn score_obs(&self, params: &Col<f64>) -> Mat<f64> {
        let p: Vec<f64> = params.iter().copied().collect();
        let mu = self.mean(&p);
        Mat::from_fn(self.exog.nrows(), self.exog.ncols(), |i, j| {
            self.exog[(i, j)] * (self.endog[i] - mu[i])
        })
    }

    fn hessian(&self, params: &Col<f64>) -> Mat<f64> {
        let p: Vec<f64> = params.iter().copied().collect();
        self.derivatives_slice(&p).1
    }
}

/// Poisson regression estimator.
#[derive(Debug, Clone)]
pub struct PoissonRegressor {
    options: RegressionOptions,
    offset: Option<Col<f64>>,
    exposure: Option<Col<f64>>,
}

impl PoissonRegressor {
    /// Create a new Poisson regressor with the given options.
    pub fn new(options: RegressionOptions) -> Self {
        Self {
            options,
            offset: None,
            exposure: None,
        }
    }

    /// Create a builder for Poisson regression.
    pub fn builder() -> PoissonRegressorBuilder {
        PoissonRegressorBuilder::default()
    }

    fn fit_newton(&self, model: PoissonModel) -> Result<FittedPoisson, RegressionError> {
        let n_samples = model.exog.nrows();
        let n_params = model.exog.ncols();
        let constant = find_constant_column(&model.exog);

        let y_sum: f64 = model.endog.iter().sum();
        let exposure_sum: f64 = match model.offset() {
            Some(off) => off.iter().map(|o| o.exp()).sum(),
            None => n_samples as f64,
        };
        let log_rate = if y_sum > 0.0 {
            (y_sum / exposure_sum).ln()
        } else {
            f64::NAN
        };

        let mut start = vec![0.0; n_params];
        if let Some(c) = constant {
            if log_rate.is_finite() {
                start[c] = log_rate;
            }
        }

        let outcome = newton::maximize(
            start,
            self.options.max_iterations,
            self.options.tolerance,
            self.options.rank_tolerance,
            |p| model.loglike_slice(p),
            |p| model.derivatives_slice(p),
        );

        if !outcome.converged {
            return Err(RegressionError::ConvergenceFailed {
                iterations: outcome.iterations,
            });
        }

        // Constant-only model with the same offset: exp(c) = Σy / Σexp(offset).
        let log_likelihood_null = if y_sum > 0.0 {
            let offset = model.offset();
            (0..n_samples)
                .map(|i| {
                    let eta = log_rate + offset.map_or(0.0, |o| o[i]);
                    let y = model.endog[i];
                    y * eta - eta.exp() - ln_gamma(y + 1.0)
                })
                .sum()
        } else {
            0.0
        };

        let params = Col::from_fn(n_params, |j| outcome.params[j]);
        let mut result = RegressionResult::empty(n_params, n_samples);
        result.fitted_values = model.mean(&outcome.params);
        result.params = params;
        result.converged = true;
        result.iterations = outcome.iterations;
        result.n_exog = n_params;
        result.has_constant = constant.is_some();
        result.log_likelihood = outcome.loglike;
        result.log_likelihood_null = log_likelihood_null;
        result.confidence_level = self.options.confidence_level;
        result.set_information_criteria();

        let mut fitted = FittedPoisson {
            model,
            result,
            options: self.options.clone(),
        };

        if self.options.compute_inference {
            fitted.with_cov_type(self.options.cov_type.clone())?;
        }

        Ok(fitted)
    }
}

impl Regressor for PoissonRegressor {
    type Fitted = FittedPoisson;

    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError> {
        self.options.validate()?;
        validate_counts(x, y, x.ncols())?;
        let offset = resolve_offset(
            x.nrows(),
            self.offset.as_ref(),
            self.exposure.as_ref(),
        )?;

        self.fit_newton(PoissonModel::new(x.clone(), y.clone(), offset))
    }
}

/// Fitted Poisson model.
#[derive(Debug, Clone)]
pub struct FittedPoisson {
    model: PoissonModel,
    result: RegressionResult,
    options: RegressionOptions,
}

impl FittedPoisson {
    /// Replace the covariance of this fit and recompute standard errors,
    /// test statistics, p-values and confidence intervals.
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

    /// Predicted counts for new rows with the given offset (e.g. log exposure).
    pub fn predict_with_offset(&self, x: &Mat<f64>, offset: &Col<f64>) -> Col<f64> {
        let p: Vec<f64> = self.result.params.iter().copied().collect();
        let eta = linear_predictor(x, &p, Some(offset));
        Col::from_fn(eta.nrows(), |i| eta[i].exp())
    }

    /// Response residuals y - μ.
    pub fn residuals(&self) -> Col<f64> {
        let y = self.model.endog();
        Col::from_fn(y.nrows(), |i| y[i] - self.result.fitted_values[i])
    }
}

impl FittedRegressor for FittedPoisson {
    type Model = PoissonModel;

    fn predict(&self, x: &Mat<f64>) -> Col<f64> {
        let p: Vec<f64> = self.result.params.iter().copied().collect();
        let eta = linear_predictor(x, &p, None);
        Col::from_fn(eta.nrows(), |i| eta[i].exp())
    }

    fn result(&self) -> &RegressionResult {
        &self.result
    }

    fn model(&self) -> &PoissonModel {
        &self.model
    }
}

/// Builder for `PoissonRegressor`.
#[derive(Debug, Clone, Default)]
pub struct PoissonRegressorBuilder {
    options_builder: RegressionOptionsBuilder,
    offset: Option<Col<f64>>,
    exposure: Option<Col<f64>>,
}

impl PoissonRegressorBuilder {
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

    /// Set the offset term: η = Xβ + offset.
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
    pub fn build(self) -> PoissonRegressor {
        PoissonRegressor {
            options: self.options_builder.build_unchecked(),
            offset: self.offset,
            exposure: self.exposure,
        }
    }
}
