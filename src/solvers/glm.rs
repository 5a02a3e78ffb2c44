//! Generalized linear models for counts, fitted by IRLS.
//!
//! Supports the Poisson family and the Negative Binomial family with a fixed
//! α, both with log link. The scale is fixed at 1.
//!
//! # Example
//!
//! ```rust,ignore
//! use countreg::solvers::{GlmRegressor, Regressor, FittedRegressor};
//! use countreg::inference::CovType;
//!
//! let mut fitted = GlmRegressor::poisson().build().fit(&x, &y)?;
//! fitted.with_cov_type(CovType::HC1)?;
//!
//! println!("deviance = {}", fitted.deviance());
//! ```

use crate::core::{
    GlmFamily, NegativeBinomialFamily, PoissonFamily, RegressionOptions, RegressionOptionsBuilder,
    RegressionResult,
};
use crate::diagnostics::{
    deviance_residuals, estimate_dispersion_pearson, pearson_chi_squared, pearson_residuals,
    response_residuals, working_residuals,
};
use crate::inference::{robust_covariance, CovType};
use crate::solvers::traits::{FittedRegressor, LikelihoodModel, RegressionError, Regressor};
use crate::solvers::validation::{resolve_offset, validate_counts};
use crate::utils::{find_constant_column, invert_symmetric, linear_predictor};
use faer::{Col, Mat};

/// GLM log-likelihood model with a log-link count family.
#[derive(Debug, Clone)]
pub struct GlmModel<F: GlmFamily> {
    exog: Mat<f64>,
    endog: Col<f64>,
    offset: Option<Col<f64>>,
    family: F,
    scale: f64,
}

impl<F: GlmFamily> GlmModel<F> {
    /// Create a GLM from validated data.
    pub fn new(exog: Mat<f64>, endog: Col<f64>, offset: Option<Col<f64>>, family: F) -> Self {
        Self {
            exog,
            endog,
            offset,
            family,
            scale: 1.0,
        }
    }

    /// The GLM family.
    pub fn family(&self) -> &F {
        &self.family
    }

    /// Dispersion scale φ.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Fitted means at `params`.
    pub fn mean(&self, params: &[f64]) -> Col<f64> {
        let eta = linear_predictor(&self.exog, params, self.offset.as_ref());
        Col::from_fn(eta.nrows(), |i| self.family.link_inverse(eta[i]))
    }

    fn params_vec(params: &Col<f64>) -> Vec<f64> {
        params.iter().copied().collect()
    }
}

impl<F: GlmFamily> LikelihoodModel for GlmModel<F> {
    fn exog(&self) -> &Mat<f64> {
        &self.exog
    }

    fn endog(&self) -> &Col<f64> {
        &self.endog
    }

    fn loglike(&self, params: &Col<f64>) -> f64 {
        let mu = self.mean(&Self::params_vec(params));
        (0..self.endog.nrows())
            .map(|i| self.family.loglike_obs(self.endog[i], mu[i]))
            .sum::<f64>()
            / self.scale
    }

    fn score_obs(&self, params: &Col<f64>) -> Mat<f64> {
        let mu = self.mean(&Self::params_vec(params));
        Mat::from_fn(self.exog.nrows(), self.exog.ncols(), |i, j| {
            let factor = (self.endog[i] - mu[i]) * mu[i] / self.family.variance(mu[i]);
            self.exog[(i, j)] * factor / self.scale
        })
    }

    fn hessian(&self, params: &Col<f64>) -> Mat<f64> {
        let mu = self.mean(&Self::params_vec(params));
        let k = self.exog.ncols();
        let mut hess = Mat::zeros(k, k);

        for i in 0..self.exog.nrows() {
            let w = self.family.observed_hessian_weight(self.endog[i], mu[i]) / self.scale;
            for a in 0..k {
                let xa = self.exog[(i, a)] * w;
                for b in 0..k {
                    hess[(a, b)] += xa * self.exog[(i, b)];
                }
            }
        }

        hess
    }

    /// Expected-information covariance `φ (X'WX)⁻¹`.
    fn nonrobust_cov(&self, params: &Col<f64>, rank_tolerance: f64) -> Option<Mat<f64>> {
        let mu = self.mean(&Self::params_vec(params));
        let k = self.exog.ncols();
        let mut xtwx = Mat::zeros(k, k);

        for i in 0..self.exog.nrows() {
            let w = self.family.irls_weight(mu[i]);
            for a in 0..k {
                let xa = self.exog[(i, a)] * w;
                for b in 0..k {
                    xtwx[(a, b)] += xa * self.exog[(i, b)];
                }
            }
        }

        let inv = invert_symmetric(&xtwx, rank_tolerance)?;
        Some(Mat::from_fn(k, k, |a, b| self.scale * inv[(a, b)]))
    }
}

/// GLM regression estimator for count families.
#[derive(Debug, Clone)]
pub struct GlmRegressor<F: GlmFamily> {
    options: RegressionOptions,
    family: F,
    offset: Option<Col<f64>>,
    exposure: Option<Col<f64>>,
    fit_null: bool,
}

impl GlmRegressor<PoissonFamily> {
    /// Builder for a Poisson GLM.
    pub fn poisson() -> GlmRegressorBuilder<PoissonFamily> {
        GlmRegressorBuilder::new(PoissonFamily::new())
    }
}

impl GlmRegressor<NegativeBinomialFamily> {
    /// Builder for a Negative Binomial GLM with fixed α.
    pub fn negative_binomial(alpha: f64) -> GlmRegressorBuilder<NegativeBinomialFamily> {
        GlmRegressorBuilder::new(NegativeBinomialFamily::new(alpha))
    }
}

impl<F: GlmFamily + Clone> GlmRegressor<F> {
    /// Create a new GLM regressor with the given options and family.
    pub fn new(options: RegressionOptions, family: F) -> Self {
        Self {
            options,
            family,
            offset: None,
            exposure: None,
            fit_null: true,
        }
    }

    /// Create a builder for an arbitrary count family.
    pub fn builder(family: F) -> GlmRegressorBuilder<F> {
        GlmRegressorBuilder::new(family)
    }

    /// Fit the GLM using IRLS (Iteratively Reweighted Least Squares).
    ///
    /// 1. Initialize μ and η = g(μ) - offset
    /// 2. Weights W = μ² / V(μ), working response z = η + (y - μ) / μ
    /// 3. Solve the weighted least squares problem for β
    /// 4. Update η = Xβ, μ = exp(η + offset) and repeat
    fn fit_irls(&self, model: GlmModel<F>) -> Result<FittedGlm<F>, RegressionError> {
        let n_samples = model.exog.nrows();
        let n_params = model.exog.ncols();
        let family = &model.family;

        let y_vec: Vec<f64> = model.endog.iter().copied().collect();
        let mut mu: Vec<f64> = family.initialize_mu(&y_vec);
        let mut eta: Vec<f64> = mu
            .iter()
            .enumerate()
            .map(|(i, &m)| family.link(m) - model.offset.as_ref().map_or(0.0, |o| o[i]))
            .collect();

        let mut beta = Col::<f64>::zeros(n_params);
        let mut deviance = family.deviance(&y_vec, &mu);
        let tol = self.options.tolerance;
        let mut converged = false;
        let mut iterations = 0;

        for iter in 0..self.options.max_iterations {
            iterations = iter + 1;

            let weights: Vec<f64> = mu.iter().map(|&m| family.irls_weight(m)).collect();
            let z: Vec<f64> = (0..n_samples)
                .map(|i| eta[i] + (y_vec[i] - mu[i]) * family.link_derivative(mu[i]))
                .collect();

            let beta_new = solve_weighted_ls(&model.exog, &z, &weights, self.options.rank_tolerance);

            let max_change = beta_new
                .iter()
                .zip(beta.iter())
                .map(|(b_new, b_old)| (b_new - b_old).abs())
                .fold(0.0_f64, f64::max);
            beta = beta_new;

            let p: Vec<f64> = beta.iter().copied().collect();
            let eta_full = linear_predictor(&model.exog, &p, model.offset.as_ref());
            for i in 0..n_samples {
                mu[i] = family.link_inverse(eta_full[i]);
                eta[i] = eta_full[i] - model.offset.as_ref().map_or(0.0, |o| o[i]);
            }

            let deviance_new = family.deviance(&y_vec, &mu);
            let deviance_change = (deviance_new - deviance).abs();
            deviance = deviance_new;

            if max_change < tol && deviance_change <= tol * (deviance.abs() + 1.0) {
                converged = true;
                break;
            }
        }

        if !converged {
            log::warn!("glm: IRLS did not converge in {iterations} iterations");
            return Err(RegressionError::ConvergenceFailed { iterations });
        }
        log::debug!("glm: IRLS converged after {iterations} iterations, deviance {deviance:.8}");

        let mu_col = Col::from_fn(n_samples, |i| mu[i]);
        let pearson_chi2 = pearson_chi_squared(&y_vec, &mu, family);

        let (log_likelihood_null, null_deviance) = if self.fit_null {
            self.null_fit(&model)
        } else {
            (f64::NAN, f64::NAN)
        };

        let mut result = RegressionResult::empty(n_params, n_samples);
        result.params = beta;
        result.fitted_values = mu_col;
        result.converged = true;
        result.iterations = iterations;
        result.n_exog = n_params;
        result.has_constant = find_constant_column(&model.exog).is_some();
        result.log_likelihood = model.loglike(&result.params);
        result.log_likelihood_null = log_likelihood_null;
        result.confidence_level = self.options.confidence_level;
        result.set_information_criteria();

        let mut fitted = FittedGlm {
            model,
            result,
            options: self.options.clone(),
            deviance,
            null_deviance,
            pearson_chi2,
        };

        if self.options.compute_inference {
            fitted.with_cov_type(self.options.cov_type.clone())?;
        }

        Ok(fitted)
    }

    /// Log-likelihood and deviance of the constant-only GLM with the same offset.
    fn null_fit(&self, model: &GlmModel<F>) -> (f64, f64) {
        let n_samples = model.exog.nrows();
        let ones = Mat::from_fn(n_samples, 1, |_, _| 1.0);
        let null_model = GlmModel::new(
            ones,
            model.endog.clone(),
            model.offset.clone(),
            model.family.clone(),
        );

        let regressor = GlmRegressor {
            options: RegressionOptions {
                compute_inference: false,
                ..self.options.clone()
            },
            family: self.family.clone(),
            offset: None,
            exposure: None,
            fit_null: false,
        };

        match regressor.fit_irls(null_model) {
            Ok(null_fit) => (null_fit.llf(), null_fit.deviance()),
            Err(err) => {
                log::warn!("glm: constant-only fit failed: {err}");
                (f64::NAN, f64::NAN)
            }
        }
    }
}

/// Solve weighted least squares `min_β Σ wᵢ (zᵢ - xᵢ'β)²` with a
/// column-pivoted QR. Columns with a negligible pivot get a zero coefficient.
fn solve_weighted_ls(x: &Mat<f64>, z: &[f64], weights: &[f64], rank_tolerance: f64) -> Col<f64> {
    let n_samples = x.nrows();
    let n_params = x.ncols();

    // X_w = sqrt(W) X, z_w = sqrt(W) z
    let mut x_weighted = Mat::zeros(n_samples, n_params);
    let mut z_weighted = Col::zeros(n_samples);
    for i in 0..n_samples {
        let sqrt_w = weights[i].sqrt();
        for j in 0..n_params {
            x_weighted[(i, j)] = sqrt_w * x[(i, j)];
        }
        z_weighted[i] = sqrt_w * z[i];
    }

    let qr = x_weighted.col_piv_qr();
    let q = qr.compute_Q();
    let r = qr.R();
    let perm = qr.P();

    let qtz = q.transpose() * z_weighted;

    let r_max = (0..n_params).map(|i| r[(i, i)].abs()).fold(0.0_f64, f64::max);
    let mut beta_perm = Col::zeros(n_params);
    for i in (0..n_params).rev() {
        let mut sum = qtz[i];
        for j in (i + 1)..n_params {
            sum -= r[(i, j)] * beta_perm[j];
        }
        if r[(i, i)].abs() > rank_tolerance * r_max.max(1.0) {
            beta_perm[i] = sum / r[(i, i)];
        }
    }

    let mut beta = Col::zeros(n_params);
    let inverse = perm.inverse();
    let fwd = inverse.arrays().0;
    for i in 0..n_params {
        beta[fwd[i]] = beta_perm[i];
    }

    beta
}

impl<F: GlmFamily + Clone> Regressor for GlmRegressor<F> {
    type Fitted = FittedGlm<F>;

    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError> {
        self.options.validate()?;
        validate_counts(x, y, x.ncols())?;
        let offset = resolve_offset(
            x.nrows(),
            self.offset.as_ref(),
            self.exposure.as_ref(),
        )?;

        self.fit_irls(GlmModel::new(
            x.clone(),
            y.clone(),
            offset,
            self.family.clone(),
        ))
    }
}

/// Fitted GLM.
#[derive(Debug, Clone)]
pub struct FittedGlm<F: GlmFamily> {
    model: GlmModel<F>,
    result: RegressionResult,
    options: RegressionOptions,
    deviance: f64,
    null_deviance: f64,
    pearson_chi2: f64,
}

impl<F: GlmFamily> FittedGlm<F> {
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

    /// The GLM family.
    pub fn family(&self) -> &F {
        self.model.family()
    }

    /// Residual deviance.
    pub fn deviance(&self) -> f64 {
        self.deviance
    }

    /// Deviance of the constant-only model with the same offset.
    pub fn null_deviance(&self) -> f64 {
        self.null_deviance
    }

    /// Pearson χ² statistic.
    pub fn pearson_chi2(&self) -> f64 {
        self.pearson_chi2
    }

    /// Pearson dispersion X² / (n - k); near 1 when the family fits.
    pub fn pearson_dispersion(&self) -> f64 {
        let y: Vec<f64> = self.model.endog.iter().copied().collect();
        let mu: Vec<f64> = self.result.fitted_values.iter().copied().collect();
        estimate_dispersion_pearson(&y, &mu, &self.model.family, self.result.n_parameters)
    }

    /// Dispersion scale φ.
    pub fn scale(&self) -> f64 {
        self.model.scale()
    }

    /// Response residuals y - μ.
    pub fn response_residuals(&self) -> Col<f64> {
        response_residuals(&self.model.endog, &self.result.fitted_values)
    }

    /// Pearson residuals.
    pub fn pearson_residuals(&self) -> Col<f64> {
        pearson_residuals(&self.model.endog, &self.result.fitted_values, &self.model.family)
    }

    /// Deviance residuals.
    pub fn deviance_residuals(&self) -> Col<f64> {
        deviance_residuals(&self.model.endog, &self.result.fitted_values, &self.model.family)
    }

    /// Working residuals.
    pub fn working_residuals(&self) -> Col<f64> {
        working_residuals(&self.model.endog, &self.result.fitted_values, &self.model.family)
    }

    /// Predicted means for new rows with the given offset.
    pub fn predict_with_offset(&self, x: &Mat<f64>, offset: &Col<f64>) -> Col<f64> {
        let p: Vec<f64> = self.result.params.iter().copied().collect();
        let eta = linear_predictor(x, &p, Some(offset));
        Col::from_fn(eta.nrows(), |i| self.model.family.link_inverse(eta[i]))
    }
}

impl<F: GlmFamily> FittedRegressor for FittedGlm<F> {
    type Model = GlmModel<F>;

    fn predict(&self, x: &Mat<f64>) -> Col<f64> {
        let p: Vec<f64> = self.result.params.iter().copied().collect();
        let eta = linear_predictor(x, &p, None);
        Col::from_fn(eta.nrows(), |i| self.model.family.link_inverse(eta[i]))
    }

    fn result(&self) -> &RegressionResult {
        &self.result
    }

    fn model(&self) -> &GlmModel<F> {
        &self.model
    }
}

/// Builder for `GlmRegressor`.
#[derive(Debug, Clone)]
pub struct GlmRegressorBuilder<F: GlmFamily> {
    options_builder: RegressionOptionsBuilder,
    family: F,
    offset: Option<Col<f64>>,
    exposure: Option<Col<f64>>,
}

impl<F: GlmFamily> GlmRegressorBuilder<F> {
    /// Create a builder for the given family.
    pub fn new(family: F) -> Self {
        Self {
            options_builder: RegressionOptionsBuilder::default(),
            family,
            offset: None,
            exposure: None,
        }
    }

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

    /// Set the maximum IRLS iterations.
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
    pub fn build(self) -> GlmRegressor<F> {
        GlmRegressor {
            options: self.options_builder.build_unchecked(),
            family: self.family,
            offset: self.offset,
            exposure: self.exposure,
            fit_null: true,
        }
    }
}
