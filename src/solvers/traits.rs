//! Core traits for count regression estimators.

use crate::core::RegressionResult;
use crate::inference::CovarianceError;
use crate::utils::invert_symmetric;
use faer::{Col, Mat};
use thiserror::Error;

/// Errors that can occur during regression fitting.
#[derive(Debug, Error)]
pub enum RegressionError {
    #[error("dimension mismatch: X has {x_rows} rows but y has {y_len} elements")]
    DimensionMismatch { x_rows: usize, y_len: usize },

    #[error("offset has {got} elements but the model has {expected} observations")]
    OffsetLength { expected: usize, got: usize },

    #[error("insufficient observations: need at least {needed}, got {got}")]
    InsufficientObservations { needed: usize, got: usize },

    #[error("matrix is singular or nearly singular")]
    SingularMatrix,

    #[error("invalid options: {0}")]
    InvalidOptions(#[from] crate::core::OptionsError),

    #[error("convergence failed after {iterations} iterations")]
    ConvergenceFailed { iterations: usize },

    #[error("exposure must be strictly positive, got {value} at index {index}")]
    InvalidExposure { index: usize, value: f64 },

    #[error("count response must be non-negative and finite, got {value} at index {index}")]
    InvalidResponse { index: usize, value: f64 },

    #[error("covariance error: {0}")]
    Covariance(#[from] CovarianceError),

    #[error("numerical error: {0}")]
    NumericalError(String),
}

/// A model with a twice-differentiable log-likelihood.
///
/// This is the seam used by the sandwich covariance estimators: they need the
/// per-observation scores (the "meat") and the Hessian (the "bread").
pub trait LikelihoodModel {
    /// Design matrix.
    fn exog(&self) -> &Mat<f64>;

    /// Response vector.
    fn endog(&self) -> &Col<f64>;

    /// Number of observations.
    fn nobs(&self) -> usize {
        self.exog().nrows()
    }

    /// Total log-likelihood at `params`.
    fn loglike(&self, params: &Col<f64>) -> f64;

    /// Per-observation scores, an `n × k` matrix.
    fn score_obs(&self, params: &Col<f64>) -> Mat<f64>;

    /// Hessian of the log-likelihood, a `k × k` matrix.
    fn hessian(&self, params: &Col<f64>) -> Mat<f64>;

    /// Gradient of the log-likelihood.
    fn score(&self, params: &Col<f64>) -> Col<f64> {
        let s = self.score_obs(params);
        Col::from_fn(s.ncols(), |j| (0..s.nrows()).map(|i| s[(i, j)]).sum())
    }

    /// Model-based covariance: the inverse of the negative Hessian.
    fn nonrobust_cov(&self, params: &Col<f64>, rank_tolerance: f64) -> Option<Mat<f64>> {
        let h = self.hessian(params);
        let neg_h = Mat::from_fn(h.nrows(), h.ncols(), |i, j| -h[(i, j)]);
        invert_symmetric(&neg_h, rank_tolerance)
    }
}

/// A count regression estimator that can be fit to data.
///
/// Fitting returns a fitted model, following the sklearn pattern.
pub trait Regressor {
    /// The type of the fitted model.
    type Fitted: FittedRegressor;

    /// Fit the model to the data.
    ///
    /// # Arguments
    /// * `x` - Design matrix of shape (n_samples, n_exog), including any constant column
    /// * `y` - Count response of length n_samples
    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError>;
}

/// A fitted count regression model.
pub trait FittedRegressor {
    /// The likelihood model the parameters were estimated on.
    type Model: LikelihoodModel;

    /// Predicted means for new rows, without offset.
    fn predict(&self, x: &Mat<f64>) -> Col<f64>;

    /// Access the regression results.
    fn result(&self) -> &RegressionResult;

    /// Access the underlying likelihood model.
    fn model(&self) -> &Self::Model;

    /// Estimated parameters (convenience method).
    fn params(&self) -> &Col<f64> {
        &self.result().params
    }

    /// Standard errors under the current covariance (convenience method).
    fn bse(&self) -> Option<&Col<f64>> {
        self.result().bse()
    }

    /// Log-likelihood at the estimate (convenience method).
    fn llf(&self) -> f64 {
        self.result().log_likelihood
    }

    /// Log-likelihood of the constant-only model (convenience method).
    fn llnull(&self) -> f64 {
        self.result().log_likelihood_null
    }
}
