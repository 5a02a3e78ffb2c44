//! Count regression with robust standard errors.
//!
//! This library provides Poisson, Negative Binomial (NB2) and GLM count
//! estimators with heteroskedasticity-robust (HC0, HC1) and cluster-robust
//! sandwich covariances, plus the usual inference statistics.
//!
//! # Example
//!
//! ```rust,ignore
//! use countreg::prelude::*;
//!
//! let data = Dataset::from_csv("ships.csv")?.dropna();
//! let y = data.column("accident")?;
//! let x = add_constant(&data.design(&["yr_con", "op_75_79"])?, false);
//!
//! let fitted = PoissonRegressor::builder()
//!     .exposure(data.column("service")?)
//!     .cov_type(CovType::cluster(data.groups("ship")?))
//!     .build()
//!     .fit(&x, &y)?;
//!
//! println!("bse = {:?}", fitted.bse());
//! ```

pub mod core;
pub mod data;
pub mod diagnostics;
pub mod inference;
pub mod solvers;
pub mod utils;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{
        GlmFamily, NegativeBinomialFamily, PoissonFamily, RegressionOptions,
        RegressionOptionsBuilder, RegressionResult,
    };
    pub use crate::data::{DataError, Dataset};
    pub use crate::diagnostics::{deviance_residuals, pearson_residuals, working_residuals};
    pub use crate::inference::{
        cov_cluster, cov_hc0, cov_hc0_scaled, cov_hc1, se_cov, ClusterOptions, CovType,
        CovarianceError,
    };
    pub use crate::solvers::{
        FittedGlm, FittedNegativeBinomial, FittedPoisson, FittedRegressor, GlmRegressor,
        LikelihoodModel, NegativeBinomialRegressor, PoissonRegressor, RegressionError, Regressor,
    };
    pub use crate::utils::add_constant;
}

pub use crate::core::{
    GlmFamily, NegativeBinomialFamily, PoissonFamily, RegressionOptions, RegressionOptionsBuilder,
    RegressionResult,
};
pub use crate::inference::CovType;
pub use crate::solvers::{
    FittedGlm, FittedNegativeBinomial, FittedPoisson, FittedRegressor, GlmRegressor,
    NegativeBinomialRegressor, PoissonRegressor, Regressor,
};
