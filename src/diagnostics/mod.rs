//! Residual diagnostics for fitted GLMs.
//!
//! # Example
//!
//! ```rust,ignore
//! use countreg::diagnostics::{deviance_residuals, pearson_chi_squared};
//!
//! let resid = deviance_residuals(&y, &mu, &family);
//! let chi2 = pearson_chi_squared(&y_vec, &mu_vec, &family);
//! ```

mod glm_residuals;

pub use glm_residuals::{
    deviance_residuals, estimate_dispersion_pearson, pearson_chi_squared, pearson_residuals,
    response_residuals, working_residuals,
};
