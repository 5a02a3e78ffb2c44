//! Core types for count regression.

mod family;
mod negative_binomial;
mod options;
mod poisson;
mod result;

pub use family::GlmFamily;
pub use negative_binomial::{nb2_derivatives, nb2_loglike_obs, Nb2Derivatives, NegativeBinomialFamily};
pub use options::{OptionsError, RegressionOptions, RegressionOptionsBuilder};
pub use poisson::PoissonFamily;
pub use result::RegressionResult;
