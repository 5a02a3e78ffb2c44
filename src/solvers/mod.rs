//! Count regression solvers.
//!
//! - [`PoissonRegressor`]: Poisson maximum likelihood by Newton-Raphson
//! - [`NegativeBinomialRegressor`]: NB2 maximum likelihood over `(β, α)`
//! - [`GlmRegressor`]: Poisson or fixed-α Negative Binomial GLM by IRLS

mod glm;
mod negative_binomial;
mod newton;
mod poisson;
mod traits;
mod validation;

pub use glm::{FittedGlm, GlmModel, GlmRegressor, GlmRegressorBuilder};
pub use negative_binomial::{
    FittedNegativeBinomial, NegativeBinomialModel, NegativeBinomialRegressor,
    NegativeBinomialRegressorBuilder,
};
pub use poisson::{FittedPoisson, PoissonModel, PoissonRegressor, PoissonRegressorBuilder};
pub use traits::{FittedRegressor, LikelihoodModel, RegressionError, Regressor};
