//! Numerical helpers shared by the solvers and the covariance estimators.

mod matrix;
mod special;

pub use matrix::{
    add_constant, detect_constant_columns, find_constant_column, invert_symmetric,
    linear_predictor, mat_vec, outer_product_sum, sandwich_product,
};
pub use special::trigamma;
