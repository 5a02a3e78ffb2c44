//! Statistical inference: robust covariance estimators, p-values and intervals.

mod coefficient;
mod covtype;
mod sandwich;

pub use coefficient::CoefficientInference;
pub use covtype::{robust_covariance, ClusterOptions, CovType, RobustCovariance};
pub use sandwich::{
    cov_cluster, cov_hc0, cov_hc0_scaled, cov_hc1, se_cov, ClusterInfo, CovarianceError,
};
