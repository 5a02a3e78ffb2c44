//! Covariance type selection for fitted models.
//!
//! A `CovType` can be requested when fitting (through the regressor
//! builders) or applied afterwards with `with_cov_type` on a fitted model.
//! Both paths go through [`robust_covariance`] and give identical numbers.

use super::sandwich::{
    cov_cluster, cov_hc0, cov_hc0_scaled, cov_hc1, ClusterInfo, CovarianceError,
};
use crate::solvers::LikelihoodModel;
use faer::{Col, Mat};

/// Options for cluster-robust covariance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterOptions {
    /// Scale by `G/(G-1) · (n-1)/(n-k)`.
    pub use_correction: bool,
    /// Use `G - 1` instead of `n - k` as the degrees of freedom for inference.
    pub df_correction: bool,
    /// Use the t distribution instead of the normal for inference.
    pub use_t: bool,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            use_correction: true,
            df_correction: true,
            use_t: false,
        }
    }
}

/// Which covariance estimator to attach to a fitted model.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CovType {
    /// Inverse of the negative Hessian (or the expected information for GLMs).
    #[default]
    NonRobust,
    /// White sandwich without small-sample correction.
    HC0,
    /// White sandwich as used for likelihood models; equal to `HC0`.
    HC1,
    /// White sandwich scaled by `n / (n - k)`.
    HC0Scaled,
    /// Cluster-robust sandwich over the given group labels.
    Cluster {
        groups: Vec<i64>,
        options: ClusterOptions,
    },
}

impl CovType {
    /// Cluster-robust covariance with default options.
    pub fn cluster(groups: Vec<i64>) -> Self {
        CovType::Cluster {
            groups,
            options: ClusterOptions::default(),
        }
    }

    /// Short name of the estimator.
    pub fn name(&self) -> &'static str {
        match self {
            CovType::NonRobust => "nonrobust",
            CovType::HC0 => "HC0",
            CovType::HC1 => "HC1",
            CovType::HC0Scaled => "HC0-scaled",
            CovType::Cluster { .. } => "cluster",
        }
    }

    /// Whether this estimator is a sandwich estimator.
    pub fn is_robust(&self) -> bool {
        !matches!(self, CovType::NonRobust)
    }
}

/// A covariance matrix together with the settings used for inference.
#[derive(Debug, Clone)]
pub struct RobustCovariance {
    /// Parameter covariance matrix.
    pub cov: Mat<f64>,
    /// Estimator that produced `cov`.
    pub cov_type: CovType,
    /// Whether inference uses the t distribution.
    pub use_t: bool,
    /// Degrees of freedom for t-based inference.
    pub df_inference: f64,
    /// Human readable description.
    pub description: String,
}

/// Compute the covariance requested by `cov_type` at `params`.
pub fn robust_covariance<M: LikelihoodModel + ?Sized>(
    model: &M,
    params: &Col<f64>,
    cov_type: &CovType,
    rank_tolerance: f64,
) -> Result<RobustCovariance, CovarianceError> {
    let nobs = model.nobs();
    let df_resid = nobs.saturating_sub(params.nrows()) as f64;

    let robust = match cov_type {
        CovType::NonRobust => RobustCovariance {
            cov: model
                .nonrobust_cov(params, rank_tolerance)
                .ok_or(CovarianceError::SingularHessian)?,
            cov_type: CovType::NonRobust,
            use_t: false,
            df_inference: df_resid,
            description: "covariance from the inverse information matrix".to_string(),
        },
        CovType::HC0 => RobustCovariance {
            cov: cov_hc0(model, params, rank_tolerance)?,
            cov_type: CovType::HC0,
            use_t: false,
            df_inference: df_resid,
            description: "heteroskedasticity robust standard errors (HC0)".to_string(),
        },
        CovType::HC1 => RobustCovariance {
            cov: cov_hc1(model, params, rank_tolerance)?,
            cov_type: CovType::HC1,
            use_t: false,
            df_inference: df_resid,
            description: "heteroskedasticity robust standard errors (HC1)".to_string(),
        },
        CovType::HC0Scaled => RobustCovariance {
            cov: cov_hc0_scaled(model, params, rank_tolerance)?,
            cov_type: CovType::HC0Scaled,
            use_t: false,
            df_inference: df_resid,
            description: "heteroskedasticity robust standard errors scaled by n/(n-k)"
                .to_string(),
        },
        CovType::Cluster { groups, options } => {
            let cov = cov_cluster(
                model,
                params,
                groups,
                options.use_correction,
                rank_tolerance,
            )?;
            let n_clusters = ClusterInfo::from_groups(groups)?.n_clusters;
            let df_inference = if options.df_correction {
                (n_clusters - 1) as f64
            } else {
                df_resid
            };
            RobustCovariance {
                cov,
                cov_type: cov_type.clone(),
                use_t: options.use_t,
                df_inference,
                description: format!(
                    "standard errors robust to correlation within {n_clusters} clusters"
                ),
            }
        }
    };

    Ok(robust)
}
