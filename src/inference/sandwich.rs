//! Sandwich (heteroskedasticity- and cluster-robust) covariance estimators.
//!
//! All estimators share the form `H⁻¹ M H⁻¹` where `H` is the Hessian of the
//! log-likelihood and `M` is the outer product of scores:
//!
//! - **HC0**: `M = Σᵢ sᵢ sᵢᵀ`
//! - **HC1**: for likelihood models the same uncorrected White sandwich as HC0
//! - **HC0 scaled**: HC0 times `n / (n - k)`, the linear-model HC1 factor
//! - **Cluster**: `M = Σ_g s_g s_gᵀ` with `s_g` the sum of scores in group g,
//!   optionally scaled by `G/(G-1) · (n-1)/(n-k)`
//!
//! # References
//! - White, H. (1980). A Heteroskedasticity-Consistent Covariance Matrix
//!   Estimator and a Direct Test for Heteroskedasticity. Econometrica, 48(4).
//! - Cameron, A. C., & Miller, D. L. (2015). A Practitioner's Guide to
//!   Cluster-Robust Inference. Journal of Human Resources, 50(2), 317-372.

use crate::solvers::LikelihoodModel;
use crate::utils::{invert_symmetric, outer_product_sum, sandwich_product};
use faer::{Col, Mat};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from the robust covariance estimators.
#[derive(Debug, Error, PartialEq)]
pub enum CovarianceError {
    #[error("group vector has {groups} entries but the model has {nobs} observations")]
    GroupLength { groups: usize, nobs: usize },

    #[error("clustered standard errors require at least 2 clusters; found {found}")]
    InsufficientClusters { found: usize },

    #[error("no residual degrees of freedom: {nobs} observations, {k_params} parameters")]
    NoResidualDf { nobs: usize, k_params: usize },

    #[error("hessian is singular; the covariance is not identified")]
    SingularHessian,
}

/// Cluster membership for grouped observations.
///
/// Cluster indices follow the sorted order of the group labels.
#[derive(Debug, Clone)]
pub struct ClusterInfo {
    /// `indices[g]` lists the row indices belonging to cluster g.
    pub indices: Vec<Vec<usize>>,
    /// Number of unique clusters (G).
    pub n_clusters: usize,
    /// `sizes[g]` is the number of observations in cluster g.
    pub sizes: Vec<usize>,
}

impl ClusterInfo {
    /// Build cluster membership from arbitrary integer labels.
    pub fn from_groups(groups: &[i64]) -> Result<Self, CovarianceError> {
        let mut by_label: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (row, &label) in groups.iter().enumerate() {
            by_label.entry(label).or_default().push(row);
        }

        if by_label.len() < 2 {
            return Err(CovarianceError::InsufficientClusters {
                found: by_label.len(),
            });
        }

        let indices: Vec<Vec<usize>> = by_label.into_values().collect();
        let sizes = indices.iter().map(Vec::len).collect();

        Ok(Self {
            n_clusters: indices.len(),
            indices,
            sizes,
        })
    }
}

/// Square roots of the diagonal of a covariance matrix.
pub fn se_cov(cov: &Mat<f64>) -> Col<f64> {
    Col::from_fn(cov.nrows(), |j| {
        let var = cov[(j, j)];
        if var >= 0.0 {
            var.sqrt()
        } else {
            log::warn!("covariance diagonal {j} is negative ({var:e}); standard error set to NaN");
            f64::NAN
        }
    })
}

/// Inverse Hessian, the bread of the sandwich.
///
/// `rank_tolerance` is relative to the largest diagonal entry of R, as in
/// the non-robust covariance.
fn bread<M: LikelihoodModel + ?Sized>(
    model: &M,
    params: &Col<f64>,
    rank_tolerance: f64,
) -> Result<Mat<f64>, CovarianceError> {
    let h = model.hessian(params);
    invert_symmetric(&h, rank_tolerance).ok_or(CovarianceError::SingularHessian)
}

/// Heteroskedasticity-robust covariance without small-sample correction.
pub fn cov_hc0<M: LikelihoodModel + ?Sized>(
    model: &M,
    params: &Col<f64>,
    rank_tolerance: f64,
) -> Result<Mat<f64>, CovarianceError> {
    let h_inv = bread(model, params, rank_tolerance)?;
    let meat = outer_product_sum(&model.score_obs(params));
    Ok(sandwich_product(&h_inv, &meat))
}

/// HC1 for likelihood models.
///
/// Without a residual-based HC1 the White sandwich is used uncorrected, so
/// this equals [`cov_hc0`]. See [`cov_hc0_scaled`] for the `n / (n - k)`
/// variant.
pub fn cov_hc1<M: LikelihoodModel + ?Sized>(
    model: &M,
    params: &Col<f64>,
    rank_tolerance: f64,
) -> Result<Mat<f64>, CovarianceError> {
    cov_hc0(model, params, rank_tolerance)
}

/// Heteroskedasticity-robust covariance scaled by `n / (n - k)`.
pub fn cov_hc0_scaled<M: LikelihoodModel + ?Sized>(
    model: &M,
    params: &Col<f64>,
    rank_tolerance: f64,
) -> Result<Mat<f64>, CovarianceError> {
    let nobs = model.nobs();
    let k_params = params.nrows();
    if nobs <= k_params {
        return Err(CovarianceError::NoResidualDf { nobs, k_params });
    }

    let factor = nobs as f64 / (nobs - k_params) as f64;
    let cov = cov_hc0(model, params, rank_tolerance)?;
    Ok(Mat::from_fn(k_params, k_params, |i, j| cov[(i, j)] * factor))
}

/// Cluster-robust covariance.
///
/// With `use_correction`, the raw sandwich is scaled by
/// `G/(G-1) · (n-1)/(n-k)`.
pub fn cov_cluster<M: LikelihoodModel + ?Sized>(
    model: &M,
    params: &Col<f64>,
    groups: &[i64],
    use_correction: bool,
    rank_tolerance: f64,
) -> Result<Mat<f64>, CovarianceError> {
    let nobs = model.nobs();
    if groups.len() != nobs {
        return Err(CovarianceError::GroupLength {
            groups: groups.len(),
            nobs,
        });
    }
    let clusters = ClusterInfo::from_groups(groups)?;
    let k_params = params.nrows();

    let scores = model.score_obs(params);
    let group_scores = Mat::from_fn(clusters.n_clusters, k_params, |g, j| {
        clusters.indices[g].iter().map(|&i| scores[(i, j)]).sum()
    });

    let h_inv = bread(model, params, rank_tolerance)?;
    let meat = outer_product_sum(&group_scores);
    let mut cov = sandwich_product(&h_inv, &meat);

    if use_correction {
        if nobs <= k_params {
            return Err(CovarianceError::NoResidualDf { nobs, k_params });
        }
        let g = clusters.n_clusters as f64;
        let n = nobs as f64;
        let k = k_params as f64;
        let factor = g / (g - 1.0) * ((n - 1.0) / (n - k));
        log::debug!(
            "cluster covariance: {} clusters, correction factor {:.6}",
            clusters.n_clusters,
            factor
        );
        for i in 0..k_params {
            for j in 0..k_params {
                cov[(i, j)] *= factor;
            }
        }
    }

    Ok(cov)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_info_basic() {
        let info = ClusterInfo::from_groups(&[3, 1, 3, 2, 1]).unwrap();
        assert_eq!(info.n_clusters, 3);
        // Sorted labels: 1, 2, 3
        assert_eq!(info.indices[0], vec![1, 4]);
        assert_eq!(info.indices[1], vec![3]);
        assert_eq!(info.indices[2], vec![0, 2]);
        assert_eq!(info.sizes, vec![2, 1, 2]);
        assert_eq!(info.sizes.iter().sum::<usize>(), 5);
    }

    #[test]
    fn test_cluster_info_single_cluster_error() {
        let result = ClusterInfo::from_groups(&[7, 7, 7]);
        assert_eq!(
            result.unwrap_err(),
            CovarianceError::InsufficientClusters { found: 1 }
        );
    }

    #[test]
    fn test_se_cov() {
        let cov = Mat::from_fn(2, 2, |i, j| if i == j { 4.0 * (i + 1) as f64 } else { 0.3 });
        let se = se_cov(&cov);
        assert!((se[0] - 2.0).abs() < 1e-12);
        assert!((se[1] - 8.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_se_cov_negative_variance_is_nan() {
        let cov = Mat::from_fn(1, 1, |_, _| -1.0);
        assert!(se_cov(&cov)[0].is_nan());
    }
}
