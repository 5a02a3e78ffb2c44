//! Shared fixtures and checks for the robust covariance tests.

#![allow(dead_code)]

pub mod results_count_robust_cluster;

use approx::assert_relative_eq;
use countreg::data::Dataset;
use countreg::utils::add_constant;
use faer::{Col, Mat};
use results_count_robust_cluster::CountResults;

/// Ship accident data after dropping incomplete rows.
pub struct Ships {
    pub endog: Col<f64>,
    pub exog: Mat<f64>,
    pub exposure: Col<f64>,
    pub group: Vec<i64>,
}

impl Ships {
    pub fn nobs(&self) -> usize {
        self.endog.nrows()
    }
}

/// Load `tests/data/ships.csv` with the constant appended last.
pub fn load_ships() -> Ships {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/ships.csv");
    let data = Dataset::from_csv(path).expect("ships.csv should load").dropna();

    let exog = data
        .design(&["yr_con", "op_75_79"])
        .expect("design columns should exist");

    Ships {
        endog: data.column("accident").expect("accident column"),
        exog: add_constant(&exog, false),
        exposure: data.column("service").expect("service column"),
        group: data.groups("ship").expect("ship labels"),
    }
}

/// `sqrt((n-1)/(n-k))`, the part of the cluster and scaled HC0 corrections that
/// the reference values do not include.
pub fn corr_fact_small_sample(nobs: usize, k_params: usize) -> f64 {
    ((nobs as f64 - 1.0) / (nobs - k_params) as f64).sqrt()
}

/// `sqrt((n-1)/n)`, maps HC0 and HC1 onto the reference robust convention.
pub fn corr_fact_hc0(nobs: usize) -> f64 {
    ((nobs as f64 - 1.0) / nobs as f64).sqrt()
}

/// Reference entries to compare against: when the model has one parameter
/// fewer than the reference, the `lnalpha` entry at position -2 is dropped.
fn masked(model_len: usize, reference: &[f64]) -> Vec<f64> {
    if model_len + 1 == reference.len() {
        let skip = reference.len() - 2;
        reference
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .map(|(_, v)| *v)
            .collect()
    } else {
        reference.to_vec()
    }
}

/// Compare params (rtol 1e-4) and corrected robust bse (rtol 1e-5).
pub fn check_basic(params: &Col<f64>, bse_rob: &Col<f64>, corr_fact: f64, res: &CountResults) {
    let ref_params = masked(params.nrows(), res.params);
    let ref_bse = masked(params.nrows(), res.bse);
    assert_eq!(ref_params.len(), params.nrows());

    for j in 0..params.nrows() {
        assert_relative_eq!(params[j], ref_params[j], max_relative = 1e-4);
        assert_relative_eq!(bse_rob[j] / corr_fact, ref_bse[j], max_relative = 1e-5);
    }
}

/// Compare the log-likelihood and the null log-likelihood (rtol 1e-4).
pub fn check_oth(llf: f64, llnull: f64, res: &CountResults) {
    assert_relative_eq!(llf, res.ll, max_relative = 1e-4);
    assert_relative_eq!(llnull, res.ll_0, max_relative = 1e-4);
}
