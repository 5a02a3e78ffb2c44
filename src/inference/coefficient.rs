//! Coefficient inference calculations.

use faer::Col;
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// Computes inference statistics for estimated parameters.
///
/// A finite `df` selects the Student-t reference distribution; `f64::INFINITY`
/// selects the standard normal.
pub struct CoefficientInference;

impl CoefficientInference {
    /// Compute z- or t-statistics for parameters.
    ///
    /// z_j = β_j / SE(β_j)
    pub fn statistics(params: &Col<f64>, std_errors: &Col<f64>) -> Col<f64> {
        let n = params.nrows();
        Col::from_fn(n, |j| {
            if std_errors[j].is_nan() || std_errors[j] == 0.0 {
                f64::NAN
            } else {
                params[j] / std_errors[j]
            }
        })
    }

    /// Two-sided p-values.
    ///
    /// p_j = 2 * P(|T| > |z_j|)
    pub fn p_values(statistics: &Col<f64>, df: f64) -> Col<f64> {
        let n = statistics.nrows();
        let survival = match Self::reference_cdf(df) {
            Some(cdf) => cdf,
            None => return Col::from_fn(n, |_| f64::NAN),
        };

        Col::from_fn(n, |j| {
            if statistics[j].is_nan() {
                f64::NAN
            } else {
                2.0 * (1.0 - survival(statistics[j].abs()))
            }
        })
    }

    /// Confidence intervals for parameters.
    ///
    /// CI_j = β_j ± q_{1-α/2} * SE(β_j)
    pub fn confidence_intervals(
        params: &Col<f64>,
        std_errors: &Col<f64>,
        df: f64,
        confidence_level: f64,
    ) -> (Col<f64>, Col<f64>) {
        let n = params.nrows();
        let q = Self::critical_value(df, confidence_level);

        let lower = Col::from_fn(n, |j| {
            if std_errors[j].is_nan() || q.is_nan() {
                f64::NAN
            } else {
                params[j] - q * std_errors[j]
            }
        });
        let upper = Col::from_fn(n, |j| {
            if std_errors[j].is_nan() || q.is_nan() {
                f64::NAN
            } else {
                params[j] + q * std_errors[j]
            }
        });

        (lower, upper)
    }

    /// Two-sided critical value of the reference distribution.
    pub fn critical_value(df: f64, confidence_level: f64) -> f64 {
        let p = 1.0 - (1.0 - confidence_level) / 2.0;
        if df.is_infinite() {
            Normal::new(0.0, 1.0)
                .map(|d| d.inverse_cdf(p))
                .unwrap_or(f64::NAN)
        } else if df > 0.0 {
            StudentsT::new(0.0, 1.0, df)
                .map(|d| d.inverse_cdf(p))
                .unwrap_or(f64::NAN)
        } else {
            f64::NAN
        }
    }

    fn reference_cdf(df: f64) -> Option<Box<dyn Fn(f64) -> f64>> {
        if df.is_infinite() {
            let normal = Normal::new(0.0, 1.0).ok()?;
            Some(Box::new(move |x| normal.cdf(x)))
        } else if df > 0.0 {
            let t = StudentsT::new(0.0, 1.0, df).ok()?;
            Some(Box::new(move |x| t.cdf(x)))
        } else {
            None
        }
    }
}
