//! Input checks shared by the count solvers.

use crate::solvers::traits::RegressionError;
use faer::{Col, Mat};

/// Check shapes and that the response holds non-negative finite counts.
///
/// At least `n_params + 1` rows are required so the residual df is positive.
pub(crate) fn validate_counts(
    x: &Mat<f64>,
    y: &Col<f64>,
    n_params: usize,
) -> Result<(), RegressionError> {
    let n_samples = x.nrows();

    if n_samples != y.nrows() {
        return Err(RegressionError::DimensionMismatch {
            x_rows: n_samples,
            y_len: y.nrows(),
        });
    }

    if n_samples <= n_params {
        return Err(RegressionError::InsufficientObservations {
            needed: n_params + 1,
            got: n_samples,
        });
    }

    for (index, &value) in y.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(RegressionError::InvalidResponse { index, value });
        }
    }

    Ok(())
}

/// Combine an explicit offset and an exposure into a single offset column.
///
/// Exposure enters as `ln(exposure)`; when both are given they are added.
pub(crate) fn resolve_offset(
    n_samples: usize,
    offset: Option<&Col<f64>>,
    exposure: Option<&Col<f64>>,
) -> Result<Option<Col<f64>>, RegressionError> {
    if let Some(off) = offset {
        if off.nrows() != n_samples {
            return Err(RegressionError::OffsetLength {
                expected: n_samples,
                got: off.nrows(),
            });
        }
    }

    let log_exposure = match exposure {
        Some(exp) => {
            if exp.nrows() != n_samples {
                return Err(RegressionError::OffsetLength {
                    expected: n_samples,
                    got: exp.nrows(),
                });
            }
            if let Some((index, &value)) = exp
                .iter()
                .enumerate()
                .find(|(_, v)| !(**v > 0.0 && v.is_finite()))
            {
                return Err(RegressionError::InvalidExposure { index, value });
            }
            Some(Col::from_fn(n_samples, |i| exp[i].ln()))
        }
        None => None,
    };

    Ok(match (offset, log_exposure) {
        (Some(off), Some(le)) => Some(Col::from_fn(n_samples, |i| off[i] + le[i])),
        (Some(off), None) => Some(off.clone()),
        (None, le) => le,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_offset_combines_terms() {
        let offset = Col::from_fn(3, |i| i as f64);
        let exposure = Col::from_fn(3, |_| std::f64::consts::E);

        let combined = resolve_offset(3, Some(&offset), Some(&exposure))
            .unwrap()
            .unwrap();
        for i in 0..3 {
            assert!((combined[i] - (i as f64 + 1.0)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_resolve_offset_none() {
        assert!(resolve_offset(4, None, None).unwrap().is_none());
    }

    #[test]
    fn test_resolve_offset_length_mismatch() {
        let offset = Col::from_fn(2, |_| 0.0);
        let result = resolve_offset(3, Some(&offset), None);
        assert!(matches!(
            result,
            Err(RegressionError::OffsetLength { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn test_negative_exposure_rejected() {
        let exposure = Col::from_fn(3, |i| if i == 1 { -2.0 } else { 1.0 });
        let result = resolve_offset(3, None, Some(&exposure));
        assert!(matches!(
            result,
            Err(RegressionError::InvalidExposure { index: 1, .. })
        ));
    }

    #[test]
    fn test_validate_counts_rejects_nan() {
        let x = Mat::from_fn(4, 1, |_, _| 1.0);
        let y = Col::from_fn(4, |i| if i == 2 { f64::NAN } else { 1.0 });
        assert!(matches!(
            validate_counts(&x, &y, 1),
            Err(RegressionError::InvalidResponse { index: 2, .. })
        ));
    }

    #[test]
    fn test_validate_counts_insufficient_observations() {
        let x = Mat::from_fn(2, 2, |_, _| 1.0);
        let y = Col::from_fn(2, |_| 1.0);
        assert!(matches!(
            validate_counts(&x, &y, 2),
            Err(RegressionError::InsufficientObservations { needed: 3, got: 2 })
        ));
    }

    #[test]
    fn test_validate_counts_accepts_one_residual_df() {
        let x = Mat::from_fn(3, 2, |i, j| if j == 0 { 1.0 } else { i as f64 });
        let y = Col::from_fn(3, |i| i as f64);
        assert!(validate_counts(&x, &y, 2).is_ok());
    }
}
