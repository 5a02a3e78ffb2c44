//! Matrix utility functions.

use faer::{Col, Mat};

/// Detect columns that are constant (zero variance).
pub fn detect_constant_columns(x: &Mat<f64>, tolerance: f64) -> Vec<bool> {
    let n_cols = x.ncols();
    let n_rows = x.nrows();

    if n_rows == 0 {
        return vec![true; n_cols];
    }

    let mut constant = vec![false; n_cols];

    for j in 0..n_cols {
        let first = x[(0, j)];
        let all_same = (1..n_rows).all(|i| (x[(i, j)] - first).abs() < tolerance);
        constant[j] = all_same;
    }

    constant
}

/// Index of the first column whose entries are all equal to one.
pub fn find_constant_column(x: &Mat<f64>) -> Option<usize> {
    if x.nrows() == 0 {
        return None;
    }
    detect_constant_columns(x, 1e-12)
        .iter()
        .enumerate()
        .find(|&(j, &is_const)| is_const && (x[(0, j)] - 1.0).abs() < 1e-12)
        .map(|(j, _)| j)
}

/// Add a column of ones to the design matrix.
///
/// With `prepend = false` the constant becomes the last column, which is the
/// coefficient ordering Stata reports.
pub fn add_constant(x: &Mat<f64>, prepend: bool) -> Mat<f64> {
    let n_rows = x.nrows();
    let n_cols = x.ncols();
    let offset = if prepend { 1 } else { 0 };
    let const_col = if prepend { 0 } else { n_cols };

    Mat::from_fn(n_rows, n_cols + 1, |i, j| {
        if j == const_col {
            1.0
        } else {
            x[(i, j - offset)]
        }
    })
}

/// Linear predictor `Xβ (+ offset)`.
pub fn linear_predictor(x: &Mat<f64>, beta: &[f64], offset: Option<&Col<f64>>) -> Col<f64> {
    let n_rows = x.nrows();
    let n_cols = x.ncols();

    Col::from_fn(n_rows, |i| {
        let mut eta = 0.0;
        for j in 0..n_cols {
            eta += x[(i, j)] * beta[j];
        }
        if let Some(off) = offset {
            eta += off[i];
        }
        eta
    })
}

/// Invert a symmetric matrix through its QR decomposition.
///
/// Returns `None` when a diagonal entry of R falls below `rank_tolerance`
/// relative to the largest one.
pub fn invert_symmetric(a: &Mat<f64>, rank_tolerance: f64) -> Option<Mat<f64>> {
    let k = a.nrows();
    if k == 0 || a.ncols() != k {
        return None;
    }

    let qr: faer::linalg::solvers::Qr<f64> = a.qr();
    let q = qr.compute_Q();
    let r = qr.R().to_owned();

    let r_max = (0..k).map(|i| r[(i, i)].abs()).fold(0.0_f64, f64::max);
    if !r_max.is_finite() || r_max == 0.0 {
        return None;
    }
    if (0..k).any(|i| r[(i, i)].abs() <= rank_tolerance * r_max) {
        return None;
    }

    let mut inv: Mat<f64> = Mat::zeros(k, k);
    for col in 0..k {
        // Qᵀe_col is row `col` of Q.
        let mut sol = vec![0.0; k];
        for i in (0..k).rev() {
            let mut sum = q[(col, i)];
            for j in (i + 1)..k {
                sum -= r[(i, j)] * sol[j];
            }
            sol[i] = sum / r[(i, i)];
        }
        for i in 0..k {
            inv[(i, col)] = sol[i];
        }
    }

    // Symmetrize away round-off.
    for i in 0..k {
        for j in (i + 1)..k {
            let avg = 0.5 * (inv[(i, j)] + inv[(j, i)]);
            inv[(i, j)] = avg;
            inv[(j, i)] = avg;
        }
    }

    Some(inv)
}

/// Matrix-vector product `A v`.
pub fn mat_vec(a: &Mat<f64>, v: &[f64]) -> Vec<f64> {
    (0..a.nrows())
        .map(|i| (0..a.ncols()).map(|j| a[(i, j)] * v[j]).sum())
        .collect()
}

/// Sum of outer products of the rows of `s`: `Σᵢ sᵢ sᵢᵀ`.
pub fn outer_product_sum(s: &Mat<f64>) -> Mat<f64> {
    let k = s.ncols();
    let mut out = Mat::zeros(k, k);
    for i in 0..s.nrows() {
        for a in 0..k {
            let sa = s[(i, a)];
            if sa == 0.0 {
                continue;
            }
            for b in 0..k {
                out[(a, b)] += sa * s[(i, b)];
            }
        }
    }
    out
}

/// Sandwich product `B M B` for a symmetric bread `B`.
pub fn sandwich_product(bread: &Mat<f64>, meat: &Mat<f64>) -> Mat<f64> {
    let k = bread.nrows();
    let mut tmp = Mat::zeros(k, k);
    for i in 0..k {
        for j in 0..k {
            let mut sum = 0.0;
            for l in 0..k {
                sum += bread[(i, l)] * meat[(l, j)];
            }
            tmp[(i, j)] = sum;
        }
    }

    let mut out = Mat::zeros(k, k);
    for i in 0..k {
        for j in 0..k {
            let mut sum = 0.0;
            for l in 0..k {
                sum += tmp[(i, l)] * bread[(l, j)];
            }
            out[(i, j)] = sum;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_constant_columns() {
        let mut x = Mat::zeros(5, 3);
        for i in 0..5 {
            x[(i, 0)] = 1.0;
            x[(i, 1)] = i as f64;
            x[(i, 2)] = 2.0;
        }

        let constant = detect_constant_columns(&x, 1e-10);
        assert!(constant[0]);
        assert!(!constant[1]);
        assert!(constant[2]);
    }

    #[test]
    fn test_find_constant_column_ignores_other_constants() {
        let x = Mat::from_fn(4, 3, |i, j| match j {
            0 => 2.0,
            1 => i as f64,
            _ => 1.0,
        });
        assert_eq!(find_constant_column(&x), Some(2));
    }

    #[test]
    fn test_add_constant_append_and_prepend() {
        let x = Mat::from_fn(3, 2, |i, j| (i * 10 + j) as f64);

        let appended = add_constant(&x, false);
        assert_eq!(appended.ncols(), 3);
        for i in 0..3 {
            assert_eq!(appended[(i, 2)], 1.0);
            assert_eq!(appended[(i, 0)], x[(i, 0)]);
            assert_eq!(appended[(i, 1)], x[(i, 1)]);
        }

        let prepended = add_constant(&x, true);
        for i in 0..3 {
            assert_eq!(prepended[(i, 0)], 1.0);
            assert_eq!(prepended[(i, 1)], x[(i, 0)]);
            assert_eq!(prepended[(i, 2)], x[(i, 1)]);
        }
    }

    #[test]
    fn test_invert_symmetric() {
        let mut a = Mat::zeros(2, 2);
        a[(0, 0)] = 4.0;
        a[(0, 1)] = 1.0;
        a[(1, 0)] = 1.0;
        a[(1, 1)] = 3.0;

        let inv = invert_symmetric(&a, 1e-12).unwrap();
        // det = 11
        assert!((inv[(0, 0)] - 3.0 / 11.0).abs() < 1e-12);
        assert!((inv[(0, 1)] + 1.0 / 11.0).abs() < 1e-12);
        assert!((inv[(1, 1)] - 4.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_invert_singular_returns_none() {
        let a = Mat::from_fn(2, 2, |_, _| 1.0);
        assert!(invert_symmetric(&a, 1e-10).is_none());
    }

    #[test]
    fn test_sandwich_product_identity_meat() {
        let mut b = Mat::zeros(2, 2);
        b[(0, 0)] = 2.0;
        b[(1, 1)] = 3.0;
        b[(0, 1)] = 1.0;
        b[(1, 0)] = 1.0;
        let meat = Mat::from_fn(2, 2, |i, j| if i == j { 1.0 } else { 0.0 });

        let out = sandwich_product(&b, &meat);
        // B * B
        assert!((out[(0, 0)] - 5.0).abs() < 1e-12);
        assert!((out[(0, 1)] - 5.0).abs() < 1e-12);
        assert!((out[(1, 1)] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_outer_product_sum() {
        let s = Mat::from_fn(2, 2, |i, j| (i + j + 1) as f64);
        // rows: [1, 2], [2, 3]
        let m = outer_product_sum(&s);
        assert_eq!(m[(0, 0)], 5.0);
        assert_eq!(m[(0, 1)], 8.0);
        assert_eq!(m[(1, 1)], 13.0);
    }
}
