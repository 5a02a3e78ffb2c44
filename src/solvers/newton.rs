//! Damped Newton-Raphson maximizer shared by the maximum likelihood solvers.
//!
//! Each iteration takes the Newton direction `-H⁻¹g` and halves the step
//! until the log-likelihood does not decrease. When the Hessian is not
//! negative definite the direction falls back to steepest ascent.

use crate::utils::{invert_symmetric, mat_vec};
use faer::Mat;

const MAX_HALVINGS: usize = 40;

/// Final state of a Newton run.
#[derive(Debug, Clone)]
pub(crate) struct NewtonOutcome {
    pub params: Vec<f64>,
    pub loglike: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Maximize a log-likelihood with damped Newton-Raphson.
///
/// `loglike` evaluates the objective; `derivatives` returns the gradient and
/// Hessian. Convergence is declared when the largest Newton step component
/// falls below `tolerance`.
pub(crate) fn maximize<L, D>(
    start: Vec<f64>,
    max_iterations: usize,
    tolerance: f64,
    rank_tolerance: f64,
    loglike: L,
    derivatives: D,
) -> NewtonOutcome
where
    L: Fn(&[f64]) -> f64,
    D: Fn(&[f64]) -> (Vec<f64>, Mat<f64>),
{
    let mut params = start;
    let mut current = loglike(&params);

    for iter in 1..=max_iterations {
        let (grad, hess) = derivatives(&params);
        let direction = ascent_direction(&grad, &hess, rank_tolerance);

        let max_step = direction.iter().fold(0.0_f64, |m, d| m.max(d.abs()));
        if !max_step.is_finite() {
            log::warn!("newton: non-finite step at iteration {iter}");
            break;
        }
        if max_step < tolerance {
            for (p, d) in params.iter_mut().zip(direction.iter()) {
                *p += d;
            }
            let value = loglike(&params);
            log::debug!("newton: converged after {iter} iterations, loglike {value:.10}");
            return NewtonOutcome {
                params,
                loglike: value,
                iterations: iter,
                converged: true,
            };
        }

        let mut step = 1.0;
        let mut accepted = false;
        for _ in 0..MAX_HALVINGS {
            let candidate: Vec<f64> = params
                .iter()
                .zip(direction.iter())
                .map(|(p, d)| p + step * d)
                .collect();
            let value = loglike(&candidate);
            if value.is_finite() && value >= current - 1e-12 * current.abs().max(1.0) {
                params = candidate;
                current = value;
                accepted = true;
                break;
            }
            step *= 0.5;
        }

        if !accepted {
            log::warn!("newton: step halving failed at iteration {iter}");
            return NewtonOutcome {
                params,
                loglike: current,
                iterations: iter,
                converged: false,
            };
        }
    }

    NewtonOutcome {
        params,
        loglike: current,
        iterations: max_iterations,
        converged: false,
    }
}

/// Newton direction `-H⁻¹g`, or the gradient if that is not an ascent direction.
fn ascent_direction(grad: &[f64], hess: &Mat<f64>, rank_tolerance: f64) -> Vec<f64> {
    if let Some(h_inv) = invert_symmetric(hess, rank_tolerance) {
        let newton: Vec<f64> = mat_vec(&h_inv, grad).into_iter().map(|v| -v).collect();
        let slope: f64 = newton.iter().zip(grad.iter()).map(|(d, g)| d * g).sum();
        if slope > 0.0 {
            return newton;
        }
    }

    let norm = grad.iter().map(|g| g * g).sum::<f64>().sqrt();
    log::debug!("newton: hessian not negative definite, using gradient step");
    grad.iter().map(|g| g / norm.max(1.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maximize_concave_quadratic() {
        // ℓ(a, b) = -(a - 1)² - 2(b + 3)²
        let loglike = |p: &[f64]| -(p[0] - 1.0).powi(2) - 2.0 * (p[1] + 3.0).powi(2);
        let derivatives = |p: &[f64]| {
            let grad = vec![-2.0 * (p[0] - 1.0), -4.0 * (p[1] + 3.0)];
            let hess = Mat::from_fn(2, 2, |i, j| match (i, j) {
                (0, 0) => -2.0,
                (1, 1) => -4.0,
                _ => 0.0,
            });
            (grad, hess)
        };

        let out = maximize(vec![10.0, 10.0], 50, 1e-12, 1e-12, loglike, derivatives);
        assert!(out.converged);
        assert!((out.params[0] - 1.0).abs() < 1e-10);
        assert!((out.params[1] + 3.0).abs() < 1e-10);
        assert!(out.iterations <= 3);
    }

    #[test]
    fn test_maximize_one_dimensional_log_likelihood() {
        // Poisson rate: ℓ(c) = 7c - 4e^c, maximized at c = ln(7/4)
        let loglike = |p: &[f64]| 7.0 * p[0] - 4.0 * p[0].exp();
        let derivatives = |p: &[f64]| {
            let grad = vec![7.0 - 4.0 * p[0].exp()];
            let hess = Mat::from_fn(1, 1, |_, _| -4.0 * p[0].exp());
            (grad, hess)
        };

        let out = maximize(vec![5.0], 100, 1e-12, 1e-12, loglike, derivatives);
        assert!(out.converged);
        assert!((out.params[0] - (7.0_f64 / 4.0).ln()).abs() < 1e-10);
    }

    #[test]
    fn test_reports_non_convergence() {
        let loglike = |p: &[f64]| -(p[0] - 1.0).powi(2);
        let derivatives = |p: &[f64]| (vec![-2.0 * (p[0] - 1.0)], Mat::from_fn(1, 1, |_, _| -2.0));

        let out = maximize(vec![100.0], 1, 1e-12, 1e-12, loglike, derivatives);
        assert!(!out.converged);
        assert_eq!(out.iterations, 1);
    }
}
