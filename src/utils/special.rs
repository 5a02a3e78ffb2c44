//! Special functions not provided by `statrs`.

/// Trigamma function ψ′(x) for x > 0.
///
/// Shifts the argument above 10 with the recurrence ψ′(x) = ψ′(x+1) + 1/x²,
/// then evaluates the asymptotic expansion.
pub fn trigamma(x: f64) -> f64 {
    if x <= 0.0 || !x.is_finite() {
        return f64::NAN;
    }

    let mut x = x;
    let mut acc = 0.0;
    while x < 10.0 {
        acc += 1.0 / (x * x);
        x += 1.0;
    }

    let f = 1.0 / (x * x);
    let series = 1.0 / x
        + f / 2.0
        + f / x * (1.0 / 6.0 - f * (1.0 / 30.0 - f * (1.0 / 42.0 - f * (1.0 / 30.0 - f * 5.0 / 66.0))));

    acc + series
}
