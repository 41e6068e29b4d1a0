//! Quadrature over tabulated values.

/// Trapezoid rule with unit spacing.
///
/// Returns 0 for fewer than two samples.
pub fn trapz(ys: &[f64]) -> f64 {
    if ys.len() < 2 {
        return 0.0;
    }
    let inner: f64 = ys[1..ys.len() - 1].iter().sum();
    inner + 0.5 * (ys[0] + ys[ys.len() - 1])
}

/// Running right-rectangle integral, starting at 0.
///
/// `out[0] = 0`, `out[j] = out[j-1] + ys[j] * (xs[j] - xs[j-1])`. The output
/// has the same length as the inputs.
pub fn cumulative_right_rect(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len().min(ys.len());
    let mut out = Vec::with_capacity(n);
    if n == 0 {
        return out;
    }
    let mut acc = 0.0;
    out.push(acc);
    for j in 1..n {
        acc += ys[j] * (xs[j] - xs[j - 1]);
        out.push(acc);
    }
    out
}
