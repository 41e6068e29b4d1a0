//! Evenly spaced grids.

/// Slack when counting steps in [`arange`], so `(stop - start) / step`
/// landing a few ulps above an integer does not add a point.
const COUNT_SLACK: f64 = 1e-9;

/// `n` evenly spaced points from `start` to `stop`, both included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            out[n - 1] = stop;
            out
        }
    }
}

/// Points `start + i·step` in the half-open interval `[start, stop)`.
///
/// Each point is computed from its index, so there is no accumulated drift.
/// Returns an empty vector for a non-positive or non-finite step.
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if !(step.is_finite() && step > 0.0) || !(stop > start) {
        return Vec::new();
    }
    let count = ((stop - start) / step - COUNT_SLACK).ceil().max(0.0) as usize;
    (0..count).map(|i| start + i as f64 * step).collect()
}
