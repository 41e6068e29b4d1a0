//! Piecewise-linear interpolation over a non-decreasing abscissa.
//!
//! Used to invert a tabulated CDF: the abscissa is the CDF, the ordinate the
//! grid. Flat stretches of the CDF (repeated abscissa values) resolve to the
//! first tabulated point at or above the query.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpError {
    #[error("interpolation needs at least 2 points, got {0}")]
    TooFewPoints(usize),

    #[error("abscissa and ordinate lengths differ ({xs} vs {ys})")]
    LengthMismatch { xs: usize, ys: usize },

    #[error("abscissa is not finite at index {0}")]
    NonFinite(usize),

    #[error("abscissa decreases at index {0}")]
    NotMonotone(usize),
}

/// Linear interpolant returning `fill` outside `[xs[0], xs[last]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MonotoneInterp {
    xs: Vec<f64>,
    ys: Vec<f64>,
    fill: f64,
}

impl MonotoneInterp {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>, fill: f64) -> Result<Self, InterpError> {
        if xs.len() != ys.len() {
            return Err(InterpError::LengthMismatch {
                xs: xs.len(),
                ys: ys.len(),
            });
        }
        if xs.len() < 2 {
            return Err(InterpError::TooFewPoints(xs.len()));
        }
        if let Some(i) = xs.iter().position(|x| !x.is_finite()) {
            return Err(InterpError::NonFinite(i));
        }
        if let Some(i) = xs.windows(2).position(|w| w[1] < w[0]) {
            return Err(InterpError::NotMonotone(i + 1));
        }
        Ok(Self { xs, ys, fill })
    }

    pub fn lower(&self) -> f64 {
        self.xs[0]
    }

    pub fn upper(&self) -> f64 {
        self.xs[self.xs.len() - 1]
    }

    pub fn eval(&self, t: f64) -> f64 {
        if t.is_nan() || t < self.lower() || t > self.upper() {
            return self.fill;
        }
        let j = self.xs.partition_point(|&x| x < t);
        if j == 0 {
            return self.ys[0];
        }
        let (x0, x1) = (self.xs[j - 1], self.xs[j]);
        let (y0, y1) = (self.ys[j - 1], self.ys[j]);
        if x1 == x0 {
            return y1;
        }
        y0 + (t - x0) * (y1 - y0) / (x1 - x0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_linearly() {
        let f = MonotoneInterp::new(vec![0.0, 0.5, 1.0], vec![10.0, 20.0, 40.0], 0.0).unwrap();
        assert_eq!(f.eval(0.0), 10.0);
        assert_eq!(f.eval(0.25), 15.0);
        assert_eq!(f.eval(0.75), 30.0);
        assert_eq!(f.eval(1.0), 40.0);
    }

    #[test]
    fn outside_range_is_fill() {
        let f = MonotoneInterp::new(vec![0.0, 1.0], vec![3.0, 4.0], -7.0).unwrap();
        assert_eq!(f.eval(-1e-9), -7.0);
        assert_eq!(f.eval(1.0 + 1e-9), -7.0);
        assert_eq!(f.eval(f64::NAN), -7.0);
    }

    #[test]
    fn plateau_resolves_to_first_point_at_or_above() {
        // A CDF that stays at zero over the first few grid points.
        let f = MonotoneInterp::new(
            vec![0.0, 0.0, 0.0, 0.5, 1.0],
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            0.0,
        )
        .unwrap();
        assert_eq!(f.eval(0.0), 1.0);
        assert!((f.eval(0.25) - 3.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_tables() {
        assert_eq!(
            MonotoneInterp::new(vec![0.0], vec![1.0], 0.0).unwrap_err(),
            InterpError::TooFewPoints(1)
        );
        assert!(matches!(
            MonotoneInterp::new(vec![0.0, 1.0], vec![1.0], 0.0).unwrap_err(),
            InterpError::LengthMismatch { .. }
        ));
        assert_eq!(
            MonotoneInterp::new(vec![0.0, 1.0, 0.5], vec![1.0, 2.0, 3.0], 0.0).unwrap_err(),
            InterpError::NotMonotone(2)
        );
        assert_eq!(
            MonotoneInterp::new(vec![0.0, f64::NAN], vec![1.0, 2.0], 0.0).unwrap_err(),
            InterpError::NonFinite(1)
        );
    }
}
