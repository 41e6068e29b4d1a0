//! Bracketed root finding (Brent–Dekker).
//!
//! Combines bisection with secant and inverse quadratic interpolation. The
//! iterate always stays inside a sign-changing bracket, so convergence is
//! guaranteed for any continuous function with `f(a)·f(b) < 0`.

use serde::{Deserialize, Serialize};

use super::error::SolverError;

/// Tolerances for [`brent_root`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootOptions {
    /// Absolute tolerance on the root.
    pub xtol: f64,
    /// Relative tolerance on the root.
    pub rtol: f64,
    /// Maximum number of iterations.
    pub max_iter: usize,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            xtol: 2e-12,
            rtol: 4.0 * f64::EPSILON,
            max_iter: 100,
        }
    }
}

/// A converged root.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootResult {
    pub root: f64,
    pub iterations: usize,
    pub function_calls: usize,
}

/// Find a root of `f` in `[a, b]`.
///
/// `f(a)` and `f(b)` must have opposite signs (or one of them be zero).
pub fn brent_root<F>(mut f: F, a: f64, b: f64, opts: &RootOptions) -> Result<RootResult, SolverError>
where
    F: FnMut(f64) -> f64,
{
    if !a.is_finite() || !b.is_finite() {
        return Err(SolverError::InvalidInterval { lower: a, upper: b });
    }

    let mut xpre = a;
    let mut xcur = b;
    let mut fpre = f(xpre);
    let mut fcur = f(xcur);
    let mut calls = 2;

    if fpre.is_nan() {
        return Err(SolverError::NonFinite { x: xpre });
    }
    if fcur.is_nan() {
        return Err(SolverError::NonFinite { x: xcur });
    }
    if fpre == 0.0 {
        return Ok(RootResult {
            root: xpre,
            iterations: 0,
            function_calls: calls,
        });
    }
    if fcur == 0.0 {
        return Ok(RootResult {
            root: xcur,
            iterations: 0,
            function_calls: calls,
        });
    }
    if fpre.is_sign_negative() == fcur.is_sign_negative() {
        return Err(SolverError::NotBracketed {
            a,
            b,
            fa: fpre,
            fb: fcur,
        });
    }

    let mut xblk = 0.0;
    let mut fblk = 0.0;
    let mut spre = 0.0;
    let mut scur = 0.0;

    for iter in 0..opts.max_iter {
        if fpre != 0.0 && fcur != 0.0 && fpre.is_sign_negative() != fcur.is_sign_negative() {
            xblk = xpre;
            fblk = fpre;
            spre = xcur - xpre;
            scur = spre;
        }
        if fblk.abs() < fcur.abs() {
            xpre = xcur;
            xcur = xblk;
            xblk = xpre;

            fpre = fcur;
            fcur = fblk;
            fblk = fpre;
        }

        let delta = (opts.xtol + opts.rtol * xcur.abs()) / 2.0;
        let sbis = (xblk - xcur) / 2.0;
        if fcur == 0.0 || sbis.abs() < delta {
            return Ok(RootResult {
                root: xcur,
                iterations: iter,
                function_calls: calls,
            });
        }

        if spre.abs() > delta && fcur.abs() < fpre.abs() {
            let stry = if xpre == xblk {
                // secant
                -fcur * (xcur - xpre) / (fcur - fpre)
            } else {
                // inverse quadratic
                let dpre = (fpre - fcur) / (xpre - xcur);
                let dblk = (fblk - fcur) / (xblk - xcur);
                -fcur * (fblk * dblk - fpre * dpre) / (dblk * dpre * (fblk - fpre))
            };
            if 2.0 * stry.abs() < spre.abs().min(3.0 * sbis.abs() - delta) {
                spre = scur;
                scur = stry;
            } else {
                spre = sbis;
                scur = sbis;
            }
        } else {
            spre = sbis;
            scur = sbis;
        }

        xpre = xcur;
        fpre = fcur;
        if scur.abs() > delta {
            xcur += scur;
        } else if sbis > 0.0 {
            xcur += delta;
        } else {
            xcur -= delta;
        }

        fcur = f(xcur);
        calls += 1;
        if fcur.is_nan() {
            return Err(SolverError::NonFinite { x: xcur });
        }
    }

    Err(SolverError::MaxIterations {
        method: "brent_root",
        iterations: opts.max_iter,
    })
}
