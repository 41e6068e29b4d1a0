//! Derivative-free scalar minimization.
//!
//! - [`bracket_minimum`]: downhill search for a triple `a < b < c` (or
//!   `a > b > c`) with `f(b)` below both ends.
//! - [`brent_minimize`]: unconstrained minimization; brackets first, then
//!   refines with Brent's parabolic/golden-section method.
//! - [`bounded_minimize`]: Brent's method restricted to a closed interval.
//!
//! Every routine reports non-convergence as [`SolverError::MaxIterations`]
//! instead of returning a best-effort value.

use serde::{Deserialize, Serialize};

use super::error::SolverError;

const GOLD: f64 = 1.618_034;
const VERY_SMALL: f64 = 1e-21;
const CGOLD: f64 = 0.381_966_0;
const MIN_TOL: f64 = 1.0e-11;

/// Options for [`brent_minimize`] and [`bracket_minimum`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrentOptions {
    /// Relative tolerance on the minimizer.
    pub tol: f64,
    /// Maximum number of Brent iterations.
    pub max_iter: usize,
    /// Maximum parabolic step growth while bracketing.
    pub grow_limit: f64,
    /// Maximum number of bracketing steps.
    pub max_bracket_iter: usize,
}

impl Default for BrentOptions {
    fn default() -> Self {
        Self {
            tol: 1.48e-8,
            max_iter: 500,
            grow_limit: 110.0,
            max_bracket_iter: 1000,
        }
    }
}

/// Options for [`bounded_minimize`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundedOptions {
    /// Absolute tolerance on the minimizer.
    pub xatol: f64,
    /// Maximum number of objective evaluations.
    pub max_evaluations: usize,
}

impl Default for BoundedOptions {
    fn default() -> Self {
        Self {
            xatol: 1e-5,
            max_evaluations: 500,
        }
    }
}

/// A bracketing triple for a minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub xa: f64,
    pub xb: f64,
    pub xc: f64,
    pub fa: f64,
    pub fb: f64,
    pub fc: f64,
    pub function_calls: usize,
}

/// A converged minimum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinimizeResult {
    pub x: f64,
    pub fun: f64,
    pub iterations: usize,
    pub function_calls: usize,
}

/// NaN compares false against everything, which would stall the searches.
fn eval<F: FnMut(f64) -> f64>(f: &mut F, x: f64) -> f64 {
    let v = f(x);
    if v.is_nan() {
        f64::INFINITY
    } else {
        v
    }
}

/// Search downhill from `xa`, `xb` until a minimum is bracketed.
pub fn bracket_minimum<F>(
    mut f: F,
    xa: f64,
    xb: f64,
    opts: &BrentOptions,
) -> Result<Bracket, SolverError>
where
    F: FnMut(f64) -> f64,
{
    let (start_a, start_b) = (xa, xb);
    let mut xa = xa;
    let mut xb = xb;
    let mut fa = eval(&mut f, xa);
    let mut fb = eval(&mut f, xb);
    if fa < fb {
        std::mem::swap(&mut xa, &mut xb);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut xc = xb + GOLD * (xb - xa);
    let mut fc = eval(&mut f, xc);
    let mut calls = 3;
    let mut iter = 0;

    while fc < fb {
        let tmp1 = (xb - xa) * (fb - fc);
        let tmp2 = (xb - xc) * (fb - fa);
        let val = tmp2 - tmp1;
        let denom = if val.abs() < VERY_SMALL {
            2.0 * VERY_SMALL
        } else {
            2.0 * val
        };
        let mut w = xb - ((xb - xc) * tmp2 - (xb - xa) * tmp1) / denom;
        let wlim = xb + opts.grow_limit * (xc - xb);
        if iter > opts.max_bracket_iter {
            return Err(SolverError::MaxIterations {
                method: "bracket_minimum",
                iterations: iter,
            });
        }
        iter += 1;

        let mut fw;
        if (w - xc) * (xb - w) > 0.0 {
            // parabolic step between b and c
            fw = eval(&mut f, w);
            calls += 1;
            if fw < fc {
                xa = xb;
                xb = w;
                fa = fb;
                fb = fw;
                break;
            } else if fw > fb {
                xc = w;
                fc = fw;
                break;
            }
            w = xc + GOLD * (xc - xb);
            fw = eval(&mut f, w);
            calls += 1;
        } else if (w - wlim) * (wlim - xc) >= 0.0 {
            w = wlim;
            fw = eval(&mut f, w);
            calls += 1;
        } else if (w - wlim) * (xc - w) > 0.0 {
            fw = eval(&mut f, w);
            calls += 1;
            if fw < fc {
                xb = xc;
                xc = w;
                w = xc + GOLD * (xc - xb);
                fb = fc;
                fc = fw;
                fw = eval(&mut f, w);
                calls += 1;
            }
        } else {
            w = xc + GOLD * (xc - xb);
            fw = eval(&mut f, w);
            calls += 1;
        }
        xa = xb;
        xb = xc;
        xc = w;
        fa = fb;
        fb = fc;
        fc = fw;
    }

    let interior = (xa < xb && xb < xc) || (xc < xb && xb < xa);
    if !fb.is_finite() || !interior || fb > fa || fb > fc {
        return Err(SolverError::NoMinimumBracket {
            xa: start_a,
            xb: start_b,
        });
    }

    Ok(Bracket {
        xa,
        xb,
        xc,
        fa,
        fb,
        fc,
        function_calls: calls,
    })
}

/// Minimize `f` without bounds, starting the bracket search at `xa`, `xb`.
pub fn brent_minimize<F>(
    mut f: F,
    xa: f64,
    xb: f64,
    opts: &BrentOptions,
) -> Result<MinimizeResult, SolverError>
where
    F: FnMut(f64) -> f64,
{
    let bracket = bracket_minimum(&mut f, xa, xb, opts)?;
    let mut calls = bracket.function_calls;

    let mut x = bracket.xb;
    let mut w = x;
    let mut v = x;
    let mut fx = bracket.fb;
    let mut fw = fx;
    let mut fv = fx;
    let (mut a, mut b) = if bracket.xa < bracket.xc {
        (bracket.xa, bracket.xc)
    } else {
        (bracket.xc, bracket.xa)
    };
    let mut deltax: f64 = 0.0;
    let mut rat: f64 = 0.0;

    for iter in 0..opts.max_iter {
        let tol1 = opts.tol * x.abs() + MIN_TOL;
        let tol2 = 2.0 * tol1;
        let xmid = 0.5 * (a + b);
        if (x - xmid).abs() < (tol2 - 0.5 * (b - a)) {
            return Ok(MinimizeResult {
                x,
                fun: fx,
                iterations: iter,
                function_calls: calls,
            });
        }

        if deltax.abs() <= tol1 {
            deltax = if x >= xmid { a - x } else { b - x };
            rat = CGOLD * deltax;
        } else {
            let tmp1 = (x - w) * (fx - fv);
            let mut tmp2 = (x - v) * (fx - fw);
            let mut p = (x - v) * tmp2 - (x - w) * tmp1;
            tmp2 = 2.0 * (tmp2 - tmp1);
            if tmp2 > 0.0 {
                p = -p;
            }
            tmp2 = tmp2.abs();
            let dx_temp = deltax;
            deltax = rat;
            if p > tmp2 * (a - x) && p < tmp2 * (b - x) && p.abs() < (0.5 * tmp2 * dx_temp).abs() {
                rat = p / tmp2;
                let u = x + rat;
                if (u - a) < tol2 || (b - u) < tol2 {
                    rat = if xmid - x >= 0.0 { tol1 } else { -tol1 };
                }
            } else {
                deltax = if x >= xmid { a - x } else { b - x };
                rat = CGOLD * deltax;
            }
        }

        let u = if rat.abs() < tol1 {
            if rat >= 0.0 {
                x + tol1
            } else {
                x - tol1
            }
        } else {
            x + rat
        };
        let fu = eval(&mut f, u);
        calls += 1;

        if fu > fx {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                w = u;
                fv = fw;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        } else {
            if u >= x {
                a = x;
            } else {
                b = x;
            }
            v = w;
            w = x;
            x = u;
            fv = fw;
            fw = fx;
            fx = fu;
        }
    }

    Err(SolverError::MaxIterations {
        method: "brent_minimize",
        iterations: opts.max_iter,
    })
}

/// Minimize `f` over the closed interval `[lower, upper]`.
pub fn bounded_minimize<F>(
    mut f: F,
    lower: f64,
    upper: f64,
    opts: &BoundedOptions,
) -> Result<MinimizeResult, SolverError>
where
    F: FnMut(f64) -> f64,
{
    if !lower.is_finite() || !upper.is_finite() || lower > upper {
        return Err(SolverError::InvalidInterval { lower, upper });
    }

    let sqrt_eps = f64::EPSILON.sqrt();
    let golden_mean = 0.5 * (3.0 - 5.0f64.sqrt());

    let mut a = lower;
    let mut b = upper;
    let mut fulc = a + golden_mean * (b - a);
    let mut nfc = fulc;
    let mut xf = fulc;
    let mut rat: f64 = 0.0;
    let mut e: f64 = 0.0;
    let mut fx = eval(&mut f, xf);
    let mut calls = 1;
    let mut ffulc = fx;
    let mut fnfc = fx;
    let mut xm = 0.5 * (a + b);
    let mut tol1 = sqrt_eps * xf.abs() + opts.xatol / 3.0;
    let mut tol2 = 2.0 * tol1;
    let mut iterations = 0;

    while (xf - xm).abs() > (tol2 - 0.5 * (b - a)) {
        let mut golden = true;

        if e.abs() > tol1 {
            golden = false;
            let mut r = (xf - nfc) * (fx - ffulc);
            let mut q = (xf - fulc) * (fx - fnfc);
            let mut p = (xf - fulc) * q - (xf - nfc) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            r = e;
            e = rat;

            if p.abs() < (0.5 * q * r).abs() && p > q * (a - xf) && p < q * (b - xf) {
                rat = p / q;
                let x = xf + rat;
                if (x - a) < tol2 || (b - x) < tol2 {
                    rat = tol1 * sign_or_one(xm - xf);
                }
            } else {
                golden = true;
            }
        }

        if golden {
            e = if xf >= xm { a - xf } else { b - xf };
            rat = golden_mean * e;
        }

        let x = xf + sign_or_one(rat) * rat.abs().max(tol1);
        let fu = eval(&mut f, x);
        calls += 1;
        iterations += 1;

        if fu <= fx {
            if x >= xf {
                a = xf;
            } else {
                b = xf;
            }
            fulc = nfc;
            ffulc = fnfc;
            nfc = xf;
            fnfc = fx;
            xf = x;
            fx = fu;
        } else {
            if x < xf {
                a = x;
            } else {
                b = x;
            }
            if fu <= fnfc || nfc == xf {
                fulc = nfc;
                ffulc = fnfc;
                nfc = x;
                fnfc = fu;
            } else if fu <= ffulc || fulc == xf || fulc == nfc {
                fulc = x;
                ffulc = fu;
            }
        }

        xm = 0.5 * (a + b);
        tol1 = sqrt_eps * xf.abs() + opts.xatol / 3.0;
        tol2 = 2.0 * tol1;

        if calls >= opts.max_evaluations {
            return Err(SolverError::MaxIterations {
                method: "bounded_minimize",
                iterations,
            });
        }
    }

    Ok(MinimizeResult {
        x: xf,
        fun: fx,
        iterations,
        function_calls: calls,
    })
}

/// sign(x), with zero mapped to +1.
fn sign_or_one(x: f64) -> f64 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}
