//! Numerical primitives for endpoint-dilution estimation.

pub mod math;

pub use math::stable::*;
pub use math::binomial;
pub use math::error::SolverError;
pub use math::grid::{arange, linspace};
pub use math::interp::{InterpError, MonotoneInterp};
pub use math::minimize::{
    bounded_minimize, bracket_minimum, brent_minimize, BoundedOptions, Bracket, BrentOptions,
    MinimizeResult,
};
pub use math::quadrature::{cumulative_right_rect, trapz};
pub use math::roots::{brent_root, RootOptions, RootResult};
