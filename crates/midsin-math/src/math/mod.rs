//! Core math modules.

pub mod stable;
pub mod binomial;
pub mod error;
pub mod grid;
pub mod interp;
pub mod minimize;
pub mod quadrature;
pub mod roots;
