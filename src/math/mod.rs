//! Numerical utilities: packed symmetric matrices, spline interpolation and quadrature.

pub mod packed;
pub mod quad;
pub mod spline;

pub use packed::*;
pub use quad::*;
pub use spline::*;
