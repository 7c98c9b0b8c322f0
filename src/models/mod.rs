//! Correlation-function model used by the fit.

pub mod model;

pub use model::*;
