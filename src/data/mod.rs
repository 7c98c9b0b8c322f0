//! Binned measurements and their mapping onto physical coordinates.

pub mod dataset;
pub mod transform;

pub use dataset::*;
pub use transform::*;
