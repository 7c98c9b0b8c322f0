//! Cosmological collaborators: background distances and redshift-space
//! correlation functions.

pub mod rsd;
pub mod universe;

pub use rsd::*;
pub use universe::*;
