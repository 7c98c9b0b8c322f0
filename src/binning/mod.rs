//! Binning of the observational axes (log-wavelength ratio, angular separation, redshift).

pub mod axis;

pub use axis::*;
