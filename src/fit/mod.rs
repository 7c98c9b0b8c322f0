//! Likelihood and minimization.
//!
//! Responsibilities:
//!
//! - hold the fit parameters and the minimizer's initial state (`params`)
//! - evaluate chi-square over the dataset within the r window (`likelihood`)
//! - minimize, run MINOS-style interval scans and trace contours (`engine`)

pub mod engine;
pub mod likelihood;
pub mod params;

pub use engine::*;
pub use likelihood::*;
pub use params::*;
