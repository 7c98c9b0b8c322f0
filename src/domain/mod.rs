//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the model parameter catalogue (`ParamId`, `N_PARAMS`)
//! - contour plane selections (`ContourPair`)
//! - the resolved run configuration (`FitConfig`)

pub mod types;

pub use types::*;
