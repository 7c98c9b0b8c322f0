//! `baofit` library crate.
//!
//! The binary (`baofit`) is a thin wrapper around this library so that:
//!
//! - the likelihood and minimizer are testable without spawning processes
//! - the dataset, cosmology and model layers can be driven from other tools

pub mod app;
pub mod binning;
pub mod cli;
pub mod cosmo;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
