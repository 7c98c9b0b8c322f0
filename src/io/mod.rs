//! Input/output helpers.
//!
//! - `.params` / `.cov` ingest into a dataset (`ingest`)
//! - multipole tables for the reference models (`multipoles`)
//! - the plain-text fit dump and its reader (`dump`)
//! - JSON fit summary (`summary`)

use std::path::{Path, PathBuf};

pub mod dump;
pub mod ingest;
pub mod multipoles;
pub mod summary;

pub use dump::*;
pub use ingest::*;
pub use multipoles::*;
pub use summary::*;

/// `prefix` with `suffix` appended verbatim, so `data/run1` + `.cov` gives
/// `data/run1.cov` even when the prefix already contains a dot.
pub fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut s = prefix.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}
