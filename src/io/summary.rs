//! JSON export of the fit summary.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::AppError;
use crate::report::FitSummary;

pub fn write_summary_json(path: &Path, summary: &FitSummary) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, summary)
        .map_err(|e| AppError::io(format!("Failed to write summary JSON '{}': {e}", path.display())))?;
    out.flush()
        .map_err(|e| AppError::io(format!("Failed to write summary JSON '{}': {e}", path.display())))
}
