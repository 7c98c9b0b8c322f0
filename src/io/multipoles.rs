//! Tabulated correlation-function multipoles.
//!
//! A reference model `NAME` is stored as three tables, `NAME.0.dat`,
//! `NAME.2.dat` and `NAME.4.dat`, each with `r xi` in the first two
//! whitespace-separated columns. Lines starting with `#` and blank lines are
//! skipped; extra columns are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::AppError;
use crate::io::with_suffix;
use crate::math::CubicSpline;

const MULTIPOLE_ORDERS: [u32; 3] = [0, 2, 4];

/// Parse one `r xi` table.
pub fn read_table<R: BufRead>(reader: R, source: &str) -> Result<(Vec<f64>, Vec<f64>), AppError> {
    let mut r = Vec::new();
    let mut xi = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| AppError::io(format!("Unable to read {source}: {e}")))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut cols = trimmed.split_whitespace().map(|t| t.parse::<f64>().ok().filter(|v| v.is_finite()));
        match (cols.next().flatten(), cols.next().flatten()) {
            (Some(a), Some(b)) => {
                r.push(a);
                xi.push(b);
            }
            _ => {
                return Err(AppError::input(format!(
                    "Badly formatted line {} in {source}: '{line}'",
                    idx + 1
                )))
            }
        }
    }
    Ok((r, xi))
}

/// Splines through the ℓ = 0, 2, 4 tables of the model named `prefix`.
pub fn load_multipoles(prefix: &Path) -> Result<[CubicSpline; 3], AppError> {
    let load = |ell: u32| -> Result<CubicSpline, AppError> {
        let path = with_suffix(prefix, &format!(".{ell}.dat"));
        let source = path.display().to_string();
        let file = File::open(&path).map_err(|e| AppError::io(format!("Unable to open {source}: {e}")))?;
        let (r, xi) = read_table(BufReader::new(file), &source)?;
        tracing::debug!(points = r.len(), file = %source, "loaded multipole table");
        CubicSpline::new(r, xi).map_err(|e| AppError::new(e.kind(), format!("{source}: {e}")))
    };
    let [l0, l2, l4] = MULTIPOLE_ORDERS;
    Ok([load(l0)?, load(l2)?, load(l4)?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use approx::assert_relative_eq;
    use std::io::Cursor;

    #[test]
    fn skips_comments_and_blank_lines() {
        let text = "# r xi\n\n1.0 0.5 99\n  2.0   0.25\n# trailing\n3.0 0.125\n";
        let (r, xi) = read_table(Cursor::new(text), "t.dat").unwrap();
        assert_eq!(r, vec![1.0, 2.0, 3.0]);
        assert_eq!(xi, vec![0.5, 0.25, 0.125]);
    }

    #[test]
    fn rejects_short_rows() {
        let err = read_table(Cursor::new("1.0 0.5\n2.0\n"), "t.dat").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn loads_all_three_orders() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("ref");
        for (ell, scale) in [(0, 1.0), (2, 2.0), (4, 3.0)] {
            let body: String = (0..10).map(|i| format!("{} {}\n", i as f64 * 10.0, scale * i as f64)).collect();
            std::fs::write(with_suffix(&prefix, &format!(".{ell}.dat")), body).unwrap();
        }
        let [s0, s2, s4] = load_multipoles(&prefix).unwrap();
        assert_relative_eq!(s0.eval(45.0), 4.5, epsilon = 1e-9);
        assert_relative_eq!(s2.eval(45.0), 9.0, epsilon = 1e-9);
        assert_relative_eq!(s4.eval(45.0), 13.5, epsilon = 1e-9);
    }

    #[test]
    fn missing_table_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("ref");
        std::fs::write(with_suffix(&prefix, ".0.dat"), "0 0\n1 1\n2 2\n").unwrap();
        let err = load_multipoles(&prefix).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("ref.2.dat"));
    }
}
