//! Text ingest of binned correlation data and its covariance.
//!
//! Two files share a prefix:
//!
//! - `<prefix>.params`: one observed bin per line, either as written by the
//!   upstream estimator, `value secondary | Lya covariance 3D (ll,sep,z)`, or
//!   as five plain numbers `value secondary ll sep z`. The secondary value is
//!   read and ignored.
//! - `<prefix>.cov`: `i j value` with zero-based observation indices.
//!
//! Any malformed line aborts the load with its 1-based line number. Blank
//! lines are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use crate::binning::Binning;
use crate::cosmo::Cosmology;
use crate::data::Dataset;
use crate::domain::FitConfig;
use crate::error::AppError;
use crate::io::with_suffix;
use crate::math::packed_len;

const PARAMS_TAG: &str = "Lya covariance 3D";

/// One parsed `.params` line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamsRecord {
    pub value: f64,
    pub secondary: f64,
    pub ll: f64,
    pub sep: f64,
    pub z: f64,
}

/// One parsed `.cov` line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CovRecord {
    pub i: usize,
    pub j: usize,
    pub value: f64,
}

pub fn parse_params_line(line: &str) -> Option<ParamsRecord> {
    let numbers: Vec<f64> = match line.split_once('|') {
        Some((head, tail)) => {
            let coords = tail
                .trim()
                .strip_prefix(PARAMS_TAG)?
                .trim_start()
                .strip_prefix('(')?
                .strip_suffix(')')?;
            let head: Vec<&str> = head.split_whitespace().collect();
            let coords: Vec<&str> = coords.split(',').map(str::trim).collect();
            if head.len() != 2 || coords.len() != 3 {
                return None;
            }
            head.iter()
                .chain(coords.iter())
                .map(|t| parse_finite(t))
                .collect::<Option<_>>()?
        }
        None => line.split_whitespace().map(parse_finite).collect::<Option<_>>()?,
    };
    match numbers[..] {
        [value, secondary, ll, sep, z] => Some(ParamsRecord {
            value,
            secondary,
            ll,
            sep,
            z,
        }),
        _ => None,
    }
}

pub fn parse_cov_line(line: &str) -> Option<CovRecord> {
    let mut tokens = line.split_whitespace();
    let i = tokens.next()?.parse().ok()?;
    let j = tokens.next()?.parse().ok()?;
    let value = parse_finite(tokens.next()?)?;
    if tokens.next().is_some() {
        return None;
    }
    Some(CovRecord { i, j, value })
}

fn parse_finite(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Add every `.params` record to `dataset`. Returns the number of records.
pub fn read_params<R: BufRead>(reader: R, source: &str, dataset: &mut Dataset) -> Result<usize, AppError> {
    let mut count = 0;
    for_each_line(reader, source, |line_no, line| {
        let rec = parse_params_line(line).ok_or_else(|| {
            AppError::input(format!("Badly formatted params line {line_no} in {source}: '{line}'"))
        })?;
        dataset
            .add_data(rec.value, rec.ll, rec.sep, rec.z)
            .map_err(|e| AppError::new(e.kind(), format!("{source} line {line_no}: {e}")))?;
        count += 1;
        Ok(())
    })?;
    Ok(count)
}

/// Add every `.cov` record to `dataset`. Returns the number of records.
pub fn read_covariance<R: BufRead>(reader: R, source: &str, dataset: &mut Dataset) -> Result<usize, AppError> {
    let mut count = 0;
    for_each_line(reader, source, |line_no, line| {
        let rec = parse_cov_line(line).ok_or_else(|| {
            AppError::input(format!("Badly formatted cov line {line_no} in {source}: '{line}'"))
        })?;
        dataset
            .add_covariance(rec.i, rec.j, rec.value)
            .map_err(|e| AppError::new(e.kind(), format!("{source} line {line_no}: {e}")))?;
        count += 1;
        Ok(())
    })?;
    Ok(count)
}

fn for_each_line<R, F>(reader: R, source: &str, mut f: F) -> Result<(), AppError>
where
    R: BufRead,
    F: FnMut(usize, &str) -> Result<(), AppError>,
{
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| AppError::io(format!("Unable to read line {} of {source}: {e}", idx + 1)))?;
        if line.trim().is_empty() {
            continue;
        }
        f(idx + 1, &line)?;
    }
    Ok(())
}

/// The (ll, sep, z) binnings described by the configuration. A non-zero
/// `dll2` selects two-step log-lambda binning with breakpoint `minll`.
pub fn build_binnings(config: &FitConfig) -> Result<(Binning, Binning, Binning), AppError> {
    let ll = &config.ll_axis;
    let ll_binning = if config.dll2 == 0.0 {
        Binning::uniform(ll.n_bins, ll.min, ll.step)?
    } else {
        Binning::two_step(ll.n_bins, ll.min, ll.step, config.dll2)?
    };
    let sep = &config.sep_axis;
    let z = &config.z_axis;
    Ok((
        ll_binning,
        Binning::uniform(sep.n_bins, sep.min, sep.step)?,
        Binning::uniform(z.n_bins, z.min, z.step)?,
    ))
}

fn open(path: &Path) -> Result<BufReader<File>, AppError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| AppError::io(format!("Unable to open {}: {e}", path.display())))
}

/// Read `<data>.params` and `<data>.cov` into a finalized dataset.
pub fn load_dataset(config: &FitConfig, cosmology: Arc<dyn Cosmology>) -> Result<Dataset, AppError> {
    let (ll, sep, z) = build_binnings(config)?;
    let mut dataset = Dataset::new(ll, sep, z, cosmology);

    let params_path = with_suffix(&config.data, ".params");
    let source = params_path.display().to_string();
    read_params(open(&params_path)?, &source, &mut dataset)?;
    dataset.finalize_data()?;
    tracing::info!(
        "Read {} of {} data values from {source}",
        dataset.n_data(),
        dataset.n_bins_total()
    );

    let cov_path = with_suffix(&config.data, ".cov");
    let source = cov_path.display().to_string();
    read_covariance(open(&cov_path)?, &source, &mut dataset)?;
    dataset.finalize_covariance()?;
    tracing::info!(
        "Read {} of {} covariance values from {source}",
        dataset.n_covariance_entries(),
        packed_len(dataset.n_data())
    );

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::transform::tests::LinearUniverse;
    use crate::domain::AxisSpec;
    use crate::error::ErrorKind;
    use std::io::Cursor;

    fn small_dataset() -> Dataset {
        Dataset::new(
            Binning::uniform(2, 0.0, 0.004).unwrap(),
            Binning::uniform(3, 0.0, 10.0).unwrap(),
            Binning::uniform(1, 1.7, 1.0).unwrap(),
            Arc::new(LinearUniverse),
        )
    }

    #[test]
    fn parses_estimator_params_lines() {
        let rec = parse_params_line("  -1.5e-3 0.25 | Lya covariance 3D (0.002,15,2.2)").unwrap();
        assert_eq!(rec.value, -1.5e-3);
        assert_eq!(rec.secondary, 0.25);
        assert_eq!((rec.ll, rec.sep, rec.z), (0.002, 15.0, 2.2));

        let plain = parse_params_line("0.1 0 0.006 25 2.2").unwrap();
        assert_eq!(plain.sep, 25.0);

        assert!(parse_params_line("0.1 | Lya covariance 3D (0.002,15,2.2)").is_none());
        assert!(parse_params_line("0.1 0 | Lya covariance 2D (0.002,15,2.2)").is_none());
        assert!(parse_params_line("0.1 0 | Lya covariance 3D (0.002,15)").is_none());
        assert!(parse_params_line("0.1 0 0.006 25").is_none());
        assert!(parse_params_line("0.1 nan 0.006 25 2.2").is_none());
    }

    #[test]
    fn parses_cov_lines() {
        assert_eq!(
            parse_cov_line("3 12 -4.5e-2"),
            Some(CovRecord { i: 3, j: 12, value: -4.5e-2 })
        );
        assert!(parse_cov_line("-1 2 0.5").is_none());
        assert!(parse_cov_line("1.5 2 0.5").is_none());
        assert!(parse_cov_line("1 2").is_none());
        assert!(parse_cov_line("1 2 3 4").is_none());
    }

    #[test]
    fn reads_both_files_into_a_dataset() {
        let mut ds = small_dataset();
        let params = "1.0 0 | Lya covariance 3D (0.002,5,2.2)\n\n0.5 0 0.006 25 2.2\n";
        assert_eq!(read_params(Cursor::new(params), "test.params", &mut ds).unwrap(), 2);
        ds.finalize_data().unwrap();
        let cov = "0 0 1.0\n1 1 2.0\n1 0 0.1\n";
        assert_eq!(read_covariance(Cursor::new(cov), "test.cov", &mut ds).unwrap(), 3);
        ds.finalize_covariance().unwrap();
        assert_eq!(ds.observation(1).index, 5);
        assert_eq!(ds.n_covariance_entries(), 3);
    }

    #[test]
    fn malformed_lines_report_their_number() {
        let mut ds = small_dataset();
        let params = "1.0 0 0.002 5 2.2\n1.0 0 0.002 x 2.2\n";
        let err = read_params(Cursor::new(params), "test.params", &mut ds).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        let msg = err.to_string();
        assert!(msg.contains("line 2") && msg.contains("0.002 x 2.2"), "{msg}");

        let mut ds = small_dataset();
        let params = "1.0 0 0.002 5 2.2\n2.0 0 0.002 5 2.2\n";
        let err = read_params(Cursor::new(params), "test.params", &mut ds).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Contract);
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn binnings_follow_configuration() {
        let mut config = crate::app::tests::base_config();
        config.ll_axis = AxisSpec { min: 1.0, step: 0.5, n_bins: 10 };
        config.dll2 = 0.25;
        let (ll, sep, z) = build_binnings(&config).unwrap();
        assert!(matches!(ll, Binning::TwoStep { .. }));
        assert_eq!(sep.n_bins(), 14);
        assert_eq!(z.n_bins(), 2);

        config.dll2 = 0.0;
        let (ll, _, _) = build_binnings(&config).unwrap();
        assert!(matches!(ll, Binning::Uniform { .. }));
    }

    #[test]
    fn load_dataset_reads_prefixed_files() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("sample");
        std::fs::write(with_suffix(&prefix, ".params"), "0.3 0 0.0022 5 2.2\n0.1 0 0.0022 15 2.2\n").unwrap();
        std::fs::write(with_suffix(&prefix, ".cov"), "0 0 1\n1 1 1\n").unwrap();

        let mut config = crate::app::tests::base_config();
        config.data = prefix;
        let ds = load_dataset(&config, Arc::new(LinearUniverse)).unwrap();
        assert!(ds.is_finalized());
        assert_eq!(ds.n_data(), 2);

        config.data = dir.path().join("missing");
        assert_eq!(load_dataset(&config, Arc::new(LinearUniverse)).unwrap_err().kind(), ErrorKind::Io);
    }
}
