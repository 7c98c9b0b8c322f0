//! Reader for the plain-text fit dump.
//!
//! Layout, one record per line:
//!
//! 1. ll, sep and z binnings as `n edge_0 ... edge_n`
//! 2. `n_data model_bins n_contour`
//! 3. `n_params value_0 ... value_{n-1}`
//! 4. `n_data` rows of `index value pull`
//! 5. `n_z * model_bins^2` rows of `r prediction` (z outermost, ll innermost)
//! 6. every remaining row is a contour point `x y`, in blocks of `n_contour`

use std::path::Path;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DumpObservation {
    pub index: usize,
    pub value: f64,
    pub pull: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DumpFile {
    pub ll_edges: Vec<f64>,
    pub sep_edges: Vec<f64>,
    pub z_edges: Vec<f64>,
    pub n_data: usize,
    pub model_bins: usize,
    pub n_contour: usize,
    pub params: Vec<f64>,
    pub observations: Vec<DumpObservation>,
    /// `(r, prediction)` for every model grid point.
    pub grid: Vec<(f64, f64)>,
    pub contour_points: Vec<(f64, f64)>,
}

impl DumpFile {
    /// Contour points split into one block per traced contour.
    pub fn contours(&self) -> Vec<&[(f64, f64)]> {
        if self.n_contour == 0 {
            return Vec::new();
        }
        self.contour_points.chunks(self.n_contour).collect()
    }
}

struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Lines<'a> {
    fn next_tokens(&mut self, what: &str) -> Result<(usize, Vec<&'a str>), AppError> {
        for (idx, line) in self.inner.by_ref() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if !tokens.is_empty() {
                return Ok((idx + 1, tokens));
            }
        }
        Err(AppError::input(format!("Dump ended before {what}.")))
    }
}

fn number<T: std::str::FromStr>(token: &str, line_no: usize) -> Result<T, AppError> {
    token
        .parse()
        .map_err(|_| AppError::input(format!("Dump line {line_no}: cannot parse '{token}'.")))
}

/// A count followed by `count + extra` values.
fn counted(tokens: &[&str], line_no: usize, extra: usize) -> Result<Vec<f64>, AppError> {
    let n: usize = number(tokens[0], line_no)?;
    let values = tokens[1..]
        .iter()
        .map(|t| number(t, line_no))
        .collect::<Result<Vec<f64>, _>>()?;
    if values.len() != n + extra {
        return Err(AppError::input(format!(
            "Dump line {line_no}: expected {} values, found {}.",
            n + extra,
            values.len()
        )));
    }
    Ok(values)
}

fn pair(tokens: &[&str], line_no: usize) -> Result<(f64, f64), AppError> {
    match tokens {
        [a, b] => Ok((number(a, line_no)?, number(b, line_no)?)),
        _ => Err(AppError::input(format!("Dump line {line_no}: expected two columns."))),
    }
}

pub fn parse_dump(text: &str) -> Result<DumpFile, AppError> {
    let mut lines = Lines {
        inner: text.lines().enumerate(),
    };

    // Bin count, then one more edge than bins.
    let mut binning = |axis: &str| -> Result<Vec<f64>, AppError> {
        let (no, tokens) = lines.next_tokens(axis)?;
        counted(&tokens, no, 1)
    };
    let ll_edges = binning("ll binning")?;
    let sep_edges = binning("sep binning")?;
    let z_edges = binning("z binning")?;

    let (no, tokens) = lines.next_tokens("section sizes")?;
    let [n_data, model_bins, n_contour] = match tokens[..] {
        [a, b, c] => [number(a, no)?, number(b, no)?, number(c, no)?],
        _ => return Err(AppError::input(format!("Dump line {no}: expected three sizes."))),
    };

    let (no, tokens) = lines.next_tokens("parameter values")?;
    let params = counted(&tokens, no, 0)?;

    let mut observations = Vec::with_capacity(n_data);
    for _ in 0..n_data {
        let (no, tokens) = lines.next_tokens("observation rows")?;
        match tokens[..] {
            [i, v, p] => observations.push(DumpObservation {
                index: number(i, no)?,
                value: number(v, no)?,
                pull: number(p, no)?,
            }),
            _ => return Err(AppError::input(format!("Dump line {no}: expected 'index value pull'."))),
        }
    }

    let n_z = z_edges.len().saturating_sub(1);
    let n_grid = n_z * model_bins * model_bins;
    let mut grid = Vec::with_capacity(n_grid);
    for _ in 0..n_grid {
        let (no, tokens) = lines.next_tokens("model grid")?;
        grid.push(pair(&tokens, no)?);
    }

    let mut contour_points = Vec::new();
    while let Ok((no, tokens)) = lines.next_tokens("contours") {
        contour_points.push(pair(&tokens, no)?);
    }
    if (n_contour == 0 && !contour_points.is_empty()) || (n_contour > 0 && contour_points.len() % n_contour != 0) {
        return Err(AppError::input(format!(
            "Dump has {} contour points, not a multiple of {n_contour}.",
            contour_points.len()
        )));
    }

    Ok(DumpFile {
        ll_edges,
        sep_edges,
        z_edges,
        n_data,
        model_bins,
        n_contour,
        params,
        observations,
        grid,
        contour_points,
    })
}

pub fn read_dump(path: &Path) -> Result<DumpFile, AppError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read '{}': {e}", path.display())))?;
    parse_dump(&text)
}
