//! Fit summary for the terminal and JSON outputs.

pub mod format;

pub use format::*;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::ContourPair;
use crate::error::AppError;
use crate::fit::{FitOutcome, Likelihood, MinosError};

#[derive(Debug, Clone, Serialize)]
pub struct ParameterSummary {
    pub name: String,
    pub value: f64,
    pub error: f64,
    pub floating: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minos: Option<MinosError>,
}

/// Everything reported about one fit.
#[derive(Debug, Clone, Serialize)]
pub struct FitSummary {
    pub generated_at: DateTime<Utc>,
    pub chi_square: f64,
    pub n_data: usize,
    pub n_in_window: usize,
    pub n_free: usize,
    /// Observations in the window minus free parameters (may be negative).
    pub dof: i64,
    pub fmin: f64,
    pub edm: f64,
    pub converged: bool,
    pub iterations: u64,
    pub parameters: Vec<ParameterSummary>,
    /// Names of the free parameters, in covariance order.
    pub free_names: Vec<String>,
    pub covariance: Vec<Vec<f64>>,
    pub global_cc: Vec<f64>,
    pub contour_levels: Vec<f64>,
    /// Planes traced at every level.
    pub contour_pairs: Vec<ContourPair>,
}

/// Collect the summary of `outcome`. `minos` is indexed like the parameters.
pub fn summarize(
    likelihood: &Likelihood<'_>,
    outcome: &FitOutcome,
    minos: &[Option<MinosError>],
    contour_levels: &[f64],
    contour_pairs: &[ContourPair],
) -> Result<FitSummary, AppError> {
    let chi_square = likelihood.chi_square(&outcome.params)?;
    let n_in_window = likelihood.n_in_window();
    let n_free = outcome.free.len();

    let parameters = outcome
        .names
        .iter()
        .enumerate()
        .map(|(i, name)| ParameterSummary {
            name: name.clone(),
            value: outcome.params[i],
            error: outcome.errors[i],
            floating: !outcome.fixed[i],
            minos: minos.get(i).copied().flatten(),
        })
        .collect();

    let k = outcome.covariance.nrows();
    let covariance = (0..k)
        .map(|a| (0..k).map(|b| outcome.covariance[(a, b)]).collect())
        .collect();

    Ok(FitSummary {
        generated_at: Utc::now(),
        chi_square,
        n_data: likelihood.dataset().n_data(),
        n_in_window,
        n_free,
        dof: n_in_window as i64 - n_free as i64,
        fmin: outcome.fmin,
        edm: outcome.edm,
        converged: outcome.converged,
        iterations: outcome.iterations,
        parameters,
        free_names: outcome.free.iter().map(|&i| outcome.names[i].clone()).collect(),
        covariance,
        global_cc: outcome.global_cc.clone(),
        contour_levels: contour_levels.to_vec(),
        contour_pairs: contour_pairs.to_vec(),
    })
}
