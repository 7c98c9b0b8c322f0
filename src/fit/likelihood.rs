//! Chi-square likelihood of the BAO model against a binned dataset.
//!
//! Observations whose 3D separation falls outside `[rmin, rmax]` keep their
//! slot in the residual vector with a zero residual, so the covariance stays
//! aligned with the observation order.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::binning::Binning;
use crate::data::Dataset;
use crate::domain::{N_PARAMS, ParamId};
use crate::error::AppError;
use crate::fit::engine::{ContourPoints, Objective};
use crate::fit::params::{Parameter, ParameterState, default_parameters};
use crate::models::BaoModel;

/// One point of the dense model grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub r3d: f64,
    pub prediction: f64,
}

pub struct Likelihood<'a> {
    dataset: &'a Dataset,
    model: &'a BaoModel,
    rmin: f64,
    rmax: f64,
    error_scale: f64,
    params: Vec<Parameter>,
}

impl<'a> Likelihood<'a> {
    /// Bind a finalized dataset and a model over the window `[rmin, rmax]`.
    pub fn new(
        dataset: &'a Dataset,
        model: &'a BaoModel,
        rmin: f64,
        rmax: f64,
        fix_bao: bool,
        no_bband: bool,
    ) -> Result<Self, AppError> {
        if !(rmin.is_finite() && rmax.is_finite() && rmax > rmin) {
            return Err(AppError::config(format!(
                "Fit window needs rmax > rmin, got [{rmin}, {rmax}]."
            )));
        }
        if !dataset.is_finalized() {
            return Err(AppError::contract(
                "Likelihood needs a dataset with finalized data and covariance.",
            ));
        }
        Ok(Self {
            dataset,
            model,
            rmin,
            rmax,
            error_scale: 1.0,
            params: default_parameters(fix_bao, no_bband),
        })
    }

    pub fn dataset(&self) -> &Dataset {
        self.dataset
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    pub fn parameter_mut(&mut self, id: ParamId) -> &mut Parameter {
        &mut self.params[id.index()]
    }

    pub fn error_scale(&self) -> f64 {
        self.error_scale
    }

    /// Divide the objective by `scale`, so that `up` corresponds to a chi-square
    /// increase of `scale` (e.g. 2.29575 and 5.99146 for 68% and 95% CL in two parameters).
    pub fn set_error_scale(&mut self, scale: f64) -> Result<(), AppError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(AppError::config(format!("Error scale must be positive, got {scale}.")));
        }
        self.error_scale = scale;
        Ok(())
    }

    pub fn in_window(&self, r: f64) -> bool {
        r >= self.rmin && r <= self.rmax
    }

    /// Number of observations inside the fit window.
    pub fn n_in_window(&self) -> usize {
        self.dataset
            .observations()
            .iter()
            .filter(|obs| self.in_window(obs.r3d))
            .count()
    }

    /// `observed - predicted` inside the window, zero outside.
    pub fn residuals(&self, params: &[f64]) -> Result<Vec<f64>, AppError> {
        check_len(params)?;
        Ok(self
            .dataset
            .observations()
            .iter()
            .map(|obs| {
                if self.in_window(obs.r3d) {
                    obs.value - self.model.evaluate(obs.r3d, obs.mu, obs.redshift, params)
                } else {
                    0.0
                }
            })
            .collect())
    }

    /// Unscaled `δᵀ C⁻¹ δ`.
    pub fn chi_square(&self, params: &[f64]) -> Result<f64, AppError> {
        let delta = self.residuals(params)?;
        self.dataset.chi_square(&delta)
    }

    /// `0.5 * chi² / error_scale`, the quantity handed to the minimizer.
    pub fn objective(&self, params: &[f64]) -> Result<f64, AppError> {
        Ok(0.5 * self.chi_square(params)? / self.error_scale)
    }

    /// Initial minimizer state: floating parameters step by 10% of their value
    /// (0.1 when the value is zero); fixed ones have no step.
    pub fn initialize(&self, state: &mut ParameterState) -> Result<(), AppError> {
        for param in &self.params {
            let value = param.value();
            let name = param.id.name();
            if param.is_floating() {
                let error = if value == 0.0 { 0.1 } else { 0.1 * value.abs() };
                state.add(name, value, error);
            } else {
                state.add(name, value, 0.0);
                state.fix(name)?;
            }
        }
        Ok(())
    }

    /// Pulls `residual / sqrt(variance)`, zero outside the window.
    pub fn pulls(&self, params: &[f64]) -> Result<Vec<f64>, AppError> {
        let delta = self.residuals(params)?;
        Ok(delta
            .iter()
            .enumerate()
            .map(|(k, d)| {
                if self.in_window(self.dataset.observation(k).r3d) {
                    d / self.dataset.variance(k).sqrt()
                } else {
                    0.0
                }
            })
            .collect())
    }

    /// Model evaluated on a uniform `model_bins x model_bins` (sep, ll) grid for
    /// each redshift bin, ordered z, then sep, then ll.
    pub fn model_grid(&self, params: &[f64], model_bins: usize) -> Result<Vec<GridPoint>, AppError> {
        check_len(params)?;
        let sep_grid = grid_binning(self.dataset.sep_binning(), model_bins)?;
        let ll_grid = grid_binning(self.dataset.ll_binning(), model_bins)?;
        let z_bins = self.dataset.z_binning();

        let mut out = Vec::with_capacity(z_bins.n_bins() * model_bins * model_bins);
        for iz in 0..z_bins.n_bins() {
            let z = z_bins.bin_center(iz);
            for isep in 0..model_bins {
                let sep = sep_grid.bin_center(isep);
                let ds = sep_grid.bin_size(isep);
                for ill in 0..model_bins {
                    let ll = ll_grid.bin_center(ill);
                    let g = self.dataset.transform(ll, sep, z, ds);
                    out.push(GridPoint {
                        r3d: g.r3d,
                        prediction: self.model.evaluate(g.r3d, g.mu, z, params),
                    });
                }
            }
        }
        Ok(out)
    }

    /// Write the full fit record to `path`.
    pub fn dump(
        &self,
        path: &Path,
        params: &[f64],
        contours: &[ContourPoints],
        model_bins: usize,
    ) -> Result<(), AppError> {
        let file = File::create(path)
            .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", path.display())))?;
        let mut out = BufWriter::new(file);
        self.write_dump(&mut out, params, contours, model_bins)?;
        out.flush()
            .map_err(|e| AppError::io(format!("Failed to write '{}': {e}", path.display())))
    }

    /// Serialize, in order: the three binnings, the section sizes, the parameter
    /// values, per-observation pulls, the model grid and any contour points.
    pub fn write_dump<W: Write>(
        &self,
        out: &mut W,
        params: &[f64],
        contours: &[ContourPoints],
        model_bins: usize,
    ) -> Result<(), AppError> {
        let pulls = self.pulls(params)?;
        let grid = self.model_grid(params, model_bins)?;
        write_records(out, self.dataset, params, &pulls, &grid, contours, model_bins)
            .map_err(|e| AppError::io(format!("Failed to write fit results: {e}")))
    }
}

fn write_records<W: Write>(
    out: &mut W,
    dataset: &Dataset,
    params: &[f64],
    pulls: &[f64],
    grid: &[GridPoint],
    contours: &[ContourPoints],
    model_bins: usize,
) -> std::io::Result<()> {
    writeln!(out, "{}", dataset.ll_binning().to_line())?;
    writeln!(out, "{}", dataset.sep_binning().to_line())?;
    writeln!(out, "{}", dataset.z_binning().to_line())?;

    let n_contour = contours.first().map_or(0, Vec::len);
    writeln!(out, "{} {} {}", dataset.n_data(), model_bins, n_contour)?;

    write!(out, "{}", params.len())?;
    for v in params {
        write!(out, " {v}")?;
    }
    writeln!(out)?;

    for (obs, pull) in dataset.observations().iter().zip(pulls) {
        writeln!(out, "{} {} {}", obs.index, obs.value, pull)?;
    }
    for point in grid {
        writeln!(out, "{} {}", point.r3d, point.prediction)?;
    }
    if n_contour > 0 {
        for (x, y) in contours.iter().flatten() {
            writeln!(out, "{x} {y}")?;
        }
    }
    Ok(())
}

impl Objective for Likelihood<'_> {
    fn eval(&self, params: &[f64]) -> Result<f64, AppError> {
        self.objective(params)
    }
}

fn check_len(params: &[f64]) -> Result<(), AppError> {
    if params.len() != N_PARAMS {
        return Err(AppError::contract(format!(
            "Expected {N_PARAMS} parameter values, got {}.",
            params.len()
        )));
    }
    Ok(())
}

/// Uniform grid spanning the full range of `axis` with `model_bins` bins of
/// width `(max - min) / (model_bins - 1)`.
fn grid_binning(axis: &Binning, model_bins: usize) -> Result<Binning, AppError> {
    if model_bins < 2 {
        return Err(AppError::config(format!(
            "Model grid needs at least 2 bins, got {model_bins}."
        )));
    }
    let min = axis.bin_low_edge(0);
    let max = axis.bin_low_edge(axis.n_bins());
    Binning::uniform(model_bins, min, (max - min) / (model_bins - 1) as f64)
}
