//! Sparse binned correlation measurements with their covariance.
//!
//! The addressable bin space is the dense `(ll, sep, z)` grid, but only a subset
//! of bins is observed. Observations are stored in insertion order; the
//! covariance is indexed by that order (not by grid index) and kept in packed
//! upper-triangular form.
//!
//! Lifecycle:
//!
//! 1. `add_data` for every observed bin
//! 2. `finalize_data` sizes the covariance
//! 3. `add_covariance` for every known element
//! 4. `finalize_covariance` factors and inverts
//!
//! Only a fully finalized dataset can compute a chi-square.

use std::sync::Arc;

use crate::binning::Binning;
use crate::cosmo::Cosmology;
use crate::data::transform::{PairGeometry, transform};
use crate::error::AppError;
use crate::math::{
    cholesky_in_place, inverse_from_cholesky, packed_index, packed_len, quadratic_form,
};

/// Maximum distance between an input coordinate and its bin center.
pub const CENTER_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Accumulating,
    DataFinalized,
    CovarianceFinalized,
}

/// One observed bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Flat index into the dense grid: `(ll_bin * n_sep + sep_bin) * n_z + z_bin`.
    pub index: usize,
    pub value: f64,
    pub r3d: f64,
    pub mu: f64,
    pub redshift: f64,
}

pub struct Dataset {
    ll_binning: Binning,
    sep_binning: Binning,
    z_binning: Binning,
    cosmology: Arc<dyn Cosmology>,
    filled: Vec<bool>,
    observations: Vec<Observation>,
    cov: Vec<f64>,
    has_cov: Vec<bool>,
    icov: Vec<f64>,
    stage: Stage,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("n_bins_total", &self.n_bins_total())
            .field("n_data", &self.n_data())
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

impl Dataset {
    pub fn new(
        ll_binning: Binning,
        sep_binning: Binning,
        z_binning: Binning,
        cosmology: Arc<dyn Cosmology>,
    ) -> Self {
        let total = ll_binning.n_bins() * sep_binning.n_bins() * z_binning.n_bins();
        Self {
            ll_binning,
            sep_binning,
            z_binning,
            cosmology,
            filled: vec![false; total],
            observations: Vec::new(),
            cov: Vec::new(),
            has_cov: Vec::new(),
            icov: Vec::new(),
            stage: Stage::Accumulating,
        }
    }

    /// Record the measurement `value` at the bin centered on `(ll, sep, z)`.
    pub fn add_data(&mut self, value: f64, ll: f64, sep: f64, z: f64) -> Result<(), AppError> {
        if self.stage != Stage::Accumulating {
            return Err(AppError::contract("Cannot add data after the dataset is finalized."));
        }
        let ll_bin = locate(&self.ll_binning, ll, "log-lambda")?;
        let sep_bin = locate(&self.sep_binning, sep, "separation")?;
        let z_bin = locate(&self.z_binning, z, "redshift")?;

        let index = (ll_bin * self.sep_binning.n_bins() + sep_bin) * self.z_binning.n_bins() + z_bin;
        if self.filled[index] {
            return Err(AppError::contract(format!(
                "Bin {index} at (ll,sep,z) = ({ll},{sep},{z}) is already filled."
            )));
        }

        let ds = self.sep_binning.bin_size(sep_bin);
        let PairGeometry { r3d, mu } = self.transform(ll, sep, z, ds);

        self.filled[index] = true;
        self.observations.push(Observation {
            index,
            value,
            r3d,
            mu,
            redshift: self.z_binning.bin_center(z_bin),
        });
        Ok(())
    }

    /// Lock the data and allocate covariance storage for the observed bins.
    pub fn finalize_data(&mut self) -> Result<(), AppError> {
        if self.stage != Stage::Accumulating {
            return Err(AppError::contract("Dataset data is already finalized."));
        }
        let n_cov = packed_len(self.n_data());
        self.cov = vec![0.0; n_cov];
        self.has_cov = vec![false; n_cov];
        self.stage = Stage::DataFinalized;
        Ok(())
    }

    /// Set covariance element `(i, j)` between observations `i` and `j` (either order).
    pub fn add_covariance(&mut self, i: usize, j: usize, value: f64) -> Result<(), AppError> {
        match self.stage {
            Stage::Accumulating => {
                return Err(AppError::contract(
                    "Covariance can only be added after the data is finalized.",
                ));
            }
            Stage::CovarianceFinalized => {
                return Err(AppError::contract("Covariance is already finalized."));
            }
            Stage::DataFinalized => {}
        }
        let n = self.n_data();
        if i >= n || j >= n {
            return Err(AppError::contract(format!(
                "Covariance element ({i},{j}) is outside the {n} observed bins."
            )));
        }
        if i == j && !(value > 0.0) {
            return Err(AppError::contract(format!(
                "Diagonal covariance element ({i},{i}) must be positive, got {value}."
            )));
        }
        let slot = packed_index(i, j);
        if self.has_cov[slot] {
            return Err(AppError::contract(format!(
                "Covariance element ({i},{j}) is already set."
            )));
        }
        self.cov[slot] = value;
        self.has_cov[slot] = true;
        Ok(())
    }

    /// Lock the covariance and compute its inverse via a Cholesky factorization.
    pub fn finalize_covariance(&mut self) -> Result<(), AppError> {
        match self.stage {
            Stage::Accumulating => {
                return Err(AppError::contract(
                    "Cannot finalize covariance before the data is finalized.",
                ));
            }
            Stage::CovarianceFinalized => {
                return Err(AppError::contract("Covariance is already finalized."));
            }
            Stage::DataFinalized => {}
        }
        let n = self.n_data();
        let mut icov = self.cov.clone();
        cholesky_in_place(&mut icov, n).map_err(|info| {
            AppError::numerical(format!(
                "Covariance is not positive definite: Cholesky failed with info = {info}."
            ))
        })?;
        inverse_from_cholesky(&mut icov, n);
        if icov.iter().any(|v| !v.is_finite()) {
            return Err(AppError::numerical("Covariance inverse has non-finite elements."));
        }
        self.icov = icov;
        self.stage = Stage::CovarianceFinalized;
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.stage == Stage::CovarianceFinalized
    }

    /// `(ll, sep, z)` bin center to physical coordinates using this dataset's cosmology.
    pub fn transform(&self, ll: f64, sep: f64, z: f64, ds: f64) -> PairGeometry {
        transform(self.cosmology.as_ref(), ll, sep, z, ds)
    }

    /// `δᵀ C⁻¹ δ` for a residual vector aligned with the observations.
    pub fn chi_square(&self, delta: &[f64]) -> Result<f64, AppError> {
        if self.stage != Stage::CovarianceFinalized {
            return Err(AppError::contract(
                "Chi-square needs both data and covariance to be finalized.",
            ));
        }
        if delta.len() != self.n_data() {
            return Err(AppError::contract(format!(
                "Residual vector has {} entries for {} observations.",
                delta.len(),
                self.n_data()
            )));
        }
        Ok(quadratic_form(&self.icov, self.n_data(), delta))
    }

    /// Size of the dense bin grid.
    pub fn n_bins_total(&self) -> usize {
        self.filled.len()
    }

    pub fn n_data(&self) -> usize {
        self.observations.len()
    }

    /// Number of covariance elements that were explicitly set.
    pub fn n_covariance_entries(&self) -> usize {
        self.has_cov.iter().filter(|&&set| set).count()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn observation(&self, k: usize) -> &Observation {
        &self.observations[k]
    }

    /// Diagonal covariance element of observation `k` (needs finalized data).
    pub fn variance(&self, k: usize) -> f64 {
        self.cov[packed_index(k, k)]
    }

    /// Packed covariance, as filled.
    pub fn covariance(&self) -> &[f64] {
        &self.cov
    }

    /// Packed inverse covariance (empty until the covariance is finalized).
    pub fn inverse_covariance(&self) -> &[f64] {
        &self.icov
    }

    pub fn ll_binning(&self) -> &Binning {
        &self.ll_binning
    }

    pub fn sep_binning(&self) -> &Binning {
        &self.sep_binning
    }

    pub fn z_binning(&self) -> &Binning {
        &self.z_binning
    }
}

fn locate(binning: &Binning, value: f64, axis: &str) -> Result<usize, AppError> {
    let bin = binning.bin_index(value).ok_or_else(|| {
        AppError::contract(format!("{axis} value {value} is outside the binned range."))
    })?;
    let center = binning.bin_center(bin);
    if (value - center).abs() >= CENTER_TOLERANCE {
        return Err(AppError::contract(format!(
            "{axis} value {value} is not at the center {center} of bin {bin}."
        )));
    }
    Ok(bin)
}
