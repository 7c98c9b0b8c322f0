//! BAO model of the Lyman-alpha correlation function.
//!
//! The prediction mixes a fiducial correlation function (with the acoustic
//! peak) and a no-wiggles reference (peak removed):
//!
//! `xi = ampl * (fid - nowiggle) + nowiggle`, both evaluated at `r * scale`,
//!
//! scaled by `bias² ((1+z)/(1+zref))^alpha` and added to a smooth broadband
//! polynomial in `1/r`.

use crate::cosmo::CorrelationModel;
use crate::domain::{N_PARAMS, ParamId};

pub struct BaoModel {
    fiducial: Box<dyn CorrelationModel>,
    nowiggles: Box<dyn CorrelationModel>,
    zref: f64,
}

impl std::fmt::Debug for BaoModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaoModel").field("zref", &self.zref).finish_non_exhaustive()
    }
}

impl BaoModel {
    pub fn new(
        fiducial: Box<dyn CorrelationModel>,
        nowiggles: Box<dyn CorrelationModel>,
        zref: f64,
    ) -> Self {
        Self {
            fiducial,
            nowiggles,
            zref,
        }
    }

    /// Predicted correlation at separation `r`, `mu` and redshift `z`.
    ///
    /// # Panics
    /// Panics if `params` has fewer than `N_PARAMS` entries.
    pub fn evaluate(&self, r: f64, mu: f64, z: f64, params: &[f64]) -> f64 {
        assert!(params.len() >= N_PARAMS, "model needs {N_PARAMS} parameters");
        let p = |id: ParamId| params[id.index()];
        let (alpha, bias, beta) = (p(ParamId::Alpha), p(ParamId::Bias), p(ParamId::Beta));
        let (ampl, scale) = (p(ParamId::BaoAmpl), p(ParamId::BaoScale));
        let (a1, a2, a3) = (p(ParamId::BbA1), p(ParamId::BbA2), p(ParamId::BbA3));

        let zfactor = ((1.0 + z) / (1.0 + self.zref)).powf(alpha);
        // mu is unchanged by an isotropic rescaling of r.
        let fid = self.fiducial.evaluate(r * scale, mu, beta);
        let nw = self.nowiggles.evaluate(r * scale, mu, beta);
        let xi = ampl * (fid - nw) + nw;
        let broadband = 1e-1 * a1 / (r * r) + 1e-3 * a2 / r + 1e-5 * a3;
        bias * bias * zfactor * xi + broadband
    }
}
