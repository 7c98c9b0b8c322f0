//! Homogeneous background cosmology.
//!
//! All distances are comoving and expressed in Mpc/h, so the Hubble distance
//! is `c / (100 km/s/Mpc)`.

use crate::error::AppError;
use crate::math::simpson;

/// `c / H0` in Mpc/h.
pub const HUBBLE_DISTANCE: f64 = 2997.92458;

/// Flatness threshold on the curvature density.
const FLAT_EPS: f64 = 1e-12;

/// Number of Simpson intervals for distance and growth integrals.
const QUAD_INTERVALS: usize = 512;

/// Distance and growth functions of a homogeneous universe.
pub trait Cosmology: Send + Sync {
    /// Line-of-sight comoving distance to redshift `z` (Mpc/h).
    fn line_of_sight_comoving_distance(&self, z: f64) -> f64;
    /// Transverse comoving distance per radian of angular separation at `z` (Mpc/h/rad).
    fn transverse_comoving_scale(&self, z: f64) -> f64;
    /// Linear growth function at `z`, unnormalized.
    fn growth_function(&self, z: f64) -> f64;
}

/// Lambda-CDM universe with matter and a cosmological constant (radiation neglected).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambdaCdm {
    omega_lambda: f64,
    omega_matter: f64,
    omega_curvature: f64,
}

impl LambdaCdm {
    pub fn new(omega_lambda: f64, omega_matter: f64) -> Result<Self, AppError> {
        if !(omega_matter.is_finite() && omega_matter > 0.0) {
            return Err(AppError::config(format!(
                "OmegaMatter must be positive, got {omega_matter}."
            )));
        }
        if !(omega_lambda.is_finite() && omega_lambda >= 0.0) {
            return Err(AppError::config(format!(
                "OmegaLambda must be non-negative, got {omega_lambda}."
            )));
        }
        Ok(Self {
            omega_lambda,
            omega_matter,
            omega_curvature: 1.0 - omega_matter - omega_lambda,
        })
    }

    /// Dimensionless Hubble rate `H(z)/H0`.
    pub fn hubble_ratio(&self, z: f64) -> f64 {
        let zp1 = 1.0 + z;
        (self.omega_matter * zp1 * zp1 * zp1 + self.omega_curvature * zp1 * zp1 + self.omega_lambda).sqrt()
    }
}

impl Cosmology for LambdaCdm {
    fn line_of_sight_comoving_distance(&self, z: f64) -> f64 {
        HUBBLE_DISTANCE * simpson(|zz| 1.0 / self.hubble_ratio(zz), 0.0, z, QUAD_INTERVALS)
    }

    fn transverse_comoving_scale(&self, z: f64) -> f64 {
        let dc = self.line_of_sight_comoving_distance(z);
        let ok = self.omega_curvature;
        if ok.abs() < FLAT_EPS {
            dc
        } else if ok > 0.0 {
            let s = ok.sqrt();
            HUBBLE_DISTANCE / s * (s * dc / HUBBLE_DISTANCE).sinh()
        } else {
            let s = (-ok).sqrt();
            HUBBLE_DISTANCE / s * (s * dc / HUBBLE_DISTANCE).sin()
        }
    }

    fn growth_function(&self, z: f64) -> f64 {
        // E(z) ∫_z^∞ (1+z')/E(z')³ dz', written in the scale factor a = 1/(1+z')
        // where the integrand (a / (Ωm + Ωk a + ΩΛ a³))^{3/2} is regular at a = 0.
        let a = 1.0 / (1.0 + z);
        let integrand = |x: f64| {
            let denom = self.omega_matter + self.omega_curvature * x + self.omega_lambda * x * x * x;
            (x / denom).powf(1.5)
        };
        self.hubble_ratio(z) * simpson(integrand, 0.0, a, QUAD_INTERVALS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn einstein_de_sitter_has_closed_forms() {
        let eds = LambdaCdm::new(0.0, 1.0).unwrap();
        for z in [0.5, 1.0, 2.25, 3.0] {
            let dc = 2.0 * HUBBLE_DISTANCE * (1.0 - 1.0 / (1.0_f64 + z).sqrt());
            assert_relative_eq!(eds.line_of_sight_comoving_distance(z), dc, max_relative = 1e-8);
            assert_relative_eq!(eds.transverse_comoving_scale(z), dc, max_relative = 1e-8);
            assert_relative_eq!(eds.growth_function(z), 0.4 / (1.0 + z), max_relative = 1e-6);
        }
    }

    #[test]
    fn open_universe_stretches_transverse_scale() {
        let open = LambdaCdm::new(0.0, 0.3).unwrap();
        assert!(open.omega_curvature > 0.0);
        let z = 2.0;
        assert!(open.transverse_comoving_scale(z) > open.line_of_sight_comoving_distance(z));

        let closed = LambdaCdm::new(0.9, 0.3).unwrap();
        assert!(closed.transverse_comoving_scale(z) < closed.line_of_sight_comoving_distance(z));
    }

    #[test]
    fn distance_grows_with_redshift() {
        let lcdm = LambdaCdm::new(0.734, 0.266).unwrap();
        assert_eq!(lcdm.line_of_sight_comoving_distance(0.0), 0.0);
        let d1 = lcdm.line_of_sight_comoving_distance(2.0);
        let d2 = lcdm.line_of_sight_comoving_distance(2.5);
        assert!(d2 > d1 && d1 > 3000.0);
        assert!(lcdm.growth_function(3.0) < lcdm.growth_function(0.0));
    }

    #[test]
    fn rejects_unphysical_densities() {
        assert!(LambdaCdm::new(0.7, 0.0).is_err());
        assert!(LambdaCdm::new(-0.1, 0.3).is_err());
        assert!(LambdaCdm::new(0.7, f64::NAN).is_err());
    }
}
