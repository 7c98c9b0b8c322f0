//! Observational bin coordinates to physical separation.
//!
//! A Lyman-alpha pixel pair is binned by the log-ratio of its two wavelengths,
//! the angular separation of the two sightlines and the mean redshift. The fit
//! model is expressed in 3D comoving separation `r` and `mu = cos(theta)` of
//! the pair with respect to the line of sight.

use std::f64::consts::PI;

use crate::cosmo::Cosmology;

pub const ARCMIN_TO_RAD: f64 = PI / (60.0 * 180.0);

/// Position of a bin in physical coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairGeometry {
    /// 3D comoving separation (Mpc/h).
    pub r3d: f64,
    /// Cosine of the angle to the line of sight, in `[0, 1]`.
    pub mu: f64,
}

/// Map `(ll, sep, z)` at a bin center onto `(r3d, mu)`.
///
/// `sep` and its bin width `ds` are in arcminutes. The transverse distance uses
/// the area-weighted mean separation of the bin, `sep + ds²/(12 sep)`, which
/// reduces to `sep` once the bin is narrow compared to its position.
pub fn transform(cosmology: &dyn Cosmology, ll: f64, sep: f64, z: f64, ds: f64) -> PairGeometry {
    let zp1 = z + 1.0;
    let ratio = (0.5 * ll).exp();
    let z1 = zp1 / ratio - 1.0;
    let z2 = zp1 * ratio - 1.0;
    let dr_los =
        cosmology.line_of_sight_comoving_distance(z2) - cosmology.line_of_sight_comoving_distance(z1);

    let weighted_sep = sep + ds * ds / (12.0 * sep);
    let dr_perp = cosmology.transverse_comoving_scale(z) * weighted_sep * ARCMIN_TO_RAD;

    let r3d = (dr_los * dr_los + dr_perp * dr_perp).sqrt();
    PairGeometry {
        r3d,
        mu: dr_los.abs() / r3d,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Toy universe with `D(z) = 1000 z` and a constant transverse scale.
    pub(crate) struct LinearUniverse;

    impl Cosmology for LinearUniverse {
        fn line_of_sight_comoving_distance(&self, z: f64) -> f64 {
            1000.0 * z
        }
        fn transverse_comoving_scale(&self, _z: f64) -> f64 {
            4000.0
        }
        fn growth_function(&self, z: f64) -> f64 {
            1.0 / (1.0 + z)
        }
    }

    #[test]
    fn pure_line_of_sight_pair() {
        // A tiny separation leaves an almost purely radial pair.
        let g = transform(&LinearUniverse, 0.01, 1e-9, 2.0, 0.0);
        let expected = 1000.0 * 3.0 * ((0.005_f64).exp() - (-0.005_f64).exp());
        assert_relative_eq!(g.r3d, expected, max_relative = 1e-9);
        assert_relative_eq!(g.mu, 1.0, max_relative = 1e-9);
    }

    #[test]
    fn zero_log_ratio_is_transverse() {
        let g = transform(&LinearUniverse, 0.0, 30.0, 2.0, 0.0);
        assert_relative_eq!(g.r3d, 4000.0 * 30.0 * ARCMIN_TO_RAD, max_relative = 1e-12);
        assert_eq!(g.mu, 0.0);
    }

    #[test]
    fn bin_width_correction_vanishes_for_wide_separation() {
        let exact = transform(&LinearUniverse, 0.004, 1.0e5, 2.2, 0.0);
        let binned = transform(&LinearUniverse, 0.004, 1.0e5, 2.2, 10.0);
        assert_relative_eq!(binned.r3d, exact.r3d, max_relative = 1e-9);
        assert_relative_eq!(binned.mu, exact.mu, max_relative = 1e-9);

        // A bin as wide as its position is pushed outwards by ds²/(12 sep).
        let near = transform(&LinearUniverse, 0.0, 10.0, 2.2, 10.0);
        assert_relative_eq!(near.r3d, 4000.0 * (10.0 + 100.0 / 120.0) * ARCMIN_TO_RAD, max_relative = 1e-12);
    }

    #[test]
    fn mu_is_a_cosine() {
        for ll in [-0.02, 0.0, 0.003, 0.05] {
            for sep in [1.0, 15.0, 95.0] {
                let g = transform(&LinearUniverse, ll, sep, 2.5, 10.0);
                assert!((0.0..=1.0).contains(&g.mu));
                assert!(g.r3d > 0.0);
            }
        }
    }
}
