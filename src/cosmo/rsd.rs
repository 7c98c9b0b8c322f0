//! Redshift-space correlation functions built from real-space multipoles.
//!
//! Linear (Kaiser) redshift-space distortions map the monopole, quadrupole and
//! hexadecapole of the matter correlation function onto an angle-dependent
//! correlation:
//!
//! `ξ(r, μ; β) = C0(β) ξ0(r) + C2(β) P2(μ) ξ2(r) + C4(β) P4(μ) ξ4(r)`
//!
//! The tabulated multipoles are expected to carry the sign convention of the
//! upstream generator, so no extra sign is applied to the ℓ=2 term.

use crate::math::CubicSpline;

/// A single multipole `ξ_ℓ(r)`.
pub type Multipole = Box<dyn Fn(f64) -> f64 + Send + Sync>;

/// Angle-dependent correlation function `ξ(r, μ; β)`.
pub trait CorrelationModel: Send + Sync {
    fn evaluate(&self, r: f64, mu: f64, beta: f64) -> f64;
}

impl<F> CorrelationModel for F
where
    F: Fn(f64, f64, f64) -> f64 + Send + Sync,
{
    fn evaluate(&self, r: f64, mu: f64, beta: f64) -> f64 {
        self(r, mu, beta)
    }
}

pub fn legendre2(mu: f64) -> f64 {
    0.5 * (3.0 * mu * mu - 1.0)
}

pub fn legendre4(mu: f64) -> f64 {
    let mu2 = mu * mu;
    (35.0 * mu2 * mu2 - 30.0 * mu2 + 3.0) / 8.0
}

/// Kaiser coefficients `(C0, C2, C4)` for distortion parameter `beta`.
pub fn kaiser_coefficients(beta: f64) -> (f64, f64, f64) {
    let b2 = beta * beta;
    (
        1.0 + 2.0 * beta / 3.0 + b2 / 5.0,
        4.0 * beta / 3.0 + 4.0 * b2 / 7.0,
        8.0 * b2 / 35.0,
    )
}

pub struct RsdCorrelation {
    xi0: Multipole,
    xi2: Multipole,
    xi4: Multipole,
}

impl RsdCorrelation {
    pub fn new(xi0: Multipole, xi2: Multipole, xi4: Multipole) -> Self {
        Self { xi0, xi2, xi4 }
    }

    /// Interpolate each multipole with its own spline.
    pub fn from_splines([s0, s2, s4]: [CubicSpline; 3]) -> Self {
        Self::new(
            Box::new(move |r| s0.eval(r)),
            Box::new(move |r| s2.eval(r)),
            Box::new(move |r| s4.eval(r)),
        )
    }
}

impl std::fmt::Debug for RsdCorrelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsdCorrelation").finish_non_exhaustive()
    }
}

impl CorrelationModel for RsdCorrelation {
    fn evaluate(&self, r: f64, mu: f64, beta: f64) -> f64 {
        let (c0, c2, c4) = kaiser_coefficients(beta);
        c0 * (self.xi0)(r) + c2 * legendre2(mu) * (self.xi2)(r) + c4 * legendre4(mu) * (self.xi4)(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::simpson;
    use approx::assert_abs_diff_eq;

    fn power_law() -> RsdCorrelation {
        RsdCorrelation::new(
            Box::new(|r| 10.0 / (r * r)),
            Box::new(|r| 4.0 / r),
            Box::new(|r| 1.0 / r.sqrt()),
        )
    }

    #[test]
    fn zero_beta_is_the_monopole() {
        let xi = power_law();
        for mu in [0.0, 0.3, 1.0] {
            assert_abs_diff_eq!(xi.evaluate(5.0, mu, 0.0), 0.4, epsilon = 1e-15);
        }
    }

    #[test]
    fn angular_average_keeps_only_the_monopole() {
        let xi = power_law();
        let beta = 1.3;
        let r = 20.0;
        let average = simpson(|mu| xi.evaluate(r, mu, beta), 0.0, 1.0, 200);
        let (c0, _, _) = kaiser_coefficients(beta);
        assert_abs_diff_eq!(average, c0 * 10.0 / (r * r), epsilon = 1e-9);
    }

    #[test]
    fn legendre_endpoints() {
        assert_abs_diff_eq!(legendre2(1.0), 1.0);
        assert_abs_diff_eq!(legendre4(1.0), 1.0);
        assert_abs_diff_eq!(legendre2(0.0), -0.5);
        assert_abs_diff_eq!(legendre4(0.0), 0.375);
    }

    #[test]
    fn closures_are_correlation_models() {
        let flat = |r: f64, _mu: f64, beta: f64| r + beta;
        assert_abs_diff_eq!(flat.evaluate(2.0, 0.5, 1.0), 3.0);
    }
}
