//! Minimizer interface and the shipped L-BFGS engine.
//!
//! The engine follows the usual likelihood-fit conventions: the objective is a
//! negative log-likelihood whose one-sigma level sits `up` above the minimum
//! (`up = 0.5` for `0.5 * chi²`). It provides
//!
//! - `minimize`: L-BFGS over the free parameters plus a finite-difference
//!   Hessian for the parabolic covariance,
//! - `minos`: asymmetric errors from the profile objective,
//! - `contour`: points where the profile objective in a parameter plane
//!   crosses `fmin + up`.
//!
//! Free parameters are optimized in units of their step sizes so that all
//! coordinates are of order one.

use std::sync::atomic::{AtomicUsize, Ordering};

use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::AppError;
use crate::fit::params::ParameterState;

/// Closed boundary of a two-parameter confidence region.
pub type ContourPoints = Vec<(f64, f64)>;

/// A scalar function of the full parameter vector.
pub trait Objective: Sync {
    fn eval(&self, params: &[f64]) -> Result<f64, AppError>;
}

/// Result of a minimization.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub names: Vec<String>,
    /// Best-fit values of every parameter (fixed ones unchanged).
    pub params: Vec<f64>,
    /// Parabolic errors; zero for fixed parameters.
    pub errors: Vec<f64>,
    pub fixed: Vec<bool>,
    /// Indices of the free parameters, in covariance order.
    pub free: Vec<usize>,
    /// Objective value at the minimum.
    pub fmin: f64,
    /// Estimated vertical distance to the minimum.
    pub edm: f64,
    /// Covariance of the free parameters.
    pub covariance: DMatrix<f64>,
    /// Global correlation coefficient of each free parameter.
    pub global_cc: Vec<f64>,
    pub iterations: u64,
    pub n_evals: usize,
    pub converged: bool,
    pub message: String,
}

impl FitOutcome {
    /// Position of parameter `index` in the covariance, if it is free.
    pub fn free_position(&self, index: usize) -> Option<usize> {
        self.free.iter().position(|&i| i == index)
    }

    /// Correlation between parameters `i` and `j` (zero if either is fixed).
    pub fn correlation(&self, i: usize, j: usize) -> f64 {
        match (self.free_position(i), self.free_position(j)) {
            (Some(a), Some(b)) => {
                let denom = (self.covariance[(a, a)] * self.covariance[(b, b)]).sqrt();
                if denom > 0.0 { self.covariance[(a, b)] / denom } else { 0.0 }
            }
            _ => 0.0,
        }
    }
}

/// Asymmetric profile errors (`lower <= 0 <= upper`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MinosError {
    pub lower: f64,
    pub upper: f64,
}

pub trait Minimizer {
    fn minimize(&self, objective: &dyn Objective, state: &ParameterState) -> Result<FitOutcome, AppError>;

    fn minos(&self, objective: &dyn Objective, outcome: &FitOutcome, index: usize) -> Result<MinosError, AppError>;

    /// `n_points` boundary points in the `(px, py)` plane, ordered by angle.
    fn contour(
        &self,
        objective: &dyn Objective,
        outcome: &FitOutcome,
        px: usize,
        py: usize,
        n_points: usize,
    ) -> Result<ContourPoints, AppError>;
}

/// Configuration for the L-BFGS engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_iterations: u64,
    /// Gradient-norm tolerance in scaled units.
    pub tolerance: f64,
    /// Number of stored L-BFGS corrections.
    pub memory: usize,
    /// Objective increase defining one standard deviation.
    pub up: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
            memory: 10,
            up: 0.5,
        }
    }
}

/// Relative step for central-difference gradients in scaled units.
const GRADIENT_STEP: f64 = 1e-5;
/// Step for the finite-difference Hessian in scaled units.
const HESSIAN_STEP: f64 = 1e-3;
/// Doublings allowed while bracketing a crossing.
const MAX_BRACKET_STEPS: usize = 30;
/// Iterations allowed while refining a crossing.
const MAX_CROSSING_STEPS: usize = 60;
/// Relative precision of a crossing.
const CROSSING_TOLERANCE: f64 = 1e-4;

pub struct LbfgsEngine {
    config: EngineConfig,
}

impl LbfgsEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    fn run_lbfgs(&self, problem: &ScaledProblem<'_>, start: Vec<f64>) -> Result<LbfgsRun, AppError> {
        let linesearch = MoreThuenteLineSearch::new();
        let tol_cost = if self.config.tolerance == 0.0 {
            0.0
        } else {
            (0.1 * self.config.tolerance).max(1e-12)
        };
        let solver = LBFGS::new(linesearch, self.config.memory)
            .with_tolerance_grad(self.config.tolerance)
            .map_err(|e| AppError::config(format!("Invalid minimizer tolerance: {e}")))?
            .with_tolerance_cost(tol_cost)
            .map_err(|e| AppError::config(format!("Invalid minimizer tolerance: {e}")))?;

        let res = Executor::new(ArgminProblem { problem }, solver)
            .configure(|state| state.param(start).max_iters(self.config.max_iterations))
            .run()
            .map_err(|e| AppError::minimizer(format!("L-BFGS failed: {e}")))?;

        let state = res.state();
        let best = state
            .get_best_param()
            .cloned()
            .ok_or_else(|| AppError::minimizer("L-BFGS returned no parameters."))?;
        let cost = state.get_best_cost();
        if !cost.is_finite() {
            return Err(AppError::minimizer(format!("L-BFGS ended on a non-finite objective ({cost}).")));
        }
        let termination = state.get_termination_status();
        let converged = matches!(
            termination,
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
                | TerminationStatus::Terminated(TerminationReason::TargetCostReached)
        );
        Ok(LbfgsRun {
            u: best,
            cost,
            iterations: state.get_iter(),
            converged,
            message: termination.to_string(),
        })
    }

    /// Minimum of the objective with the parameters in `pinned` held at the given values
    /// and the remaining free parameters of `outcome` re-optimized.
    fn profile(&self, objective: &dyn Objective, outcome: &FitOutcome, pinned: &[(usize, f64)]) -> Result<f64, AppError> {
        let mut template = outcome.params.clone();
        for &(i, v) in pinned {
            template[i] = v;
        }
        let others: Vec<usize> = (0..outcome.free.len())
            .filter(|&k| pinned.iter().all(|&(i, _)| outcome.free[k] != i))
            .collect();
        if others.is_empty() {
            return objective.eval(&template);
        }

        // Start from the linear-response guess x_o + V_op V_pp⁻¹ (p - p̂).
        let shift = conditional_shift(outcome, pinned, &others);
        let free: Vec<usize> = others.iter().map(|&k| outcome.free[k]).collect();
        let origin: Vec<f64> = free.iter().map(|&i| outcome.params[i]).collect();
        let scale: Vec<f64> = free.iter().map(|&i| outcome.errors[i]).collect();
        let start: Vec<f64> = shift.iter().zip(&scale).map(|(d, s)| d / s).collect();

        let problem = ScaledProblem::new(objective, template, free, origin, scale);
        let start_value = problem.value(&start)?;
        match self.run_lbfgs(&problem, start.clone()) {
            Ok(run) => Ok(run.cost.min(start_value)),
            Err(err) if err.kind() == crate::error::ErrorKind::Minimizer => {
                tracing::debug!(%err, "profile minimization failed, using the starting point");
                Ok(start_value)
            }
            Err(err) => Err(err),
        }
    }

    /// Smallest `t > 0` with `profile(point(t)) = fmin + up`, starting the search at `t0`.
    fn crossing<P>(&self, objective: &dyn Objective, outcome: &FitOutcome, t0: f64, point: P) -> Result<f64, AppError>
    where
        P: Fn(f64) -> Vec<(usize, f64)>,
    {
        let target = outcome.fmin + self.config.up;
        let g = |t: f64| -> Result<f64, AppError> { Ok(self.profile(objective, outcome, &point(t))? - target) };

        let (mut lo, mut g_lo) = (0.0, -self.config.up);
        let mut hi = t0;
        let mut g_hi = g(hi)?;
        let mut steps = 0;
        while g_hi < 0.0 {
            steps += 1;
            if steps > MAX_BRACKET_STEPS {
                return Err(AppError::minimizer(format!(
                    "Objective never rises by {} along the search direction.",
                    self.config.up
                )));
            }
            lo = hi;
            g_lo = g_hi;
            hi *= 2.0;
            g_hi = g(hi)?;
        }

        // Illinois variant of regula falsi on the bracket [lo, hi].
        let mut side = 0i8;
        for _ in 0..MAX_CROSSING_STEPS {
            let t = (lo * g_hi - hi * g_lo) / (g_hi - g_lo);
            let gt = g(t)?;
            if gt.abs() <= CROSSING_TOLERANCE * self.config.up || (hi - lo) <= CROSSING_TOLERANCE * hi {
                return Ok(t);
            }
            if gt < 0.0 {
                lo = t;
                g_lo = gt;
                if side == -1 {
                    g_hi *= 0.5;
                }
                side = -1;
            } else {
                hi = t;
                g_hi = gt;
                if side == 1 {
                    g_lo *= 0.5;
                }
                side = 1;
            }
        }
        Ok(0.5 * (lo + hi))
    }
}

impl Default for LbfgsEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Minimizer for LbfgsEngine {
    fn minimize(&self, objective: &dyn Objective, state: &ParameterState) -> Result<FitOutcome, AppError> {
        let settings = state.settings();
        let names: Vec<String> = settings.iter().map(|p| p.name.clone()).collect();
        let fixed: Vec<bool> = settings.iter().map(|p| p.fixed).collect();
        let free = state.free_indices();
        let values = state.values();

        for &i in &free {
            let step = settings[i].error;
            if !(step.is_finite() && step > 0.0) {
                return Err(AppError::config(format!(
                    "Free parameter '{}' needs a positive step size, got {step}.",
                    settings[i].name
                )));
            }
        }

        if free.is_empty() {
            let fmin = objective.eval(&values)?;
            return Ok(FitOutcome {
                names,
                errors: vec![0.0; values.len()],
                params: values,
                fixed,
                free,
                fmin,
                edm: 0.0,
                covariance: DMatrix::zeros(0, 0),
                global_cc: Vec::new(),
                iterations: 0,
                n_evals: 1,
                converged: true,
                message: "no free parameters".to_string(),
            });
        }

        let origin: Vec<f64> = free.iter().map(|&i| values[i]).collect();
        let scale: Vec<f64> = free.iter().map(|&i| settings[i].error).collect();
        let problem = ScaledProblem::new(objective, values.clone(), free.clone(), origin, scale.clone());

        let run = self.run_lbfgs(&problem, vec![0.0; free.len()])?;
        if !run.converged {
            tracing::warn!(status = %run.message, iterations = run.iterations, "minimizer did not converge");
        }

        let hessian = problem.hessian(&run.u, run.cost)?;
        let cov_u = invert_hessian(&hessian).ok_or_else(|| {
            AppError::minimizer("Hessian at the minimum is not positive definite.")
        })?;
        let grad = DVector::from_vec(problem.gradient(&run.u)?);
        let edm = 0.5 * grad.dot(&(&cov_u * &grad));

        // Back to parameter units: V = 2 up S H⁻¹ S.
        let n = free.len();
        let covariance = DMatrix::from_fn(n, n, |a, b| 2.0 * self.config.up * cov_u[(a, b)] * scale[a] * scale[b]);

        let params = problem.to_full(&run.u);
        let mut errors = vec![0.0; params.len()];
        for (k, &i) in free.iter().enumerate() {
            errors[i] = covariance[(k, k)].sqrt();
        }
        let global_cc = global_correlations(&covariance);

        tracing::debug!(fmin = run.cost, edm, iterations = run.iterations, "minimization finished");

        Ok(FitOutcome {
            names,
            params,
            errors,
            fixed,
            free,
            fmin: run.cost,
            edm,
            covariance,
            global_cc,
            iterations: run.iterations,
            n_evals: problem.evals(),
            converged: run.converged,
            message: run.message,
        })
    }

    fn minos(&self, objective: &dyn Objective, outcome: &FitOutcome, index: usize) -> Result<MinosError, AppError> {
        if outcome.free_position(index).is_none() {
            return Ok(MinosError { lower: 0.0, upper: 0.0 });
        }
        let center = outcome.params[index];
        let sigma = outcome.errors[index];
        let upper = self.crossing(objective, outcome, 1.0, |t| vec![(index, center + t * sigma)])?;
        let lower = self.crossing(objective, outcome, 1.0, |t| vec![(index, center - t * sigma)])?;
        Ok(MinosError {
            lower: -lower * sigma,
            upper: upper * sigma,
        })
    }

    fn contour(
        &self,
        objective: &dyn Objective,
        outcome: &FitOutcome,
        px: usize,
        py: usize,
        n_points: usize,
    ) -> Result<ContourPoints, AppError> {
        let (Some(a), Some(b)) = (outcome.free_position(px), outcome.free_position(py)) else {
            return Err(AppError::config(format!(
                "Contour parameters ({px},{py}) must both be floating."
            )));
        };
        if px == py {
            return Err(AppError::config("Contour parameters must be distinct."));
        }

        let (x0, y0) = (outcome.params[px], outcome.params[py]);
        let (sx, sy) = (outcome.errors[px], outcome.errors[py]);
        // Marginal covariance of the pair in σ units.
        let rho = outcome.covariance[(a, b)] / (sx * sy);
        let det = 1.0 - rho * rho;

        (0..n_points)
            .into_par_iter()
            .map(|k| {
                let theta = 2.0 * std::f64::consts::PI * k as f64 / n_points as f64;
                let (c, s) = (theta.cos(), theta.sin());
                // Quadratic estimate: (c² - 2ρcs + s²) t² / (1-ρ²) = 2 up.
                let q = (c * c - 2.0 * rho * c * s + s * s) / det;
                let t0 = if q.is_finite() && q > 0.0 {
                    (2.0 * self.config.up / q).sqrt()
                } else {
                    1.0
                };
                let t = self.crossing(objective, outcome, t0, |t| {
                    vec![(px, x0 + t * sx * c), (py, y0 + t * sy * s)]
                })?;
                Ok((x0 + t * sx * c, y0 + t * sy * s))
            })
            .collect()
    }
}

struct LbfgsRun {
    u: Vec<f64>,
    cost: f64,
    iterations: u64,
    converged: bool,
    message: String,
}

/// Objective restricted to a subset of parameters, in scaled coordinates
/// `x[free[k]] = origin[k] + scale[k] * u[k]`.
struct ScaledProblem<'a> {
    objective: &'a dyn Objective,
    template: Vec<f64>,
    free: Vec<usize>,
    origin: Vec<f64>,
    scale: Vec<f64>,
    evals: AtomicUsize,
}

impl<'a> ScaledProblem<'a> {
    fn new(objective: &'a dyn Objective, template: Vec<f64>, free: Vec<usize>, origin: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            objective,
            template,
            free,
            origin,
            scale,
            evals: AtomicUsize::new(0),
        }
    }

    fn to_full(&self, u: &[f64]) -> Vec<f64> {
        let mut x = self.template.clone();
        for (k, &i) in self.free.iter().enumerate() {
            x[i] = self.origin[k] + self.scale[k] * u[k];
        }
        x
    }

    fn evals(&self) -> usize {
        self.evals.load(Ordering::Relaxed)
    }

    fn value(&self, u: &[f64]) -> Result<f64, AppError> {
        self.evals.fetch_add(1, Ordering::Relaxed);
        self.objective.eval(&self.to_full(u))
    }

    fn gradient(&self, u: &[f64]) -> Result<Vec<f64>, AppError> {
        let mut grad = vec![0.0; u.len()];
        let mut probe = u.to_vec();
        for k in 0..u.len() {
            let eps = GRADIENT_STEP * u[k].abs().max(1.0);
            probe[k] = u[k] + eps;
            let f_plus = self.value(&probe)?;
            probe[k] = u[k] - eps;
            let f_minus = self.value(&probe)?;
            probe[k] = u[k];
            grad[k] = (f_plus - f_minus) / (2.0 * eps);
        }
        Ok(grad)
    }

    /// Central second differences around `u`, where the objective is `f0`.
    fn hessian(&self, u: &[f64], f0: f64) -> Result<DMatrix<f64>, AppError> {
        let n = u.len();
        let h = HESSIAN_STEP;
        let mut hess = DMatrix::zeros(n, n);
        let mut probe = u.to_vec();
        for i in 0..n {
            probe[i] = u[i] + h;
            let fp = self.value(&probe)?;
            probe[i] = u[i] - h;
            let fm = self.value(&probe)?;
            probe[i] = u[i];
            hess[(i, i)] = (fp - 2.0 * f0 + fm) / (h * h);
        }
        for i in 0..n {
            for j in (i + 1)..n {
                let mut corner = |di: f64, dj: f64| -> Result<f64, AppError> {
                    probe[i] = u[i] + di;
                    probe[j] = u[j] + dj;
                    let f = self.value(&probe);
                    probe[i] = u[i];
                    probe[j] = u[j];
                    f
                };
                let fpp = corner(h, h)?;
                let fpm = corner(h, -h)?;
                let fmp = corner(-h, h)?;
                let fmm = corner(-h, -h)?;
                let hij = (fpp - fpm - fmp + fmm) / (4.0 * h * h);
                hess[(i, j)] = hij;
                hess[(j, i)] = hij;
            }
        }
        Ok(hess)
    }
}

struct ArgminProblem<'p, 'a> {
    problem: &'p ScaledProblem<'a>,
}

impl CostFunction for ArgminProblem<'_, '_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        self.problem
            .value(params)
            .map_err(|e| argmin::core::Error::msg(e.to_string()))
    }
}

impl Gradient for ArgminProblem<'_, '_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, params: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        self.problem
            .gradient(params)
            .map_err(|e| argmin::core::Error::msg(e.to_string()))
    }
}

/// Invert a Hessian by Cholesky, adding diagonal damping if needed and
/// falling back to LU. `None` when no usable inverse exists.
fn invert_hessian(hessian: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let n = hessian.nrows();
    let identity = DMatrix::identity(n, n);
    let diag_scale = (0..n).map(|i| hessian[(i, i)].abs()).fold(0.0_f64, f64::max).max(1.0);

    let mut h_damped = hessian.clone();
    let mut damping = 0.0_f64;
    let max_attempts = 10;
    for attempt in 0..max_attempts {
        if let Some(chol) = nalgebra::linalg::Cholesky::new(h_damped.clone()) {
            if damping > 0.0 {
                tracing::warn!(damping, "Hessian needed diagonal damping to invert");
            }
            return Some(chol.solve(&identity));
        }
        if attempt + 1 == max_attempts {
            break;
        }
        let next = if damping == 0.0 { diag_scale * 1e-9 } else { damping * 10.0 };
        for i in 0..n {
            h_damped[(i, i)] += next - damping;
        }
        damping = next;
    }

    let cov = h_damped.lu().try_inverse()?;
    (0..n).all(|i| cov[(i, i)].is_finite() && cov[(i, i)] > 0.0).then_some(cov)
}

/// `ρ_i = sqrt(1 - 1 / (V_ii (V⁻¹)_ii))` for every parameter of `covariance`.
fn global_correlations(covariance: &DMatrix<f64>) -> Vec<f64> {
    let n = covariance.nrows();
    match covariance.clone().try_inverse() {
        Some(inv) => (0..n)
            .map(|i| {
                let prod = covariance[(i, i)] * inv[(i, i)];
                if prod > 0.0 { (1.0 - 1.0 / prod).clamp(0.0, 1.0).sqrt() } else { 0.0 }
            })
            .collect(),
        None => vec![0.0; n],
    }
}

/// Shift of the non-pinned free parameters implied by moving the pinned ones,
/// `V_op V_pp⁻¹ (p - p̂)`. Zero when the pinned block cannot be inverted.
fn conditional_shift(outcome: &FitOutcome, pinned: &[(usize, f64)], others: &[usize]) -> Vec<f64> {
    let pinned_pos: Vec<(usize, f64)> = pinned
        .iter()
        .filter_map(|&(i, v)| outcome.free_position(i).map(|k| (k, v - outcome.params[i])))
        .collect();
    if pinned_pos.is_empty() {
        return vec![0.0; others.len()];
    }
    let m = pinned_pos.len();
    let v_pp = DMatrix::from_fn(m, m, |a, b| outcome.covariance[(pinned_pos[a].0, pinned_pos[b].0)]);
    let delta = DVector::from_fn(m, |a, _| pinned_pos[a].1);
    let Some(v_pp_inv) = v_pp.try_inverse() else {
        return vec![0.0; others.len()];
    };
    let weights = v_pp_inv * delta;
    others
        .iter()
        .map(|&o| (0..m).map(|a| outcome.covariance[(o, pinned_pos[a].0)] * weights[a]).sum())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// `0.5 (x-a)ᵀ A (x-a)` with known inverse covariance `A`.
    struct Quadratic {
        center: Vec<f64>,
        a: DMatrix<f64>,
    }

    impl Quadratic {
        fn three_params() -> Self {
            let cov = DMatrix::from_row_slice(3, 3, &[
                0.04, 0.012, -0.004, //
                0.012, 0.09, 0.009, //
                -0.004, 0.009, 0.01,
            ]);
            Self {
                center: vec![1.0, 2.0, -0.5],
                a: cov.try_inverse().unwrap(),
            }
        }
    }

    impl Objective for Quadratic {
        fn eval(&self, params: &[f64]) -> Result<f64, AppError> {
            let d = DVector::from_iterator(params.len(), params.iter().zip(&self.center).map(|(x, c)| x - c));
            Ok(0.5 * d.dot(&(&self.a * &d)))
        }
    }

    fn state(values: &[f64]) -> ParameterState {
        let mut state = ParameterState::new();
        for (i, v) in values.iter().enumerate() {
            state.add(format!("p{i}"), *v, 0.1);
        }
        state
    }

    #[test]
    fn recovers_minimum_and_covariance() {
        let q = Quadratic::three_params();
        let engine = LbfgsEngine::default();
        let out = engine.minimize(&q, &state(&[0.8, 2.3, -0.4])).unwrap();
        assert!(out.converged, "{}", out.message);
        for (x, c) in out.params.iter().zip(&q.center) {
            assert_abs_diff_eq!(x, c, epsilon = 1e-4);
        }
        assert_abs_diff_eq!(out.fmin, 0.0, epsilon = 1e-6);
        let expected = q.a.clone().try_inverse().unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert_abs_diff_eq!(out.covariance[(i, j)], expected[(i, j)], epsilon = 1e-6);
            }
        }
        assert_abs_diff_eq!(out.errors[1], 0.3, epsilon = 1e-5);
        assert!(out.global_cc.iter().all(|r| (0.0..1.0).contains(r)));
    }

    #[test]
    fn fixed_parameters_stay_put() {
        let q = Quadratic::three_params();
        let mut st = state(&[0.8, 2.3, 0.0]);
        st.fix("p2").unwrap();
        let out = LbfgsEngine::default().minimize(&q, &st).unwrap();
        assert_eq!(out.params[2], 0.0);
        assert_eq!(out.errors[2], 0.0);
        assert_eq!(out.free, vec![0, 1]);
        assert_eq!(out.covariance.nrows(), 2);
        assert_eq!(out.correlation(0, 2), 0.0);
    }

    #[test]
    fn global_correlation_of_a_pair_is_its_correlation() {
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 0.6, 0.6, 4.0]);
        let rho = global_correlations(&cov);
        assert_abs_diff_eq!(rho[0], 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(rho[1], 0.3, epsilon = 1e-12);
    }

    #[test]
    fn minos_matches_parabolic_errors_for_quadratics() {
        let q = Quadratic::three_params();
        let engine = LbfgsEngine::default();
        let out = engine.minimize(&q, &state(&[0.8, 2.3, -0.4])).unwrap();
        let err = engine.minos(&q, &out, 0).unwrap();
        assert_abs_diff_eq!(err.upper, 0.2, epsilon = 1e-3);
        assert_abs_diff_eq!(err.lower, -0.2, epsilon = 1e-3);
    }

    #[test]
    fn contour_lies_on_the_marginal_ellipse() {
        let q = Quadratic::three_params();
        let engine = LbfgsEngine::default();
        let out = engine.minimize(&q, &state(&[0.8, 2.3, -0.4])).unwrap();
        let points = engine.contour(&q, &out, 0, 1, 12).unwrap();
        assert_eq!(points.len(), 12);

        // Profiling over p2 leaves the marginal 2x2 covariance.
        let cov = q.a.clone().try_inverse().unwrap();
        let c2 = DMatrix::from_row_slice(2, 2, &[cov[(0, 0)], cov[(0, 1)], cov[(1, 0)], cov[(1, 1)]]);
        let c2_inv = c2.try_inverse().unwrap();
        for (x, y) in points {
            let d = DVector::from_row_slice(&[x - 1.0, y - 2.0]);
            assert_abs_diff_eq!(d.dot(&(&c2_inv * &d)), 1.0, epsilon = 2e-3);
        }
    }

    #[test]
    fn contour_rejects_fixed_parameters() {
        let q = Quadratic::three_params();
        let mut st = state(&[0.8, 2.3, -0.5]);
        st.fix("p2").unwrap();
        let engine = LbfgsEngine::default();
        let out = engine.minimize(&q, &st).unwrap();
        assert!(engine.contour(&q, &out, 0, 2, 4).is_err());
        assert!(engine.contour(&q, &out, 1, 1, 4).is_err());
    }

    #[test]
    fn non_positive_steps_are_rejected() {
        let q = Quadratic::three_params();
        let mut st = ParameterState::new();
        st.add("p0", 1.0, 0.0);
        st.add("p1", 1.0, 0.1);
        st.add("p2", 1.0, 0.1);
        assert!(LbfgsEngine::default().minimize(&q, &st).is_err());
    }
}
