//! The fit workflow shared by every front-end:
//! cosmology -> model references -> dataset -> likelihood -> minimize ->
//! MINOS errors -> contours -> dump / summary.
//!
//! Front-ends only present the returned `RunOutput`.

use std::sync::Arc;

use crate::cosmo::{Cosmology, LambdaCdm, RsdCorrelation};
use crate::domain::{ContourPair, DEFAULT_CONTOUR_PAIRS, FitConfig};
use crate::error::AppError;
use crate::fit::{
    ContourPoints, EngineConfig, FitOutcome, LbfgsEngine, Likelihood, Minimizer, MinosError, ParameterState,
};
use crate::io::{load_dataset, load_multipoles, write_summary_json};
use crate::models::BaoModel;
use crate::report::{FitSummary, summarize};

/// One traced contour.
#[derive(Debug, Clone)]
pub struct ContourSet {
    pub level: f64,
    pub pair: ContourPair,
    pub points: ContourPoints,
}

/// All computed outputs of a single `baofit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub outcome: FitOutcome,
    /// Indexed like the parameters; `None` when not computed or fixed.
    pub minos: Vec<Option<MinosError>>,
    /// Level-major, then in the configured pair order.
    pub contours: Vec<ContourSet>,
    pub summary: FitSummary,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    // 1) Cosmology and model references.
    let cosmology: Arc<dyn Cosmology> = Arc::new(LambdaCdm::new(config.omega_lambda, config.omega_matter)?);
    tracing::info!(
        zref = config.zref,
        distance = cosmology.line_of_sight_comoving_distance(config.zref),
        growth = cosmology.growth_function(config.zref),
        "cosmology ready"
    );
    let fiducial = RsdCorrelation::from_splines(load_multipoles(&config.fiducial)?);
    let nowiggles = RsdCorrelation::from_splines(load_multipoles(&config.nowiggles)?);
    let model = BaoModel::new(Box::new(fiducial), Box::new(nowiggles), config.zref);

    // 2) Observations and covariance.
    let dataset = load_dataset(config, cosmology)?;
    let mut likelihood = Likelihood::new(
        &dataset,
        &model,
        config.rmin,
        config.rmax,
        config.fix_bao,
        config.no_bband,
    )?;
    tracing::info!(
        n_data = dataset.n_data(),
        n_in_window = likelihood.n_in_window(),
        "likelihood ready"
    );
    let contour_pairs = if config.contours_requested() {
        resolve_contour_pairs(&likelihood, config.contour_pairs.as_deref())?
    } else {
        Vec::new()
    };

    // 3) Best fit.
    let engine = LbfgsEngine::new(EngineConfig {
        max_iterations: config.max_iterations,
        tolerance: config.tolerance,
        ..EngineConfig::default()
    });
    let mut state = ParameterState::new();
    likelihood.initialize(&mut state)?;
    let outcome = engine.minimize(&likelihood, &state)?;
    if !outcome.converged {
        tracing::warn!(status = %outcome.message, "best fit did not converge; reporting it anyway");
    }
    tracing::info!(
        fmin = outcome.fmin,
        edm = outcome.edm,
        iterations = outcome.iterations,
        "fit complete"
    );

    // 4) Profile errors.
    let mut minos = vec![None; outcome.params.len()];
    if config.minos {
        for &i in &outcome.free {
            let err = engine.minos(&likelihood, &outcome, i)?;
            tracing::debug!(param = %outcome.names[i], lower = err.lower, upper = err.upper, "minos");
            minos[i] = Some(err);
        }
    }

    // 5) Contours, one re-fit per error scale.
    let mut contours = Vec::new();
    if !contour_pairs.is_empty() {
        for param in likelihood.parameters().to_vec() {
            likelihood.parameter_mut(param.id).set_value(outcome.params[param.id.index()]);
        }
        for &level in &config.contour_levels {
            likelihood.set_error_scale(level)?;
            let mut state = ParameterState::new();
            likelihood.initialize(&mut state)?;
            let refit = engine.minimize(&likelihood, &state)?;
            for &pair in &contour_pairs {
                let points = engine.contour(&likelihood, &refit, pair.x.index(), pair.y.index(), config.n_contour)?;
                tracing::info!(level, %pair, points = points.len(), "contour traced");
                contours.push(ContourSet { level, pair, points });
            }
        }
        likelihood.set_error_scale(1.0)?;
    }

    // 6) Outputs.
    if let Some(path) = &config.dump {
        let blocks: Vec<ContourPoints> = contours.iter().map(|c| c.points.clone()).collect();
        likelihood.dump(path, &outcome.params, &blocks, config.model_bins)?;
        tracing::info!(path = %path.display(), "fit results dumped");
    }

    let levels: &[f64] = if contour_pairs.is_empty() {
        &[]
    } else {
        &config.contour_levels
    };
    let summary = summarize(&likelihood, &outcome, &minos, levels, &contour_pairs)?;
    if let Some(path) = &config.summary_json {
        write_summary_json(path, &summary)?;
        tracing::info!(path = %path.display(), "summary written");
    }

    Ok(RunOutput {
        outcome,
        minos,
        contours,
        summary,
    })
}

/// Planes to trace: an explicit list must be entirely floating, the default
/// grid keeps only its floating pairs.
fn resolve_contour_pairs(
    likelihood: &Likelihood<'_>,
    requested: Option<&[ContourPair]>,
) -> Result<Vec<ContourPair>, AppError> {
    let params = likelihood.parameters();
    let fixed = |pair: &ContourPair| {
        [pair.x, pair.y]
            .into_iter()
            .find(|id| !params[id.index()].is_floating())
    };

    let Some(pairs) = requested else {
        let (kept, skipped): (Vec<ContourPair>, Vec<ContourPair>) =
            DEFAULT_CONTOUR_PAIRS.into_iter().partition(|p| fixed(p).is_none());
        if !skipped.is_empty() {
            let names: Vec<String> = skipped.iter().map(ToString::to_string).collect();
            tracing::info!(skipped = %names.join(","), "default contour planes over fixed parameters skipped");
        }
        return Ok(kept);
    };

    for pair in pairs {
        if let Some(id) = fixed(pair) {
            return Err(AppError::config(format!(
                "Contour pair {pair} uses '{id}', which is fixed in this fit."
            )));
        }
    }
    Ok(pairs.to_vec())
}
