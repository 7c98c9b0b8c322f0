//! Shared domain types.
//!
//! These are plain values passed between the CLI, the pipeline and the
//! reports: the fit parameter catalogue, contour selections and the resolved
//! run configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

/// Number of model parameters.
pub const N_PARAMS: usize = 8;

/// Model parameters, in the order they appear in every parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamId {
    /// Exponent of the `(1+z)/(1+zref)` evolution factor.
    Alpha,
    Bias,
    /// Redshift-space distortion parameter.
    Beta,
    BaoAmpl,
    BaoScale,
    /// Broadband `1e-1 a1 / r²` coefficient.
    BbA1,
    /// Broadband `1e-3 a2 / r` coefficient.
    BbA2,
    /// Broadband `1e-5 a3` constant.
    BbA3,
}

impl ParamId {
    pub const ALL: [ParamId; N_PARAMS] = [
        ParamId::Alpha,
        ParamId::Bias,
        ParamId::Beta,
        ParamId::BaoAmpl,
        ParamId::BaoScale,
        ParamId::BbA1,
        ParamId::BbA2,
        ParamId::BbA3,
    ];

    /// Position in a parameter vector.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Command-line / JSON name.
    pub fn name(self) -> &'static str {
        match self {
            ParamId::Alpha => "alpha",
            ParamId::Bias => "bias",
            ParamId::Beta => "beta",
            ParamId::BaoAmpl => "bao-ampl",
            ParamId::BaoScale => "bao-scale",
            ParamId::BbA1 => "bb-a1",
            ParamId::BbA2 => "bb-a2",
            ParamId::BbA3 => "bb-a3",
        }
    }

    /// Label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ParamId::Alpha => "Alpha",
            ParamId::Bias => "Bias",
            ParamId::Beta => "Beta",
            ParamId::BaoAmpl => "BAO Ampl",
            ParamId::BaoScale => "BAO Scale",
            ParamId::BbA1 => "BB a1",
            ParamId::BbA2 => "BB a2",
            ParamId::BbA3 => "BB a3",
        }
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParamId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ParamId::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = ParamId::ALL.iter().map(|p| p.name()).collect();
                format!("unknown parameter '{s}' (expected one of {})", names.join(", "))
            })
    }
}

/// Two parameters spanning a contour plane, written `x:y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContourPair {
    pub x: ParamId,
    pub y: ParamId,
}

/// Contour planes traced when none are given: x in {a1, scale, bias} crossed
/// with y in {a2, ampl, beta}, y outermost. Pairs over a fixed parameter are
/// skipped at run time.
pub const DEFAULT_CONTOUR_PAIRS: [ContourPair; 9] = {
    use ParamId::{BaoAmpl, BaoScale, BbA1, BbA2, Beta, Bias};
    [
        ContourPair { x: BbA1, y: BbA2 },
        ContourPair { x: BaoScale, y: BbA2 },
        ContourPair { x: Bias, y: BbA2 },
        ContourPair { x: BbA1, y: BaoAmpl },
        ContourPair { x: BaoScale, y: BaoAmpl },
        ContourPair { x: Bias, y: BaoAmpl },
        ContourPair { x: BbA1, y: Beta },
        ContourPair { x: BaoScale, y: Beta },
        ContourPair { x: Bias, y: Beta },
    ]
};

impl fmt::Display for ContourPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

impl FromStr for ContourPair {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(':')
            .ok_or_else(|| format!("contour pair '{s}' must be written as x:y"))?;
        let pair = ContourPair {
            x: x.parse()?,
            y: y.parse()?,
        };
        if pair.x == pair.y {
            return Err(format!("contour pair '{s}' uses the same parameter twice"));
        }
        Ok(pair)
    }
}

/// A uniform axis given by its first edge, bin width and bin count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSpec {
    pub min: f64,
    pub step: f64,
    pub n_bins: usize,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub omega_lambda: f64,
    /// Already resolved: a zero on the command line means `1 - omega_lambda`.
    pub omega_matter: f64,

    /// Prefix of the fiducial multipole tables.
    pub fiducial: PathBuf,
    /// Prefix of the no-wiggles multipole tables.
    pub nowiggles: PathBuf,
    pub zref: f64,

    pub rmin: f64,
    pub rmax: f64,

    /// Prefix of the `.params` / `.cov` inputs.
    pub data: PathBuf,
    pub ll_axis: AxisSpec,
    /// Second log-lambda step; non-zero selects two-step binning.
    pub dll2: f64,
    pub sep_axis: AxisSpec,
    pub z_axis: AxisSpec,

    pub dump: Option<PathBuf>,
    pub summary_json: Option<PathBuf>,
    pub model_bins: usize,

    /// Points per contour; zero disables contours.
    pub n_contour: usize,
    /// Error scales, one contour set per entry.
    pub contour_levels: Vec<f64>,
    /// Planes to trace. `None` selects the floating subset of
    /// `DEFAULT_CONTOUR_PAIRS`; an explicit list must be all floating.
    pub contour_pairs: Option<Vec<ContourPair>>,

    pub max_iterations: u64,
    pub tolerance: f64,
    pub minos: bool,
    pub fix_bao: bool,
    pub no_bband: bool,
}

impl FitConfig {
    pub fn contours_requested(&self) -> bool {
        self.n_contour > 0
            && !self.contour_levels.is_empty()
            && self.contour_pairs.as_ref().is_none_or(|pairs| !pairs.is_empty())
    }
}
