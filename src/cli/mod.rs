//! Command-line parsing for the BAO fitter.
//!
//! Argument parsing and command dispatch stay separate from the fitting code;
//! `app::fit_config_from_args` turns the parsed flags into a `FitConfig`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::ContourPair;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "baofit", version, about = "Lyman-alpha BAO correlation-function fitter")]
pub struct Cli {
    /// Maximum log level (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value_t = tracing::Level::WARN)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the BAO model to a binned 3D correlation measurement.
    Fit(FitArgs),
    /// Summarize a dump written by `baofit fit --dump`.
    Inspect(InspectArgs),
}

/// Options for a fit.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Present-day vacuum energy density.
    #[arg(long, default_value_t = 0.734)]
    pub omega_lambda: f64,

    /// Present-day matter density; 0 means 1 - omega-lambda.
    #[arg(long, default_value_t = 0.266)]
    pub omega_matter: f64,

    /// Fiducial model prefix; reads NAME.0.dat, NAME.2.dat, NAME.4.dat.
    #[arg(long, value_name = "NAME")]
    pub fiducial: PathBuf,

    /// No-wiggles model prefix; reads NAME.0.dat, NAME.2.dat, NAME.4.dat.
    #[arg(long, value_name = "NAME")]
    pub nowiggles: PathBuf,

    /// Reference redshift of the model tables.
    #[arg(long, default_value_t = 2.25)]
    pub zref: f64,

    /// Minimum 3D separation (Mpc/h) used in the fit.
    #[arg(long, default_value_t = 0.0)]
    pub rmin: f64,

    /// Maximum 3D separation (Mpc/h) used in the fit.
    #[arg(long, default_value_t = 200.0)]
    pub rmax: f64,

    /// Data prefix; reads NAME.params and NAME.cov.
    #[arg(long, value_name = "NAME")]
    pub data: PathBuf,

    /// First log-lambda bin edge (breakpoint for two-step binning).
    #[arg(long, default_value_t = 0.0002)]
    pub minll: f64,

    /// Log-lambda bin size.
    #[arg(long, default_value_t = 0.004)]
    pub dll: f64,

    /// Linear bin size below the breakpoint; non-zero selects two-step binning.
    #[arg(long, default_value_t = 0.0)]
    pub dll2: f64,

    /// Number of log-lambda bins.
    #[arg(long, default_value_t = 14)]
    pub nll: usize,

    /// First separation bin edge (arcmin).
    #[arg(long, default_value_t = 0.0)]
    pub minsep: f64,

    /// Separation bin size (arcmin).
    #[arg(long, default_value_t = 10.0)]
    pub dsep: f64,

    /// Number of separation bins.
    #[arg(long, default_value_t = 14)]
    pub nsep: usize,

    /// First redshift bin edge.
    #[arg(long, default_value_t = 1.7)]
    pub minz: f64,

    /// Redshift bin size.
    #[arg(long, default_value_t = 1.0)]
    pub dz: f64,

    /// Number of redshift bins.
    #[arg(long, default_value_t = 2)]
    pub nz: usize,

    /// Write fit results, model grid and contours to this file.
    #[arg(long, value_name = "FILE")]
    pub dump: Option<PathBuf>,

    /// Write a JSON fit summary to this file.
    #[arg(long = "summary-json", value_name = "FILE")]
    pub summary_json: Option<PathBuf>,

    /// Model grid bins per axis in the dump.
    #[arg(long, default_value_t = 200)]
    pub model_bins: usize,

    /// Points per contour (0 disables contours).
    #[arg(long = "ncontour", default_value_t = 40)]
    pub n_contour: usize,

    /// Error scales at which contours are traced, in dump order.
    #[arg(long, value_delimiter = ',', default_values_t = [5.99146, 2.29575])]
    pub contour_levels: Vec<f64>,

    /// Parameter planes to trace, as x:y, in dump order within each level.
    ///
    /// Without this flag every floating pair of x in {bb-a1, bao-scale, bias}
    /// and y in {bb-a2, bao-ampl, beta} is traced (y outermost). bb-a2 is
    /// always fixed, so at most six of those nine planes appear in the dump.
    /// Listed pairs must all be floating.
    #[arg(long, value_delimiter = ',')]
    pub contour_pairs: Option<Vec<ContourPair>>,

    /// Minimizer iteration cap.
    #[arg(long, default_value_t = 1000)]
    pub max_iterations: u64,

    /// Minimizer gradient tolerance.
    #[arg(long, default_value_t = 1e-6)]
    pub tolerance: f64,

    /// Compute asymmetric profile errors for every floating parameter.
    #[arg(long)]
    pub minos: bool,

    /// Fix the BAO amplitude and scale at 1.
    #[arg(long)]
    pub fix_bao: bool,

    /// Fix the 1/r² broadband term at 0.
    #[arg(long)]
    pub no_bband: bool,
}

/// Options for reading back a dump.
#[derive(Debug, Parser)]
pub struct InspectArgs {
    /// Dump file produced by `baofit fit --dump`.
    #[arg(value_name = "FILE")]
    pub dump: PathBuf,
}
