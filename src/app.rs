//! Top-level application orchestration.
//!
//! `src/main.rs` only maps errors to exit codes; this module is the real main:
//! - parses CLI arguments
//! - installs the tracing subscriber
//! - resolves and validates the fit configuration
//! - runs the fit pipeline and prints the summary
//! - reads back dumps for `inspect`

use clap::Parser;

use crate::cli::{Cli, Command, FitArgs, InspectArgs};
use crate::domain::{AxisSpec, FitConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `baofit` binary.
pub fn run() -> Result<(), AppError> {
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    // Only fails if a subscriber is already installed, which keeps the existing one.
    let _ = tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Command::Fit(args) => handle_fit(&args),
        Command::Inspect(args) => handle_inspect(&args),
    }
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(args)?;
    let run = pipeline::run_fit(&config)?;
    println!("{}", crate::report::format_fit_summary(&run.summary));
    Ok(())
}

fn handle_inspect(args: &InspectArgs) -> Result<(), AppError> {
    let dump = crate::io::read_dump(&args.dump)?;
    println!("{}", crate::report::format_dump_summary(&dump));
    Ok(())
}

/// Resolve CLI flags into a validated `FitConfig`.
pub fn fit_config_from_args(args: &FitArgs) -> Result<FitConfig, AppError> {
    let omega_matter = if args.omega_matter == 0.0 {
        1.0 - args.omega_lambda
    } else {
        args.omega_matter
    };

    if !(args.rmin.is_finite() && args.rmax.is_finite() && args.rmax > args.rmin) {
        return Err(AppError::config(format!(
            "Need rmax > rmin, got rmin={} rmax={}.",
            args.rmin, args.rmax
        )));
    }
    if args.model_bins < 2 {
        return Err(AppError::config(format!(
            "--model-bins must be at least 2, got {}.",
            args.model_bins
        )));
    }
    if let Some(bad) = args.contour_levels.iter().find(|l| !(l.is_finite() && **l > 0.0)) {
        return Err(AppError::config(format!("Contour levels must be positive, got {bad}.")));
    }
    if !(args.tolerance.is_finite() && args.tolerance >= 0.0) {
        return Err(AppError::config(format!(
            "--tolerance must be non-negative, got {}.",
            args.tolerance
        )));
    }
    if !args.zref.is_finite() || args.zref <= -1.0 {
        return Err(AppError::config(format!("--zref must exceed -1, got {}.", args.zref)));
    }

    Ok(FitConfig {
        omega_lambda: args.omega_lambda,
        omega_matter,
        fiducial: args.fiducial.clone(),
        nowiggles: args.nowiggles.clone(),
        zref: args.zref,
        rmin: args.rmin,
        rmax: args.rmax,
        data: args.data.clone(),
        ll_axis: AxisSpec {
            min: args.minll,
            step: args.dll,
            n_bins: args.nll,
        },
        dll2: args.dll2,
        sep_axis: AxisSpec {
            min: args.minsep,
            step: args.dsep,
            n_bins: args.nsep,
        },
        z_axis: AxisSpec {
            min: args.minz,
            step: args.dz,
            n_bins: args.nz,
        },
        dump: args.dump.clone(),
        summary_json: args.summary_json.clone(),
        model_bins: args.model_bins,
        n_contour: args.n_contour,
        contour_levels: args.contour_levels.clone(),
        contour_pairs: args.contour_pairs.clone(),
        max_iterations: args.max_iterations,
        tolerance: args.tolerance,
        minos: args.minos,
        fix_bao: args.fix_bao,
        no_bband: args.no_bband,
    })
}

/// Rewrite argv so a bare flag list means `baofit fit ...`.
///
/// Rules:
/// - `baofit --data run ...`        -> `baofit fit --data run ...`
/// - `baofit --help/--version/-h`   -> unchanged
/// - `baofit --log-level X fit ...` -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    // Only the first word after the global options can name a subcommand;
    // a later `fit` is an option value such as `--data fit`.
    let mut i = 1;
    while let Some(arg) = argv.get(i) {
        match arg.as_str() {
            "--log-level" => i += 2,
            a if a.starts_with("--log-level=") => i += 1,
            _ => break,
        }
    }
    let Some(first) = argv.get(i) else {
        return argv;
    };

    let is_top_level = matches!(first.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    let names_subcommand = matches!(first.as_str(), "fit" | "inspect");
    if !is_top_level && !names_subcommand && first.starts_with('-') {
        argv.insert(1, "fit".to_string());
    }
    argv
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Configuration matching the CLI defaults, with placeholder input prefixes.
    pub(crate) fn base_config() -> FitConfig {
        let cli = Cli::try_parse_from(["baofit", "fit", "--fiducial", "fid", "--nowiggles", "nw", "--data", "run"])
            .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        fit_config_from_args(&args).unwrap()
    }

    fn args(extra: &[&str]) -> FitArgs {
        let mut argv = vec!["baofit", "fit", "--fiducial", "f", "--nowiggles", "n", "--data", "d"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Fit(args) => args,
            Command::Inspect(_) => panic!("expected fit"),
        }
    }

    #[test]
    fn defaults_resolve_to_the_standard_run() {
        let config = base_config();
        assert_eq!(config.omega_matter, 0.266);
        assert_eq!(config.ll_axis, AxisSpec { min: 0.0002, step: 0.004, n_bins: 14 });
        assert_eq!(config.z_axis.n_bins, 2);
        assert_eq!(config.model_bins, 200);
        assert!(config.contours_requested());
    }

    #[test]
    fn zero_omega_matter_means_flat() {
        let config = fit_config_from_args(&args(&["--omega-matter", "0", "--omega-lambda", "0.7"])).unwrap();
        assert!((config.omega_matter - 0.3).abs() < 1e-12);
    }

    #[test]
    fn rejects_invalid_options() {
        for extra in [
            &["--rmin", "50", "--rmax", "40"][..],
            &["--model-bins", "1"][..],
            &["--contour-levels", "2.3,-1"][..],
            &["--tolerance", "-1"][..],
        ] {
            let err = fit_config_from_args(&args(extra)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Config, "{extra:?}");
        }
    }

    #[test]
    fn bare_flags_default_to_fit() {
        let argv = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(rewrite_args(argv(&["baofit", "--data", "x"]))[1], "fit");
        assert_eq!(rewrite_args(argv(&["baofit", "--help"]))[1], "--help");
        assert_eq!(rewrite_args(argv(&["baofit", "--log-level", "info", "fit"]))[1], "--log-level");
        assert_eq!(rewrite_args(argv(&["baofit", "inspect", "a.dump"]))[1], "inspect");
        assert_eq!(rewrite_args(argv(&["baofit"])).len(), 1);
    }

    #[test]
    fn option_values_named_like_subcommands_still_default_to_fit() {
        let argv = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let out = rewrite_args(argv(&["baofit", "--data", "fit", "--fiducial", "inspect"]));
        assert_eq!(out, argv(&["baofit", "fit", "--data", "fit", "--fiducial", "inspect"]));

        let out = rewrite_args(argv(&["baofit", "--log-level=debug", "--data", "fit"]));
        assert_eq!(out[1], "fit");
        assert_eq!(out[3], "--data");
        let out = rewrite_args(argv(&["baofit", "--log-level", "warn", "inspect", "a.dump"]));
        assert_eq!(out[1], "--log-level");

        let cli = Cli::try_parse_from(rewrite_args(argv(&[
            "baofit", "--data", "fit", "--fiducial", "fid", "--nowiggles", "nw",
        ])))
        .unwrap();
        assert!(matches!(cli.command, Command::Fit(ref args) if args.data.as_os_str() == "fit"));
    }
}
