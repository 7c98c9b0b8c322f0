//! Plain-text rendering of a fit summary.
//!
//! Kept apart from the fitting code so output changes stay local.

use crate::domain::ParamId;
use crate::io::DumpFile;
use crate::report::FitSummary;

/// Format the fit summary: statistics, parameter table, correlations.
pub fn format_fit_summary(summary: &FitSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} - Lyman-alpha BAO fit ===\n", env!("CARGO_PKG_NAME")));
    out.push_str(&format!(
        "Data: n={} | in window={} | free params={} | dof={}\n",
        summary.n_data, summary.n_in_window, summary.n_free, summary.dof
    ));
    out.push_str(&format!(
        "chi2={:.4} | fmin={:.6} | edm={:.3e} | iterations={}{}\n",
        summary.chi_square,
        summary.fmin,
        summary.edm,
        summary.iterations,
        if summary.converged { "" } else { " | NOT CONVERGED" },
    ));

    let any_minos = summary.parameters.iter().any(|p| p.minos.is_some());
    out.push_str("\nParameters:\n");
    out.push_str(&format!("  {:<10} {:>13} {:>12}  {:<8}", "name", "value", "error", "status"));
    if any_minos {
        out.push_str(&format!(" {:>12} {:>12}", "minos-", "minos+"));
    }
    out.push('\n');
    for p in &summary.parameters {
        let status = if p.floating { "float" } else { "fixed" };
        out.push_str(&format!("  {:<10} {:>13.6} {:>12.6}  {:<8}", p.name, p.value, p.error, status));
        if let Some(m) = p.minos {
            out.push_str(&format!(" {:>12.6} {:>+12.6}", m.lower, m.upper));
        }
        out.push('\n');
    }

    if !summary.free_names.is_empty() {
        out.push_str("\nCorrelations (global cc in last column):\n");
        out.push_str(&format!("  {:<10}", ""));
        for name in &summary.free_names {
            out.push_str(&format!(" {:>9}", truncate(name, 9)));
        }
        out.push_str(&format!(" {:>9}\n", "global"));
        for (a, name) in summary.free_names.iter().enumerate() {
            out.push_str(&format!("  {:<10}", name));
            for b in 0..summary.free_names.len() {
                let denom = (summary.covariance[a][a] * summary.covariance[b][b]).sqrt();
                let rho = if denom > 0.0 { summary.covariance[a][b] / denom } else { 0.0 };
                out.push_str(&format!(" {:>9.3}", rho));
            }
            out.push_str(&format!(" {:>9.3}\n", summary.global_cc.get(a).copied().unwrap_or(0.0)));
        }
    }

    if !summary.contour_levels.is_empty() {
        let levels: Vec<String> = summary.contour_levels.iter().map(|l| l.to_string()).collect();
        out.push_str(&format!("\nContour levels: {}\n", levels.join(", ")));
        let pairs: Vec<String> = summary.contour_pairs.iter().map(ToString::to_string).collect();
        out.push_str(&format!("Contour planes: {}\n", pairs.join(", ")));
    }

    out
}

/// Short description of a dump read back from disk.
pub fn format_dump_summary(dump: &DumpFile) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} - fit dump ===\n", env!("CARGO_PKG_NAME")));
    out.push_str(&format!(
        "Bins: ll={} | sep={} | z={}\n",
        dump.ll_edges.len().saturating_sub(1),
        dump.sep_edges.len().saturating_sub(1),
        dump.z_edges.len().saturating_sub(1),
    ));

    out.push_str("\nParameters:\n");
    for (k, value) in dump.params.iter().enumerate() {
        let label = ParamId::ALL.get(k).map_or("?", |p| p.display_name());
        out.push_str(&format!("  {:<10} {:>13.6}\n", label, value));
    }

    let in_window: Vec<f64> = dump.observations.iter().map(|o| o.pull).filter(|p| *p != 0.0).collect();
    let chi2: f64 = in_window.iter().map(|p| p * p).sum();
    let worst = dump
        .observations
        .iter()
        .max_by(|a, b| a.pull.abs().partial_cmp(&b.pull.abs()).unwrap_or(std::cmp::Ordering::Equal));
    out.push_str(&format!(
        "\nObservations: n={} | non-zero pulls={} | sum pull²={:.3}\n",
        dump.n_data,
        in_window.len(),
        chi2
    ));
    if let Some(w) = worst {
        out.push_str(&format!("Largest pull: {:+.3} at bin {}\n", w.pull, w.index));
    }
    out.push_str(&format!(
        "Model grid: {} points ({} bins per axis)\n",
        dump.grid.len(),
        dump.model_bins
    ));
    out.push_str(&format!(
        "Contours: {} of {} points\n",
        dump.contours().len(),
        dump.n_contour
    ));

    out
}

fn truncate(s: &str, width: usize) -> &str {
    match s.char_indices().nth(width) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
