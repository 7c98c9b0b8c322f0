//! One-dimensional binning of a continuous coordinate.
//!
//! The three supported schemes form a closed set, so they are modelled as a
//! single enum rather than a trait object:
//!
//! - `Uniform`: `n` equal-width bins starting at `low_edge`
//! - `Variable`: explicit, strictly increasing edges
//! - `TwoStep`: a zero-width-ish bin at the origin, uniform bins up to a
//!   breakpoint, then geometrically growing bins with log-weighted centers
//!
//! Intervals are closed on the left and open on the right.

use crate::error::AppError;

/// Relative half-width (in units of the linear step) of the bin straddling zero
/// in the two-step scheme.
const ZERO_BIN_EPS: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq)]
pub enum Binning {
    Uniform {
        n_bins: usize,
        low_edge: f64,
        bin_size: f64,
    },
    Variable {
        edges: Vec<f64>,
    },
    TwoStep {
        edges: Vec<f64>,
        centers: Vec<f64>,
    },
}

impl Binning {
    /// `n_bins` bins of width `bin_size` starting at `low_edge`.
    pub fn uniform(n_bins: usize, low_edge: f64, bin_size: f64) -> Result<Self, AppError> {
        if n_bins == 0 {
            return Err(AppError::config("Uniform binning needs at least one bin."));
        }
        if !(bin_size.is_finite() && bin_size > 0.0) {
            return Err(AppError::config(format!(
                "Uniform binning needs a positive bin size, got {bin_size}."
            )));
        }
        if !low_edge.is_finite() {
            return Err(AppError::config(format!(
                "Uniform binning needs a finite low edge, got {low_edge}."
            )));
        }
        Ok(Binning::Uniform {
            n_bins,
            low_edge,
            bin_size,
        })
    }

    /// Bins defined by explicit edges (`edges.len() - 1` bins).
    pub fn variable(edges: Vec<f64>) -> Result<Self, AppError> {
        validate_edges(&edges)?;
        Ok(Binning::Variable { edges })
    }

    /// Linear-then-logarithmic binning.
    ///
    /// Produces `n_bins` bins: one bin of width `2*eps*lin_step` centered on zero,
    /// `floor(breakpoint/lin_step)` uniform bins of width `lin_step`, and the
    /// remainder spaced geometrically from `breakpoint` with ratio
    /// `(breakpoint+log_step)/breakpoint`.
    pub fn two_step(n_bins: usize, breakpoint: f64, log_step: f64, lin_step: f64) -> Result<Self, AppError> {
        let all_positive = [breakpoint, log_step, lin_step]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0);
        if !all_positive {
            return Err(AppError::config(format!(
                "Two-step binning needs positive breakpoint, log step and linear step \
                 (got {breakpoint}, {log_step}, {lin_step})."
            )));
        }
        // Count as f64 first: a tiny linear step would overflow usize.
        let n_uniform = (breakpoint / lin_step).floor();
        if !n_uniform.is_finite() || n_uniform + 1.0 > n_bins as f64 {
            return Err(AppError::config(format!(
                "Two-step binning with breakpoint {breakpoint} and step {lin_step} needs at least \
                 {} bins, got {n_bins}.",
                n_uniform + 1.0
            )));
        }
        let n_uniform = n_uniform as usize;

        let mut edges = Vec::with_capacity(n_bins + 1);
        let mut centers = Vec::with_capacity(n_bins);

        edges.push(-ZERO_BIN_EPS * lin_step);
        edges.push(ZERO_BIN_EPS * lin_step);
        centers.push(0.0);

        for k in 1..=n_uniform {
            edges.push(k as f64 * lin_step);
            centers.push((k as f64 - 0.5) * lin_step);
        }

        let ratio = ((breakpoint + log_step) / breakpoint).ln();
        for k in 1..(n_bins - n_uniform) {
            edges.push(breakpoint * (ratio * k as f64).exp());
            centers.push(breakpoint * (ratio * (k as f64 - 0.5)).exp());
        }

        validate_edges(&edges)?;
        Ok(Binning::TwoStep { edges, centers })
    }

    /// Total number of bins.
    pub fn n_bins(&self) -> usize {
        match self {
            Binning::Uniform { n_bins, .. } => *n_bins,
            Binning::Variable { edges } | Binning::TwoStep { edges, .. } => edges.len() - 1,
        }
    }

    /// Bin containing `value`, or `None` when it is outside the binned range.
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        match self {
            Binning::Uniform {
                n_bins,
                low_edge,
                bin_size,
            } => {
                let bin = ((value - low_edge) / bin_size).floor();
                if bin.is_finite() && bin >= 0.0 && bin < *n_bins as f64 {
                    Some(bin as usize)
                } else {
                    None
                }
            }
            Binning::Variable { edges } | Binning::TwoStep { edges, .. } => {
                if !(value >= edges[0]) {
                    return None;
                }
                edges[1..].iter().position(|&edge| value < edge)
            }
        }
    }

    /// Lower edge of bin `index`. `index == n_bins()` gives the upper edge of the last bin.
    ///
    /// # Panics
    /// Panics if `index > n_bins()`.
    pub fn bin_low_edge(&self, index: usize) -> f64 {
        match self {
            Binning::Uniform {
                n_bins,
                low_edge,
                bin_size,
            } => {
                assert!(index <= *n_bins, "bin edge index {index} out of range");
                low_edge + index as f64 * bin_size
            }
            Binning::Variable { edges } | Binning::TwoStep { edges, .. } => edges[index],
        }
    }

    /// Full width of bin `index`.
    ///
    /// # Panics
    /// Panics if `index >= n_bins()`.
    pub fn bin_size(&self, index: usize) -> f64 {
        match self {
            Binning::Uniform { n_bins, bin_size, .. } => {
                assert!(index < *n_bins, "bin index {index} out of range");
                *bin_size
            }
            Binning::Variable { edges } | Binning::TwoStep { edges, .. } => {
                assert!(index + 1 < edges.len(), "bin index {index} out of range");
                edges[index + 1] - edges[index]
            }
        }
    }

    /// Representative coordinate of bin `index`.
    ///
    /// This is the midpoint except for the two-step scheme, whose centers are
    /// fixed at construction (log-weighted in the geometric region).
    ///
    /// # Panics
    /// Panics if `index >= n_bins()`.
    pub fn bin_center(&self, index: usize) -> f64 {
        match self {
            Binning::TwoStep { centers, .. } => centers[index],
            _ => self.bin_low_edge(index) + 0.5 * self.bin_size(index),
        }
    }

    /// All `n_bins() + 1` edges in increasing order.
    pub fn edges(&self) -> Vec<f64> {
        (0..=self.n_bins()).map(|i| self.bin_low_edge(i)).collect()
    }

    /// One-line text form: the bin count followed by every edge.
    pub fn to_line(&self) -> String {
        let mut out = self.n_bins().to_string();
        for edge in self.edges() {
            out.push(' ');
            out.push_str(&edge.to_string());
        }
        out
    }
}

fn validate_edges(edges: &[f64]) -> Result<(), AppError> {
    if edges.len() < 2 {
        return Err(AppError::config("A binning needs at least two edges."));
    }
    if edges.iter().any(|e| !e.is_finite()) {
        return Err(AppError::config("Bin edges must be finite."));
    }
    if edges.windows(2).any(|w| w[1] <= w[0]) {
        return Err(AppError::config("Bin edges must be strictly increasing."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn all_kinds() -> Vec<Binning> {
        vec![
            Binning::uniform(14, 0.0002, 0.004).unwrap(),
            Binning::uniform(2, 1.7, 1.0).unwrap(),
            Binning::variable(vec![-1.0, 0.5, 2.0, 7.5, 30.0]).unwrap(),
            Binning::two_step(14, 0.01, 0.004, 0.002).unwrap(),
        ]
    }

    #[test]
    fn center_maps_back_to_its_bin() {
        for binning in all_kinds() {
            for i in 0..binning.n_bins() {
                assert_eq!(binning.bin_index(binning.bin_center(i)), Some(i), "{binning:?} bin {i}");
            }
        }
    }

    #[test]
    fn uniform_edges_step_by_bin_size() {
        let b = Binning::uniform(14, 0.0, 10.0).unwrap();
        for i in 0..b.n_bins() {
            assert_relative_eq!(b.bin_low_edge(i + 1) - b.bin_low_edge(i), b.bin_size(i));
        }
        assert_relative_eq!(b.bin_low_edge(14), 140.0);
    }

    #[test]
    fn edges_are_strictly_increasing() {
        for binning in all_kinds() {
            let edges = binning.edges();
            assert_eq!(edges.len(), binning.n_bins() + 1);
            assert!(edges.windows(2).all(|w| w[1] > w[0]), "{edges:?}");
        }
    }

    #[test]
    fn out_of_range_values_have_no_bin() {
        let uniform = Binning::uniform(3, 0.0, 1.0).unwrap();
        assert_eq!(uniform.bin_index(-0.1), None);
        assert_eq!(uniform.bin_index(3.0), None);
        assert_eq!(uniform.bin_index(f64::NAN), None);

        let variable = Binning::variable(vec![0.0, 1.0, 4.0]).unwrap();
        assert_eq!(variable.bin_index(-1e-9), None);
        assert_eq!(variable.bin_index(4.0), None);
        assert_eq!(variable.bin_index(1.0), Some(1));
    }

    #[test]
    fn two_step_layout() {
        // breakpoint 1 with linear step 0.25 gives 4 uniform bins after the zero bin.
        let b = Binning::two_step(10, 1.0, 0.5, 0.25).unwrap();
        assert_eq!(b.n_bins(), 10);
        assert_relative_eq!(b.bin_low_edge(0), -0.25e-3);
        assert_relative_eq!(b.bin_low_edge(1), 0.25e-3);
        assert_relative_eq!(b.bin_center(0), 0.0);
        assert_relative_eq!(b.bin_center(1), 0.125);
        assert_relative_eq!(b.bin_low_edge(5), 1.0);
        assert_relative_eq!(b.bin_low_edge(6), 1.5, max_relative = 1e-12);
        assert_relative_eq!(b.bin_low_edge(10), 1.5_f64.powi(5), max_relative = 1e-12);
        // Geometric center of the first logarithmic bin.
        assert_relative_eq!(b.bin_center(5), 1.5_f64.sqrt(), max_relative = 1e-12);
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        assert!(Binning::uniform(0, 0.0, 1.0).is_err());
        assert!(Binning::uniform(3, 0.0, 0.0).is_err());
        assert!(Binning::uniform(3, 0.0, -1.0).is_err());
        assert!(Binning::variable(vec![1.0]).is_err());
        assert!(Binning::variable(vec![0.0, 2.0, 2.0]).is_err());
        assert!(Binning::two_step(3, 0.01, 0.004, 0.002).is_err());
        assert!(Binning::two_step(10, 0.0, 0.004, 0.002).is_err());
    }

    #[test]
    fn two_step_with_vanishing_linear_step_is_a_config_error() {
        for (breakpoint, lin_step) in [(0.01, 1e-300), (1e300, 1e-300)] {
            let err = Binning::two_step(14, breakpoint, 0.004, lin_step).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Config);
        }
    }

    #[test]
    fn text_form_lists_count_then_edges() {
        let b = Binning::uniform(2, 1.5, 0.5).unwrap();
        assert_eq!(b.to_line(), "2 1.5 2 2.5");
    }
}
