//! Natural cubic spline interpolation of tabulated functions.
//!
//! Used for the tabulated correlation-function multipoles. Outside the table
//! the first/last cubic segment is extended, so evaluation never fails.

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the knots (zero at both ends).
    m: Vec<f64>,
}

impl CubicSpline {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, AppError> {
        if x.len() != y.len() {
            return Err(AppError::config(format!(
                "Spline needs matching columns, got {} abscissae and {} values.",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 3 {
            return Err(AppError::config(format!(
                "Spline needs at least 3 points, got {}.",
                x.len()
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(AppError::config("Spline points must be finite."));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AppError::config("Spline abscissae must be strictly increasing."));
        }

        let n = x.len();
        // Tridiagonal system for the interior second derivatives (Thomas algorithm).
        let mut m = vec![0.0; n];
        let mut c_prime = vec![0.0; n];
        let mut d_prime = vec![0.0; n];
        for i in 1..n - 1 {
            let h0 = x[i] - x[i - 1];
            let h1 = x[i + 1] - x[i];
            let a = h0;
            let b = 2.0 * (h0 + h1);
            let c = h1;
            let d = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
            let denom = b - a * c_prime[i - 1];
            c_prime[i] = c / denom;
            d_prime[i] = (d - a * d_prime[i - 1]) / denom;
        }
        for i in (1..n - 1).rev() {
            m[i] = d_prime[i] - c_prime[i] * m[i + 1];
        }

        Ok(Self { x, y, m })
    }

    pub fn eval(&self, t: f64) -> f64 {
        let n = self.x.len();
        // Segment k covers [x[k], x[k+1]].
        let k = match self.x.partition_point(|&xi| xi <= t) {
            0 => 0,
            p if p >= n => n - 2,
            p => p - 1,
        };
        let h = self.x[k + 1] - self.x[k];
        let a = (self.x[k + 1] - t) / h;
        let b = (t - self.x[k]) / h;
        a * self.y[k]
            + b * self.y[k + 1]
            + ((a * a * a - a) * self.m[k] + (b * b * b - b) * self.m[k + 1]) * h * h / 6.0
    }
}
