//! Fixed-order quadrature.

/// Composite Simpson integral of `f` over `[a, b]` with `intervals` sub-intervals
/// (rounded up to an even count).
pub fn simpson<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, intervals: usize) -> f64 {
    if a == b {
        return 0.0;
    }
    let n = (intervals.max(2) + 1) & !1;
    let h = (b - a) / n as f64;
    let mut sum = f(a) + f(b);
    for i in 1..n {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(a + i as f64 * h);
    }
    sum * h / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn exact_for_cubics() {
        let v = simpson(|x| x * x * x - 2.0 * x + 1.0, 0.0, 2.0, 2);
        assert_abs_diff_eq!(v, 4.0 - 4.0 + 2.0, epsilon = 1e-12);
    }

    #[test]
    fn odd_counts_round_up_and_orientation_flips_sign() {
        let forward = simpson(f64::exp, 0.0, 1.0, 101);
        assert_abs_diff_eq!(forward, std::f64::consts::E - 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(simpson(f64::exp, 1.0, 0.0, 100), -forward, epsilon = 1e-10);
    }
}
