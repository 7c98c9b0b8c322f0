//! Packed storage for symmetric matrices.
//!
//! Only the upper triangle is stored, column by column, in a flat slice of
//! length `n*(n+1)/2`. Element `(row, col)` with `row <= col` lives at
//! `row + col*(col+1)/2` (the LAPACK "UPLO = 'U'" packed convention).
//!
//! The routines here mirror the LAPACK/BLAS trio used for covariance work:
//! - [`cholesky_in_place`]: `A = Uᵀ U` (like `dpptrf`)
//! - [`inverse_from_cholesky`]: `A⁻¹` from `U` (like `dpptri`)
//! - [`symmetric_mul_vec`]: `y = A x` (like `dspmv`)

/// Number of stored elements for an `n x n` symmetric matrix.
pub fn packed_len(n: usize) -> usize {
    n * (n + 1) / 2
}

/// Offset of element `(i, j)`; the pair is ordered so that `row <= col`.
pub fn packed_index(i: usize, j: usize) -> usize {
    let (row, col) = if i <= j { (i, j) } else { (j, i) };
    row + col * (col + 1) / 2
}

/// Factor `ap` into the upper-triangular `U` with `A = Uᵀ U`, overwriting `ap`.
///
/// On failure returns the 1-based order of the leading minor that is not
/// positive definite; `ap` is then partially overwritten and must be discarded.
pub fn cholesky_in_place(ap: &mut [f64], n: usize) -> Result<(), usize> {
    debug_assert_eq!(ap.len(), packed_len(n));
    for j in 0..n {
        let jc = j * (j + 1) / 2;
        for i in 0..j {
            let ic = i * (i + 1) / 2;
            let mut s = ap[jc + i];
            for k in 0..i {
                s -= ap[ic + k] * ap[jc + k];
            }
            ap[jc + i] = s / ap[ic + i];
        }
        let mut ajj = ap[jc + j];
        for k in 0..j {
            ajj -= ap[jc + k] * ap[jc + k];
        }
        if !(ajj > 0.0) || !ajj.is_finite() {
            return Err(j + 1);
        }
        ap[jc + j] = ajj.sqrt();
    }
    Ok(())
}

/// Replace the Cholesky factor `U` held in `ap` with the packed inverse of `Uᵀ U`.
pub fn inverse_from_cholesky(ap: &mut [f64], n: usize) {
    debug_assert_eq!(ap.len(), packed_len(n));

    // W = U⁻¹ is upper triangular; build it column by column.
    let mut w = vec![0.0; ap.len()];
    for j in 0..n {
        let jc = j * (j + 1) / 2;
        w[jc + j] = 1.0 / ap[jc + j];
        for i in (0..j).rev() {
            let mut s = 0.0;
            for k in (i + 1)..=j {
                s += ap[packed_index(i, k)] * w[jc + k];
            }
            w[jc + i] = -s / ap[packed_index(i, i)];
        }
    }

    // A⁻¹ = W Wᵀ, only rows above the diagonal are needed.
    for j in 0..n {
        for i in 0..=j {
            let mut s = 0.0;
            for k in j..n {
                s += w[packed_index(i, k)] * w[packed_index(j, k)];
            }
            ap[packed_index(i, j)] = s;
        }
    }
}

/// `A x` for packed symmetric `A`. Allocates the result, leaving `ap` untouched.
pub fn symmetric_mul_vec(ap: &[f64], n: usize, x: &[f64]) -> Vec<f64> {
    debug_assert_eq!(ap.len(), packed_len(n));
    debug_assert_eq!(x.len(), n);
    let mut y = vec![0.0; n];
    for j in 0..n {
        let jc = j * (j + 1) / 2;
        let mut acc = 0.0;
        for i in 0..j {
            let a = ap[jc + i];
            y[i] += a * x[j];
            acc += a * x[i];
        }
        y[j] += acc + ap[jc + j] * x[j];
    }
    y
}

/// `xᵀ A x` for packed symmetric `A`.
pub fn quadratic_form(ap: &[f64], n: usize, x: &[f64]) -> f64 {
    symmetric_mul_vec(ap, n, x)
        .iter()
        .zip(x)
        .map(|(ax, xi)| ax * xi)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::DMatrix;

    fn to_dense(ap: &[f64], n: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n, n, |i, j| ap[packed_index(i, j)])
    }

    fn from_dense(m: &DMatrix<f64>) -> Vec<f64> {
        let n = m.nrows();
        let mut ap = vec![0.0; packed_len(n)];
        for j in 0..n {
            for i in 0..=j {
                ap[packed_index(i, j)] = m[(i, j)];
            }
        }
        ap
    }

    fn spd_matrix() -> DMatrix<f64> {
        // B Bᵀ + n I is symmetric positive definite.
        let b = DMatrix::from_row_slice(4, 4, &[
            1.0, 0.3, -0.2, 0.5, //
            0.1, 2.0, 0.4, -0.3, //
            -0.6, 0.2, 1.5, 0.7, //
            0.4, -0.1, 0.3, 0.9,
        ]);
        &b * b.transpose() + DMatrix::identity(4, 4) * 4.0
    }

    #[test]
    fn index_matches_column_packing() {
        assert_eq!(packed_index(0, 0), 0);
        assert_eq!(packed_index(0, 1), 1);
        assert_eq!(packed_index(1, 1), 2);
        assert_eq!(packed_index(0, 2), 3);
        assert_eq!(packed_index(2, 0), 3);
        assert_eq!(packed_index(2, 2), 5);
        assert_eq!(packed_len(3), 6);
    }

    #[test]
    fn cholesky_reproduces_matrix() {
        let a = spd_matrix();
        let mut ap = from_dense(&a);
        cholesky_in_place(&mut ap, 4).unwrap();
        let u = DMatrix::from_fn(4, 4, |i, j| if i <= j { ap[packed_index(i, j)] } else { 0.0 });
        let rebuilt = u.transpose() * &u;
        for (x, y) in rebuilt.iter().zip(a.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn inverse_times_matrix_is_identity() {
        let a = spd_matrix();
        let mut ap = from_dense(&a);
        cholesky_in_place(&mut ap, 4).unwrap();
        inverse_from_cholesky(&mut ap, 4);
        let product = &a * to_dense(&ap, 4);
        let identity = DMatrix::<f64>::identity(4, 4);
        for (x, y) in product.iter().zip(identity.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn non_positive_definite_reports_failing_minor() {
        // Second leading minor is 1*1 - 2*2 < 0.
        let mut ap = vec![1.0, 2.0, 1.0];
        assert_eq!(cholesky_in_place(&mut ap, 2), Err(2));

        let mut ap = vec![-1.0];
        assert_eq!(cholesky_in_place(&mut ap, 1), Err(1));
    }

    #[test]
    fn packed_product_matches_dense() {
        let a = spd_matrix();
        let ap = from_dense(&a);
        let x = [0.5, -1.0, 2.0, 0.25];
        let y = symmetric_mul_vec(&ap, 4, &x);
        let dense = &a * nalgebra::DVector::from_row_slice(&x);
        for (p, d) in y.iter().zip(dense.iter()) {
            assert_abs_diff_eq!(p, d, epsilon = 1e-12);
        }
        let q = quadratic_form(&ap, 4, &x);
        assert_abs_diff_eq!(q, dense.dot(&nalgebra::DVector::from_row_slice(&x)), epsilon = 1e-12);
    }
}
