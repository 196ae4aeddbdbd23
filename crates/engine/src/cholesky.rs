use std::convert::Infallible;

use nalgebra::DMatrix;

use crate::error::PsdError;
use crate::math::ensure_well_formed;

/// Pivots in `[-PIVOT_TOLERANCE, 0]` are rounding noise and clamp to zero.
pub const PIVOT_TOLERANCE: f64 = 1e-8;

// ────────────────────────────────────────────────────────────────
// chol_psd
// LLᵀ = A for A PSD, zero pivots allowed
// ────────────────────────────────────────────────────────────────
/// Lower-triangular root of a positive semi-definite matrix.
///
/// Unlike a strict Cholesky factorisation this accepts zero eigenvalues:
/// a zero pivot leaves its column empty instead of dividing by zero.
/// The input must already be PSD up to [`PIVOT_TOLERANCE`]; a more negative
/// pivot yields NaN entries. Use [`try_chol_psd`] to have that reported.
pub fn chol_psd(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    match factor(matrix, |_, _| Ok::<(), Infallible>(())) {
        Ok(root) => root,
        Err(never) => match never {},
    }
}

/// Checked [`chol_psd`]: rejects malformed input and indefinite pivots.
pub fn try_chol_psd(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>, PsdError> {
    ensure_well_formed(matrix)?;
    factor(matrix, |column, value| {
        Err(PsdError::NegativePivot { column, value })
    })
}

fn factor<E>(
    matrix: &DMatrix<f64>,
    mut on_negative_pivot: impl FnMut(usize, f64) -> Result<(), E>,
) -> Result<DMatrix<f64>, E> {
    let n = matrix.nrows();
    let mut root = DMatrix::zeros(n, n);

    for j in 0..n {
        let mut pivot = matrix[(j, j)] - row_dot(&root, j, j, j);
        if (-PIVOT_TOLERANCE..=0.0).contains(&pivot) {
            pivot = 0.0;
        } else if pivot < -PIVOT_TOLERANCE {
            on_negative_pivot(j, pivot)?;
        }
        root[(j, j)] = pivot.sqrt();

        // Rank-deficient direction: the column below the diagonal stays zero.
        if root[(j, j)] == 0.0 {
            continue;
        }

        let inv = 1.0 / root[(j, j)];
        for i in (j + 1)..n {
            root[(i, j)] = (matrix[(i, j)] - row_dot(&root, i, j, j)) * inv;
        }
    }

    Ok(root)
}

// Σ_{k<len} L[a,k]·L[b,k]
fn row_dot(root: &DMatrix<f64>, a: usize, b: usize, len: usize) -> f64 {
    (0..len).map(|k| root[(a, k)] * root[(b, k)]).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cholesky_roundtrip() {
        let a = DMatrix::from_row_slice(3, 3, &[
            4.0,  2.0, 0.6,
            2.0,  2.0, 0.5,
            0.6,  0.5, 1.0,
        ]);
        let l = chol_psd(&a);

        for i in 0..3 {
            for j in (i + 1)..3 {
                assert_eq!(l[(i, j)], 0.0);
            }
        }
        assert_relative_eq!(l[(0, 0)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(l[(1, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(&l * l.transpose(), a, epsilon = 1e-10);
    }

    #[test]
    fn test_rank_deficient() {
        let a = DMatrix::from_element(2, 2, 1.0);
        let l = chol_psd(&a);
        let expected = DMatrix::from_row_slice(2, 2, &[
            1.0, 0.0,
            1.0, 0.0,
        ]);
        assert_relative_eq!(l, expected, epsilon = 1e-12);
        assert!(l.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_zero_leading_pivot() {
        let a = DMatrix::from_row_slice(3, 3, &[
            0.0, 0.0, 0.0,
            0.0, 2.0, 1.0,
            0.0, 1.0, 1.0,
        ]);
        let l = chol_psd(&a);
        assert_eq!(l[(1, 0)], 0.0);
        assert_eq!(l[(2, 0)], 0.0);
        assert_relative_eq!(&l * l.transpose(), a, epsilon = 1e-12);
    }

    #[test]
    fn test_rounding_noise_clamped() {
        let a = DMatrix::from_row_slice(2, 2, &[
            1.0, 1.0,
            1.0, 1.0 - 1e-12,
        ]);
        let l = chol_psd(&a);
        assert_eq!(l[(1, 1)], 0.0);
    }

    #[test]
    fn test_indefinite_propagates_nan() {
        let a = DMatrix::from_row_slice(2, 2, &[
            1.0, 2.0,
            2.0, 1.0,
        ]);
        let l = chol_psd(&a);
        assert!(l[(1, 1)].is_nan());
    }

    #[test]
    fn test_try_rejects_indefinite() {
        let a = DMatrix::from_row_slice(2, 2, &[
            1.0, 2.0,
            2.0, 1.0,
        ]);
        match try_chol_psd(&a) {
            Err(PsdError::NegativePivot { column, value }) => {
                assert_eq!(column, 1);
                assert_relative_eq!(value, -3.0, epsilon = 1e-12);
            }
            other => panic!("expected NegativePivot, got {:?}", other),
        }
    }

    #[test]
    fn test_try_rejects_non_square() {
        let a = DMatrix::<f64>::zeros(2, 3);
        assert_eq!(
            try_chol_psd(&a),
            Err(PsdError::NotSquare { rows: 2, cols: 3 })
        );
    }
}
