use nalgebra::{DMatrix, DVector};

use crate::error::PsdError;

/// Eigenvalues at or above `-PSD_TOLERANCE` count as non-negative.
pub const PSD_TOLERANCE: f64 = 1e-8;

// ────────────────────────────────────────────────────────────────
// is_psd
// λ_min(A) ≥ -1e-8
// ────────────────────────────────────────────────────────────────
pub fn is_psd(matrix: &DMatrix<f64>) -> bool {
    is_psd_with_tolerance(matrix, PSD_TOLERANCE)
}

/// Same check as [`is_psd`] with a caller-chosen tolerance.
pub fn is_psd_with_tolerance(matrix: &DMatrix<f64>, tolerance: f64) -> bool {
    min_eigenvalue(matrix) >= -tolerance
}

/// Smallest eigenvalue of the symmetric eigendecomposition.
///
/// Only the lower triangle is read. An empty matrix has no eigenvalues and
/// reports `+inf`.
pub fn min_eigenvalue(matrix: &DMatrix<f64>) -> f64 {
    if matrix.is_empty() {
        return f64::INFINITY;
    }
    matrix
        .clone()
        .symmetric_eigen()
        .eigenvalues
        .iter()
        .fold(f64::INFINITY, |acc, &v| acc.min(v))
}

// ────────────────────────────────────────────────────────────────
// clip_eigenvalues
// A = QΛQᵀ  →  Q max(Λ, floor) Qᵀ
// ────────────────────────────────────────────────────────────────
pub(crate) fn clip_eigenvalues(matrix: &DMatrix<f64>, floor: f64) -> DMatrix<f64> {
    let eigen = matrix.clone().symmetric_eigen();
    let vals = eigen.eigenvalues.map(|v| v.max(floor));
    &eigen.eigenvectors * DMatrix::from_diagonal(&vals) * eigen.eigenvectors.transpose()
}

/// Scales entry (i, j) by `d[i] * d[j]`, i.e. `D A D` for `D = diag(d)`.
pub(crate) fn congruence(matrix: &DMatrix<f64>, d: &DVector<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(matrix.nrows(), matrix.ncols(), |i, j| {
        matrix[(i, j)] * d[i] * d[j]
    })
}

// ────────────────────────────────────────────────────────────────
// Input validation for the checked entry points
// ────────────────────────────────────────────────────────────────
pub(crate) fn ensure_square(matrix: &DMatrix<f64>) -> Result<usize, PsdError> {
    if matrix.nrows() != matrix.ncols() {
        return Err(PsdError::NotSquare {
            rows: matrix.nrows(),
            cols: matrix.ncols(),
        });
    }
    Ok(matrix.nrows())
}

pub(crate) fn ensure_finite(matrix: &DMatrix<f64>) -> Result<(), PsdError> {
    for j in 0..matrix.ncols() {
        for i in 0..matrix.nrows() {
            if !matrix[(i, j)].is_finite() {
                return Err(PsdError::NonFinite { row: i, col: j });
            }
        }
    }
    Ok(())
}

/// Square and finite: the precondition shared by every `try_*` operation.
pub(crate) fn ensure_well_formed(matrix: &DMatrix<f64>) -> Result<usize, PsdError> {
    let n = ensure_square(matrix)?;
    ensure_finite(matrix)?;
    Ok(n)
}
