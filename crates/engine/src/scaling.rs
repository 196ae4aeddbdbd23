use nalgebra::{DMatrix, DVector};

use crate::math::congruence;

/// Covariance ↔ correlation normalisation shared by the repair routines.
///
/// Built only when the diagonal is not all ones. Indices whose variance is
/// not strictly positive cannot be normalised; they map to an isolated unit
/// diagonal entry in correlation space and to a zero row and column when
/// scaled back.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationScaling {
    std_devs: DVector<f64>,
    inv_std_devs: DVector<f64>,
    degenerate: Vec<usize>,
}

impl CorrelationScaling {
    /// Returns `None` when the matrix already has a unit diagonal.
    pub fn from_matrix(matrix: &DMatrix<f64>) -> Option<Self> {
        let diag = matrix.diagonal();
        if diag.iter().all(|&d| d == 1.0) {
            return None;
        }

        let std_devs = diag.map(|v| if v > 0.0 { v.sqrt() } else { 0.0 });
        let inv_std_devs = std_devs.map(|s| if s > 0.0 { 1.0 / s } else { 0.0 });
        let degenerate: Vec<usize> = (0..std_devs.len())
            .filter(|&i| std_devs[i] == 0.0)
            .collect();
        if !degenerate.is_empty() {
            log::debug!(
                "correlation scaling: {} of {} variances are non-positive, indices {:?} zeroed",
                degenerate.len(),
                std_devs.len(),
                degenerate
            );
        }

        Some(Self {
            std_devs,
            inv_std_devs,
            degenerate,
        })
    }

    /// Standard deviations taken from the diagonal (0 for degenerate indices).
    pub fn std_devs(&self) -> &DVector<f64> {
        &self.std_devs
    }

    /// Indices with a non-positive variance.
    pub fn degenerate(&self) -> &[usize] {
        &self.degenerate
    }

    // R = D⁻¹ Σ D⁻¹
    pub fn to_correlation(&self, matrix: &DMatrix<f64>) -> DMatrix<f64> {
        let mut corr = congruence(matrix, &self.inv_std_devs);
        for &i in &self.degenerate {
            corr[(i, i)] = 1.0;
        }
        corr
    }

    // Σ = D R D
    pub fn to_covariance(&self, matrix: &DMatrix<f64>) -> DMatrix<f64> {
        congruence(matrix, &self.std_devs)
    }
}
