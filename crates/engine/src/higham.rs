//! Higham's alternating projections for the nearest correlation matrix.
//!
//! Alternates between the PSD cone (in a diagonally weighted Frobenius
//! norm) and the set of unit-diagonal matrices, with Dykstra's correction
//! carried on the PSD step.

use nalgebra::{DMatrix, DVector};

use crate::error::PsdError;
use crate::math::{clip_eigenvalues, congruence, ensure_well_formed, min_eigenvalue};
use crate::scaling::CorrelationScaling;

pub const DEFAULT_EPSILON: f64 = 1e-9;
pub const DEFAULT_MAX_ITER: usize = 1000;
pub const DEFAULT_TOLERANCE: f64 = 1e-8;

/// Stopping parameters for [`higham_psd`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighamConfig {
    /// Accept an iterate once its smallest eigenvalue exceeds `-epsilon`.
    pub epsilon: f64,
    /// Iteration budget. Exhausting it is not an error.
    pub max_iter: usize,
    /// Accept once successive weighted distances differ by less than this.
    pub tolerance: f64,
}

impl Default for HighamConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl HighamConfig {
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> Result<(), PsdError> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(PsdError::InvalidParameter(format!(
                "epsilon must be finite and non-negative, got {}",
                self.epsilon
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(PsdError::InvalidParameter(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Outcome of a Higham run.
#[derive(Debug, Clone, PartialEq)]
pub struct HighamReport {
    /// Repaired matrix, back in the input's scale.
    pub matrix: DMatrix<f64>,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether the stopping rule fired before the budget ran out.
    pub converged: bool,
    /// Weighted Frobenius distance from the (normalised) input at exit.
    pub distance: f64,
}

// ────────────────────────────────────────────────────────────────
// pu: projection onto {X : diag(X) = 1}
// ────────────────────────────────────────────────────────────────
pub fn pu(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = matrix.clone();
    out.fill_diagonal(1.0);
    out
}

// ────────────────────────────────────────────────────────────────
// ps: projection onto the PSD cone in the W-norm
// W^-½ · P₊(W^½ A W^½) · W^-½
// ────────────────────────────────────────────────────────────────
/// Only the diagonal of `weight` is read.
pub fn ps(matrix: &DMatrix<f64>, weight: &DMatrix<f64>) -> DMatrix<f64> {
    project_psd(matrix, &sqrt_weight(weight))
}

// ────────────────────────────────────────────────────────────────
// frobenius_norm: ‖W^½ A W^½‖_F
// ────────────────────────────────────────────────────────────────
/// Only the diagonal of `weight` is read.
pub fn frobenius_norm(matrix: &DMatrix<f64>, weight: &DMatrix<f64>) -> f64 {
    weighted_norm(matrix, &sqrt_weight(weight))
}

fn sqrt_weight(weight: &DMatrix<f64>) -> DVector<f64> {
    weight.diagonal().map(f64::sqrt)
}

fn project_psd(matrix: &DMatrix<f64>, w05: &DVector<f64>) -> DMatrix<f64> {
    let inv_w05 = w05.map(|w| 1.0 / w);
    let projected = clip_eigenvalues(&congruence(matrix, w05), 0.0);
    congruence(&projected, &inv_w05)
}

fn weighted_norm(matrix: &DMatrix<f64>, w05: &DVector<f64>) -> f64 {
    congruence(matrix, w05).norm()
}

// ────────────────────────────────────────────────────────────────
// higham_psd
// ────────────────────────────────────────────────────────────────
/// Nearest PSD matrix with unit diagonal under the weighted Frobenius norm.
///
/// `weight` defaults to the identity and only its diagonal is read. A
/// non-unit diagonal is treated as a covariance matrix, as in
/// [`crate::near_psd::near_psd`]. Non-convergence is not reported here;
/// use [`higham_psd_with_report`] to inspect it.
pub fn higham_psd(
    matrix: &DMatrix<f64>,
    weight: Option<&DMatrix<f64>>,
    config: &HighamConfig,
) -> DMatrix<f64> {
    higham_psd_with_report(matrix, weight, config).matrix
}

pub fn higham_psd_with_report(
    matrix: &DMatrix<f64>,
    weight: Option<&DMatrix<f64>>,
    config: &HighamConfig,
) -> HighamReport {
    let n = matrix.nrows();
    if n == 0 {
        return HighamReport {
            matrix: matrix.clone(),
            iterations: 0,
            converged: true,
            distance: 0.0,
        };
    }

    let w05 = match weight {
        Some(w) => sqrt_weight(w),
        None => DVector::from_element(n, 1.0),
    };

    let scaling = CorrelationScaling::from_matrix(matrix);
    let original = match &scaling {
        Some(s) => s.to_correlation(matrix),
        None => matrix.clone(),
    };

    let mut y = original.clone();
    let mut delta_s = DMatrix::zeros(n, n);
    let mut previous = f64::MAX;
    let mut distance = 0.0;
    let mut iterations = 0;
    let mut converged = false;

    for k in 1..=config.max_iter {
        iterations = k;

        // Dykstra correction, then the two projections
        let r = &y - &delta_s;
        let x = project_psd(&r, &w05);
        delta_s = &x - &r;
        y = pu(&x);

        distance = weighted_norm(&(&y - &original), &w05);
        let min_eig = min_eigenvalue(&y);
        log::trace!(
            "higham: iter={} distance={:.6e} min_eig={:.3e}",
            k,
            distance,
            min_eig
        );

        if (distance - previous).abs() < config.tolerance && min_eig > -config.epsilon {
            converged = true;
            break;
        }
        previous = distance;
    }

    if converged {
        log::debug!(
            "higham: converged after {} iterations (n={}, distance={:.6e})",
            iterations,
            n,
            distance
        );
    } else {
        log::warn!(
            "higham: no convergence within {} iterations (n={}), returning last iterate",
            config.max_iter,
            n
        );
    }

    let matrix = match scaling {
        Some(s) => s.to_covariance(&y),
        None => y,
    };

    HighamReport {
        matrix,
        iterations,
        converged,
        distance,
    }
}

/// Checked [`higham_psd_with_report`].
///
/// Rejects malformed input, a weight that is not a positive diagonal matrix
/// of matching size, and out-of-range parameters.
pub fn try_higham_psd(
    matrix: &DMatrix<f64>,
    weight: Option<&DMatrix<f64>>,
    config: &HighamConfig,
) -> Result<HighamReport, PsdError> {
    let n = ensure_well_formed(matrix)?;
    config.validate()?;
    if let Some(w) = weight {
        validate_weight(w, n)?;
    }
    Ok(higham_psd_with_report(matrix, weight, config))
}

fn validate_weight(weight: &DMatrix<f64>, n: usize) -> Result<(), PsdError> {
    let dim = ensure_well_formed(weight)?;
    if dim != n {
        return Err(PsdError::DimensionMismatch {
            expected: n,
            actual: dim,
        });
    }
    for j in 0..n {
        for i in 0..n {
            let w = weight[(i, j)];
            if i == j && w <= 0.0 {
                return Err(PsdError::InvalidWeight(format!(
                    "diagonal entry {} is {}, must be positive",
                    i, w
                )));
            }
            if i != j && w != 0.0 {
                return Err(PsdError::InvalidWeight(format!(
                    "off-diagonal entry ({}, {}) is {}, must be zero",
                    i, j, w
                )));
            }
        }
    }
    Ok(())
}
