use nalgebra::{DMatrix, DVector};

use crate::error::PsdError;
use crate::math::ensure_well_formed;
use crate::scaling::CorrelationScaling;

// ────────────────────────────────────────────────────────────────
// near_psd  (Rebonato & Jäckel eigenvalue clipping)
// B = T·S·√Λ₊,  out = B·Bᵀ
// ────────────────────────────────────────────────────────────────
/// Projects a correlation or covariance matrix onto the PSD cone by clipping
/// its eigenvalues at `epsilon` and renormalising rows to a unit diagonal.
///
/// A non-unit diagonal is read as a covariance matrix: the repair runs in
/// correlation space and the original variances are restored afterwards.
/// The result is PSD by construction but is not the Frobenius-nearest
/// matrix; see [`crate::higham::higham_psd`] for that.
pub fn near_psd(matrix: &DMatrix<f64>, epsilon: f64) -> DMatrix<f64> {
    let n = matrix.nrows();
    if n == 0 {
        return matrix.clone();
    }

    let scaling = CorrelationScaling::from_matrix(matrix);
    let corr = match &scaling {
        Some(s) => s.to_correlation(matrix),
        None => matrix.clone(),
    };

    let eigen = corr.symmetric_eigen();
    let vals = eigen.eigenvalues.map(|v| v.max(epsilon));
    let vecs = eigen.eigenvectors;

    // t_i = 1 / Σ_k s_ik² λ_k
    let t = DVector::from_fn(n, |i, _| {
        let row_weight: f64 = (0..n).map(|k| vecs[(i, k)].powi(2) * vals[k]).sum();
        if row_weight > 0.0 {
            (1.0 / row_weight).sqrt()
        } else {
            0.0
        }
    });

    let b = DMatrix::from_diagonal(&t) * &vecs * DMatrix::from_diagonal(&vals.map(f64::sqrt));
    let out = &b * b.transpose();

    match scaling {
        Some(s) => s.to_covariance(&out),
        None => out,
    }
}

/// Checked [`near_psd`]: square, finite input and a finite `epsilon >= 0`.
pub fn try_near_psd(matrix: &DMatrix<f64>, epsilon: f64) -> Result<DMatrix<f64>, PsdError> {
    ensure_well_formed(matrix)?;
    if !epsilon.is_finite() || epsilon < 0.0 {
        return Err(PsdError::InvalidParameter(format!(
            "epsilon must be finite and non-negative, got {}",
            epsilon
        )));
    }
    Ok(near_psd(matrix, epsilon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{is_psd, min_eigenvalue};
    use approx::assert_relative_eq;

    fn indefinite_correlation() -> DMatrix<f64> {
        DMatrix::from_row_slice(3, 3, &[
            1.0,  0.9,  0.9,
            0.9,  1.0, -0.9,
            0.9, -0.9,  1.0,
        ])
    }

    #[test]
    fn test_near_psd_repairs_correlation() {
        let bad = indefinite_correlation();
        assert!(!is_psd(&bad));

        let fixed = near_psd(&bad, 0.0);
        assert!(is_psd(&fixed));
        assert_relative_eq!(fixed, fixed.transpose(), epsilon = 1e-12);
        for i in 0..3 {
            assert_relative_eq!(fixed[(i, i)], 1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_near_psd_epsilon_floor() {
        let fixed = near_psd(&indefinite_correlation(), 1e-4);
        assert!(min_eigenvalue(&fixed) > 0.0);
    }

    #[test]
    fn test_near_psd_keeps_valid_input() {
        let r = DMatrix::from_row_slice(3, 3, &[
            1.0,  0.2,  0.3,
            0.2,  1.0, -0.1,
            0.3, -0.1,  1.0,
        ]);
        assert_relative_eq!(near_psd(&r, 0.0), r, epsilon = 1e-10);
    }

    #[test]
    fn test_near_psd_idempotent_on_covariance() {
        let sd = DVector::from_vec(vec![0.3, 1.2, 0.05]);
        let d = DMatrix::from_diagonal(&sd);
        let cov = &d * indefinite_correlation() * &d;

        let once = near_psd(&cov, 0.0);
        assert!(CorrelationScaling::from_matrix(&once).is_some());
        let twice = near_psd(&once, 0.0);
        assert_relative_eq!(twice, once, epsilon = 1e-10);
    }

    #[test]
    fn test_near_psd_restores_variances() {
        let sd = DVector::from_vec(vec![0.2, 0.5, 1.5]);
        let cov = DMatrix::from_diagonal(&sd) * indefinite_correlation() * DMatrix::from_diagonal(&sd);
        let fixed = near_psd(&cov, 0.0);

        assert!(is_psd(&fixed));
        for i in 0..3 {
            assert_relative_eq!(fixed[(i, i)], sd[i] * sd[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn test_near_psd_negative_scalar() {
        let m = DMatrix::from_element(1, 1, -5.0);
        let fixed = near_psd(&m, 0.0);
        assert_eq!(fixed, DMatrix::from_element(1, 1, 0.0));
    }

    #[test]
    fn test_try_near_psd_rejects_negative_epsilon() {
        let r = DMatrix::<f64>::identity(2, 2);
        assert!(matches!(
            try_near_psd(&r, -1.0),
            Err(PsdError::InvalidParameter(_))
        ));
        assert!(try_near_psd(&r, 0.0).is_ok());
    }
}
