use js_sys::Float64Array;
use nalgebra::{DMatrix, DVector};
use wasm_bindgen::prelude::*;

use crate::cholesky;
use crate::error::PsdError;
use crate::higham::{self, HighamConfig};
use crate::math;
use crate::near_psd;

// ════════════════════════════════════════════════════════════════
// RepairResult: returned to JS with Float64Array views
// ════════════════════════════════════════════════════════════════
#[wasm_bindgen]
pub struct RepairResult {
    matrix: Vec<f64>,
    dim: usize,
    is_psd: bool,
    iterations: usize,
    converged: bool,
}

#[wasm_bindgen]
impl RepairResult {
    /// Row-major n×n result.
    #[wasm_bindgen(getter)]
    pub fn matrix(&self) -> Float64Array {
        Float64Array::from(self.matrix.as_slice())
    }

    #[wasm_bindgen(getter)]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Whether the returned matrix passes `is_psd`. For `cholesky_psd` the
    /// check runs on the reconstruction L·Lᵀ, since L itself is not symmetric.
    #[wasm_bindgen(getter)]
    pub fn is_psd(&self) -> bool {
        self.is_psd
    }

    /// Higham iterations run; 0 for the single-pass operations.
    #[wasm_bindgen(getter)]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// False only when Higham exhausted its iteration budget.
    #[wasm_bindgen(getter)]
    pub fn converged(&self) -> bool {
        self.converged
    }
}

impl RepairResult {
    fn single_pass(m: &DMatrix<f64>, is_psd: bool) -> Self {
        Self {
            matrix: flatten_row_major(m),
            dim: m.nrows(),
            is_psd,
            iterations: 0,
            converged: true,
        }
    }
}

// ════════════════════════════════════════════════════════════════
// Entry points called from JS
// ════════════════════════════════════════════════════════════════
#[wasm_bindgen]
pub fn repair_near_psd(n: usize, data: &[f64], epsilon: f64) -> Result<RepairResult, JsValue> {
    let m = matrix_from_row_major(n, data).map_err(to_js)?;
    let fixed = near_psd::try_near_psd(&m, epsilon).map_err(to_js)?;
    Ok(RepairResult::single_pass(&fixed, math::is_psd(&fixed)))
}

/// `weights` is the diagonal of W; pass an empty array for the identity.
#[wasm_bindgen]
pub fn repair_higham_psd(
    n: usize,
    data: &[f64],
    weights: &[f64],
    epsilon: f64,
    max_iter: usize,
    tolerance: f64,
) -> Result<RepairResult, JsValue> {
    let m = matrix_from_row_major(n, data).map_err(to_js)?;
    let w = weight_from_diagonal(n, weights).map_err(to_js)?;
    let config = HighamConfig {
        epsilon,
        max_iter,
        tolerance,
    };

    let report = higham::try_higham_psd(&m, w.as_ref(), &config).map_err(to_js)?;
    Ok(RepairResult {
        matrix: flatten_row_major(&report.matrix),
        dim: n,
        is_psd: math::is_psd(&report.matrix),
        iterations: report.iterations,
        converged: report.converged,
    })
}

#[wasm_bindgen]
pub fn cholesky_psd(n: usize, data: &[f64]) -> Result<RepairResult, JsValue> {
    let m = matrix_from_row_major(n, data).map_err(to_js)?;
    let root = cholesky::try_chol_psd(&m).map_err(to_js)?;
    let reconstructed = &root * root.transpose();
    Ok(RepairResult::single_pass(&root, math::is_psd(&reconstructed)))
}

#[wasm_bindgen]
pub fn check_psd(n: usize, data: &[f64]) -> Result<bool, JsValue> {
    let m = matrix_from_row_major(n, data).map_err(to_js)?;
    Ok(math::is_psd(&m))
}

// ── Marshalling ─────────────────────────────────────────────────
fn to_js(err: PsdError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn matrix_from_row_major(n: usize, data: &[f64]) -> Result<DMatrix<f64>, PsdError> {
    let expected = n.checked_mul(n).ok_or(PsdError::DimensionMismatch {
        expected: usize::MAX,
        actual: data.len(),
    })?;
    if data.len() != expected {
        return Err(PsdError::DimensionMismatch {
            expected,
            actual: data.len(),
        });
    }
    Ok(DMatrix::from_row_slice(n, n, data))
}

fn weight_from_diagonal(n: usize, weights: &[f64]) -> Result<Option<DMatrix<f64>>, PsdError> {
    if weights.is_empty() {
        return Ok(None);
    }
    if weights.len() != n {
        return Err(PsdError::DimensionMismatch {
            expected: n,
            actual: weights.len(),
        });
    }
    Ok(Some(DMatrix::from_diagonal(&DVector::from_vec(weights.to_vec()))))
}

fn flatten_row_major(m: &DMatrix<f64>) -> Vec<f64> {
    let mut out = Vec::with_capacity(m.nrows() * m.ncols());
    for i in 0..m.nrows() {
        for j in 0..m.ncols() {
            out.push(m[(i, j)]);
        }
    }
    out
}
