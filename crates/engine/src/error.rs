use thiserror::Error;

/// Errors reported by the checked (`try_*`) entry points and the wasm surface.
///
/// The plain operations never fail: numeric noise is clamped, and malformed
/// input is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PsdError {
    /// Input matrix is not square
    #[error("Matrix is not square: {rows}x{cols}")]
    NotSquare {
        /// Row count
        rows: usize,
        /// Column count
        cols: usize,
    },

    /// Flat buffer or companion matrix has the wrong size
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected element count / dimension
        expected: usize,
        /// Actual element count / dimension
        actual: usize,
    },

    /// Input contains NaN or infinity
    #[error("Non-finite entry at ({row}, {col})")]
    NonFinite {
        /// Row index
        row: usize,
        /// Column index
        col: usize,
    },

    /// Cholesky pivot below the rounding tolerance: input is indefinite
    #[error("Negative pivot {value:.3e} in column {column}: matrix is not positive semi-definite")]
    NegativePivot {
        /// Column of the failing pivot
        column: usize,
        /// Pivot value before the square root
        value: f64,
    },

    /// Weight matrix is not diagonal with strictly positive entries
    #[error("Invalid weight matrix: {0}")]
    InvalidWeight(String),

    /// Tuning parameter out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
