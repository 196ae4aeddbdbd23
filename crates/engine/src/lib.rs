//! Repair of covariance and correlation matrices that have drifted out of the
//! positive semi-definite cone.
//!
//! - [`chol_psd()`]: Cholesky root tolerant of zero pivots
//! - [`near_psd()`]: Rebonato–Jäckel eigenvalue clipping
//! - [`higham_psd()`]: Higham's weighted alternating projections
//! - [`is_psd()`]: eigenvalue sign check
//!
//! All operations are pure functions over `nalgebra::DMatrix<f64>`. The
//! `try_*` variants validate their input and return [`PsdError`]; the
//! [`engine`] module exposes the same operations to JavaScript.

pub mod cholesky;
pub mod engine;
pub mod error;
pub mod higham;
pub mod math;
pub mod near_psd;
pub mod scaling;

pub use cholesky::{chol_psd, try_chol_psd, PIVOT_TOLERANCE};
pub use error::PsdError;
pub use higham::{
    frobenius_norm, higham_psd, higham_psd_with_report, ps, pu, try_higham_psd, HighamConfig,
    HighamReport,
};
pub use math::{is_psd, is_psd_with_tolerance, min_eigenvalue, PSD_TOLERANCE};
pub use near_psd::{near_psd, try_near_psd};
pub use scaling::CorrelationScaling;
