//! Error types for warpy-transform

use crate::point::RealPoint;
use thiserror::Error;

/// Errors that can occur while building, evaluating or (de)serializing
/// coordinate transforms
#[derive(Debug, Error)]
pub enum TransformError {
    /// Decoded object carries a `type` tag no transform answers to
    #[error("unknown transform type: {0}")]
    UnknownTransformType(String),

    /// A transform without an inverse was used where one is required
    #[error("transform is not invertible: {0}")]
    NonInvertibleTransform(String),

    /// Iterative inversion ran out of iterations
    #[error(
        "inverse did not converge after {iterations} iterations (residual {residual:e}, estimate {estimate:?})"
    )]
    Convergence {
        estimate: RealPoint,
        residual: f64,
        iterations: usize,
    },

    /// Singular matrix (non-invertible)
    #[error("singular transformation matrix")]
    SingularMatrix,

    /// Invalid transformation parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Transforms of incompatible dimensionality were combined
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// JSON is well-formed but does not describe a transform
    #[error("malformed transform JSON: {0}")]
    MalformedJson(String),

    /// JSON parse or encode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for transform operations
pub type TransformResult<T> = Result<T, TransformError>;
