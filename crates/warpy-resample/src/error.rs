//! Error types for warpy-resample

use thiserror::Error;
use warpy_transform::TransformError;

/// Error reported by a pixel source
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while resampling
#[derive(Debug, Error)]
pub enum ResampleError {
    /// Transform error
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] warpy_core::Error),

    /// The interpolation kernel cannot handle the source pixel format
    #[error("{interpolation} interpolation is not supported for {format} pixels")]
    UnsupportedPixelFormat {
        interpolation: String,
        format: String,
    },

    /// The pixel source failed to deliver a region
    #[error("pixel source unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),

    /// The request cannot be served
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for resampling operations
pub type ResampleResult<T> = Result<T, ResampleError>;
