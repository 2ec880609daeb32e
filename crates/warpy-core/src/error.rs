//! Error types for warpy-core
//!
//! Provides a unified error type for raster construction, pixel access and
//! region validation. Each variant captures enough context for diagnostics
//! without exposing internal storage details.

use thiserror::Error;

/// Warpy core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid raster dimensions
    #[error("invalid raster dimensions: {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    /// Index out of bounds
    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Invalid parameter value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Sample buffer does not match the raster geometry
    #[error("data length {actual} doesn't match expected {expected}")]
    DataLengthMismatch { expected: usize, actual: usize },

    /// Two rasters (or a raster and an operation) disagree on pixel format
    #[error("incompatible pixel formats: {0} vs {1}")]
    IncompatibleFormats(String, String),

    /// Operation not supported for this sample type
    #[error("unsupported sample type for this operation: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for warpy-core operations
pub type Result<T> = std::result::Result<T, Error>;
