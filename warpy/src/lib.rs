//! Warpy - Coordinate transforms and image warping for Rust
//!
//! # Overview
//!
//! Warpy renders warped views of large multi-resolution images on demand:
//!
//! - A polymorphic transform model (affine, thin-plate spline, sequences,
//!   bounded and dimension-wrapped transforms, numeric inversion)
//! - A JSON serialization registry compatible with the legacy file layout
//! - A transform + interpolation descriptor
//! - A tile-based resampling engine with a transformation-field cache
//! - Nearest, bilinear and cubic-convolution interpolation kernels
//!
//! # Example
//!
//! ```
//! use warpy::resample::{RasterPyramid, ResamplingEngine};
//! use warpy::transform::{
//!     AffineTransform, FORMAT_VERSION, InterpolationMode, Transform, TransformInterpolation,
//! };
//! use warpy::{Raster, RegionRequest};
//!
//! let image = Raster::from_u8(64, 48, 1, vec![128; 64 * 48]).unwrap();
//! let rotate = AffineTransform::rotation_2d(32.0, 24.0, 0.1).unwrap();
//! let descriptor = TransformInterpolation::new(
//!     Transform::Affine(rotate),
//!     InterpolationMode::Bilinear,
//!     FORMAT_VERSION,
//! );
//!
//! let engine = ResamplingEngine::new(RasterPyramid::new(image, &[2.0]).unwrap(), descriptor).unwrap();
//! let (w, h) = engine.output_dimensions();
//! let tile = engine.resample(&RegionRequest::new(1.0, 0, 0, w, h).unwrap()).unwrap();
//! assert_eq!(tile.dimensions(), (w, h));
//! ```

// Re-export core types (primary data structures used everywhere)
pub use warpy_core::*;

// Re-export domain crates as modules to avoid name conflicts
pub use warpy_resample as resample;
pub use warpy_transform as transform;
