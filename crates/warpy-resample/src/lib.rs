//! warpy-resample - Image resampling through coordinate transforms
//!
//! This crate renders warped views of multi-resolution images:
//!
//! - **Kernels**: nearest neighbor, bilinear and the cubic-convolution family
//! - **Field cache**: coarse-grid approximation of expensive transforms
//! - **Sources**: the [`PixelSource`] trait and the in-memory [`RasterPyramid`]
//! - **Engine**: [`ResamplingEngine`], which maps output regions through a
//!   [`TransformInterpolation`](warpy_transform::TransformInterpolation)
//!   descriptor and reconstructs them from the source
//!
//! # Example
//!
//! ```
//! use warpy_core::{Raster, RegionRequest};
//! use warpy_resample::{RasterPyramid, ResamplingEngine};
//! use warpy_transform::{
//!     AffineTransform, FORMAT_VERSION, InterpolationMode, Transform, TransformInterpolation,
//! };
//!
//! let image = Raster::from_u8(4, 4, 1, (0..16).collect()).unwrap();
//! let source = RasterPyramid::new(image, &[]).unwrap();
//! let shift = AffineTransform::translation(&[1.0, 0.0]).unwrap();
//! let descriptor = TransformInterpolation::new(
//!     Transform::Affine(shift),
//!     InterpolationMode::Nearest,
//!     FORMAT_VERSION,
//! );
//!
//! let engine = ResamplingEngine::new(source, descriptor).unwrap();
//! let tile = engine
//!     .resample(&RegionRequest::new(1.0, 0, 0, 4, 4).unwrap())
//!     .unwrap();
//! assert_eq!(tile.sample(0, 0, 0).unwrap(), 1.0);
//! ```

pub mod engine;
pub mod error;
pub mod field_cache;
pub mod kernel;
pub mod source;

pub use engine::{DEFAULT_EDGE_SAMPLES, DEFAULT_PAD_FACTOR, EngineOptions, ResamplingEngine};
pub use error::{ResampleError, ResampleResult, SourceError};
pub use field_cache::TransformFieldCache;
pub use kernel::{Footprint, Kernel, cubic_weight};
pub use source::{DEFAULT_TILE_SIZE, PixelSource, RasterPyramid};
