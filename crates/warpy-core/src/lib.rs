//! Warpy Core - Basic data structures for image warping
//!
//! This crate provides the value types shared by the transform and
//! resampling crates:
//!
//! - [`Raster`] - Multi-band pixel buffer
//! - [`PixelFormat`] / [`SampleType`] - Sample storage description
//! - [`PixelCalibration`] - Physical pixel size
//! - [`RegionRequest`] - A region at a given downsample, z and t
//! - [`Bounds`] - Floating-point bounding box

pub mod calibration;
pub mod error;
pub mod raster;
pub mod region;

pub use calibration::PixelCalibration;
pub use error::{Error, Result};
pub use raster::{PixelFormat, Raster, SampleType};
pub use region::{Bounds, RegionRequest};
