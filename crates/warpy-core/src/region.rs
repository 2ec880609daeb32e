//! Region requests and floating-point bounds
//!
//! A [`RegionRequest`] names a rectangle in full-resolution pixel coordinates
//! together with the downsample factor at which it should be delivered and
//! the z-slice / timepoint it belongs to. The delivered raster holds roughly
//! `width / downsample` by `height / downsample` pixels.

use crate::error::{Error, Result};

/// A rectangular region at a given resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionRequest {
    /// Downsample factor (1.0 = full resolution)
    pub downsample: f64,
    /// Left edge, full-resolution pixels
    pub x: i32,
    /// Top edge, full-resolution pixels
    pub y: i32,
    /// Width in full-resolution pixels
    pub width: u32,
    /// Height in full-resolution pixels
    pub height: u32,
    /// Z-slice index
    pub z: u32,
    /// Timepoint index
    pub t: u32,
}

impl RegionRequest {
    /// Create a request for plane (z = 0, t = 0)
    ///
    /// # Errors
    ///
    /// See [`RegionRequest::validate`].
    pub fn new(downsample: f64, x: i32, y: i32, width: u32, height: u32) -> Result<Self> {
        let request = RegionRequest {
            downsample,
            x,
            y,
            width,
            height,
            z: 0,
            t: 0,
        };
        request.validate()?;
        Ok(request)
    }

    /// Same region on another plane
    pub fn with_plane(mut self, z: u32, t: u32) -> Self {
        self.z = z;
        self.t = t;
        self
    }

    /// Check that the request describes a non-empty region
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if the downsample is not a positive
    /// finite number, and `Error::InvalidDimension` for an empty region.
    pub fn validate(&self) -> Result<()> {
        if !(self.downsample.is_finite() && self.downsample > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "downsample must be positive and finite, got {}",
                self.downsample
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidDimension {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Size of the raster that satisfies this request
    ///
    /// `floor(extent / downsample)`, but never smaller than one pixel.
    pub fn output_size(&self) -> (u32, u32) {
        let w = (self.width as f64 / self.downsample).floor().max(1.0);
        let h = (self.height as f64 / self.downsample).floor().max(1.0);
        (w as u32, h as u32)
    }
}

/// Axis-aligned floating-point bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bounds {
    /// A box containing nothing; the first included point defines it
    pub fn empty() -> Self {
        Bounds {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Bounds {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Grow the box to contain (x, y); non-finite points are ignored
    pub fn include(&mut self, x: f64, y: f64) {
        if !(x.is_finite() && y.is_finite()) {
            return;
        }
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn is_empty(&self) -> bool {
        !(self.min_x <= self.max_x && self.min_y <= self.max_y)
    }

    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_x - self.min_x
        }
    }

    pub fn height(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_y - self.min_y
        }
    }

    /// Inclusive containment test
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Smallest box with integer edges containing this one
    pub fn snapped_outward(&self) -> Self {
        Bounds {
            min_x: self.min_x.floor(),
            min_y: self.min_y.floor(),
            max_x: self.max_x.ceil(),
            max_y: self.max_y.ceil(),
        }
    }

    /// Grow every side by `pad`
    pub fn padded(&self, pad: f64) -> Self {
        Bounds {
            min_x: self.min_x - pad,
            min_y: self.min_y - pad,
            max_x: self.max_x + pad,
            max_y: self.max_y + pad,
        }
    }

    /// Intersection with another box (may be empty)
    pub fn intersect(&self, other: &Bounds) -> Self {
        Bounds {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        }
    }
}
