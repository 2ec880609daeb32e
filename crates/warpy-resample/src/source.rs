//! Pixel sources
//!
//! The resampling engine reads source pixels through the [`PixelSource`]
//! trait: a multi-resolution image that delivers any rectangular region at
//! one of its downsample levels. [`RasterPyramid`] is an in-memory
//! implementation built from a single full-resolution raster.

use crate::error::SourceError;
use warpy_core::{PixelCalibration, PixelFormat, Raster, RegionRequest};

/// Default tile edge reported by sources without a preference
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// A multi-resolution image
pub trait PixelSource: Send + Sync {
    /// Full-resolution width in pixels
    fn width(&self) -> u32;

    /// Full-resolution height in pixels
    fn height(&self) -> u32;

    /// Available downsample factors, ascending, starting with 1.0
    fn downsample_levels(&self) -> &[f64];

    fn pixel_format(&self) -> PixelFormat;

    fn pixel_calibration(&self) -> PixelCalibration {
        PixelCalibration::default()
    }

    /// Preferred tile size as (width, height) in level pixels
    fn preferred_tile_size(&self) -> (u32, u32) {
        (DEFAULT_TILE_SIZE, DEFAULT_TILE_SIZE)
    }

    /// Read a region at one of the available downsample levels
    ///
    /// The delivered raster covers the request at the requested downsample,
    /// `ceil` of the region's extent divided by the downsample in each
    /// direction. Pixels outside the image are zero.
    fn read_region(&self, request: &RegionRequest) -> Result<Raster, SourceError>;
}

impl<S: PixelSource + ?Sized> PixelSource for Box<S> {
    fn width(&self) -> u32 {
        (**self).width()
    }

    fn height(&self) -> u32 {
        (**self).height()
    }

    fn downsample_levels(&self) -> &[f64] {
        (**self).downsample_levels()
    }

    fn pixel_format(&self) -> PixelFormat {
        (**self).pixel_format()
    }

    fn pixel_calibration(&self) -> PixelCalibration {
        (**self).pixel_calibration()
    }

    fn preferred_tile_size(&self) -> (u32, u32) {
        (**self).preferred_tile_size()
    }

    fn read_region(&self, request: &RegionRequest) -> Result<Raster, SourceError> {
        (**self).read_region(request)
    }
}

/// In-memory image pyramid
///
/// Each level is a point-sampled reduction of the full-resolution raster:
/// level pixel `(i, j)` at downsample `d` is full-resolution pixel
/// `(floor(i * d), floor(j * d))`.
#[derive(Debug, Clone)]
pub struct RasterPyramid {
    levels: Vec<Raster>,
    downsamples: Vec<f64>,
    calibration: PixelCalibration,
    tile_size: (u32, u32),
}

impl RasterPyramid {
    /// Build a pyramid from a full-resolution raster
    ///
    /// # Arguments
    ///
    /// * `full` - The level-0 raster
    /// * `downsamples` - Extra levels; 1.0 is always added, factors below
    ///   1.0 or non-finite are ignored
    ///
    /// # Errors
    ///
    /// Returns `warpy_core::Error` if a level raster cannot be allocated.
    pub fn new(full: Raster, downsamples: &[f64]) -> warpy_core::Result<Self> {
        let mut factors: Vec<f64> = downsamples
            .iter()
            .copied()
            .filter(|d| d.is_finite() && *d > 1.0)
            .collect();
        factors.push(1.0);
        factors.sort_by(f64::total_cmp);
        factors.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

        let mut levels = Vec::with_capacity(factors.len());
        for &ds in &factors {
            levels.push(if ds == 1.0 {
                full.clone()
            } else {
                reduce(&full, ds)?
            });
        }

        Ok(RasterPyramid {
            levels,
            downsamples: factors,
            calibration: PixelCalibration::default(),
            tile_size: (DEFAULT_TILE_SIZE, DEFAULT_TILE_SIZE),
        })
    }

    pub fn with_calibration(mut self, calibration: PixelCalibration) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn with_tile_size(mut self, width: u32, height: u32) -> Self {
        self.tile_size = (width.max(1), height.max(1));
        self
    }

    /// Raster of one level
    pub fn level(&self, index: usize) -> Option<&Raster> {
        self.levels.get(index)
    }

    fn level_for(&self, downsample: f64) -> Option<usize> {
        self.downsamples
            .iter()
            .position(|d| (d - downsample).abs() < 1e-9)
    }
}

fn reduce(full: &Raster, ds: f64) -> warpy_core::Result<Raster> {
    let (w, h) = full.dimensions();
    let lw = (w as f64 / ds).ceil().max(1.0) as u32;
    let lh = (h as f64 / ds).ceil().max(1.0) as u32;
    let mut out = Raster::new(lw, lh, full.format())?;
    for j in 0..lh {
        let sy = ((j as f64 * ds).floor() as u32).min(h - 1);
        for i in 0..lw {
            let sx = ((i as f64 * ds).floor() as u32).min(w - 1);
            out.copy_pixel_from(i, j, full, sx, sy)?;
        }
    }
    Ok(out)
}

impl PixelSource for RasterPyramid {
    fn width(&self) -> u32 {
        self.levels[0].width()
    }

    fn height(&self) -> u32 {
        self.levels[0].height()
    }

    fn downsample_levels(&self) -> &[f64] {
        &self.downsamples
    }

    fn pixel_format(&self) -> PixelFormat {
        self.levels[0].format()
    }

    fn pixel_calibration(&self) -> PixelCalibration {
        self.calibration.clone()
    }

    fn preferred_tile_size(&self) -> (u32, u32) {
        self.tile_size
    }

    fn read_region(&self, request: &RegionRequest) -> Result<Raster, SourceError> {
        request.validate()?;
        let index = self.level_for(request.downsample).ok_or_else(|| {
            format!(
                "no pyramid level with downsample {} (available: {:?})",
                request.downsample, self.downsamples
            )
        })?;
        let ds = self.downsamples[index];
        let lx0 = (request.x as f64 / ds).floor() as i64;
        let ly0 = (request.y as f64 / ds).floor() as i64;
        let lx1 = ((request.x as f64 + request.width as f64) / ds).ceil() as i64;
        let ly1 = ((request.y as f64 + request.height as f64) / ds).ceil() as i64;
        let w = (lx1 - lx0).max(1) as u32;
        let h = (ly1 - ly0).max(1) as u32;
        Ok(self.levels[index].crop(lx0, ly0, w, h)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> Raster {
        let data: Vec<u8> = (0..h)
            .flat_map(|y| (0..w).map(move |x| (x + y * w) as u8))
            .collect();
        Raster::from_u8(w, h, 1, data).unwrap()
    }

    #[test]
    fn test_levels() {
        let p = RasterPyramid::new(gradient(10, 6), &[4.0, 2.0, 0.5, f64::NAN, 2.0]).unwrap();
        assert_eq!(p.downsample_levels(), &[1.0, 2.0, 4.0]);
        assert_eq!(p.level(1).unwrap().dimensions(), (5, 3));
        assert_eq!(p.level(2).unwrap().dimensions(), (3, 2));
        // level 2, pixel (2, 1) is full-resolution pixel (8, 4)
        assert_eq!(p.level(2).unwrap().sample(2, 1, 0).unwrap(), 48.0);
    }

    #[test]
    fn test_read_full_resolution() {
        let full = gradient(8, 8);
        let p = RasterPyramid::new(full.clone(), &[]).unwrap();
        let req = RegionRequest::new(1.0, 2, 3, 4, 2).unwrap();
        let r = p.read_region(&req).unwrap();
        assert_eq!(r, full.crop(2, 3, 4, 2).unwrap());
    }

    #[test]
    fn test_read_outside_is_zero() {
        let p = RasterPyramid::new(gradient(4, 4), &[]).unwrap();
        let req = RegionRequest::new(1.0, -2, 0, 3, 1).unwrap();
        let r = p.read_region(&req).unwrap();
        assert_eq!(r.sample(0, 0, 0).unwrap(), 0.0);
        assert_eq!(r.sample(2, 0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_read_downsampled() {
        let p = RasterPyramid::new(gradient(8, 8), &[2.0]).unwrap();
        let req = RegionRequest::new(2.0, 2, 4, 4, 4).unwrap();
        let r = p.read_region(&req).unwrap();
        assert_eq!(r.dimensions(), (2, 2));
        assert_eq!(r.sample(0, 0, 0).unwrap(), 34.0);
    }

    #[test]
    fn test_missing_level() {
        let p = RasterPyramid::new(gradient(8, 8), &[2.0]).unwrap();
        let req = RegionRequest::new(3.0, 0, 0, 6, 6).unwrap();
        assert!(p.read_region(&req).is_err());
    }
}
