//! Raster - multi-band pixel buffer
//!
//! `Raster` is the pixel container exchanged between a pixel source and the
//! resampling engine. Samples are stored band-interleaved in row-major order,
//! so the sample for band `b` of pixel (x, y) lives at
//! `(y * width + x) * bands + b`.
//!
//! Grayscale rasters (any number of bands of `u8`, `u16` or `f32` samples)
//! support per-sample arithmetic access through [`Raster::sample`] and
//! [`Raster::set_sample`]. Packed RGB rasters hold one `u32` word per pixel
//! and can only be copied pixel by pixel.
//!
//! # Examples
//!
//! ```
//! use warpy_core::{PixelFormat, Raster, SampleType};
//!
//! let format = PixelFormat::new(SampleType::U8, 1).unwrap();
//! let mut raster = Raster::new(64, 32, format).unwrap();
//! raster.set_sample(10, 5, 0, 127.6).unwrap();
//! assert_eq!(raster.sample(10, 5, 0).unwrap(), 128.0);
//! ```

use crate::error::{Error, Result};

/// Storage type of a single sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    /// Unsigned 8-bit integer
    U8,
    /// Unsigned 16-bit integer
    U16,
    /// 32-bit float
    F32,
    /// Packed 0xAARRGGBB word, one per pixel
    PackedRgb,
}

impl SampleType {
    /// Whether values are rounded and clamped when written
    #[inline]
    pub fn is_integer(self) -> bool {
        matches!(self, SampleType::U8 | SampleType::U16)
    }

    /// Largest representable sample value, if bounded
    pub fn max_value(self) -> Option<f32> {
        match self {
            SampleType::U8 => Some(u8::MAX as f32),
            SampleType::U16 => Some(u16::MAX as f32),
            SampleType::F32 | SampleType::PackedRgb => None,
        }
    }

    /// Short lowercase name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            SampleType::U8 => "u8",
            SampleType::U16 => "u16",
            SampleType::F32 => "f32",
            SampleType::PackedRgb => "rgb",
        }
    }
}

/// Pixel format descriptor: sample type and band count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    sample_type: SampleType,
    bands: u32,
}

impl PixelFormat {
    /// Create a pixel format
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if `bands` is 0, or if a packed RGB
    /// format is requested with more than one band.
    pub fn new(sample_type: SampleType, bands: u32) -> Result<Self> {
        if bands == 0 {
            return Err(Error::InvalidParameter(
                "band count must be positive".to_string(),
            ));
        }
        if sample_type == SampleType::PackedRgb && bands != 1 {
            return Err(Error::InvalidParameter(format!(
                "packed RGB rasters have exactly one band, got {bands}"
            )));
        }
        Ok(PixelFormat { sample_type, bands })
    }

    /// Single-band 8-bit grayscale
    pub fn gray8() -> Self {
        PixelFormat {
            sample_type: SampleType::U8,
            bands: 1,
        }
    }

    /// Packed RGB
    pub fn rgb() -> Self {
        PixelFormat {
            sample_type: SampleType::PackedRgb,
            bands: 1,
        }
    }

    #[inline]
    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    #[inline]
    pub fn bands(&self) -> u32 {
        self.bands
    }

    /// Whether samples can be read and written as numbers.
    ///
    /// Everything except packed RGB qualifies.
    #[inline]
    pub fn is_grayscale(&self) -> bool {
        self.sample_type != SampleType::PackedRgb
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.sample_type.name(), self.bands)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RasterData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
    PackedRgb(Vec<u32>),
}

impl RasterData {
    fn zeroed(sample_type: SampleType, len: usize) -> Self {
        match sample_type {
            SampleType::U8 => RasterData::U8(vec![0; len]),
            SampleType::U16 => RasterData::U16(vec![0; len]),
            SampleType::F32 => RasterData::F32(vec![0.0; len]),
            SampleType::PackedRgb => RasterData::PackedRgb(vec![0; len]),
        }
    }

    fn len(&self) -> usize {
        match self {
            RasterData::U8(v) => v.len(),
            RasterData::U16(v) => v.len(),
            RasterData::F32(v) => v.len(),
            RasterData::PackedRgb(v) => v.len(),
        }
    }
}

/// Multi-band pixel buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: RasterData,
}

impl Raster {
    /// Create a raster with every sample set to zero
    ///
    /// # Arguments
    ///
    /// * `width` - Width in pixels (must be > 0)
    /// * `height` - Height in pixels (must be > 0)
    /// * `format` - Sample type and band count
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if width or height is 0.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        let len = width as usize * height as usize * format.bands as usize;
        Ok(Raster {
            width,
            height,
            format,
            data: RasterData::zeroed(format.sample_type, len),
        })
    }

    fn check_len(width: u32, height: u32, bands: u32, actual: usize) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        let expected = width as usize * height as usize * bands as usize;
        if expected != actual {
            return Err(Error::DataLengthMismatch { expected, actual });
        }
        Ok(())
    }

    /// Create an 8-bit raster from interleaved samples
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are invalid or the data length
    /// doesn't equal `width * height * bands`.
    pub fn from_u8(width: u32, height: u32, bands: u32, data: Vec<u8>) -> Result<Self> {
        let format = PixelFormat::new(SampleType::U8, bands)?;
        Self::check_len(width, height, bands, data.len())?;
        Ok(Raster {
            width,
            height,
            format,
            data: RasterData::U8(data),
        })
    }

    /// Create a 16-bit raster from interleaved samples
    ///
    /// # Errors
    ///
    /// See [`Raster::from_u8`].
    pub fn from_u16(width: u32, height: u32, bands: u32, data: Vec<u16>) -> Result<Self> {
        let format = PixelFormat::new(SampleType::U16, bands)?;
        Self::check_len(width, height, bands, data.len())?;
        Ok(Raster {
            width,
            height,
            format,
            data: RasterData::U16(data),
        })
    }

    /// Create a floating-point raster from interleaved samples
    ///
    /// # Errors
    ///
    /// See [`Raster::from_u8`].
    pub fn from_f32(width: u32, height: u32, bands: u32, data: Vec<f32>) -> Result<Self> {
        let format = PixelFormat::new(SampleType::F32, bands)?;
        Self::check_len(width, height, bands, data.len())?;
        Ok(Raster {
            width,
            height,
            format,
            data: RasterData::F32(data),
        })
    }

    /// Create a packed RGB raster, one `u32` per pixel
    ///
    /// # Errors
    ///
    /// See [`Raster::from_u8`].
    pub fn from_packed_rgb(width: u32, height: u32, data: Vec<u32>) -> Result<Self> {
        Self::check_len(width, height, 1, data.len())?;
        Ok(Raster {
            width,
            height,
            format: PixelFormat::rgb(),
            data: RasterData::PackedRgb(data),
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get the raster dimensions as (width, height)
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn bands(&self) -> u32 {
        self.format.bands
    }

    #[inline]
    pub fn sample_type(&self) -> SampleType {
        self.format.sample_type
    }

    /// Total number of stored samples
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; rasters have at least one pixel
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    #[inline]
    fn index(&self, x: u32, y: u32, band: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.format.bands as usize + band as usize
    }

    fn checked_index(&self, x: u32, y: u32, band: u32) -> Result<usize> {
        if x >= self.width {
            return Err(Error::IndexOutOfBounds {
                index: x as usize,
                len: self.width as usize,
            });
        }
        if y >= self.height {
            return Err(Error::IndexOutOfBounds {
                index: y as usize,
                len: self.height as usize,
            });
        }
        if band >= self.format.bands {
            return Err(Error::IndexOutOfBounds {
                index: band as usize,
                len: self.format.bands as usize,
            });
        }
        Ok(self.index(x, y, band))
    }

    /// Read one sample as `f32`
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexOutOfBounds` for coordinates outside the raster
    /// and `Error::UnsupportedFormat` for packed RGB rasters.
    pub fn sample(&self, x: u32, y: u32, band: u32) -> Result<f32> {
        let idx = self.checked_index(x, y, band)?;
        match &self.data {
            RasterData::U8(v) => Ok(v[idx] as f32),
            RasterData::U16(v) => Ok(v[idx] as f32),
            RasterData::F32(v) => Ok(v[idx]),
            RasterData::PackedRgb(_) => Err(Error::UnsupportedFormat(
                "packed RGB samples are not numeric".to_string(),
            )),
        }
    }

    /// Read one sample without bounds checking
    ///
    /// Coordinates must be in range; packed RGB words are returned as their
    /// numeric value.
    #[inline]
    pub fn sample_unchecked(&self, x: u32, y: u32, band: u32) -> f32 {
        let idx = self.index(x, y, band);
        match &self.data {
            RasterData::U8(v) => v[idx] as f32,
            RasterData::U16(v) => v[idx] as f32,
            RasterData::F32(v) => v[idx],
            RasterData::PackedRgb(v) => v[idx] as f32,
        }
    }

    /// Write one sample
    ///
    /// Integer sample types round to nearest and clamp to their range;
    /// non-finite values are written as zero.
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexOutOfBounds` for coordinates outside the raster
    /// and `Error::UnsupportedFormat` for packed RGB rasters.
    pub fn set_sample(&mut self, x: u32, y: u32, band: u32, value: f32) -> Result<()> {
        let idx = self.checked_index(x, y, band)?;
        if self.format.sample_type == SampleType::PackedRgb {
            return Err(Error::UnsupportedFormat(
                "packed RGB samples are not numeric".to_string(),
            ));
        }
        self.store(idx, value);
        Ok(())
    }

    /// Write one sample without bounds checking
    #[inline]
    pub fn set_sample_unchecked(&mut self, x: u32, y: u32, band: u32, value: f32) {
        let idx = self.index(x, y, band);
        self.store(idx, value);
    }

    #[inline]
    fn store(&mut self, idx: usize, value: f32) {
        let value = if value.is_finite() { value } else { 0.0 };
        match &mut self.data {
            RasterData::U8(v) => v[idx] = value.round().clamp(0.0, u8::MAX as f32) as u8,
            RasterData::U16(v) => v[idx] = value.round().clamp(0.0, u16::MAX as f32) as u16,
            RasterData::F32(v) => v[idx] = value,
            RasterData::PackedRgb(v) => v[idx] = value.round().max(0.0) as u32,
        }
    }

    /// Read the packed RGB word of a pixel
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedFormat` if the raster is not packed RGB.
    pub fn packed_rgb(&self, x: u32, y: u32) -> Result<u32> {
        let idx = self.checked_index(x, y, 0)?;
        match &self.data {
            RasterData::PackedRgb(v) => Ok(v[idx]),
            _ => Err(Error::UnsupportedFormat(format!(
                "{} raster has no packed RGB words",
                self.format
            ))),
        }
    }

    /// Copy every band of one pixel from another raster of the same format
    ///
    /// This is a bit-exact element copy; no conversion or rounding occurs.
    /// Coordinates must be in range for both rasters.
    ///
    /// # Errors
    ///
    /// Returns `Error::IncompatibleFormats` if the formats differ.
    pub fn copy_pixel_from(
        &mut self,
        dx: u32,
        dy: u32,
        src: &Raster,
        sx: u32,
        sy: u32,
    ) -> Result<()> {
        if self.format != src.format {
            return Err(self.format_mismatch(src));
        }
        let n = self.format.bands as usize;
        let d = self.index(dx, dy, 0);
        let s = src.index(sx, sy, 0);
        match (&mut self.data, &src.data) {
            (RasterData::U8(a), RasterData::U8(b)) => a[d..d + n].copy_from_slice(&b[s..s + n]),
            (RasterData::U16(a), RasterData::U16(b)) => a[d..d + n].copy_from_slice(&b[s..s + n]),
            (RasterData::F32(a), RasterData::F32(b)) => a[d..d + n].copy_from_slice(&b[s..s + n]),
            (RasterData::PackedRgb(a), RasterData::PackedRgb(b)) => {
                a[d..d + n].copy_from_slice(&b[s..s + n])
            }
            _ => return Err(self.format_mismatch(src)),
        }
        Ok(())
    }

    fn format_mismatch(&self, other: &Raster) -> Error {
        Error::IncompatibleFormats(self.format.to_string(), other.format.to_string())
    }

    /// Extract a sub-region, filling pixels outside this raster with zero
    ///
    /// # Arguments
    ///
    /// * `x`, `y` - Top-left corner of the region (may be negative)
    /// * `width`, `height` - Region size (must be > 0)
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if width or height is 0.
    pub fn crop(&self, x: i64, y: i64, width: u32, height: u32) -> Result<Raster> {
        let mut out = Raster::new(width, height, self.format)?;
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + width as i64).min(self.width as i64);
        let y1 = (y + height as i64).min(self.height as i64);
        for sy in y0..y1 {
            for sx in x0..x1 {
                out.copy_pixel_from(
                    (sx - x) as u32,
                    (sy - y) as u32,
                    self,
                    sx as u32,
                    sy as u32,
                )?;
            }
        }
        Ok(out)
    }
}
