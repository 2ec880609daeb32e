//! Tile-based resampling engine
//!
//! [`ResamplingEngine`] presents a warped view of a [`PixelSource`]. The
//! descriptor's transform maps output coordinates to source coordinates;
//! every output pixel is pulled from the source through it.
//!
//! For each request the engine:
//!
//! 1. maps the request's four edges, sampled at `edge_samples + 1` points
//!    each, into source space and takes their bounding box (nonlinear
//!    transforms bow edges outward, so corners alone are not enough),
//! 2. picks the smallest source level not finer than the requested
//!    downsample divided by the global scale,
//! 3. pads the box by `ceil(level_downsample * pad_factor)` pixels, clamps it
//!    to the source and fetches it,
//! 4. maps every output pixel into the fetched raster and reconstructs it
//!    with the interpolation kernel; pixels outside the kernel's sampling
//!    window stay zero.

use crate::error::{ResampleError, ResampleResult};
use crate::field_cache::TransformFieldCache;
use crate::kernel::Kernel;
use crate::source::PixelSource;
use rayon::prelude::*;
use warpy_core::{Bounds, PixelCalibration, Raster, RegionRequest, SampleType};
use warpy_transform::{
    InterpolationMode, RealPoint, Transform, TransformError, TransformInterpolation,
};

/// Default and minimum number of steps along each sampled edge
pub const DEFAULT_EDGE_SAMPLES: usize = 10;

/// Default padding, in source-level pixels, around each fetched region
pub const DEFAULT_PAD_FACTOR: f64 = 4.0;

/// Tuning knobs of the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    /// Steps along each edge when mapping bounds; values below
    /// [`DEFAULT_EDGE_SAMPLES`] are raised to it
    pub edge_samples: usize,
    /// Fetch padding as a multiple of the source level's downsample
    pub pad_factor: f64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            edge_samples: DEFAULT_EDGE_SAMPLES,
            pad_factor: DEFAULT_PAD_FACTOR,
        }
    }
}

/// Produces warped regions of a pixel source on demand
#[derive(Debug)]
pub struct ResamplingEngine<S> {
    source: S,
    descriptor: TransformInterpolation,
    kernel: Kernel,
    field_cache: Option<TransformFieldCache>,
    edge_samples: usize,
    pad_factor: f64,
    output_width: u32,
    output_height: u32,
    global_scale: f64,
    calibration: PixelCalibration,
    output_levels: Vec<f64>,
}

impl<S: PixelSource> ResamplingEngine<S> {
    /// Create an engine with default options
    ///
    /// # Errors
    ///
    /// See [`ResamplingEngine::with_options`].
    pub fn new(source: S, descriptor: TransformInterpolation) -> ResampleResult<Self> {
        Self::with_options(source, descriptor, EngineOptions::default())
    }

    /// Create an engine
    ///
    /// Output bounds, global scale, calibration and resolution levels are
    /// computed here, once.
    ///
    /// # Errors
    ///
    /// - `ResampleError::Transform(NonInvertibleTransform)` if the transform
    ///   has no inverse
    /// - `ResampleError::UnsupportedPixelFormat` for packed RGB sources with
    ///   any kernel other than nearest neighbor
    /// - `ResampleError::Core` for an empty source or a negative or
    ///   non-finite pad factor
    /// - `ResampleError::SourceUnavailable` if the source reports no levels
    pub fn with_options(
        source: S,
        descriptor: TransformInterpolation,
        options: EngineOptions,
    ) -> ResampleResult<Self> {
        if !(options.pad_factor.is_finite() && options.pad_factor >= 0.0) {
            return Err(warpy_core::Error::InvalidParameter(format!(
                "pad factor must be non-negative, got {}",
                options.pad_factor
            ))
            .into());
        }
        let edge_samples = options.edge_samples.max(DEFAULT_EDGE_SAMPLES);

        let transform = descriptor.transform();
        if !transform.is_invertible() {
            return Err(TransformError::NonInvertibleTransform(format!(
                "{} has no inverse; output bounds cannot be computed",
                transform.name()
            ))
            .into());
        }

        let mode = descriptor.interpolation();
        let format = source.pixel_format();
        if mode != InterpolationMode::Nearest && format.sample_type() == SampleType::PackedRgb {
            return Err(ResampleError::UnsupportedPixelFormat {
                interpolation: mode.name().to_string(),
                format: format.to_string(),
            });
        }

        let (src_w, src_h) = (source.width(), source.height());
        if src_w == 0 || src_h == 0 {
            return Err(warpy_core::Error::InvalidDimension {
                width: src_w,
                height: src_h,
            }
            .into());
        }
        let levels = source.downsample_levels();
        if levels.is_empty() {
            return Err(ResampleError::SourceUnavailable(
                "pixel source reports no resolution levels".into(),
            ));
        }

        // output extent: source outline mapped back into output space
        let mut warned = false;
        let source_rect = Bounds::new(0.0, 0.0, src_w as f64, src_h as f64);
        let mut out_bounds = Bounds::empty();
        for (x, y) in edge_points(&source_rect, edge_samples) {
            let p = inverse_or_estimate(transform, RealPoint::new_2d(x, y), &mut warned)?;
            out_bounds.include(p.x, p.y);
        }
        if out_bounds.is_empty() {
            return Err(TransformError::NonInvertibleTransform(format!(
                "{} maps the source outline to no finite output point",
                transform.name()
            ))
            .into());
        }
        let output_width = out_bounds.width().ceil().max(1.0) as u32;
        let output_height = out_bounds.height().ceil().max(1.0) as u32;

        let origin = inverse_or_estimate(transform, RealPoint::new_2d(0.0, 0.0), &mut warned)?;
        let corner = inverse_or_estimate(
            transform,
            RealPoint::new_2d(src_w as f64, src_h as f64),
            &mut warned,
        )?;
        let diagonal = (src_w as f64).hypot(src_h as f64);
        let mut global_scale = corner.distance(&origin, 2) / diagonal;
        if !(global_scale.is_finite() && global_scale > 0.0) {
            tracing::warn!(global_scale, "degenerate global scale estimate, using 1.0");
            global_scale = 1.0;
        }

        // magnified output pixels cover less of the specimen; pixel units stay
        let source_cal = source.pixel_calibration();
        let calibration = if source_cal.has_physical_unit() {
            source_cal.scaled(1.0 / global_scale, 1.0 / global_scale)
        } else {
            source_cal
        };
        let (tile_w, tile_h) = source.preferred_tile_size();
        let output_levels = if output_width >= tile_w && output_height >= tile_h {
            levels.to_vec()
        } else {
            levels[..1].to_vec()
        };

        let cache_options = descriptor.field_cache();
        let field_cache = if cache_options.enabled {
            Some(TransformFieldCache::new(
                transform.clone(),
                output_width,
                output_height,
                cache_options.grid_spacing,
            )?)
        } else {
            None
        };

        tracing::debug!(
            transform = transform.name(),
            interpolation = mode.name(),
            output_width,
            output_height,
            global_scale,
            field_cache = cache_options.enabled,
            "resampling engine ready"
        );

        Ok(ResamplingEngine {
            source,
            kernel: Kernel::new(mode),
            descriptor,
            field_cache,
            edge_samples,
            pad_factor: options.pad_factor,
            output_width,
            output_height,
            global_scale,
            calibration,
            output_levels,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn descriptor(&self) -> &TransformInterpolation {
        &self.descriptor
    }

    pub fn field_cache(&self) -> Option<&TransformFieldCache> {
        self.field_cache.as_ref()
    }

    /// Full-resolution output size as (width, height)
    pub fn output_dimensions(&self) -> (u32, u32) {
        (self.output_width, self.output_height)
    }

    pub fn output_pixel_calibration(&self) -> &PixelCalibration {
        &self.calibration
    }

    pub fn output_downsample_levels(&self) -> &[f64] {
        &self.output_levels
    }

    /// Output-to-source length ratio along the image diagonal
    ///
    /// Greater than one when the output is magnified.
    pub fn global_scale(&self) -> f64 {
        self.global_scale
    }

    /// Source level used for an output downsample
    pub fn source_downsample(&self, downsample: f64) -> f64 {
        let levels = self.source.downsample_levels();
        let target = downsample / self.global_scale;
        levels
            .iter()
            .copied()
            .find(|&level| level >= target * (1.0 - 1e-9))
            .or_else(|| levels.last().copied())
            .unwrap_or(1.0)
    }

    /// Source region fetched to serve `request`
    ///
    /// `None` when the request maps entirely outside the source.
    ///
    /// # Errors
    ///
    /// Returns `ResampleError::Core` for an invalid request.
    pub fn source_request(&self, request: &RegionRequest) -> ResampleResult<Option<RegionRequest>> {
        request.validate()?;
        let transform = self.descriptor.transform();
        let z = request.z as f64;
        let region = Bounds::new(
            request.x as f64,
            request.y as f64,
            request.x as f64 + request.width as f64,
            request.y as f64 + request.height as f64,
        );
        let mut mapped = Bounds::empty();
        for (x, y) in edge_points(&region, self.edge_samples) {
            let p = transform.apply(RealPoint::new(x, y, z));
            mapped.include(p.x, p.y);
        }
        if mapped.is_empty() {
            return Ok(None);
        }

        let level = self.source_downsample(request.downsample);
        let pad = (level * self.pad_factor).ceil();
        let extent = Bounds::new(
            0.0,
            0.0,
            self.source.width() as f64,
            self.source.height() as f64,
        );
        let fetch = mapped.snapped_outward().padded(pad).intersect(&extent);
        if fetch.width() < 1.0 || fetch.height() < 1.0 {
            return Ok(None);
        }

        Ok(Some(RegionRequest {
            downsample: level,
            x: fetch.min_x as i32,
            y: fetch.min_y as i32,
            width: fetch.width() as u32,
            height: fetch.height() as u32,
            z: request.z,
            t: request.t,
        }))
    }

    /// Render one output region
    ///
    /// The result has `request.output_size()` pixels in the source's pixel
    /// format. Output pixel `(i, j)` samples the transform at full-resolution
    /// output position `(x + i * downsample, y + j * downsample)`.
    ///
    /// # Errors
    ///
    /// - `ResampleError::Core` for an invalid request or a source raster
    ///   whose format differs from the one it reports
    /// - `ResampleError::SourceUnavailable` if the source read fails
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn resample(&self, request: &RegionRequest) -> ResampleResult<Raster> {
        request.validate()?;
        let (out_w, out_h) = request.output_size();
        let mut out = Raster::new(out_w, out_h, self.source.pixel_format())?;
        let Some(fetch) = self.source_request(request)? else {
            tracing::trace!("request maps outside the source");
            return Ok(out);
        };
        tracing::trace!(
            level = fetch.downsample,
            x = fetch.x,
            y = fetch.y,
            width = fetch.width,
            height = fetch.height,
            "fetching source region"
        );

        let fetched = self
            .source
            .read_region(&fetch)
            .map_err(ResampleError::SourceUnavailable)?;
        if fetched.format() != out.format() {
            return Err(warpy_core::Error::IncompatibleFormats(
                out.format().to_string(),
                fetched.format().to_string(),
            )
            .into());
        }

        // full-resolution position of fetched pixel (0, 0)
        let level = fetch.downsample;
        let origin_x = (fetch.x as f64 / level).floor() * level;
        let origin_y = (fetch.y as f64 / level).floor() * level;
        let (fw, fh) = fetched.dimensions();

        let transform = self.descriptor.transform();
        let cache = self.field_cache.as_ref().filter(|_| request.z == 0);
        let z = request.z as f64;
        let nearest = self.kernel.mode() == InterpolationMode::Nearest;
        let bands = out.bands();

        for oy in 0..out_h {
            let ty = request.y as f64 + oy as f64 * request.downsample;
            for ox in 0..out_w {
                let tx = request.x as f64 + ox as f64 * request.downsample;
                let (sx, sy) = match cache {
                    Some(cache) => cache.lookup(tx, ty),
                    None => {
                        let p = transform.apply(RealPoint::new(tx, ty, z));
                        (p.x, p.y)
                    }
                };
                let fx = (sx - origin_x) / level;
                let fy = (sy - origin_y) / level;
                let Some(fp) = self.kernel.footprint(fx, fy, fw, fh) else {
                    continue;
                };
                if nearest {
                    let (px, py) = fp.origin();
                    out.copy_pixel_from(ox, oy, &fetched, px, py)?;
                } else {
                    for band in 0..bands {
                        out.set_sample_unchecked(ox, oy, band, fp.sample(&fetched, band) as f32);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Tile grid covering the whole output at one downsample
    ///
    /// # Arguments
    ///
    /// * `downsample` - Output downsample factor
    /// * `tile_width`, `tile_height` - Tile size in output pixels at that
    ///   downsample
    /// * `z`, `t` - Plane of every tile
    ///
    /// # Errors
    ///
    /// Returns `ResampleError::InvalidRequest` for a zero tile size or an
    /// invalid downsample.
    pub fn tile_requests(
        &self,
        downsample: f64,
        tile_width: u32,
        tile_height: u32,
        z: u32,
        t: u32,
    ) -> ResampleResult<Vec<RegionRequest>> {
        if tile_width == 0 || tile_height == 0 {
            return Err(ResampleError::InvalidRequest(format!(
                "tile size must be positive, got {tile_width}x{tile_height}"
            )));
        }
        if !(downsample.is_finite() && downsample > 0.0) {
            return Err(ResampleError::InvalidRequest(format!(
                "downsample must be positive, got {downsample}"
            )));
        }
        let step_x = (tile_width as f64 * downsample).ceil().max(1.0) as u32;
        let step_y = (tile_height as f64 * downsample).ceil().max(1.0) as u32;

        let mut tiles = Vec::new();
        for y in (0..self.output_height).step_by(step_y as usize) {
            let h = step_y.min(self.output_height - y);
            for x in (0..self.output_width).step_by(step_x as usize) {
                let w = step_x.min(self.output_width - x);
                tiles.push(RegionRequest {
                    downsample,
                    x: x as i32,
                    y: y as i32,
                    width: w,
                    height: h,
                    z,
                    t,
                });
            }
        }
        Ok(tiles)
    }

    /// Render a batch of requests in parallel
    ///
    /// All tiles share this engine and its field cache. Results are in
    /// request order.
    pub fn resample_tiles(&self, requests: &[RegionRequest]) -> Vec<ResampleResult<Raster>> {
        requests.par_iter().map(|r| self.resample(r)).collect()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Points along the outline of a box, `steps + 1` per edge, clockwise
fn edge_points(b: &Bounds, steps: usize) -> Vec<(f64, f64)> {
    let corners = [
        (b.min_x, b.min_y),
        (b.max_x, b.min_y),
        (b.max_x, b.max_y),
        (b.min_x, b.max_y),
    ];
    let mut points = Vec::with_capacity(4 * (steps + 1));
    for e in 0..4 {
        let (x0, y0) = corners[e];
        let (x1, y1) = corners[(e + 1) % 4];
        for k in 0..=steps {
            let f = k as f64 / steps as f64;
            points.push((x0 + f * (x1 - x0), y0 + f * (y1 - y0)));
        }
    }
    points
}

/// Inverse mapping, accepting the last estimate of a non-converged solve
fn inverse_or_estimate(
    transform: &Transform,
    p: RealPoint,
    warned: &mut bool,
) -> ResampleResult<RealPoint> {
    match transform.apply_inverse(p) {
        Ok(q) => Ok(q),
        Err(TransformError::Convergence {
            estimate,
            residual,
            iterations,
        }) => {
            if !*warned {
                tracing::warn!(
                    residual,
                    iterations,
                    "inverse did not converge while estimating output bounds, using approximation"
                );
                *warned = true;
            }
            Ok(estimate)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RasterPyramid;
    use warpy_transform::{AffineTransform, FORMAT_VERSION, FieldCacheOptions, Sequence};

    fn gradient(w: u32, h: u32) -> Raster {
        let data: Vec<u8> = (0..h)
            .flat_map(|y| (0..w).map(move |x| ((x * 3 + y * 5) % 256) as u8))
            .collect();
        Raster::from_u8(w, h, 1, data).unwrap()
    }

    fn descriptor(t: AffineTransform, mode: InterpolationMode) -> TransformInterpolation {
        TransformInterpolation::new(Transform::Affine(t), mode, FORMAT_VERSION)
    }

    #[test]
    fn test_edge_points() {
        let pts = edge_points(&Bounds::new(0.0, 0.0, 10.0, 20.0), 10);
        assert_eq!(pts.len(), 44);
        assert_eq!(pts[0], (0.0, 0.0));
        assert_eq!(pts[10], (10.0, 0.0));
        assert_eq!(pts[5], (5.0, 0.0));
        assert!(pts.contains(&(10.0, 20.0)));
    }

    #[test]
    fn test_identity_geometry() {
        let src = RasterPyramid::new(gradient(40, 30), &[2.0]).unwrap();
        let e = ResamplingEngine::new(
            src,
            descriptor(AffineTransform::identity(2).unwrap(), InterpolationMode::Nearest),
        )
        .unwrap();
        assert_eq!(e.output_dimensions(), (40, 30));
        assert_eq!(e.global_scale(), 1.0);
        // smaller than one 512 tile: single level
        assert_eq!(e.output_downsample_levels(), &[1.0]);
        assert_eq!(e.source_downsample(1.0), 1.0);
        assert_eq!(e.source_downsample(1.5), 2.0);
        assert_eq!(e.source_downsample(2.0), 2.0);
        assert_eq!(e.source_downsample(8.0), 2.0);
    }

    #[test]
    fn test_scale_changes_calibration_and_level() {
        let src = RasterPyramid::new(gradient(64, 64), &[2.0, 4.0])
            .unwrap()
            .with_calibration(PixelCalibration::new(0.5, 0.5, "µm"))
            .with_tile_size(16, 16);
        // output pixel (x, y) reads source (x / 2, y / 2): a 2x magnification
        let t = AffineTransform::scaling(&[0.5, 0.5]).unwrap();
        let e = ResamplingEngine::new(src, descriptor(t, InterpolationMode::Bilinear)).unwrap();
        assert_eq!(e.output_dimensions(), (128, 128));
        assert!((e.global_scale() - 2.0).abs() < 1e-12);
        assert!((e.output_pixel_calibration().pixel_width() - 0.25).abs() < 1e-12);
        assert_eq!(e.output_downsample_levels(), &[1.0, 2.0, 4.0]);
        assert_eq!(e.source_downsample(4.0), 2.0);
    }

    #[test]
    fn test_pad_factor_validation() {
        let src = RasterPyramid::new(gradient(8, 8), &[]).unwrap();
        let options = EngineOptions {
            edge_samples: 2,
            pad_factor: -1.0,
        };
        let d = descriptor(AffineTransform::identity(2).unwrap(), InterpolationMode::Nearest);
        assert!(matches!(
            ResamplingEngine::with_options(src, d, options),
            Err(ResampleError::Core(_))
        ));
    }

    #[test]
    fn test_request_outside_source_is_background() {
        let src = RasterPyramid::new(gradient(20, 20), &[]).unwrap();
        let t = AffineTransform::translation(&[500.0, 0.0]).unwrap();
        let e = ResamplingEngine::new(src, descriptor(t, InterpolationMode::Nearest)).unwrap();
        let req = RegionRequest::new(1.0, 0, 0, 10, 10).unwrap();
        assert!(e.source_request(&req).unwrap().is_none());
        let out = e.resample(&req).unwrap();
        assert_eq!(out, Raster::new(10, 10, out.format()).unwrap());
    }

    #[test]
    fn test_bilinear_translation_by_half_pixel() {
        let src = RasterPyramid::new(gradient(20, 20), &[]).unwrap();
        let t = AffineTransform::translation(&[0.5, 0.0]).unwrap();
        let e = ResamplingEngine::new(src, descriptor(t, InterpolationMode::Bilinear)).unwrap();
        let out = e.resample(&RegionRequest::new(1.0, 4, 4, 4, 4).unwrap()).unwrap();
        // (3x + 5y) at x + 0.5 rounds half away from zero
        let expected = ((3.0 * 4.5 + 5.0 * 4.0) as f32).round();
        assert_eq!(out.sample(0, 0, 0).unwrap(), expected);
    }

    #[test]
    fn test_cache_bypassed_off_plane_zero() {
        let src = RasterPyramid::new(gradient(32, 32), &[]).unwrap();
        let d = descriptor(AffineTransform::identity(2).unwrap(), InterpolationMode::Nearest)
            .with_field_cache(FieldCacheOptions::enabled(8))
            .unwrap();
        let e = ResamplingEngine::new(src, d).unwrap();
        let req = RegionRequest::new(1.0, 0, 0, 8, 8).unwrap().with_plane(1, 0);
        e.resample(&req).unwrap();
        assert_eq!(e.field_cache().unwrap().cached_nodes(), 0);
        e.resample(&RegionRequest::new(1.0, 0, 0, 8, 8).unwrap()).unwrap();
        assert!(e.field_cache().unwrap().cached_nodes() > 0);
    }

    #[test]
    fn test_forward_only_sequence_rejected() {
        let src = RasterPyramid::new(gradient(8, 8), &[]).unwrap();
        let seq = Sequence::new(vec![Transform::Affine(AffineTransform::identity(2).unwrap())]);
        let d = TransformInterpolation::new(
            Transform::Sequence(seq),
            InterpolationMode::Nearest,
            FORMAT_VERSION,
        );
        assert!(matches!(
            ResamplingEngine::new(src, d),
            Err(ResampleError::Transform(TransformError::NonInvertibleTransform(_)))
        ));
    }

    #[test]
    fn test_tile_requests_cover_output() {
        let src = RasterPyramid::new(gradient(50, 30), &[]).unwrap();
        let e = ResamplingEngine::new(
            src,
            descriptor(AffineTransform::identity(2).unwrap(), InterpolationMode::Nearest),
        )
        .unwrap();
        let tiles = e.tile_requests(2.0, 8, 8, 0, 0).unwrap();
        // 16-pixel steps: 4 columns, 2 rows
        assert_eq!(tiles.len(), 8);
        let area: u64 = tiles.iter().map(|r| r.width as u64 * r.height as u64).sum();
        assert_eq!(area, 50 * 30);
        assert_eq!(tiles[3].width, 2);
        assert!(e.tile_requests(1.0, 0, 8, 0, 0).is_err());
    }
}
