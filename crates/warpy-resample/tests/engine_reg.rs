//! Resampling engine regression test
//!
//! Renders rotated, identity and spline-warped views of synthetic pyramids
//! and checks them against direct evaluation of the transform, the fetched
//! source regions against the mapped request, and the error paths of engine
//! construction and rendering.

use std::f64::consts::FRAC_PI_4;
use warpy_core::{Bounds, PixelFormat, Raster, RegionRequest};
use warpy_resample::{
    PixelSource, RasterPyramid, ResampleError, ResamplingEngine, SourceError,
};
use warpy_test::{RegParams, SimpleRng};
use warpy_transform::{
    AffineTransform, FORMAT_VERSION, FieldCacheOptions, InterpolationMode, NumericInverse,
    RealPoint, ThinPlateSpline, Transform, TransformError, TransformInterpolation,
};

fn pattern(w: u32, h: u32) -> Raster {
    let data: Vec<u8> = (0..h)
        .flat_map(|y| (0..w).map(move |x| ((x * 7 + y * 13) % 251) as u8))
        .collect();
    Raster::from_u8(w, h, 1, data).unwrap()
}

fn describe(transform: Transform, mode: InterpolationMode) -> TransformInterpolation {
    TransformInterpolation::new(transform, mode, FORMAT_VERSION)
}

fn rotation() -> Transform {
    Transform::Affine(AffineTransform::rotation_2d(50.0, 50.0, FRAC_PI_4).unwrap())
}

/// Spline warp bowing the top edge upward, made invertible numerically
fn bulge() -> Transform {
    let src = vec![
        vec![0.0, 0.0],
        vec![100.0, 0.0],
        vec![0.0, 100.0],
        vec![100.0, 100.0],
        vec![50.0, 20.0],
    ];
    let tgt = vec![
        vec![0.0, 0.0],
        vec![100.0, 0.0],
        vec![0.0, 100.0],
        vec![100.0, 100.0],
        vec![50.0, 8.0],
    ];
    let tps = ThinPlateSpline::new(&src, &tgt).unwrap();
    Transform::NumericInverse(NumericInverse::new(Transform::ThinPlateSpline(tps)))
}

struct OfflineSource;

impl PixelSource for OfflineSource {
    fn width(&self) -> u32 {
        64
    }

    fn height(&self) -> u32 {
        64
    }

    fn downsample_levels(&self) -> &[f64] {
        &[1.0]
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::gray8()
    }

    fn read_region(&self, _request: &RegionRequest) -> Result<Raster, SourceError> {
        Err("slide server offline".into())
    }
}

#[test]
fn engine_rotation_reg() {
    warpy_test::init_tracing();
    let mut rp = RegParams::new("engine_rotation");
    let image = pattern(100, 100);
    let source = RasterPyramid::new(image.clone(), &[]).unwrap();
    let engine =
        ResamplingEngine::new(source, describe(rotation(), InterpolationMode::Nearest)).unwrap();

    // the rotated square's bounding box: 100 * sqrt(2) on each side
    let (w, h) = engine.output_dimensions();
    rp.compare_values(142.0, w as f64, 0.0);
    rp.compare_values(142.0, h as f64, 0.0);
    rp.compare_values(1.0, engine.global_scale(), 1e-12);

    // the whole rotated square is fetched for a full-image request
    let full = RegionRequest::new(1.0, 0, 0, w, h).unwrap();
    let fetch = engine.source_request(&full).unwrap().unwrap();
    rp.compare_values(0.0, fetch.x as f64, 0.0);
    rp.compare_values(0.0, fetch.y as f64, 0.0);
    rp.compare_values(100.0, fetch.width as f64, 0.0);
    rp.compare_values(100.0, fetch.height as f64, 0.0);

    let out = engine.resample(&full).unwrap();
    let mut expected = Raster::new(w, h, image.format()).unwrap();
    let t = rotation();
    for y in 0..h {
        for x in 0..w {
            let p = t.apply(RealPoint::new_2d(x as f64, y as f64));
            let sx = (p.x + 0.5).floor();
            let sy = (p.y + 0.5).floor();
            if sx >= 0.0 && sx < 100.0 && sy >= 0.0 && sy < 100.0 {
                expected
                    .copy_pixel_from(x, y, &image, sx as u32, sy as u32)
                    .unwrap();
            }
        }
    }
    rp.compare_rasters(&expected, &out);

    assert!(rp.cleanup(), "engine rotation regression test failed");
}

#[test]
fn engine_fetch_bounds_reg() {
    let mut rp = RegParams::new("engine_fetch_bounds");
    let mut rng = SimpleRng::new(2024);
    let extent = Bounds::new(0.0, 0.0, 100.0, 100.0);

    for transform in [rotation(), bulge()] {
        let source = RasterPyramid::new(pattern(100, 100), &[2.0]).unwrap();
        let engine = ResamplingEngine::new(
            source,
            describe(transform.clone(), InterpolationMode::Bilinear),
        )
        .unwrap();

        for _ in 0..20 {
            let x = rng.range(0.0, 100.0) as i32;
            let y = rng.range(0.0, 100.0) as i32;
            let size = rng.range(8.0, 40.0) as u32;
            let req = RegionRequest::new(1.0, x, y, size, size).unwrap();
            let Some(fetch) = engine.source_request(&req).unwrap() else {
                continue;
            };
            let fetched = Bounds::new(
                fetch.x as f64,
                fetch.y as f64,
                (fetch.x + fetch.width as i32) as f64,
                (fetch.y + fetch.height as i32) as f64,
            );
            // every mapped point of the request that lands on the source
            // lies inside the fetched region
            for j in 0..=8 {
                for i in 0..=8 {
                    let tx = x as f64 + size as f64 * i as f64 / 8.0;
                    let ty = y as f64 + size as f64 * j as f64 / 8.0;
                    let p = transform.apply(RealPoint::new_2d(tx, ty));
                    if extent.contains(p.x, p.y) {
                        rp.check(
                            fetched.contains(p.x, p.y),
                            &format!("({tx}, {ty}) -> ({}, {}) within {fetched:?}", p.x, p.y),
                        );
                    }
                }
            }
        }
    }

    assert!(rp.cleanup(), "engine fetch bounds regression test failed");
}

#[test]
fn engine_identity_reg() {
    let mut rp = RegParams::new("engine_identity");
    let mut rng = SimpleRng::new(31);
    let data: Vec<u16> = (0..96 * 80 * 2).map(|i| (i * 37 % 65521) as u16).collect();
    let image = Raster::from_u16(96, 80, 2, data).unwrap();
    let source = RasterPyramid::new(image, &[2.0, 4.0]).unwrap();
    let reference = source.clone();
    let identity = Transform::Affine(AffineTransform::identity(2).unwrap());
    let engine =
        ResamplingEngine::new(source, describe(identity, InterpolationMode::Nearest)).unwrap();

    for downsample in [1.0, 2.0] {
        for _ in 0..10 {
            let x = 2 * (rng.range(0.0, 40.0) as i32);
            let y = 2 * (rng.range(0.0, 32.0) as i32);
            let w = 2 * (rng.range(1.0, 8.0) as u32);
            let h = 2 * (rng.range(1.0, 8.0) as u32);
            let req = RegionRequest::new(downsample, x, y, w, h).unwrap();
            let direct = reference.read_region(&req).unwrap();
            let warped = engine.resample(&req).unwrap();
            rp.compare_rasters(&direct, &warped);
        }
    }

    assert!(rp.cleanup(), "engine identity regression test failed");
}

#[test]
fn engine_pixel_format_reg() {
    let mut rp = RegParams::new("engine_pixel_format");
    let words: Vec<u32> = (0..256).map(|i| 0x00ff_0000 | (i << 8) | (255 - i)).collect();
    let rgb = Raster::from_packed_rgb(16, 16, words).unwrap();
    let identity = Transform::Affine(AffineTransform::identity(2).unwrap());

    let source = RasterPyramid::new(rgb.clone(), &[]).unwrap();
    let result = ResamplingEngine::new(
        source,
        describe(identity.clone(), InterpolationMode::Bilinear),
    );
    rp.check(
        matches!(result, Err(ResampleError::UnsupportedPixelFormat { .. })),
        "bilinear on packed RGB is rejected",
    );

    let source = RasterPyramid::new(rgb.clone(), &[]).unwrap();
    let engine =
        ResamplingEngine::new(source, describe(identity, InterpolationMode::Nearest)).unwrap();
    let out = engine
        .resample(&RegionRequest::new(1.0, 0, 0, 16, 16).unwrap())
        .unwrap();
    rp.compare_rasters(&rgb, &out);

    assert!(rp.cleanup(), "engine pixel format regression test failed");
}

#[test]
fn engine_errors_reg() {
    warpy_test::init_tracing();
    let mut rp = RegParams::new("engine_errors");

    // a bare spline has no inverse
    let tps = match bulge() {
        Transform::NumericInverse(ni) => ni.inner().clone(),
        _ => unreachable!(),
    };
    let source = RasterPyramid::new(pattern(100, 100), &[]).unwrap();
    let result = ResamplingEngine::new(source, describe(tps, InterpolationMode::Nearest));
    rp.check(
        matches!(
            result,
            Err(ResampleError::Transform(TransformError::NonInvertibleTransform(_)))
        ),
        "forward-only spline is rejected",
    );

    // the numerically inverted spline only moves y, and keeps the corners
    let source = RasterPyramid::new(pattern(100, 100), &[]).unwrap();
    let engine =
        ResamplingEngine::new(source, describe(bulge(), InterpolationMode::Bilinear)).unwrap();
    let (w, h) = engine.output_dimensions();
    rp.check(w == 100 || w == 101, &format!("output width {w}"));
    rp.check((100..130).contains(&h), &format!("output height {h}"));

    // source failures surface with their cause attached
    let shift = Transform::Affine(AffineTransform::translation(&[1.0, 1.0]).unwrap());
    let engine =
        ResamplingEngine::new(OfflineSource, describe(shift, InterpolationMode::Nearest)).unwrap();
    match engine.resample(&RegionRequest::new(1.0, 0, 0, 16, 16).unwrap()) {
        Err(ResampleError::SourceUnavailable(cause)) => {
            rp.compare_strings(b"slide server offline", cause.to_string().as_bytes());
        }
        other => {
            rp.check(false, &format!("expected SourceUnavailable, got {other:?}"));
        }
    }

    assert!(rp.cleanup(), "engine errors regression test failed");
}

#[test]
fn engine_tiles_reg() {
    warpy_test::init_tracing();
    let mut rp = RegParams::new("engine_tiles");
    let source = RasterPyramid::new(pattern(100, 100), &[2.0]).unwrap();
    let descriptor = describe(bulge(), InterpolationMode::CatmullRom)
        .with_field_cache(FieldCacheOptions::enabled(16))
        .unwrap();
    let engine = ResamplingEngine::new(source, descriptor).unwrap();

    for downsample in [1.0, 2.0] {
        let tiles = engine.tile_requests(downsample, 24, 24, 0, 0).unwrap();
        let parallel = engine.resample_tiles(&tiles);
        rp.compare_values(tiles.len() as f64, parallel.len() as f64, 0.0);
        for (req, tile) in tiles.iter().zip(parallel) {
            let tile = tile.unwrap();
            let sequential = engine.resample(req).unwrap();
            rp.compare_rasters(&sequential, &tile);
        }
    }
    rp.check(
        engine.field_cache().map_or(0, |c| c.cached_nodes()) > 0,
        "tiles were served from the field cache",
    );

    assert!(rp.cleanup(), "engine tiles regression test failed");
}
