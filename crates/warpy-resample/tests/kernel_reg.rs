//! Interpolation kernel regression test
//!
//! Checks that every kernel's weights sum to one at arbitrary sub-pixel
//! offsets, that each cubic mode uses its own shape constants, and that all
//! kernels reproduce a constant image.

use warpy_core::Raster;
use warpy_resample::{Kernel, cubic_weight};
use warpy_test::{RegParams, SimpleRng};
use warpy_transform::InterpolationMode;

#[test]
fn kernel_partition_reg() {
    let mut rp = RegParams::new("kernel_partition");
    let mut rng = SimpleRng::new(7);

    for mode in InterpolationMode::all() {
        let kernel = Kernel::new(mode);
        for _ in 0..50 {
            let fx = rng.range(1.0, 5.0);
            let fy = rng.range(1.0, 5.0);
            let fp = kernel.footprint(fx, fy, 8, 8);
            rp.check(fp.is_some(), "position inside every sampling window");
            if let Some(fp) = fp {
                let sx: f64 = fp.x_weights().iter().sum();
                let sy: f64 = fp.y_weights().iter().sum();
                rp.compare_values(1.0, sx, 1e-12);
                rp.compare_values(1.0, sy, 1e-12);
            }
        }
    }

    assert!(rp.cleanup(), "kernel partition regression test failed");
}

#[test]
fn kernel_parameters_reg() {
    let mut rp = RegParams::new("kernel_parameters");

    let expected = [
        (InterpolationMode::Bicubic, 1.0, 0.0),
        (InterpolationMode::CatmullRom, 0.5, 0.0),
        (InterpolationMode::MitchellNetravali, 1.0 / 3.0, 1.0 / 3.0),
        (InterpolationMode::CubicBSpline, 0.0, 1.0),
    ];
    for (mode, a, b) in expected {
        let fp = Kernel::new(mode).footprint(2.3, 2.0, 8, 8).unwrap();
        let w = fp.x_weights();
        rp.compare_values(cubic_weight(1.3, a, b), w[0], 1e-12);
        rp.compare_values(cubic_weight(0.3, a, b), w[1], 1e-12);
        rp.compare_values(cubic_weight(0.7, a, b), w[2], 1e-12);
        rp.compare_values(cubic_weight(1.7, a, b), w[3], 1e-12);
        // integer position along y
        rp.compare_values(1.0 - b / 3.0, fp.y_weights()[1], 1e-12);
    }

    // an impulse is smoothed by the B-spline and preserved by Catmull-Rom
    let mut data = vec![0.0f32; 49];
    data[3 * 7 + 3] = 90.0;
    let impulse = Raster::from_f32(7, 7, 1, data).unwrap();
    let bspline = Kernel::new(InterpolationMode::CubicBSpline)
        .interpolate(&impulse, 0, 3.0, 3.0)
        .unwrap();
    rp.compare_values(90.0 * 4.0 / 9.0, bspline, 1e-9);
    let catmull = Kernel::new(InterpolationMode::CatmullRom)
        .interpolate(&impulse, 0, 3.0, 3.0)
        .unwrap();
    rp.compare_values(90.0, catmull, 1e-9);

    assert!(rp.cleanup(), "kernel parameter regression test failed");
}

#[test]
fn kernel_constant_reg() {
    let mut rp = RegParams::new("kernel_constant");
    let mut rng = SimpleRng::new(0xc0ffee);
    let flat = Raster::from_u16(10, 10, 2, vec![1234; 200]).unwrap();

    for mode in InterpolationMode::all() {
        let kernel = Kernel::new(mode);
        for _ in 0..20 {
            let fx = rng.range(1.0, 7.0);
            let fy = rng.range(1.0, 7.0);
            for band in 0..2 {
                let v = kernel.interpolate(&flat, band, fx, fy).unwrap();
                rp.compare_values(1234.0, v, 1e-9);
            }
        }
        rp.check(
            kernel.interpolate(&flat, 0, 9.6, 2.0).is_none(),
            "position beyond the last column",
        );
    }

    assert!(rp.cleanup(), "kernel constant regression test failed");
}
