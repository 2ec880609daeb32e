//! Interpolation kernels
//!
//! A [`Kernel`] turns a fractional source position into a [`Footprint`]:
//! the top-left integer pixel of the neighborhood it reads plus separable
//! per-axis weights. Computing the footprint once per output pixel lets the
//! caller reuse it for every band.
//!
//! Sampling windows (for a source of length `n` along an axis):
//!
//! | Kernel   | Valid positions      | Taps |
//! |----------|----------------------|------|
//! | Nearest  | `0 <= round(x) < n`  | 1    |
//! | Bilinear | `0 <= x < n - 1`     | 2    |
//! | Cubic    | `1 <= x < n - 2`     | 4    |
//!
//! Positions outside the window yield no footprint; the output pixel keeps
//! the background value.

use warpy_core::Raster;
use warpy_transform::InterpolationMode;

/// Cubic-convolution weight for a tap at distance `x`
///
/// Two-parameter family (`a`, `b`) with support (-2, 2):
///
/// ```text
/// |x| < 1:  (-a - 1.5b + 2)|x|^3 + (a + 2b - 3)|x|^2 + (1 - b/3)
/// |x| < 2:  (-a - b/6)|x|^3 + (5a + b)|x|^2 + (-8a - 2b)|x| + 4a + 4b/3
/// otherwise 0
/// ```
///
/// The four taps around any position always sum to one.
#[inline]
pub fn cubic_weight(x: f64, a: f64, b: f64) -> f64 {
    let ax = x.abs();
    let ax2 = ax * ax;
    let ax3 = ax2 * ax;
    if ax < 1.0 {
        (-a - 1.5 * b + 2.0) * ax3 + (a + 2.0 * b - 3.0) * ax2 + (1.0 - b / 3.0)
    } else if ax < 2.0 {
        (-a - b / 6.0) * ax3 + (5.0 * a + b) * ax2 + (-8.0 * a - 2.0 * b) * ax + 4.0 * a
            + 4.0 * b / 3.0
    } else {
        0.0
    }
}

/// Neighborhood and weights for one sample position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    x0: u32,
    y0: u32,
    taps: usize,
    wx: [f64; 4],
    wy: [f64; 4],
}

impl Footprint {
    /// Top-left pixel of the neighborhood
    pub fn origin(&self) -> (u32, u32) {
        (self.x0, self.y0)
    }

    /// Taps per axis (1, 2 or 4)
    pub fn taps(&self) -> usize {
        self.taps
    }

    /// Horizontal weights, left to right
    pub fn x_weights(&self) -> &[f64] {
        &self.wx[..self.taps]
    }

    /// Vertical weights, top to bottom
    pub fn y_weights(&self) -> &[f64] {
        &self.wy[..self.taps]
    }

    /// Weighted sum of one band over the neighborhood
    ///
    /// The neighborhood must lie inside `raster`; this holds for any
    /// footprint produced by [`Kernel::footprint`] with the raster's size.
    #[inline]
    pub fn sample(&self, raster: &Raster, band: u32) -> f64 {
        let mut acc = 0.0;
        for (j, wy) in self.y_weights().iter().enumerate() {
            let y = self.y0 + j as u32;
            let mut row = 0.0;
            for (i, wx) in self.x_weights().iter().enumerate() {
                row += wx * raster.sample_unchecked(self.x0 + i as u32, y, band) as f64;
            }
            acc += wy * row;
        }
        acc
    }
}

/// An interpolation kernel bound to its shape parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kernel {
    mode: InterpolationMode,
}

impl Kernel {
    pub fn new(mode: InterpolationMode) -> Self {
        Kernel { mode }
    }

    pub fn mode(&self) -> InterpolationMode {
        self.mode
    }

    /// Footprint for sampling at (fx, fy) in a `width` x `height` source
    ///
    /// Returns `None` when the position is outside the kernel's sampling
    /// window or not finite.
    pub fn footprint(&self, fx: f64, fy: f64, width: u32, height: u32) -> Option<Footprint> {
        match self.mode {
            InterpolationMode::Nearest => nearest_footprint(fx, fy, width, height),
            InterpolationMode::Bilinear => bilinear_footprint(fx, fy, width, height),
            mode => {
                let (a, b) = mode.cubic_parameters()?;
                cubic_footprint(fx, fy, width, height, a, b)
            }
        }
    }

    /// Interpolated value of one band, or `None` outside the window
    pub fn interpolate(&self, raster: &Raster, band: u32, fx: f64, fy: f64) -> Option<f64> {
        self.footprint(fx, fy, raster.width(), raster.height())
            .map(|fp| fp.sample(raster, band))
    }
}

// ============================================================================
// Per-kernel footprints
// ============================================================================

fn nearest_footprint(fx: f64, fy: f64, width: u32, height: u32) -> Option<Footprint> {
    let xi = (fx + 0.5).floor();
    let yi = (fy + 0.5).floor();
    if !(xi >= 0.0 && xi < width as f64 && yi >= 0.0 && yi < height as f64) {
        return None;
    }
    Some(Footprint {
        x0: xi as u32,
        y0: yi as u32,
        taps: 1,
        wx: [1.0, 0.0, 0.0, 0.0],
        wy: [1.0, 0.0, 0.0, 0.0],
    })
}

fn bilinear_footprint(fx: f64, fy: f64, width: u32, height: u32) -> Option<Footprint> {
    if !(fx >= 0.0 && fx < width as f64 - 1.0 && fy >= 0.0 && fy < height as f64 - 1.0) {
        return None;
    }
    let xi = fx.floor();
    let yi = fy.floor();
    let xf = fx - xi;
    let yf = fy - yi;
    Some(Footprint {
        x0: xi as u32,
        y0: yi as u32,
        taps: 2,
        wx: [1.0 - xf, xf, 0.0, 0.0],
        wy: [1.0 - yf, yf, 0.0, 0.0],
    })
}

fn cubic_footprint(fx: f64, fy: f64, width: u32, height: u32, a: f64, b: f64) -> Option<Footprint> {
    if !(fx >= 1.0 && fx < width as f64 - 2.0 && fy >= 1.0 && fy < height as f64 - 2.0) {
        return None;
    }
    let xi = fx.floor();
    let yi = fy.floor();
    Some(Footprint {
        x0: xi as u32 - 1,
        y0: yi as u32 - 1,
        taps: 4,
        wx: cubic_taps(fx - xi, a, b),
        wy: cubic_taps(fy - yi, a, b),
    })
}

/// Weights of the taps at offsets -1, 0, 1, 2 from the floor of the position
#[inline]
fn cubic_taps(t: f64, a: f64, b: f64) -> [f64; 4] {
    [
        cubic_weight(t + 1.0, a, b),
        cubic_weight(t, a, b),
        cubic_weight(t - 1.0, a, b),
        cubic_weight(t - 2.0, a, b),
    ]
}
