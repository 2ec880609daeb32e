//! Image interpolation mode selector
//!
//! The ordinal of each mode is part of the descriptor file format and must
//! not change.

use std::fmt;

/// Kernel used to reconstruct output pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InterpolationMode {
    /// Round to the nearest source pixel
    #[default]
    Nearest,
    /// Blend the four enclosing pixels
    Bilinear,
    /// Cubic convolution, a = 1, b = 0
    Bicubic,
    /// Cubic convolution, a = 0.5, b = 0
    CatmullRom,
    /// Cubic convolution, a = b = 1/3
    MitchellNetravali,
    /// Cubic convolution, a = 0, b = 1
    CubicBSpline,
}

impl InterpolationMode {
    /// Every mode, in ordinal order
    pub const fn all() -> [InterpolationMode; 6] {
        [
            InterpolationMode::Nearest,
            InterpolationMode::Bilinear,
            InterpolationMode::Bicubic,
            InterpolationMode::CatmullRom,
            InterpolationMode::MitchellNetravali,
            InterpolationMode::CubicBSpline,
        ]
    }

    /// Position in the persisted enumeration
    pub fn ordinal(self) -> u32 {
        match self {
            InterpolationMode::Nearest => 0,
            InterpolationMode::Bilinear => 1,
            InterpolationMode::Bicubic => 2,
            InterpolationMode::CatmullRom => 3,
            InterpolationMode::MitchellNetravali => 4,
            InterpolationMode::CubicBSpline => 5,
        }
    }

    /// Mode for a persisted ordinal, if it names one
    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::all().get(i).copied())
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            InterpolationMode::Nearest => "NearestNeighbor",
            InterpolationMode::Bilinear => "Bilinear",
            InterpolationMode::Bicubic => "Bicubic",
            InterpolationMode::CatmullRom => "Catmull-Rom",
            InterpolationMode::MitchellNetravali => "Mitchell-Netravali",
            InterpolationMode::CubicBSpline => "Cubic B-spline",
        }
    }

    /// Shape constants `(a, b)` of the cubic-convolution kernel
    ///
    /// `None` for the non-cubic modes.
    pub fn cubic_parameters(self) -> Option<(f64, f64)> {
        match self {
            InterpolationMode::Bicubic => Some((1.0, 0.0)),
            InterpolationMode::CatmullRom => Some((0.5, 0.0)),
            InterpolationMode::MitchellNetravali => Some((1.0 / 3.0, 1.0 / 3.0)),
            InterpolationMode::CubicBSpline => Some((0.0, 1.0)),
            InterpolationMode::Nearest | InterpolationMode::Bilinear => None,
        }
    }

    pub fn is_cubic(self) -> bool {
        self.cubic_parameters().is_some()
    }

    /// Pixels needed before and after the sample position along each axis
    ///
    /// A sample at `x` is valid when `x >= before` and `x < len - after`.
    pub fn support_margins(self) -> (usize, usize) {
        if self.is_cubic() { (1, 2) } else { (0, 1) }
    }
}

impl fmt::Display for InterpolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
