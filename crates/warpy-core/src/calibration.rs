//! Physical pixel size

/// Physical size of one full-resolution pixel
#[derive(Debug, Clone, PartialEq)]
pub struct PixelCalibration {
    pixel_width: f64,
    pixel_height: f64,
    unit: String,
}

impl Default for PixelCalibration {
    fn default() -> Self {
        PixelCalibration {
            pixel_width: 1.0,
            pixel_height: 1.0,
            unit: "px".to_string(),
        }
    }
}

impl PixelCalibration {
    /// Create a calibration
    ///
    /// Non-finite or non-positive sizes fall back to 1.0.
    pub fn new(pixel_width: f64, pixel_height: f64, unit: impl Into<String>) -> Self {
        let sanitize = |v: f64| if v.is_finite() && v > 0.0 { v } else { 1.0 };
        PixelCalibration {
            pixel_width: sanitize(pixel_width),
            pixel_height: sanitize(pixel_height),
            unit: unit.into(),
        }
    }

    #[inline]
    pub fn pixel_width(&self) -> f64 {
        self.pixel_width
    }

    #[inline]
    pub fn pixel_height(&self) -> f64 {
        self.pixel_height
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Whether the calibration carries a real physical unit
    pub fn has_physical_unit(&self) -> bool {
        self.unit != "px"
    }

    /// Calibration with both pixel sizes multiplied by the given factors
    pub fn scaled(&self, scale_x: f64, scale_y: f64) -> Self {
        PixelCalibration::new(
            self.pixel_width * scale_x,
            self.pixel_height * scale_y,
            self.unit.clone(),
        )
    }
}
