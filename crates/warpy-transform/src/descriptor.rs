//! Transform + interpolation descriptor
//!
//! A [`TransformInterpolation`] bundles everything a resampling engine needs
//! to know about the warp: the transform tree, the interpolation kernel, the
//! transformation-field cache settings and the version of the software that
//! wrote it. It is persisted as JSON:
//!
//! ```json
//! {
//!   "interpolation": 1,
//!   "version": "0.1.0",
//!   "fieldCacheEnabled": true,
//!   "fieldCacheGridSpacing": 32,
//!   "transform": { "type": "...", ... }
//! }
//! ```
//!
//! The cache fields are optional. A version different from the reader's is
//! logged as a warning and otherwise ignored.
//!
//! Older affine-only descriptors store the six coefficients of a 2D affine
//! as `m00, m10, m01, m11, m02, m12` plus the interpolation ordinal as
//! `mInterpolate`; [`from_json_str`] accepts those too.

use crate::affine::AffineTransform;
use crate::interpolation::InterpolationMode;
use crate::serial;
use crate::transform::Transform;
use crate::{TransformError, TransformResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Version string of this crate, for callers with no host application
pub const FORMAT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default transformation-field grid spacing, in output pixels
pub const DEFAULT_GRID_SPACING: u32 = 32;

/// Transformation-field cache settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldCacheOptions {
    /// Whether the resampler approximates the transform on a coarse grid
    pub enabled: bool,
    /// Grid cell size in full-resolution output pixels
    pub grid_spacing: u32,
}

impl Default for FieldCacheOptions {
    fn default() -> Self {
        FieldCacheOptions {
            enabled: false,
            grid_spacing: DEFAULT_GRID_SPACING,
        }
    }
}

impl FieldCacheOptions {
    /// Enabled cache with the given spacing
    pub fn enabled(grid_spacing: u32) -> Self {
        FieldCacheOptions {
            enabled: true,
            grid_spacing,
        }
    }

    /// # Errors
    ///
    /// Returns `TransformError::InvalidParameters` for a zero grid spacing.
    pub fn validate(&self) -> TransformResult<()> {
        if self.grid_spacing == 0 {
            return Err(TransformError::InvalidParameters(
                "field cache grid spacing must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A transform together with the way images are resampled through it
#[derive(Debug, Clone)]
pub struct TransformInterpolation {
    transform: Transform,
    interpolation: InterpolationMode,
    field_cache: FieldCacheOptions,
    version: String,
}

impl TransformInterpolation {
    /// Create a descriptor with the cache disabled
    ///
    /// # Arguments
    ///
    /// * `transform` - Maps output coordinates to source coordinates
    /// * `interpolation` - Kernel used to reconstruct output pixels
    /// * `version` - Version recorded in the persisted descriptor
    pub fn new(
        transform: Transform,
        interpolation: InterpolationMode,
        version: impl Into<String>,
    ) -> Self {
        TransformInterpolation {
            transform,
            interpolation,
            field_cache: FieldCacheOptions::default(),
            version: version.into(),
        }
    }

    /// Replace the field cache settings
    ///
    /// # Errors
    ///
    /// See [`FieldCacheOptions::validate`].
    pub fn with_field_cache(mut self, options: FieldCacheOptions) -> TransformResult<Self> {
        options.validate()?;
        self.field_cache = options;
        Ok(self)
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn interpolation(&self) -> InterpolationMode {
        self.interpolation
    }

    pub fn field_cache(&self) -> FieldCacheOptions {
        self.field_cache
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Encode as a JSON value
    pub fn encode(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "interpolation".to_string(),
            Value::from(self.interpolation.ordinal()),
        );
        obj.insert("version".to_string(), Value::from(self.version.clone()));
        if self.field_cache != FieldCacheOptions::default() {
            obj.insert(
                "fieldCacheEnabled".to_string(),
                Value::from(self.field_cache.enabled),
            );
            obj.insert(
                "fieldCacheGridSpacing".to_string(),
                Value::from(self.field_cache.grid_spacing),
            );
        }
        obj.insert("transform".to_string(), serial::encode(&self.transform));
        Value::Object(obj)
    }

    /// Pretty-printed JSON text
    ///
    /// # Errors
    ///
    /// Returns `TransformError::Json` if serialization fails.
    pub fn to_json_string(&self) -> TransformResult<String> {
        Ok(serde_json::to_string_pretty(&self.encode())?)
    }
}

#[derive(Deserialize)]
struct DescriptorHeader {
    #[serde(default)]
    interpolation: i64,
    version: Option<String>,
    #[serde(rename = "fieldCacheEnabled", default)]
    field_cache_enabled: bool,
    #[serde(rename = "fieldCacheGridSpacing", default = "default_spacing")]
    field_cache_grid_spacing: u32,
}

fn default_spacing() -> u32 {
    DEFAULT_GRID_SPACING
}

#[derive(Deserialize)]
struct AffineDescriptorRecord {
    m00: f64,
    m10: f64,
    m01: f64,
    m11: f64,
    m02: f64,
    m12: f64,
    #[serde(rename = "mInterpolate", default)]
    interpolate: i64,
}

fn mode_or_nearest(ordinal: i64) -> InterpolationMode {
    InterpolationMode::from_ordinal(ordinal).unwrap_or_else(|| {
        tracing::warn!(ordinal, "invalid interpolation ordinal, using nearest neighbor");
        InterpolationMode::Nearest
    })
}

/// Decode a descriptor from a JSON value
///
/// # Arguments
///
/// * `value` - Descriptor JSON, full or affine-only legacy form
/// * `expected_version` - Version of the reader; a mismatch is logged
///
/// # Errors
///
/// Returns `TransformError::MalformedJson` if the value is neither form,
/// otherwise any error of [`serial::from_json_value`].
pub fn decode(value: Value, expected_version: &str) -> TransformResult<TransformInterpolation> {
    let obj = value
        .as_object()
        .ok_or_else(|| TransformError::MalformedJson("descriptor is not a JSON object".to_string()))?;

    if !obj.contains_key("transform") && obj.contains_key("m00") {
        return decode_affine_only(&value);
    }

    let header = DescriptorHeader::deserialize(&value)
        .map_err(|e| TransformError::MalformedJson(format!("invalid descriptor fields: {e}")))?;
    let transform_json = obj
        .get("transform")
        .cloned()
        .ok_or_else(|| TransformError::MalformedJson("missing field \"transform\"".to_string()))?;

    let version = header.version.unwrap_or_default();
    if version != expected_version {
        tracing::warn!(
            reader = expected_version,
            writer = %version,
            "descriptor written by a different version"
        );
    }

    let transform = serial::from_json_value(transform_json)?;
    let field_cache = FieldCacheOptions {
        enabled: header.field_cache_enabled,
        grid_spacing: header.field_cache_grid_spacing,
    };
    TransformInterpolation {
        transform,
        interpolation: mode_or_nearest(header.interpolation),
        field_cache: FieldCacheOptions::default(),
        version,
    }
    .with_field_cache(field_cache)
}

fn decode_affine_only(value: &Value) -> TransformResult<TransformInterpolation> {
    let rec = AffineDescriptorRecord::deserialize(value).map_err(|e| {
        TransformError::MalformedJson(format!("invalid affine descriptor fields: {e}"))
    })?;
    tracing::debug!("decoding affine-only descriptor");
    let affine = AffineTransform::new_2d(rec.m00, rec.m01, rec.m02, rec.m10, rec.m11, rec.m12)?;
    Ok(TransformInterpolation::new(
        Transform::Affine(affine),
        mode_or_nearest(rec.interpolate),
        String::new(),
    ))
}

/// Parse and decode descriptor JSON text
///
/// # Errors
///
/// Returns `TransformError::Json` for invalid JSON, otherwise see [`decode`].
pub fn from_json_str(json: &str, expected_version: &str) -> TransformResult<TransformInterpolation> {
    decode(serde_json::from_str(json)?, expected_version)
}

/// Read a descriptor file
///
/// # Errors
///
/// Returns `TransformError::Io` if the file cannot be read, otherwise see
/// [`from_json_str`].
pub fn read_descriptor(
    path: impl AsRef<Path>,
    expected_version: &str,
) -> TransformResult<TransformInterpolation> {
    from_json_str(&fs::read_to_string(path)?, expected_version)
}

/// Write a descriptor file as pretty-printed JSON
///
/// # Errors
///
/// Returns `TransformError::Io` or `TransformError::Json` on failure.
pub fn write_descriptor(
    path: impl AsRef<Path>,
    descriptor: &TransformInterpolation,
) -> TransformResult<()> {
    fs::write(path, descriptor.to_json_string()?)?;
    Ok(())
}
