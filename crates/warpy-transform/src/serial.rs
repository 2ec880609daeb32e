//! JSON serialization registry for transform trees
//!
//! Every node is encoded as a JSON object carrying a `type` tag plus the
//! fields of that node. Composite nodes nest their children as further
//! tagged objects. The tags and field names are fixed by the existing
//! transform files and must not change:
//!
//! | Tag | Node | Fields |
//! |---|---|---|
//! | `AffineTransform3D` | 3D affine | `affinetransform3d` (12 row-packed values) |
//! | `AffineTransform2D` | 2D affine | `affinetransform2d` (6 row-packed values) |
//! | `ThinplateSplineTransform` | thin-plate spline | `srcPts`, `tgtPts` (`[D][N]`) |
//! | `RealTransformSequence` | sequence | `size`, `realTransform_0` .. |
//! | `InvertibleRealTransformSequence` | invertible sequence | `size`, `realTransform_0` .. |
//! | `BoundedRealTransform` | bounded | `realTransform`, `interval_min`, `interval_max` |
//! | `Wrapped2DTransformAs3D` | 2D-in-3D wrapper | `wrappedTransform` |
//! | `WrappedIterativeInvertibleRealTransform` | numeric inverse | `wrappedTransform`, optional `tolerance`, `maxIterations` |
//!
//! # Legacy files
//!
//! Files written before tagging was introduced contain affine objects with an
//! `affinetransform3d` field but no `type`. [`repair_legacy_affine`] injects
//! the missing tag and is applied by [`from_json_str`] and
//! [`from_json_value`] before decoding. Independently of that pass, a
//! sequence child holding an `affinetransform3d` field is always decoded as
//! a 3D affine, whatever else it carries.

use crate::affine::AffineTransform;
use crate::inverse::{DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, NumericInverse};
use crate::spline::ThinPlateSpline;
use crate::transform::{Bounded, InvertibleSequence, Sequence, Transform, Wrapped2DIn3D};
use crate::{TransformError, TransformResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

const TYPE_KEY: &str = "type";
const AFFINE_3D_KEY: &str = "affinetransform3d";
const SIZE_KEY: &str = "size";
const WRAPPED_KEY: &str = "wrappedTransform";
const BOUNDED_INNER_KEY: &str = "realTransform";

/// The `type` tags understood by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    Affine3D,
    Affine2D,
    ThinPlateSpline,
    Sequence,
    InvertibleSequence,
    Bounded,
    Wrapped2DIn3D,
    NumericInverse,
}

impl TransformKind {
    /// Every kind, in registration order
    pub const ALL: [TransformKind; 8] = [
        TransformKind::Affine3D,
        TransformKind::Affine2D,
        TransformKind::ThinPlateSpline,
        TransformKind::Sequence,
        TransformKind::InvertibleSequence,
        TransformKind::Bounded,
        TransformKind::Wrapped2DIn3D,
        TransformKind::NumericInverse,
    ];

    /// The `type` tag written to JSON
    pub fn tag(self) -> &'static str {
        match self {
            TransformKind::Affine3D => "AffineTransform3D",
            TransformKind::Affine2D => "AffineTransform2D",
            TransformKind::ThinPlateSpline => "ThinplateSplineTransform",
            TransformKind::Sequence => "RealTransformSequence",
            TransformKind::InvertibleSequence => "InvertibleRealTransformSequence",
            TransformKind::Bounded => "BoundedRealTransform",
            TransformKind::Wrapped2DIn3D => "Wrapped2DTransformAs3D",
            TransformKind::NumericInverse => "WrappedIterativeInvertibleRealTransform",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }

    /// The kind a transform is encoded as
    pub fn of(transform: &Transform) -> Self {
        match transform {
            Transform::Affine(a) if a.num_dimensions() == 3 => TransformKind::Affine3D,
            Transform::Affine(_) => TransformKind::Affine2D,
            Transform::ThinPlateSpline(_) => TransformKind::ThinPlateSpline,
            Transform::Sequence(_) => TransformKind::Sequence,
            Transform::InvertibleSequence(_) => TransformKind::InvertibleSequence,
            Transform::Bounded(_) => TransformKind::Bounded,
            Transform::Wrapped2DIn3D(_) => TransformKind::Wrapped2DIn3D,
            Transform::NumericInverse(_) => TransformKind::NumericInverse,
        }
    }
}

// ============================================================================
// Wire records
// ============================================================================

#[derive(Serialize, Deserialize)]
struct Affine3DRecord {
    affinetransform3d: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct Affine2DRecord {
    affinetransform2d: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct SplineRecord {
    #[serde(rename = "srcPts")]
    src_pts: Vec<Vec<f64>>,
    #[serde(rename = "tgtPts")]
    tgt_pts: Vec<Vec<f64>>,
}

#[derive(Serialize, Deserialize)]
struct IntervalRecord {
    interval_min: Vec<f64>,
    interval_max: Vec<f64>,
}

#[derive(Serialize, Deserialize, Default)]
struct IterationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tolerance: Option<f64>,
    #[serde(
        rename = "maxIterations",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    max_iterations: Option<usize>,
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode a transform tree as a tagged JSON value
pub fn encode(transform: &Transform) -> Value {
    let kind = TransformKind::of(transform);
    let mut obj = Map::new();
    obj.insert(TYPE_KEY.to_string(), Value::from(kind.tag()));

    match transform {
        Transform::Affine(a) => {
            let fields = if a.num_dimensions() == 3 {
                record_fields(&Affine3DRecord {
                    affinetransform3d: a.row_packed().to_vec(),
                })
            } else {
                record_fields(&Affine2DRecord {
                    affinetransform2d: a.row_packed().to_vec(),
                })
            };
            obj.extend(fields);
        }
        Transform::ThinPlateSpline(t) => {
            obj.extend(record_fields(&SplineRecord {
                src_pts: transpose(&t.source_landmarks()),
                tgt_pts: transpose(&t.target_landmarks()),
            }));
        }
        Transform::Sequence(s) => encode_children(&mut obj, s.children()),
        Transform::InvertibleSequence(s) => encode_children(&mut obj, s.children()),
        Transform::Bounded(b) => {
            obj.insert(BOUNDED_INNER_KEY.to_string(), encode(b.inner()));
            obj.extend(record_fields(&IntervalRecord {
                interval_min: b.interval_min().to_vec(),
                interval_max: b.interval_max().to_vec(),
            }));
        }
        Transform::Wrapped2DIn3D(w) => {
            obj.insert(WRAPPED_KEY.to_string(), encode(w.inner()));
        }
        Transform::NumericInverse(n) => {
            obj.insert(WRAPPED_KEY.to_string(), encode(n.inner()));
            let params = IterationRecord {
                tolerance: (n.tolerance() != DEFAULT_TOLERANCE).then_some(n.tolerance()),
                max_iterations: (n.max_iterations() != DEFAULT_MAX_ITERATIONS)
                    .then_some(n.max_iterations()),
            };
            obj.extend(record_fields(&params));
        }
    }
    Value::Object(obj)
}

fn encode_children(obj: &mut Map<String, Value>, children: &[Transform]) {
    obj.insert(SIZE_KEY.to_string(), Value::from(children.len()));
    for (i, child) in children.iter().enumerate() {
        obj.insert(child_key(i), encode(child));
    }
}

fn child_key(i: usize) -> String {
    format!("realTransform_{i}")
}

/// Fields of a wire record as a JSON map
///
/// Records hold only numbers and arrays, which always serialize.
fn record_fields<T: Serialize>(record: &T) -> Map<String, Value> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Pretty-printed JSON text for a transform tree
///
/// # Errors
///
/// Returns `TransformError::Json` if serialization fails.
pub fn to_json_string(transform: &Transform) -> TransformResult<String> {
    Ok(serde_json::to_string_pretty(&encode(transform))?)
}

/// Write a transform tree to a file as pretty-printed JSON
///
/// # Errors
///
/// Returns `TransformError::Io` or `TransformError::Json` on failure.
pub fn write_transform(path: impl AsRef<Path>, transform: &Transform) -> TransformResult<()> {
    fs::write(path, to_json_string(transform)?)?;
    Ok(())
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a tagged JSON value into a transform tree
///
/// No legacy repair is applied; see [`from_json_value`].
///
/// # Errors
///
/// Returns `TransformError::UnknownTransformType` for an unrecognised tag,
/// `TransformError::MalformedJson` for missing or mistyped fields, and any
/// construction error of the decoded nodes. Errors anywhere in the tree fail
/// the whole decode.
pub fn decode(value: &Value) -> TransformResult<Transform> {
    let obj = as_object(value, "transform")?;
    let tag = obj
        .get(TYPE_KEY)
        .ok_or_else(|| TransformError::MalformedJson("missing \"type\" tag".to_string()))?
        .as_str()
        .ok_or_else(|| TransformError::MalformedJson("\"type\" tag is not a string".to_string()))?;
    let kind = TransformKind::from_tag(tag)
        .ok_or_else(|| TransformError::UnknownTransformType(tag.to_string()))?;

    match kind {
        TransformKind::Affine3D => decode_affine_3d(value),
        TransformKind::Affine2D => {
            let rec: Affine2DRecord = record(value, kind)?;
            if rec.affinetransform2d.len() != 6 {
                return Err(TransformError::MalformedJson(format!(
                    "affinetransform2d needs 6 values, got {}",
                    rec.affinetransform2d.len()
                )));
            }
            Ok(Transform::Affine(AffineTransform::from_row_packed(
                &rec.affinetransform2d,
            )?))
        }
        TransformKind::ThinPlateSpline => {
            let rec: SplineRecord = record(value, kind)?;
            let src = landmarks_from_wire(rec.src_pts)?;
            let tgt = landmarks_from_wire(rec.tgt_pts)?;
            Ok(Transform::ThinPlateSpline(ThinPlateSpline::new(&src, &tgt)?))
        }
        TransformKind::Sequence => Ok(Transform::Sequence(Sequence::new(decode_children(obj)?))),
        TransformKind::InvertibleSequence => Ok(Transform::InvertibleSequence(
            InvertibleSequence::new(decode_children(obj)?)?,
        )),
        TransformKind::Bounded => {
            let inner = decode(field(obj, BOUNDED_INNER_KEY)?)?;
            let rec: IntervalRecord = record(value, kind)?;
            Ok(Transform::Bounded(Bounded::new(
                inner,
                rec.interval_min,
                rec.interval_max,
            )?))
        }
        TransformKind::Wrapped2DIn3D => {
            let inner = decode(field(obj, WRAPPED_KEY)?)?;
            Ok(Transform::Wrapped2DIn3D(Wrapped2DIn3D::new(inner)?))
        }
        TransformKind::NumericInverse => {
            let inner = decode(field(obj, WRAPPED_KEY)?)?;
            let rec: IterationRecord = record(value, kind)?;
            Ok(Transform::NumericInverse(NumericInverse::with_parameters(
                inner,
                rec.tolerance.unwrap_or(DEFAULT_TOLERANCE),
                rec.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            )?))
        }
    }
}

fn decode_affine_3d(value: &Value) -> TransformResult<Transform> {
    let rec: Affine3DRecord = record(value, TransformKind::Affine3D)?;
    if rec.affinetransform3d.len() != 12 {
        return Err(TransformError::MalformedJson(format!(
            "affinetransform3d needs 12 values, got {}",
            rec.affinetransform3d.len()
        )));
    }
    Ok(Transform::Affine(AffineTransform::from_row_packed(
        &rec.affinetransform3d,
    )?))
}

fn decode_children(obj: &Map<String, Value>) -> TransformResult<Vec<Transform>> {
    let size = field(obj, SIZE_KEY)?
        .as_u64()
        .ok_or_else(|| TransformError::MalformedJson("\"size\" is not a count".to_string()))?;
    (0..size as usize)
        .map(|i| {
            let child = field(obj, &child_key(i))?;
            // legacy files nest untagged affines directly in sequences
            let is_affine_shaped = child
                .as_object()
                .is_some_and(|c| c.contains_key(AFFINE_3D_KEY));
            if is_affine_shaped {
                decode_affine_3d(child)
            } else {
                decode(child)
            }
        })
        .collect()
}

fn as_object<'a>(value: &'a Value, what: &str) -> TransformResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| TransformError::MalformedJson(format!("{what} is not a JSON object")))
}

fn field<'a>(obj: &'a Map<String, Value>, key: &str) -> TransformResult<&'a Value> {
    obj.get(key)
        .ok_or_else(|| TransformError::MalformedJson(format!("missing field \"{key}\"")))
}

fn record<T: for<'de> Deserialize<'de>>(value: &Value, kind: TransformKind) -> TransformResult<T> {
    T::deserialize(value).map_err(|e| {
        TransformError::MalformedJson(format!("invalid {} fields: {}", kind.tag(), e))
    })
}

/// Convert a wire landmark array to landmark-major rows
///
/// Files store `[D][N]` (dimension-major). Landmark-major `[N][D]` input is
/// also accepted: since a valid spline has `N > D`, the shorter axis is the
/// dimension axis.
fn landmarks_from_wire(rows: Vec<Vec<f64>>) -> TransformResult<Vec<Vec<f64>>> {
    let cols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != cols) {
        return Err(TransformError::InvalidParameters(
            "landmark arrays are not rectangular".to_string(),
        ));
    }
    if rows.len() < cols {
        Ok(transpose(&rows))
    } else {
        Ok(rows)
    }
}

fn transpose(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let cols = rows.first().map_or(0, Vec::len);
    (0..cols)
        .map(|c| rows.iter().map(|r| r[c]).collect())
        .collect()
}

// ============================================================================
// Legacy repair and entry points
// ============================================================================

/// Tag untagged affine objects anywhere in a JSON tree
///
/// Every object that has an `affinetransform3d` field but no `type` gets
/// `"type": "AffineTransform3D"`. Tagged objects are left alone, so the pass
/// is idempotent.
///
/// # Returns
///
/// The number of objects repaired.
pub fn repair_legacy_affine(value: &mut Value) -> usize {
    match value {
        Value::Object(obj) => {
            let mut repaired = 0;
            if obj.contains_key(AFFINE_3D_KEY) && !obj.contains_key(TYPE_KEY) {
                obj.insert(
                    TYPE_KEY.to_string(),
                    Value::from(TransformKind::Affine3D.tag()),
                );
                repaired += 1;
            }
            repaired + obj.values_mut().map(repair_legacy_affine).sum::<usize>()
        }
        Value::Array(items) => items.iter_mut().map(repair_legacy_affine).sum(),
        _ => 0,
    }
}

/// Repair legacy affines, then decode
///
/// # Errors
///
/// See [`decode`].
pub fn from_json_value(mut value: Value) -> TransformResult<Transform> {
    let repaired = repair_legacy_affine(&mut value);
    if repaired > 0 {
        tracing::debug!(repaired, "tagged legacy untyped affine transforms");
    }
    decode(&value)
}

/// Parse, repair and decode transform JSON text
///
/// # Errors
///
/// Returns `TransformError::Json` for invalid JSON text, otherwise see
/// [`decode`].
pub fn from_json_str(json: &str) -> TransformResult<Transform> {
    from_json_value(serde_json::from_str(json)?)
}

/// Read a transform file
///
/// # Errors
///
/// Returns `TransformError::Io` if the file cannot be read, otherwise see
/// [`from_json_str`].
pub fn read_transform(path: impl AsRef<Path>) -> TransformResult<Transform> {
    from_json_str(&fs::read_to_string(path)?)
}
