//! warpy-transform - Composable coordinate transforms
//!
//! This crate provides the transform model used to warp images:
//!
//! - [`Transform`] - Closed sum type over every transform node
//! - [`AffineTransform`] - 2D / 3D affine maps
//! - [`ThinPlateSpline`] - Landmark-driven nonlinear warps
//! - [`Sequence`] / [`InvertibleSequence`] - Ordered composition
//! - [`Bounded`] - A transform restricted to an interval
//! - [`Wrapped2DIn3D`] - 2D transform acting on 3D points
//! - [`NumericInverse`] - Iterative inverse of a forward-only transform
//! - [`serial`] - Tagged JSON encoding and legacy-file repair
//! - [`descriptor`] - Transform plus interpolation settings, as persisted
//!
//! # Example
//!
//! ```
//! use warpy_transform::{AffineTransform, RealPoint, Transform, serial};
//!
//! let t = Transform::Affine(AffineTransform::rotation_2d(50.0, 50.0, 0.3).unwrap());
//! let json = serial::to_json_string(&t).unwrap();
//! let back = serial::from_json_str(&json).unwrap();
//!
//! let p = RealPoint::new_2d(10.0, 20.0);
//! let q = back.apply(p);
//! let r = back.apply_inverse(q).unwrap();
//! assert!(r.distance(&p, 2) < 1e-9);
//! ```

pub mod affine;
pub mod descriptor;
pub mod error;
pub mod interpolation;
pub mod inverse;
pub mod point;
pub mod serial;
pub mod spline;
pub mod transform;

pub use affine::AffineTransform;
pub use descriptor::{FORMAT_VERSION, FieldCacheOptions, TransformInterpolation};
pub use error::{TransformError, TransformResult};
pub use interpolation::InterpolationMode;
pub use inverse::{InverseSolution, NumericInverse};
pub use point::RealPoint;
pub use serial::TransformKind;
pub use spline::ThinPlateSpline;
pub use transform::{Bounded, InvertibleSequence, Sequence, Transform, Wrapped2DIn3D};
