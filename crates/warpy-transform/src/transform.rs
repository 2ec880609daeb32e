//! The transform tree and its evaluator
//!
//! [`Transform`] is a closed sum type over every supported node. Composite
//! nodes own their children exclusively; `clone()` produces a fully
//! independent deep copy. No node holds scratch state, so a single tree can
//! be evaluated from many threads at once.
//!
//! # Invertibility
//!
//! | Node | `apply_inverse` |
//! |---|---|
//! | `Affine` | closed form, unless the matrix is singular |
//! | `ThinPlateSpline` | not available |
//! | `Sequence` | not available |
//! | `InvertibleSequence` | children inverted right to left |
//! | `Bounded` | delegates to the inner transform inside the interval |
//! | `Wrapped2DIn3D` | delegates to the inner 2D transform |
//! | `NumericInverse` | iterative |
//!
//! Composites that require invertible children check this when they are
//! built, so a tree that exists is a tree that can be evaluated.

use crate::affine::AffineTransform;
use crate::inverse::NumericInverse;
use crate::point::{MAX_DIMS, RealPoint};
use crate::spline::ThinPlateSpline;
use crate::{TransformError, TransformResult};

/// A coordinate transform node
#[derive(Debug, Clone)]
pub enum Transform {
    /// Linear map plus translation
    Affine(AffineTransform),
    /// Landmark-driven nonlinear warp, forward only
    ThinPlateSpline(ThinPlateSpline),
    /// Ordered composition, forward only
    Sequence(Sequence),
    /// Ordered composition of invertible transforms
    InvertibleSequence(InvertibleSequence),
    /// Inner transform restricted to an interval
    Bounded(Bounded),
    /// 2D transform acting on the first two of three coordinates
    Wrapped2DIn3D(Wrapped2DIn3D),
    /// Forward-only transform inverted by iteration
    NumericInverse(NumericInverse),
}

impl Transform {
    /// Map a point forward
    pub fn apply(&self, p: RealPoint) -> RealPoint {
        match self {
            Transform::Affine(t) => t.apply(p),
            Transform::ThinPlateSpline(t) => t.apply(p),
            Transform::Sequence(t) => t.apply(p),
            Transform::InvertibleSequence(t) => t.apply(p),
            Transform::Bounded(t) => t.apply(p),
            Transform::Wrapped2DIn3D(t) => t.apply(p),
            Transform::NumericInverse(t) => t.apply(p),
        }
    }

    /// Map a point backward
    ///
    /// # Errors
    ///
    /// Returns `TransformError::NonInvertibleTransform` for nodes without an
    /// inverse, `TransformError::SingularMatrix` for singular affines and
    /// `TransformError::Convergence` when a numeric inverse gives up.
    pub fn apply_inverse(&self, p: RealPoint) -> TransformResult<RealPoint> {
        match self {
            Transform::Affine(t) => t.apply_inverse(p),
            Transform::ThinPlateSpline(_) | Transform::Sequence(_) => {
                Err(TransformError::NonInvertibleTransform(self.name().to_string()))
            }
            Transform::InvertibleSequence(t) => t.apply_inverse(p),
            Transform::Bounded(t) => t.apply_inverse(p),
            Transform::Wrapped2DIn3D(t) => t.apply_inverse(p),
            Transform::NumericInverse(t) => t.apply_inverse(p),
        }
    }

    /// Whether `apply_inverse` can succeed
    pub fn is_invertible(&self) -> bool {
        match self {
            Transform::Affine(t) => t.is_invertible(),
            Transform::ThinPlateSpline(_) | Transform::Sequence(_) => false,
            Transform::InvertibleSequence(_)
            | Transform::Bounded(_)
            | Transform::Wrapped2DIn3D(_)
            | Transform::NumericInverse(_) => true,
        }
    }

    /// Number of leading coordinates the transform reads and writes
    pub fn num_dimensions(&self) -> usize {
        match self {
            Transform::Affine(t) => t.num_dimensions(),
            Transform::ThinPlateSpline(t) => t.num_dimensions(),
            Transform::Sequence(t) => t.num_dimensions(),
            Transform::InvertibleSequence(t) => t.num_dimensions(),
            Transform::Bounded(t) => t.inner().num_dimensions(),
            Transform::Wrapped2DIn3D(_) => 3,
            Transform::NumericInverse(t) => t.num_dimensions(),
        }
    }

    /// Independent deep copy
    ///
    /// Equivalent to `clone()`; exists to make per-worker copies explicit
    /// at call sites.
    pub fn copy(&self) -> Transform {
        self.clone()
    }

    /// Human-readable node name
    pub fn name(&self) -> &'static str {
        match self {
            Transform::Affine(_) => "Affine",
            Transform::ThinPlateSpline(_) => "ThinPlateSpline",
            Transform::Sequence(_) => "Sequence",
            Transform::InvertibleSequence(_) => "InvertibleSequence",
            Transform::Bounded(_) => "Bounded",
            Transform::Wrapped2DIn3D(_) => "Wrapped2DIn3D",
            Transform::NumericInverse(_) => "NumericInverse",
        }
    }
}

impl From<AffineTransform> for Transform {
    fn from(t: AffineTransform) -> Self {
        Transform::Affine(t)
    }
}

impl From<ThinPlateSpline> for Transform {
    fn from(t: ThinPlateSpline) -> Self {
        Transform::ThinPlateSpline(t)
    }
}

impl From<NumericInverse> for Transform {
    fn from(t: NumericInverse) -> Self {
        Transform::NumericInverse(t)
    }
}

// ============================================================================
// Sequences
// ============================================================================

/// Ordered composition without an inverse
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    children: Vec<Transform>,
}

impl Sequence {
    pub fn new(children: Vec<Transform>) -> Self {
        Sequence { children }
    }

    /// Append a transform to be applied after the existing ones
    pub fn push(&mut self, t: Transform) {
        self.children.push(t);
    }

    pub fn children(&self) -> &[Transform] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn num_dimensions(&self) -> usize {
        self.children
            .iter()
            .map(Transform::num_dimensions)
            .max()
            .unwrap_or(0)
    }

    /// Fold the children left to right; an empty sequence is the identity
    pub fn apply(&self, p: RealPoint) -> RealPoint {
        self.children.iter().fold(p, |q, t| t.apply(q))
    }
}

/// Ordered composition whose children are all invertible
#[derive(Debug, Clone, Default)]
pub struct InvertibleSequence {
    children: Vec<Transform>,
}

impl InvertibleSequence {
    /// Build from invertible children
    ///
    /// # Errors
    ///
    /// Returns `TransformError::NonInvertibleTransform` naming the first
    /// child without an inverse.
    pub fn new(children: Vec<Transform>) -> TransformResult<Self> {
        for (i, t) in children.iter().enumerate() {
            check_invertible(t, &format!("child {i} of InvertibleSequence"))?;
        }
        Ok(InvertibleSequence { children })
    }

    /// Append a transform to be applied after the existing ones
    ///
    /// # Errors
    ///
    /// Returns `TransformError::NonInvertibleTransform` if `t` has no inverse;
    /// the sequence is left unchanged.
    pub fn push(&mut self, t: Transform) -> TransformResult<()> {
        check_invertible(&t, "InvertibleSequence child")?;
        self.children.push(t);
        Ok(())
    }

    pub fn children(&self) -> &[Transform] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn num_dimensions(&self) -> usize {
        self.children
            .iter()
            .map(Transform::num_dimensions)
            .max()
            .unwrap_or(0)
    }

    pub fn apply(&self, p: RealPoint) -> RealPoint {
        self.children.iter().fold(p, |q, t| t.apply(q))
    }

    /// Fold the child inverses right to left
    pub fn apply_inverse(&self, p: RealPoint) -> TransformResult<RealPoint> {
        self.children
            .iter()
            .rev()
            .try_fold(p, |q, t| t.apply_inverse(q))
    }
}

fn check_invertible(t: &Transform, context: &str) -> TransformResult<()> {
    if t.is_invertible() {
        Ok(())
    } else {
        Err(TransformError::NonInvertibleTransform(format!(
            "{} ({})",
            context,
            t.name()
        )))
    }
}

// ============================================================================
// Bounded
// ============================================================================

/// Invertible transform that only acts inside a closed interval
///
/// Both directions test the query point's leading coordinates against the
/// interval; points outside pass through unchanged. This keeps expensive
/// iterative inverses from running far away from the region of interest.
#[derive(Debug, Clone)]
pub struct Bounded {
    inner: Box<Transform>,
    min: Vec<f64>,
    max: Vec<f64>,
}

impl Bounded {
    /// Restrict `inner` to `[min, max]`
    ///
    /// # Errors
    ///
    /// Returns `TransformError::NonInvertibleTransform` if `inner` has no
    /// inverse, and `TransformError::InvalidParameters` if the interval
    /// bounds differ in length, are empty, longer than three, non-finite, or
    /// have `min > max` in some dimension.
    pub fn new(inner: Transform, min: Vec<f64>, max: Vec<f64>) -> TransformResult<Self> {
        check_invertible(&inner, "Bounded inner transform")?;
        if min.len() != max.len() || min.is_empty() || min.len() > MAX_DIMS {
            return Err(TransformError::InvalidParameters(format!(
                "interval bounds must have 1 to {} matching entries, got {} and {}",
                MAX_DIMS,
                min.len(),
                max.len()
            )));
        }
        if min
            .iter()
            .zip(&max)
            .any(|(lo, hi)| !(lo.is_finite() && hi.is_finite() && lo <= hi))
        {
            return Err(TransformError::InvalidParameters(format!(
                "invalid interval [{min:?}, {max:?}]"
            )));
        }
        Ok(Bounded {
            inner: Box::new(inner),
            min,
            max,
        })
    }

    pub fn inner(&self) -> &Transform {
        &self.inner
    }

    pub fn interval_min(&self) -> &[f64] {
        &self.min
    }

    pub fn interval_max(&self) -> &[f64] {
        &self.max
    }

    /// Whether the point lies inside the (closed) interval
    pub fn contains(&self, p: &RealPoint) -> bool {
        self.min
            .iter()
            .zip(&self.max)
            .enumerate()
            .all(|(d, (lo, hi))| {
                let v = p.get(d);
                v >= *lo && v <= *hi
            })
    }

    pub fn apply(&self, p: RealPoint) -> RealPoint {
        if self.contains(&p) {
            self.inner.apply(p)
        } else {
            p
        }
    }

    pub fn apply_inverse(&self, p: RealPoint) -> TransformResult<RealPoint> {
        if self.contains(&p) {
            self.inner.apply_inverse(p)
        } else {
            Ok(p)
        }
    }
}

// ============================================================================
// Dimension wrapping
// ============================================================================

/// Lifts an invertible 2D transform into 3D
///
/// The inner transform sees (x, y); z is passed through unchanged.
#[derive(Debug, Clone)]
pub struct Wrapped2DIn3D {
    inner: Box<Transform>,
}

impl Wrapped2DIn3D {
    /// Wrap a 2D transform
    ///
    /// # Errors
    ///
    /// Returns `TransformError::NonInvertibleTransform` if `inner` has no
    /// inverse and `TransformError::DimensionMismatch` if it is not 2D.
    pub fn new(inner: Transform) -> TransformResult<Self> {
        check_invertible(&inner, "Wrapped2DIn3D inner transform")?;
        let dims = inner.num_dimensions();
        if dims != 2 {
            return Err(TransformError::DimensionMismatch {
                expected: 2,
                actual: dims,
            });
        }
        Ok(Wrapped2DIn3D {
            inner: Box::new(inner),
        })
    }

    pub fn inner(&self) -> &Transform {
        &self.inner
    }

    pub fn apply(&self, p: RealPoint) -> RealPoint {
        let q = self.inner.apply(RealPoint::new_2d(p.x, p.y));
        RealPoint::new(q.x, q.y, p.z)
    }

    pub fn apply_inverse(&self, p: RealPoint) -> TransformResult<RealPoint> {
        let q = self.inner.apply_inverse(RealPoint::new_2d(p.x, p.y))?;
        Ok(RealPoint::new(q.x, q.y, p.z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn affine(m: [f64; 6]) -> Transform {
        Transform::Affine(AffineTransform::from_row_packed(&m).unwrap())
    }

    fn spline() -> Transform {
        let src = vec![
            vec![0.0, 0.0],
            vec![10.0, 0.0],
            vec![0.0, 10.0],
            vec![10.0, 10.0],
        ];
        let tgt = vec![
            vec![0.0, 0.0],
            vec![11.0, 0.0],
            vec![0.0, 10.0],
            vec![10.0, 12.0],
        ];
        Transform::ThinPlateSpline(ThinPlateSpline::new(&src, &tgt).unwrap())
    }

    #[test]
    fn test_sequence_order() {
        let scale = affine([2.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
        let shift = affine([1.0, 0.0, 5.0, 0.0, 1.0, 0.0]);
        let p = RealPoint::new_2d(1.0, 1.0);
        let ab = Sequence::new(vec![scale.clone(), shift.clone()]);
        let ba = Sequence::new(vec![shift, scale]);
        assert_eq!(ab.apply(p), RealPoint::new_2d(7.0, 2.0));
        assert_eq!(ba.apply(p), RealPoint::new_2d(12.0, 2.0));
        assert_eq!(Sequence::default().apply(p), p);
    }

    #[test]
    fn test_sequence_not_invertible() {
        let t = Transform::Sequence(Sequence::new(vec![affine([1.0, 0.0, 0.0, 0.0, 1.0, 0.0])]));
        assert!(!t.is_invertible());
        assert!(matches!(
            t.apply_inverse(RealPoint::default()),
            Err(TransformError::NonInvertibleTransform(_))
        ));
    }

    #[test]
    fn test_invertible_sequence_rejects_spline() {
        let err = InvertibleSequence::new(vec![affine([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]), spline()]);
        assert!(matches!(err, Err(TransformError::NonInvertibleTransform(_))));

        let mut seq = InvertibleSequence::default();
        assert!(seq.push(spline()).is_err());
        assert!(seq.is_empty());
        seq.push(affine([0.0, -1.0, 3.0, 1.0, 0.0, 0.0])).unwrap();
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn test_invertible_sequence_round_trip() {
        let seq = InvertibleSequence::new(vec![
            affine([2.0, 0.0, 0.0, 0.0, 0.5, 0.0]),
            affine([0.0, -1.0, 3.0, 1.0, 0.0, -4.0]),
            Transform::NumericInverse(NumericInverse::new(spline())),
        ])
        .unwrap();
        let p = RealPoint::new_2d(2.5, 3.0);
        let q = seq.apply(p);
        let back = seq.apply_inverse(q).unwrap();
        assert!(back.distance(&p, 2) < 1e-5);
    }

    #[test]
    fn test_bounded_identity_outside() {
        let shift = affine([1.0, 0.0, 100.0, 0.0, 1.0, 0.0]);
        let b = Bounded::new(shift, vec![0.0, 0.0], vec![10.0, 10.0]).unwrap();
        assert_eq!(b.apply(RealPoint::new_2d(5.0, 5.0)), RealPoint::new_2d(105.0, 5.0));
        assert_eq!(b.apply(RealPoint::new_2d(50.0, 5.0)), RealPoint::new_2d(50.0, 5.0));
        assert_eq!(
            b.apply_inverse(RealPoint::new_2d(5.0, 5.0)).unwrap(),
            RealPoint::new_2d(-95.0, 5.0)
        );
        assert_eq!(
            b.apply_inverse(RealPoint::new_2d(105.0, 5.0)).unwrap(),
            RealPoint::new_2d(105.0, 5.0)
        );
    }

    #[test]
    fn test_bounded_validation() {
        let id = affine([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert!(Bounded::new(spline(), vec![0.0], vec![1.0]).is_err());
        assert!(Bounded::new(id.clone(), vec![0.0, 0.0], vec![1.0]).is_err());
        assert!(Bounded::new(id.clone(), vec![2.0], vec![1.0]).is_err());
        assert!(Bounded::new(id, vec![], vec![]).is_err());
    }

    #[test]
    fn test_wrapped_passes_z() {
        let rot = affine([0.0, -1.0, 0.0, 1.0, 0.0, 0.0]);
        let w = Wrapped2DIn3D::new(rot).unwrap();
        let t = Transform::Wrapped2DIn3D(w);
        assert_eq!(t.num_dimensions(), 3);
        let q = t.apply(RealPoint::new(1.0, 0.0, 42.0));
        assert!(q.distance(&RealPoint::new(0.0, 1.0, 42.0), 3) < 1e-12);
        let back = t.apply_inverse(q).unwrap();
        assert!(back.distance(&RealPoint::new(1.0, 0.0, 42.0), 3) < 1e-12);
    }

    #[test]
    fn test_wrapped_validation() {
        assert!(Wrapped2DIn3D::new(spline()).is_err());
        let a3 = Transform::Affine(AffineTransform::identity(3).unwrap());
        assert!(matches!(
            Wrapped2DIn3D::new(a3),
            Err(TransformError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_copy_is_independent() {
        let t = Transform::InvertibleSequence(
            InvertibleSequence::new(vec![affine([1.0, 0.0, 1.0, 0.0, 1.0, 1.0])]).unwrap(),
        );
        let mut c = t.copy();
        if let Transform::InvertibleSequence(seq) = &mut c {
            seq.push(affine([1.0, 0.0, 1.0, 0.0, 1.0, 1.0])).unwrap();
        }
        let p = RealPoint::default();
        assert_eq!(t.apply(p), RealPoint::new_2d(1.0, 1.0));
        assert_eq!(c.apply(p), RealPoint::new_2d(2.0, 2.0));
    }
}
