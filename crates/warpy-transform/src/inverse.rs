//! Numeric inversion of forward-only transforms
//!
//! [`NumericInverse`] wraps any transform and derives `apply_inverse` by
//! iterative root finding: starting from the target point itself, it runs a
//! damped Newton iteration on `forward(x) - target` with a central-difference
//! Jacobian. When the Jacobian is singular the step falls back to the
//! fixed-point correction `target - forward(x)`.
//!
//! The iteration stops once the forward-mapped error norm drops below the
//! tolerance, or fails with [`TransformError::Convergence`] after
//! `max_iterations` steps. It always terminates.

use crate::point::RealPoint;
use crate::transform::Transform;
use crate::{TransformError, TransformResult};
use nalgebra::{DMatrix, DVector};

/// Default convergence tolerance on the forward-mapped error norm
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Default iteration budget
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Step-halving attempts per Newton iteration
const MAX_BACKTRACKS: usize = 12;

/// Result of a successful numeric inversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseSolution {
    /// The source point found
    pub point: RealPoint,
    /// Forward-mapped error norm at `point`
    pub residual: f64,
    /// Iterations used (0 if the initial guess already converged)
    pub iterations: usize,
}

/// A transform whose inverse is found by iteration
#[derive(Debug, Clone)]
pub struct NumericInverse {
    inner: Box<Transform>,
    tolerance: f64,
    max_iterations: usize,
}

impl NumericInverse {
    /// Wrap a transform with the default tolerance and iteration budget
    pub fn new(inner: Transform) -> Self {
        NumericInverse {
            inner: Box::new(inner),
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Wrap a transform with explicit iteration parameters
    ///
    /// # Errors
    ///
    /// Returns `TransformError::InvalidParameters` unless `tolerance` is
    /// positive and finite and `max_iterations` is positive.
    pub fn with_parameters(
        inner: Transform,
        tolerance: f64,
        max_iterations: usize,
    ) -> TransformResult<Self> {
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(TransformError::InvalidParameters(format!(
                "tolerance must be positive, got {tolerance}"
            )));
        }
        if max_iterations == 0 {
            return Err(TransformError::InvalidParameters(
                "max_iterations must be positive".to_string(),
            ));
        }
        Ok(NumericInverse {
            inner: Box::new(inner),
            tolerance,
            max_iterations,
        })
    }

    pub fn inner(&self) -> &Transform {
        &self.inner
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn num_dimensions(&self) -> usize {
        self.inner.num_dimensions()
    }

    /// Forward mapping; delegates to the wrapped transform
    #[inline]
    pub fn apply(&self, p: RealPoint) -> RealPoint {
        self.inner.apply(p)
    }

    /// Inverse mapping
    ///
    /// # Errors
    ///
    /// Returns `TransformError::Convergence` with the last estimate if the
    /// iteration budget runs out.
    pub fn apply_inverse(&self, target: RealPoint) -> TransformResult<RealPoint> {
        self.apply_inverse_detailed(target).map(|s| s.point)
    }

    /// Inverse mapping, reporting residual and iteration count
    ///
    /// # Errors
    ///
    /// See [`NumericInverse::apply_inverse`].
    pub fn apply_inverse_detailed(&self, target: RealPoint) -> TransformResult<InverseSolution> {
        let dims = self.num_dimensions();
        let mut estimate = target;
        let mut forward = self.inner.apply(estimate);
        let mut residual = forward.distance(&target, dims);

        for iteration in 0..self.max_iterations {
            if residual < self.tolerance {
                return Ok(InverseSolution {
                    point: estimate,
                    residual,
                    iterations: iteration,
                });
            }
            if !residual.is_finite() {
                break;
            }

            let step = self.newton_step(estimate, forward, target, dims);

            // backtrack until the residual shrinks; keep the smallest step
            // otherwise so the iteration keeps moving
            let mut scale = 1.0;
            let mut candidate = offset(estimate, &step, scale, dims);
            let mut cand_forward = self.inner.apply(candidate);
            let mut cand_residual = cand_forward.distance(&target, dims);
            for _ in 0..MAX_BACKTRACKS {
                if cand_residual < residual {
                    break;
                }
                scale *= 0.5;
                candidate = offset(estimate, &step, scale, dims);
                cand_forward = self.inner.apply(candidate);
                cand_residual = cand_forward.distance(&target, dims);
            }

            estimate = candidate;
            forward = cand_forward;
            residual = cand_residual;
        }

        if residual < self.tolerance {
            return Ok(InverseSolution {
                point: estimate,
                residual,
                iterations: self.max_iterations,
            });
        }
        Err(TransformError::Convergence {
            estimate,
            residual,
            iterations: self.max_iterations,
        })
    }

    fn newton_step(
        &self,
        estimate: RealPoint,
        forward: RealPoint,
        target: RealPoint,
        dims: usize,
    ) -> [f64; 3] {
        let mut fallback = [0.0; 3];
        for (d, slot) in fallback.iter_mut().enumerate().take(dims) {
            *slot = target.get(d) - forward.get(d);
        }

        let mut jac = DMatrix::<f64>::zeros(dims, dims);
        for col in 0..dims {
            let h = 1e-6 * estimate.get(col).abs().max(1.0);
            let mut plus = estimate;
            let mut minus = estimate;
            plus.set(col, estimate.get(col) + h);
            minus.set(col, estimate.get(col) - h);
            let fp = self.inner.apply(plus);
            let fm = self.inner.apply(minus);
            for row in 0..dims {
                jac[(row, col)] = (fp.get(row) - fm.get(row)) / (2.0 * h);
            }
        }

        let rhs = DVector::from_iterator(dims, fallback.iter().take(dims).copied());
        match jac.lu().solve(&rhs) {
            Some(x) if x.iter().all(|v| v.is_finite()) => {
                let mut step = [0.0; 3];
                for (d, slot) in step.iter_mut().enumerate().take(dims) {
                    *slot = x[d];
                }
                step
            }
            _ => fallback,
        }
    }
}

#[inline]
fn offset(p: RealPoint, step: &[f64; 3], scale: f64, dims: usize) -> RealPoint {
    let mut q = p;
    for (d, s) in step.iter().enumerate().take(dims) {
        q.set(d, p.get(d) + scale * s);
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AffineTransform;
    use crate::ThinPlateSpline;

    #[test]
    fn test_matches_affine_inverse() {
        let a = AffineTransform::new_2d(1.2, 0.3, 5.0, -0.1, 0.9, -3.0).unwrap();
        let ni = NumericInverse::new(Transform::Affine(a.clone()));
        let target = RealPoint::new_2d(40.0, 17.0);
        let sol = ni.apply_inverse_detailed(target).unwrap();
        let exact = a.apply_inverse(target).unwrap();
        assert!(sol.point.distance(&exact, 2) < 1e-6);
        assert!(sol.iterations <= ni.max_iterations());
        assert!(sol.residual < ni.tolerance());
    }

    #[test]
    fn test_spline_round_trip() {
        let src = vec![
            vec![0.0, 0.0],
            vec![200.0, 0.0],
            vec![0.0, 200.0],
            vec![200.0, 200.0],
            vec![100.0, 100.0],
        ];
        let tgt = vec![
            vec![3.0, -2.0],
            vec![198.0, 4.0],
            vec![-1.0, 203.0],
            vec![205.0, 199.0],
            vec![104.0, 97.0],
        ];
        let tps = ThinPlateSpline::new(&src, &tgt).unwrap();
        let ni = NumericInverse::new(Transform::ThinPlateSpline(tps));
        let p = RealPoint::new_2d(60.0, 140.0);
        let q = ni.apply(p);
        let back = ni.apply_inverse(q).unwrap();
        assert!(back.distance(&p, 2) < 1e-4);
    }

    #[test]
    fn test_invalid_parameters() {
        let id = Transform::Affine(AffineTransform::identity(2).unwrap());
        assert!(NumericInverse::with_parameters(id.clone(), 0.0, 10).is_err());
        assert!(NumericInverse::with_parameters(id.clone(), f64::NAN, 10).is_err());
        assert!(NumericInverse::with_parameters(id, 1e-6, 0).is_err());
    }

    #[test]
    fn test_convergence_failure_reports_estimate() {
        // x -> 0 has no preimage for non-zero targets
        let collapse = AffineTransform::new_2d(0.0, 0.0, 0.0, 0.0, 0.0, 0.0).unwrap();
        let ni = NumericInverse::with_parameters(Transform::Affine(collapse), 1e-9, 5).unwrap();
        match ni.apply_inverse(RealPoint::new_2d(1.0, 1.0)) {
            Err(TransformError::Convergence {
                residual,
                iterations,
                ..
            }) => {
                assert!(residual > 1.0 - 1e-9);
                assert_eq!(iterations, 5);
            }
            other => panic!("expected convergence error, got {other:?}"),
        }
    }

    #[test]
    fn test_identity_needs_no_iterations() {
        let ni = NumericInverse::new(Transform::Affine(AffineTransform::identity(2).unwrap()));
        let sol = ni.apply_inverse_detailed(RealPoint::new_2d(3.0, 4.0)).unwrap();
        assert_eq!(sol.iterations, 0);
        assert_eq!(sol.point, RealPoint::new_2d(3.0, 4.0));
    }
}
