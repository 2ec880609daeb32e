//! Thin-plate spline transform
//!
//! A thin-plate spline maps each source landmark exactly onto its target
//! landmark and interpolates smoothly in between. For a query point `p` in
//! `D` dimensions:
//! ```text
//! f(p) = a0 + A p + sum_i w_i U(|p - s_i|),   U(r) = r^2 ln r
//! ```
//! The affine part `(a0, A)` and the radial weights `w_i` come from solving
//! the `(N + D + 1)` square system
//! ```text
//! | K   P | | w |   | t |
//! | P^T 0 | | a | = | 0 |
//! ```
//! with `K_ij = U(|s_i - s_j|)` and `P_i = [1, s_i]`.
//!
//! The spline has no closed-form inverse; wrap it in a
//! [`NumericInverse`](crate::NumericInverse) when one is needed.

use crate::point::{MAX_DIMS, RealPoint};
use crate::{TransformError, TransformResult};
use nalgebra::{DMatrix, DVector};

/// Smallest allowed ratio between the extreme singular values of the
/// landmark design matrix `[1, s_i]`
const MIN_CONDITION: f64 = 1e-10;

/// The radial basis function U(r) = r^2 ln r, expressed in terms of r^2
#[inline]
fn r2_log_r(r2: f64) -> f64 {
    if r2 <= 0.0 { 0.0 } else { 0.5 * r2 * r2.ln() }
}

/// Landmark-driven thin-plate spline
#[derive(Debug, Clone)]
pub struct ThinPlateSpline {
    dims: usize,
    /// N x D, landmark-major
    source: Vec<f64>,
    /// N x D, landmark-major
    target: Vec<f64>,
    /// N x D radial weights
    weights: Vec<f64>,
    /// (D + 1) x D affine coefficients: translation row then linear rows
    affine: Vec<f64>,
}

impl ThinPlateSpline {
    /// Solve a spline from landmark correspondences
    ///
    /// # Arguments
    ///
    /// * `source` - N landmarks, each a slice of D coordinates
    /// * `target` - N landmarks matched index by index to `source`
    ///
    /// # Errors
    ///
    /// Returns `TransformError::InvalidParameters` if the arrays are not
    /// rectangular, disagree in shape, hold fewer than D + 1 landmarks, have
    /// a dimensionality other than 2 or 3, contain non-finite values, or if
    /// the landmarks are degenerate (e.g. collinear in 2D).
    pub fn new(source: &[Vec<f64>], target: &[Vec<f64>]) -> TransformResult<Self> {
        let n = source.len();
        let dims = source.first().map_or(0, |p| p.len());
        if !(2..=MAX_DIMS).contains(&dims) {
            return Err(TransformError::InvalidParameters(format!(
                "thin-plate spline landmarks must be 2D or 3D, got {dims}D"
            )));
        }
        if target.len() != n {
            return Err(TransformError::InvalidParameters(format!(
                "{} source landmarks but {} target landmarks",
                n,
                target.len()
            )));
        }
        if source.iter().chain(target).any(|p| p.len() != dims) {
            return Err(TransformError::InvalidParameters(
                "landmark arrays are not rectangular".to_string(),
            ));
        }
        if n < dims + 1 {
            return Err(TransformError::InvalidParameters(format!(
                "{dims}D thin-plate spline needs at least {} landmarks, got {n}",
                dims + 1
            )));
        }
        let flat_src: Vec<f64> = source.iter().flatten().copied().collect();
        let flat_tgt: Vec<f64> = target.iter().flatten().copied().collect();
        if flat_src.iter().chain(&flat_tgt).any(|v| !v.is_finite()) {
            return Err(TransformError::InvalidParameters(
                "landmarks contain non-finite values".to_string(),
            ));
        }

        check_affine_rank(&flat_src, n, dims)?;
        let (weights, affine) = solve(&flat_src, &flat_tgt, n, dims)?;

        Ok(ThinPlateSpline {
            dims,
            source: flat_src,
            target: flat_tgt,
            weights,
            affine,
        })
    }

    #[inline]
    pub fn num_dimensions(&self) -> usize {
        self.dims
    }

    /// Number of landmark pairs
    pub fn num_landmarks(&self) -> usize {
        self.source.len() / self.dims
    }

    /// Source landmarks, one row of D coordinates per landmark
    pub fn source_landmarks(&self) -> Vec<Vec<f64>> {
        self.source.chunks(self.dims).map(<[f64]>::to_vec).collect()
    }

    /// Target landmarks, one row of D coordinates per landmark
    pub fn target_landmarks(&self) -> Vec<Vec<f64>> {
        self.target.chunks(self.dims).map(<[f64]>::to_vec).collect()
    }

    /// Evaluate the spline at a point
    pub fn apply(&self, p: RealPoint) -> RealPoint {
        let d = self.dims;
        let mut out = p;
        let mut acc = [0.0f64; MAX_DIMS];

        // affine part
        for (k, slot) in acc.iter_mut().enumerate().take(d) {
            let mut v = self.affine[k];
            for j in 0..d {
                v += self.affine[(j + 1) * d + k] * p.get(j);
            }
            *slot = v;
        }

        for (i, s) in self.source.chunks(d).enumerate() {
            let r2: f64 = s
                .iter()
                .enumerate()
                .map(|(j, &c)| {
                    let diff = p.get(j) - c;
                    diff * diff
                })
                .sum();
            let u = r2_log_r(r2);
            if u != 0.0 {
                for (k, slot) in acc.iter_mut().enumerate().take(d) {
                    *slot += self.weights[i * d + k] * u;
                }
            }
        }

        for (k, &v) in acc.iter().enumerate().take(d) {
            out.set(k, v);
        }
        out
    }
}

/// Reject landmark sets whose affine span is degenerate
fn check_affine_rank(src: &[f64], n: usize, dims: usize) -> TransformResult<()> {
    let p = DMatrix::from_fn(n, dims + 1, |i, j| if j == 0 { 1.0 } else { src[i * dims + j - 1] });
    let sv = p.singular_values();
    let max = sv.max();
    let min = sv.min();
    if !(max > 0.0) || min / max < MIN_CONDITION {
        return Err(TransformError::InvalidParameters(
            "thin-plate spline landmarks are degenerate".to_string(),
        ));
    }
    Ok(())
}

fn solve(src: &[f64], tgt: &[f64], n: usize, dims: usize) -> TransformResult<(Vec<f64>, Vec<f64>)> {
    let size = n + dims + 1;
    let mut l = DMatrix::<f64>::zeros(size, size);
    for i in 0..n {
        for j in (i + 1)..n {
            let r2: f64 = (0..dims)
                .map(|k| {
                    let diff = src[i * dims + k] - src[j * dims + k];
                    diff * diff
                })
                .sum();
            let u = r2_log_r(r2);
            l[(i, j)] = u;
            l[(j, i)] = u;
        }
        l[(i, n)] = 1.0;
        l[(n, i)] = 1.0;
        for k in 0..dims {
            l[(i, n + 1 + k)] = src[i * dims + k];
            l[(n + 1 + k, i)] = src[i * dims + k];
        }
    }

    let lu = l.lu();
    let mut weights = vec![0.0; n * dims];
    let mut affine = vec![0.0; (dims + 1) * dims];
    for k in 0..dims {
        let mut rhs = DVector::<f64>::zeros(size);
        for i in 0..n {
            rhs[i] = tgt[i * dims + k];
        }
        let x = lu.solve(&rhs).ok_or_else(|| {
            TransformError::InvalidParameters(
                "thin-plate spline system is singular (duplicate landmarks?)".to_string(),
            )
        })?;
        if x.iter().any(|v| !v.is_finite()) {
            return Err(TransformError::InvalidParameters(
                "thin-plate spline system is ill-conditioned".to_string(),
            ));
        }
        for i in 0..n {
            weights[i * dims + k] = x[i];
        }
        for j in 0..=dims {
            affine[j * dims + k] = x[n + j];
        }
    }
    Ok((weights, affine))
}
