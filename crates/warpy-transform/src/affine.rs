//! Affine transforms in two and three dimensions
//!
//! An affine transform of dimensionality `d` is stored as a row-packed
//! `d x (d + 1)` matrix: the linear part followed by the translation column
//! of each row. In 2D:
//! ```text
//! | m00  m01  m02 |
//! | m10  m11  m12 |
//! ```
//! with
//! ```text
//! x' = m00*x + m01*y + m02
//! y' = m10*x + m11*y + m12
//! ```
//!
//! The inverse is computed once at construction; a singular matrix yields an
//! affine that evaluates forward but reports itself as not invertible.

use crate::point::RealPoint;
use crate::{TransformError, TransformResult};
use nalgebra::DMatrix;

/// Row-packed affine transform of dimensionality 2 or 3
#[derive(Debug, Clone, PartialEq)]
pub struct AffineTransform {
    dims: usize,
    matrix: Vec<f64>,
    inverse: Option<Vec<f64>>,
}

impl AffineTransform {
    /// Identity transform of the given dimensionality
    ///
    /// # Errors
    ///
    /// Returns `TransformError::InvalidParameters` unless `dims` is 2 or 3.
    pub fn identity(dims: usize) -> TransformResult<Self> {
        check_dims(dims)?;
        let mut m = vec![0.0; dims * (dims + 1)];
        for d in 0..dims {
            m[d * (dims + 1) + d] = 1.0;
        }
        Self::from_row_packed(&m)
    }

    /// Build from a row-packed matrix
    ///
    /// Six values make a 2D transform, twelve a 3D one.
    ///
    /// # Errors
    ///
    /// Returns `TransformError::InvalidParameters` for any other length or
    /// for non-finite coefficients.
    pub fn from_row_packed(values: &[f64]) -> TransformResult<Self> {
        let dims = match values.len() {
            6 => 2,
            12 => 3,
            n => {
                return Err(TransformError::InvalidParameters(format!(
                    "affine matrix needs 6 or 12 values, got {n}"
                )));
            }
        };
        if values.iter().any(|v| !v.is_finite()) {
            return Err(TransformError::InvalidParameters(
                "affine matrix contains non-finite values".to_string(),
            ));
        }
        let matrix = values.to_vec();
        let inverse = invert_row_packed(dims, &matrix);
        Ok(AffineTransform {
            dims,
            matrix,
            inverse,
        })
    }

    /// 2D affine from its six coefficients
    pub fn new_2d(m00: f64, m01: f64, m02: f64, m10: f64, m11: f64, m12: f64) -> TransformResult<Self> {
        Self::from_row_packed(&[m00, m01, m02, m10, m11, m12])
    }

    /// Pure translation; the offset length sets the dimensionality
    pub fn translation(offset: &[f64]) -> TransformResult<Self> {
        let dims = offset.len();
        let mut t = Self::identity(dims)?;
        for (d, &v) in offset.iter().enumerate() {
            t.matrix[d * (dims + 1) + dims] = v;
        }
        Self::from_row_packed(&t.matrix)
    }

    /// Axis-aligned scaling about the origin
    pub fn scaling(factors: &[f64]) -> TransformResult<Self> {
        let dims = factors.len();
        let mut t = Self::identity(dims)?;
        for (d, &v) in factors.iter().enumerate() {
            t.matrix[d * (dims + 1) + d] = v;
        }
        Self::from_row_packed(&t.matrix)
    }

    /// 2D rotation by `angle` radians (counter-clockwise in a y-up frame)
    /// about the given center
    pub fn rotation_2d(center_x: f64, center_y: f64, angle: f64) -> TransformResult<Self> {
        let (sin, cos) = angle.sin_cos();
        Self::new_2d(
            cos,
            -sin,
            center_x - cos * center_x + sin * center_y,
            sin,
            cos,
            center_y - sin * center_x - cos * center_y,
        )
    }

    /// Lift a 2D affine into 3D, leaving z unchanged; 3D affines are cloned
    pub fn to_3d(&self) -> Self {
        if self.dims == 3 {
            return self.clone();
        }
        let m = &self.matrix;
        let lifted = [
            m[0], m[1], 0.0, m[2], //
            m[3], m[4], 0.0, m[5], //
            0.0, 0.0, 1.0, 0.0,
        ];
        let inverse = invert_row_packed(3, &lifted);
        AffineTransform {
            dims: 3,
            matrix: lifted.to_vec(),
            inverse,
        }
    }

    #[inline]
    pub fn num_dimensions(&self) -> usize {
        self.dims
    }

    /// Row-packed coefficients
    pub fn row_packed(&self) -> &[f64] {
        &self.matrix
    }

    /// Coefficient at (row, column); column `dims` is the translation
    pub fn get(&self, row: usize, col: usize) -> f64 {
        if row < self.dims && col <= self.dims {
            self.matrix[row * (self.dims + 1) + col]
        } else {
            0.0
        }
    }

    pub fn is_invertible(&self) -> bool {
        self.inverse.is_some()
    }

    /// The inverse transform
    ///
    /// # Errors
    ///
    /// Returns `TransformError::SingularMatrix` if the linear part is singular.
    pub fn inverse(&self) -> TransformResult<Self> {
        let inv = self.inverse.as_ref().ok_or(TransformError::SingularMatrix)?;
        Ok(AffineTransform {
            dims: self.dims,
            matrix: inv.clone(),
            inverse: Some(self.matrix.clone()),
        })
    }

    /// Transform applying `self` first and `next` second
    ///
    /// A 2D operand is lifted to 3D when the other one is 3D.
    pub fn then(&self, next: &AffineTransform) -> TransformResult<Self> {
        let (a, b) = if self.dims == next.dims {
            (self.clone(), next.clone())
        } else {
            (self.to_3d(), next.to_3d())
        };
        let product = homogeneous(b.dims, &b.matrix) * homogeneous(a.dims, &a.matrix);
        Self::from_row_packed(&row_packed_from(a.dims, &product))
    }

    /// Map a point forward
    #[inline]
    pub fn apply(&self, p: RealPoint) -> RealPoint {
        map_row_packed(self.dims, &self.matrix, p)
    }

    /// Map a point backward
    ///
    /// # Errors
    ///
    /// Returns `TransformError::SingularMatrix` if the matrix is singular.
    #[inline]
    pub fn apply_inverse(&self, p: RealPoint) -> TransformResult<RealPoint> {
        let inv = self.inverse.as_ref().ok_or(TransformError::SingularMatrix)?;
        Ok(map_row_packed(self.dims, inv, p))
    }
}

fn check_dims(dims: usize) -> TransformResult<()> {
    if dims == 2 || dims == 3 {
        Ok(())
    } else {
        Err(TransformError::InvalidParameters(format!(
            "affine transforms are 2D or 3D, got {dims}D"
        )))
    }
}

#[inline]
fn map_row_packed(dims: usize, m: &[f64], p: RealPoint) -> RealPoint {
    let mut out = p;
    let stride = dims + 1;
    for row in 0..dims {
        let r = &m[row * stride..(row + 1) * stride];
        let mut v = r[dims];
        for col in 0..dims {
            v += r[col] * p.get(col);
        }
        out.set(row, v);
    }
    out
}

fn homogeneous(dims: usize, m: &[f64]) -> DMatrix<f64> {
    DMatrix::from_fn(dims + 1, dims + 1, |r, c| {
        if r < dims {
            m[r * (dims + 1) + c]
        } else if c == dims {
            1.0
        } else {
            0.0
        }
    })
}

fn row_packed_from(dims: usize, h: &DMatrix<f64>) -> Vec<f64> {
    (0..dims)
        .flat_map(|r| (0..=dims).map(move |c| (r, c)))
        .map(|(r, c)| h[(r, c)])
        .collect()
}

fn invert_row_packed(dims: usize, m: &[f64]) -> Option<Vec<f64>> {
    let inv = homogeneous(dims, m).try_inverse()?;
    let packed = row_packed_from(dims, &inv);
    packed.iter().all(|v| v.is_finite()).then_some(packed)
}
