//! Real-valued points
//!
//! Every transform works on a [`RealPoint`] with three coordinates. A
//! transform of dimensionality `d` reads and writes the first `d`
//! coordinates and passes the remaining ones through untouched, so a 2D
//! transform applied to a 3D point leaves `z` alone.

/// Maximum dimensionality supported by the transform model
pub const MAX_DIMS: usize = 3;

/// A point in up to three dimensions
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RealPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl RealPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        RealPoint { x, y, z }
    }

    /// Point in the z = 0 plane
    pub fn new_2d(x: f64, y: f64) -> Self {
        RealPoint { x, y, z: 0.0 }
    }

    /// Build from up to three leading coordinates; missing ones are zero
    pub fn from_slice(coords: &[f64]) -> Self {
        let mut p = RealPoint::default();
        for (d, &v) in coords.iter().take(MAX_DIMS).enumerate() {
            p.set(d, v);
        }
        p
    }

    /// Coordinate `d` (0 = x, 1 = y, 2 = z); out-of-range indices read as 0
    #[inline]
    pub fn get(&self, d: usize) -> f64 {
        match d {
            0 => self.x,
            1 => self.y,
            2 => self.z,
            _ => 0.0,
        }
    }

    /// Set coordinate `d`; out-of-range indices are ignored
    #[inline]
    pub fn set(&mut self, d: usize, value: f64) {
        match d {
            0 => self.x = value,
            1 => self.y = value,
            2 => self.z = value,
            _ => {}
        }
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Euclidean distance over the first `dims` coordinates
    pub fn distance(&self, other: &RealPoint, dims: usize) -> f64 {
        (0..dims.min(MAX_DIMS))
            .map(|d| {
                let diff = self.get(d) - other.get(d);
                diff * diff
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Whether the first `dims` coordinates are finite
    pub fn is_finite(&self, dims: usize) -> bool {
        (0..dims.min(MAX_DIMS)).all(|d| self.get(d).is_finite())
    }
}

impl From<[f64; 2]> for RealPoint {
    fn from(c: [f64; 2]) -> Self {
        RealPoint::new_2d(c[0], c[1])
    }
}

impl From<[f64; 3]> for RealPoint {
    fn from(c: [f64; 3]) -> Self {
        RealPoint::new(c[0], c[1], c[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let mut p = RealPoint::new_2d(1.0, 2.0);
        p.set(2, 5.0);
        p.set(7, 9.0);
        assert_eq!(p.to_array(), [1.0, 2.0, 5.0]);
        assert_eq!(p.get(7), 0.0);
    }

    #[test]
    fn test_distance_uses_leading_dims() {
        let a = RealPoint::new(0.0, 0.0, 100.0);
        let b = RealPoint::new(3.0, 4.0, -100.0);
        assert_eq!(a.distance(&b, 2), 5.0);
        assert!(a.distance(&b, 3) > 200.0);
    }

    #[test]
    fn test_from_slice() {
        assert_eq!(RealPoint::from_slice(&[1.0]), RealPoint::new(1.0, 0.0, 0.0));
        assert_eq!(
            RealPoint::from_slice(&[1.0, 2.0, 3.0, 4.0]),
            RealPoint::new(1.0, 2.0, 3.0)
        );
    }
}
