//! Affine transform regression test
//!
//! Checks that the inverse of random well-conditioned 2D and 3D affines
//! undoes the forward map, and that composition follows application order.

use warpy_test::{RegParams, SimpleRng};
use warpy_transform::{AffineTransform, RealPoint, Transform};

fn random_affine(rng: &mut SimpleRng, dims: usize) -> AffineTransform {
    let mut m = Vec::with_capacity(dims * (dims + 1));
    for row in 0..dims {
        for col in 0..=dims {
            let v = if col == dims {
                rng.range(-100.0, 100.0)
            } else if col == row {
                rng.range(0.5, 2.0)
            } else {
                rng.range(-0.3, 0.3)
            };
            m.push(v);
        }
    }
    AffineTransform::from_row_packed(&m).unwrap()
}

#[test]
fn affine_reg() {
    let mut rp = RegParams::new("affine");
    let mut rng = SimpleRng::new(0x5eed);

    for dims in [2, 3] {
        for _ in 0..25 {
            let a = Transform::Affine(random_affine(&mut rng, dims));
            for coords in rng.points(8, 3, -500.0, 500.0) {
                let p = RealPoint::from_slice(&coords);
                let back = a.apply_inverse(a.apply(p)).unwrap();
                rp.compare_points(&p.to_array(), &back.to_array(), 1e-9);
            }
        }
    }

    assert!(rp.cleanup(), "affine regression test failed");
}

#[test]
fn affine_compose_reg() {
    let mut rp = RegParams::new("affine_compose");
    let mut rng = SimpleRng::new(99);

    for _ in 0..10 {
        let a = random_affine(&mut rng, 2);
        let b = random_affine(&mut rng, 3);
        let ab = a.then(&b).unwrap();
        rp.compare_values(3.0, ab.num_dimensions() as f64, 0.0);
        for coords in rng.points(5, 3, -50.0, 50.0) {
            let p = RealPoint::from_slice(&coords);
            let expected = b.apply(a.apply(p));
            rp.compare_points(&expected.to_array(), &ab.apply(p).to_array(), 1e-9);
        }

        let inv = ab.inverse().unwrap();
        let p = RealPoint::new(1.0, 2.0, 3.0);
        rp.compare_points(&p.to_array(), &inv.apply(ab.apply(p)).to_array(), 1e-9);
    }

    assert!(rp.cleanup(), "affine compose regression test failed");
}
