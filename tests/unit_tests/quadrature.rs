use isodist::element::ElementShape;
use isodist::quadrature::{element_quadrature, Quadrature, QuadratureError, MAX_QUADRATURE_STRENGTH};
use matrixcompare::assert_scalar_eq;
use nalgebra::Point2;

/// Integral of `x^a` over `[-1, 1]`.
fn monomial_integral_1d(a: i32) -> f64 {
    if a % 2 == 0 {
        2.0 / (a as f64 + 1.0)
    } else {
        0.0
    }
}

#[test]
fn quad_rules_integrate_tensor_monomials_exactly() {
    for strength in 0..=11 {
        let quadrature = element_quadrature::<f64>(ElementShape::Quad4, strength).unwrap();
        for a in 0..=strength as i32 {
            for b in 0..=strength as i32 {
                let integral = quadrature.integrate(|p: &Point2<f64>| p.x.powi(a) * p.y.powi(b));
                let expected = monomial_integral_1d(a) * monomial_integral_1d(b);
                assert_scalar_eq!(integral, expected, comp = abs, tol = 1e-12);
            }
        }
    }
}

#[test]
fn triangle_rules_integrate_low_degree_polynomials_exactly() {
    // Reference triangle (-1, -1), (1, -1), (-1, 1)
    let cases: [(&dyn Fn(&Point2<f64>) -> f64, f64, usize); 4] = [
        (&|_: &Point2<f64>| 1.0, 2.0, 0),
        (&|p: &Point2<f64>| p.x, -2.0 / 3.0, 1),
        (&|p: &Point2<f64>| p.x * p.x, 2.0 / 3.0, 2),
        (&|p: &Point2<f64>| p.x * p.y, 0.0, 2),
    ];

    for (f, expected, degree) in cases {
        for strength in degree..=7 {
            let quadrature = element_quadrature::<f64>(ElementShape::Tri3, strength).unwrap();
            let integral = quadrature.integrate(f);
            assert_scalar_eq!(integral, expected, comp = abs, tol = 1e-12);
        }
    }
}

#[test]
fn weights_sum_to_reference_area() {
    for strength in [0, 1, 2, 5, 11] {
        let quad = element_quadrature::<f64>(ElementShape::Quad4, strength).unwrap();
        assert_scalar_eq!(quad.weights().iter().sum::<f64>(), 4.0, comp = abs, tol = 1e-13);

        let tri = element_quadrature::<f64>(ElementShape::Tri3, strength).unwrap();
        assert_scalar_eq!(tri.weights().iter().sum::<f64>(), 2.0, comp = abs, tol = 1e-13);
        assert_eq!(tri.weights().len(), tri.num_points());
    }
}

#[test]
fn strength_5_quad_rule_has_nine_points() {
    let quadrature = element_quadrature::<f64>(ElementShape::Quad4, 5).unwrap();
    assert_eq!(quadrature.num_points(), 9);
}

#[test]
fn unsupported_strength_is_an_error() {
    let result = element_quadrature::<f64>(ElementShape::Quad4, MAX_QUADRATURE_STRENGTH + 1);
    assert_eq!(
        result.unwrap_err(),
        QuadratureError::UnsupportedStrength {
            strength: MAX_QUADRATURE_STRENGTH + 1,
            max: MAX_QUADRATURE_STRENGTH
        }
    );
}
