use isodist_quadrature::integrate;
use isodist_quadrature::tensor::{quadrilateral_gauss, quadrilateral_gauss_with_strength};
use matrixcompare::assert_scalar_eq;

fn monomial_integral_1d(alpha: i32) -> f64 {
    (1.0 - (-1.0f64).powi(alpha + 1)) / (alpha as f64 + 1.0)
}

#[test]
fn quadrilateral_gauss_rules_satisfy_expected_accuracy() {
    for n in 1..=12 {
        // Degree that the rule can exactly integrate *along each dimension*
        let expected_polynomial_degree = 2 * n as i32 - 1;
        let rule = quadrilateral_gauss(n);

        assert_eq!(rule.0.len(), n * n);
        assert!(rule.0.iter().all(|&w| w > 0.0));

        for alpha in 0..=expected_polynomial_degree {
            for beta in 0..=expected_polynomial_degree {
                let exact = monomial_integral_1d(alpha) * monomial_integral_1d(beta);
                let estimated = integrate(&rule, |&[x, y]| x.powi(alpha) * y.powi(beta));
                assert_scalar_eq!(estimated, exact, comp = abs, tol = 1e-12);
            }
        }
    }
}

#[test]
fn strength_five_quadrilateral_rule_has_three_points_per_dimension() {
    let (weights, points) = quadrilateral_gauss_with_strength(5);
    assert_eq!(weights.len(), 9);
    assert_eq!(points.len(), 9);
    assert_scalar_eq!(weights.iter().sum::<f64>(), 4.0, comp = abs, tol = 1e-14);
}
