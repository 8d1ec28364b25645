//! Quadrature rules for the reference triangle with corners `(-1, -1)`, `(1, -1)`, `(-1, 1)`.

use crate::univariate::gauss;
use crate::{Point2, Rule2d};

/// Area of the reference triangle.
const REFERENCE_AREA: f64 = 2.0;

/// Maps barycentric coordinates associated with the corners `(-1, -1)`, `(1, -1)`, `(-1, 1)`
/// to reference coordinates.
fn from_barycentric(_lambda0: f64, lambda1: f64, lambda2: f64) -> Point2 {
    [-1.0 + 2.0 * lambda1, -1.0 + 2.0 * lambda2]
}

/// Pushes the three distinct permutations of the barycentric point `(a, b, b)`.
fn push_orbit_abb(rule: &mut Rule2d, a: f64, b: f64, normalized_weight: f64) {
    let (weights, points) = rule;
    for point in [
        from_barycentric(a, b, b),
        from_barycentric(b, a, b),
        from_barycentric(b, b, a),
    ] {
        weights.push(REFERENCE_AREA * normalized_weight);
        points.push(point);
    }
}

/// One-point centroid rule, exact for polynomials of total degree 1.
pub fn triangle_centroid() -> Rule2d {
    let third = 1.0 / 3.0;
    (
        vec![REFERENCE_AREA],
        vec![from_barycentric(third, third, third)],
    )
}

/// Three-point interior rule, exact for polynomials of total degree 2.
pub fn triangle_strength_2() -> Rule2d {
    let mut rule = (Vec::with_capacity(3), Vec::with_capacity(3));
    push_orbit_abb(&mut rule, 2.0 / 3.0, 1.0 / 6.0, 1.0 / 3.0);
    rule
}

/// Seven-point rule (Radon/Dunavant), exact for polynomials of total degree 5.
pub fn triangle_strength_5() -> Rule2d {
    let sqrt15 = 15.0f64.sqrt();
    let third = 1.0 / 3.0;
    let mut rule = (Vec::with_capacity(7), Vec::with_capacity(7));
    rule.0.push(REFERENCE_AREA * 9.0 / 40.0);
    rule.1.push(from_barycentric(third, third, third));
    push_orbit_abb(
        &mut rule,
        (9.0 - 2.0 * sqrt15) / 21.0,
        (6.0 + sqrt15) / 21.0,
        (155.0 + sqrt15) / 1200.0,
    );
    push_orbit_abb(
        &mut rule,
        (9.0 + 2.0 * sqrt15) / 21.0,
        (6.0 - sqrt15) / 21.0,
        (155.0 - sqrt15) / 1200.0,
    );
    rule
}

/// Collapsed (Duffy) Gauss rule with `n * n` points.
///
/// The square `[-1, 1]^2` is collapsed onto the reference triangle by
/// `xi = (1 + u)(1 - v) / 2 - 1`, `eta = v`. The rule is exact for polynomials of total
/// degree `2 n - 2`.
pub fn triangle_collapsed_gauss(num_points_per_dim: usize) -> Rule2d {
    let n = num_points_per_dim;
    let (weights1d, points1d) = gauss(n);
    let mut weights = Vec::with_capacity(n * n);
    let mut points = Vec::with_capacity(n * n);
    for (&wu, &[u]) in weights1d.iter().zip(&points1d) {
        for (&wv, &[v]) in weights1d.iter().zip(&points1d) {
            let jacobian = 0.5 * (1.0 - v);
            weights.push(wu * wv * jacobian);
            points.push([(1.0 + u) * jacobian - 1.0, v]);
        }
    }
    (weights, points)
}

/// The cheapest available triangle rule that integrates all polynomials of total degree
/// `strength` exactly.
pub fn triangle(strength: usize) -> Rule2d {
    match strength {
        0 | 1 => triangle_centroid(),
        2 => triangle_strength_2(),
        3..=5 => triangle_strength_5(),
        _ => triangle_collapsed_gauss((strength + 3) / 2),
    }
}
