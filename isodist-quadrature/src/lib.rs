//! Quadrature rules for the reference domains used by `isodist`.
//!
//! Reference domains:
//!
//! - interval: `[-1, 1]`,
//! - quadrilateral: `[-1, 1]^2`,
//! - triangle: the triangle with corners `(-1, -1)`, `(1, -1)`, `(-1, 1)` (area 2).
//!
//! Rules are returned as plain `f64` weights and points so that they can be used independently
//! of any linear algebra library.

pub mod simplex;
pub mod tensor;
pub mod univariate;

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A two-dimensional point.
pub type Point2 = Point<2>;

/// A D-dimensional rule, given as `(weights, points)`.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// A two-dimensional quadrature rule.
pub type Rule2d = Rule<2>;

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    assert_eq!(weights.len(), points.len());
    weights
        .iter()
        .zip(points)
        .map(|(w, x)| w * f(x))
        .sum()
}

/// Number of Gauss points per dimension needed to integrate polynomials of the given degree
/// exactly along each dimension.
pub fn gauss_points_for_strength(strength: usize) -> usize {
    // n points integrate polynomials of degree 2n - 1 exactly
    (strength + 2) / 2
}
