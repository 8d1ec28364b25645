//! Quadrature rules for the reference elements, converted to the scalar type in use.
use crate::element::ElementShape;
use crate::nalgebra::{convert, Point2, Scalar};
use crate::Real;
use isodist_quadrature::{simplex, tensor, Rule2d};
use num::Zero;
use std::fmt;
use std::ops::{Add, AddAssign, Mul};

/// Highest quadrature strength that can be requested.
pub const MAX_QUADRATURE_STRENGTH: usize = 43;

pub type QuadraturePair2d<T> = (Vec<T>, Vec<Point2<T>>);

/// A quadrature rule on a two-dimensional reference domain.
pub trait Quadrature<T>
where
    T: Scalar,
{
    fn weights(&self) -> &[T];
    fn points(&self) -> &[Point2<T>];

    fn num_points(&self) -> usize {
        self.weights().len()
    }

    /// Approximates the integral of the given function using this quadrature rule.
    fn integrate<U, Function>(&self, f: Function) -> U
    where
        Function: Fn(&Point2<T>) -> U,
        U: Zero + Mul<T, Output = U> + Add<T, Output = U> + AddAssign<U>,
    {
        let mut integral = U::zero();
        for (w, p) in self.weights().iter().zip(self.points()) {
            integral += f(p) * w.clone();
        }
        integral
    }
}

impl<T, A, B> Quadrature<T> for (A, B)
where
    T: Scalar,
    A: AsRef<[T]>,
    B: AsRef<[Point2<T>]>,
{
    fn weights(&self) -> &[T] {
        self.0.as_ref()
    }

    fn points(&self) -> &[Point2<T>] {
        self.1.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuadratureError {
    UnsupportedStrength { strength: usize, max: usize },
}

impl fmt::Display for QuadratureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedStrength { strength, max } => write!(
                f,
                "quadrature strength {} is not supported (maximum is {})",
                strength, max
            ),
        }
    }
}

impl std::error::Error for QuadratureError {}

pub fn convert_quadrature_rule_from_2d_f64<T: Real>(rule: Rule2d) -> QuadraturePair2d<T> {
    let (weights, points) = rule;
    let weights = weights.into_iter().map(convert).collect();
    let points = points
        .into_iter()
        .map(|[x, y]| Point2::new(convert(x), convert(y)))
        .collect();
    (weights, points)
}

pub fn quadrilateral_gauss<T: Real>(num_points_per_dim: usize) -> QuadraturePair2d<T> {
    convert_quadrature_rule_from_2d_f64(tensor::quadrilateral_gauss(num_points_per_dim))
}

/// The cheapest triangle rule integrating polynomials of total degree `strength` exactly.
pub fn triangle_quadrature<T: Real>(strength: usize) -> QuadraturePair2d<T> {
    convert_quadrature_rule_from_2d_f64(simplex::triangle(strength))
}

/// Gauss-type rule for the reference element of the given shape, exact for polynomials of
/// degree `strength`.
///
/// Quadrilaterals use the tensor Gauss rule exact for degree `strength` in each variable,
/// triangles the cheapest rule exact for total degree `strength`.
pub fn element_quadrature<T: Real>(
    shape: ElementShape,
    strength: usize,
) -> Result<QuadraturePair2d<T>, QuadratureError> {
    if strength > MAX_QUADRATURE_STRENGTH {
        return Err(QuadratureError::UnsupportedStrength {
            strength,
            max: MAX_QUADRATURE_STRENGTH,
        });
    }

    let rule = match shape {
        ElementShape::Quad4 => tensor::quadrilateral_gauss_with_strength(strength),
        ElementShape::Tri3 => simplex::triangle(strength),
    };
    Ok(convert_quadrature_rule_from_2d_f64(rule))
}
