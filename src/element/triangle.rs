use numeric_literals::replace_float_literals;

use super::{gather_vertices, max_vertex_distance};
use crate::connectivity::Tri3d2Connectivity;
use crate::element::{ElementConnectivity, ElementShape, FiniteElement};
use crate::nalgebra::{Matrix1x3, Matrix2, Matrix2x3, Point2, Scalar, Vector2};
use crate::Real;

/// Linear triangle in the plane.
///
/// The reference triangle has the corners (-1, -1), (1, -1) and (-1, 1), the same triangle
/// the quadrature rules are defined on. The map to the physical triangle is affine, so the
/// Jacobian is constant over the element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tri3d2Element<T>
where
    T: Scalar,
{
    vertices: [Point2<T>; 3],
}

impl<T> Tri3d2Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point2<T>; 3]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<T>; 3] {
        &self.vertices
    }
}

impl<T> Tri3d2Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference() -> Self {
        Self::from_vertices([Point2::new(-1.0, -1.0), Point2::new(1.0, -1.0), Point2::new(-1.0, 1.0)])
    }

    /// Signed area, positive for counter-clockwise vertex order.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn signed_area(&self) -> T {
        let [a, b, c] = &self.vertices;
        0.5 * (b - a).perp(&(c - a))
    }

    /// Barycentric coordinates of the reference point.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn evaluate_basis(&self, xi: &Point2<T>) -> Matrix1x3<T> {
        let l1 = 0.5 * (xi.x + 1.0);
        let l2 = 0.5 * (xi.y + 1.0);
        Matrix1x3::new(1.0 - l1 - l2, l1, l2)
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn gradients(&self, _: &Point2<T>) -> Matrix2x3<T> {
        Matrix2x3::new(-0.5, 0.5, 0.0, -0.5, 0.0, 0.5)
    }

    /// Jacobian of the affine reference map, with columns `(b - a) / 2` and `(c - a) / 2`.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn affine_jacobian(&self) -> Matrix2<T> {
        let [a, b, c] = &self.vertices;
        Matrix2::from_columns(&[(b - a) * 0.5, (c - a) * 0.5])
    }
}

impl_reference_finite_element_for_fixed!(Tri3d2Element, 3);

impl<T> FiniteElement<T> for Tri3d2Element<T>
where
    T: Real,
{
    fn reference_jacobian(&self, _: &Point2<T>) -> Matrix2<T> {
        self.affine_jacobian()
    }

    fn map_reference_coords(&self, xi: &Point2<T>) -> Point2<T> {
        // Reference corner 0 sits at (-1, -1)
        let offset = xi.coords + Vector2::repeat(T::one());
        self.vertices[0] + self.affine_jacobian() * offset
    }

    fn diameter(&self) -> T {
        max_vertex_distance(&self.vertices)
    }
}

impl<T> ElementConnectivity<T> for Tri3d2Connectivity
where
    T: Real,
{
    type Element = Tri3d2Element<T>;

    const SHAPE: ElementShape = ElementShape::Tri3;

    fn element(&self, vertices: &[Point2<T>]) -> Option<Self::Element> {
        gather_vertices(&self.0, vertices).map(Tri3d2Element::from_vertices)
    }
}
