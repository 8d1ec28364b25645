use numeric_literals::replace_float_literals;

use super::{gather_vertices, max_vertex_distance};
use crate::connectivity::Quad4d2Connectivity;
use crate::element::{ElementConnectivity, ElementShape, FiniteElement};
use crate::nalgebra::{Matrix1x4, Matrix2, Matrix2x4, Point2, Scalar, Vector2};
use crate::Real;

/// Reference coordinates of the corners of `[-1, 1]^2`, in node order.
const CORNERS: [[f64; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

fn corner<T: Real>(node: usize) -> Vector2<T> {
    let [x, y] = CORNERS[node];
    Vector2::new(
        T::from_f64(x).expect("Literal must fit in T"),
        T::from_f64(y).expect("Literal must fit in T"),
    )
}

/// Bilinear quadrilateral in the plane, with reference element `[-1, 1]^2`.
///
/// The basis function of node `i` is `(1 + s x)(1 + t y) / 4`, where `(s, t)` is the
/// reference corner of the node.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Quad4d2Element<T>
where
    T: Scalar,
{
    vertices: [Point2<T>; 4],
}

impl<T> Quad4d2Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point2<T>; 4]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<T>; 4] {
        &self.vertices
    }
}

impl<T> Quad4d2Element<T>
where
    T: Real,
{
    pub fn reference() -> Self {
        Self::from_vertices([0, 1, 2, 3].map(|node| Point2::from(corner::<T>(node))))
    }

    /// Signed area by the shoelace formula, positive for counter-clockwise vertex order.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn signed_area(&self) -> T {
        let [a, b, c, d] = &self.vertices;
        // The diagonals span a parallelogram of twice the area
        0.5 * (c - a).perp(&(d - b))
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn evaluate_basis(&self, xi: &Point2<T>) -> Matrix1x4<T> {
        Matrix1x4::from_fn(|_, node| {
            let c = corner::<T>(node);
            0.25 * (1.0 + c.x * xi.x) * (1.0 + c.y * xi.y)
        })
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn gradients(&self, xi: &Point2<T>) -> Matrix2x4<T> {
        Matrix2x4::from_fn(|component, node| {
            let c = corner::<T>(node);
            match component {
                0 => 0.25 * c.x * (1.0 + c.y * xi.y),
                _ => 0.25 * c.y * (1.0 + c.x * xi.x),
            }
        })
    }
}

impl_reference_finite_element_for_fixed!(Quad4d2Element, 4);

impl<T> FiniteElement<T> for Quad4d2Element<T>
where
    T: Real,
{
    fn reference_jacobian(&self, xi: &Point2<T>) -> Matrix2<T> {
        // J = sum_i x_i grad(N_i)^T
        let gradients = self.gradients(xi);
        self.vertices
            .iter()
            .zip(gradients.column_iter())
            .fold(Matrix2::zeros(), |j, (x, g)| j + x.coords * g.transpose())
    }

    fn map_reference_coords(&self, xi: &Point2<T>) -> Point2<T> {
        let basis = self.evaluate_basis(xi);
        let x = self
            .vertices
            .iter()
            .zip(basis.iter())
            .fold(Vector2::zeros(), |x, (v, &n)| x + v.coords * n);
        Point2::from(x)
    }

    fn diameter(&self) -> T {
        max_vertex_distance(&self.vertices)
    }
}

impl<T> ElementConnectivity<T> for Quad4d2Connectivity
where
    T: Real,
{
    type Element = Quad4d2Element<T>;

    const SHAPE: ElementShape = ElementShape::Quad4;

    fn element(&self, vertices: &[Point2<T>]) -> Option<Self::Element> {
        gather_vertices(&self.0, vertices).map(Quad4d2Element::from_vertices)
    }
}
