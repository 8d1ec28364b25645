use crate::connectivity::Connectivity;
use crate::nalgebra::{distance, DMatrixViewMut, Matrix2, Point2, Scalar};
use crate::Real;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;

/// The element geometries supported by the mesh and the basis evaluation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementShape {
    Tri3,
    Quad4,
}

impl ElementShape {
    pub fn num_nodes(&self) -> usize {
        match self {
            Self::Tri3 => 3,
            Self::Quad4 => 4,
        }
    }

    /// Whether a basis of the given type is implemented on this geometry.
    pub fn supports(&self, fe_type: &FeType) -> bool {
        match (fe_type.family, fe_type.order) {
            (FeFamily::Lagrange, FeOrder::First) => true,
            (FeFamily::Lagrange, FeOrder::Second) => false,
        }
    }
}

impl fmt::Display for ElementShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tri3 => write!(f, "TRI3"),
            Self::Quad4 => write!(f, "QUAD4"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeOrder {
    First,
    Second,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeFamily {
    Lagrange,
}

/// Polynomial order and family of a finite element variable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeType {
    pub order: FeOrder,
    pub family: FeFamily,
}

impl FeType {
    pub fn lagrange(order: FeOrder) -> Self {
        Self {
            order,
            family: FeFamily::Lagrange,
        }
    }
}

impl Default for FeType {
    fn default() -> Self {
        Self::lagrange(FeOrder::First)
    }
}

impl fmt::Display for FeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = match self.order {
            FeOrder::First => "FIRST",
            FeOrder::Second => "SECOND",
        };
        let family = match self.family {
            FeFamily::Lagrange => "LAGRANGE",
        };
        write!(f, "{}, {}", order, family)
    }
}

pub trait ReferenceFiniteElement<T>
where
    T: Scalar,
{
    /// Returns the number of nodes in the element.
    fn num_nodes(&self) -> usize;

    /// Evaluates each basis function at the given reference coordinates.
    ///
    /// # Panics
    ///
    /// Panics if `basis_values.len()` differs from the number of nodes.
    fn populate_basis(&self, basis_values: &mut [T], reference_coords: &Point2<T>);

    /// Populates the columns of `basis_gradients` with the gradients of each basis function
    /// with respect to the reference coordinates.
    ///
    /// # Panics
    ///
    /// Panics if `basis_gradients` is not a `2 x n` matrix, with `n` the number of nodes.
    fn populate_basis_gradients(&self, basis_gradients: DMatrixViewMut<T>, reference_coords: &Point2<T>);
}

pub trait FiniteElement<T>: ReferenceFiniteElement<T>
where
    T: Scalar,
{
    /// Compute the Jacobian of the transformation from the reference element to the given
    /// element at the given reference coordinates.
    fn reference_jacobian(&self, reference_coords: &Point2<T>) -> Matrix2<T>;

    /// Maps reference coordinates to physical coordinates in the element.
    fn map_reference_coords(&self, reference_coords: &Point2<T>) -> Point2<T>;

    /// The diameter of the finite element.
    ///
    /// The diameter of a finite element is defined as the largest distance between any two
    /// points in the element, i.e.
    ///  h = max |x - y| for x, y in K
    /// where K is the element and h is the diameter.
    fn diameter(&self) -> T;
}

pub trait ElementConnectivity<T>: Debug + Connectivity
where
    T: Scalar,
{
    type Element: FiniteElement<T>;

    const SHAPE: ElementShape;

    /// Returns the finite element associated with this connectivity.
    ///
    /// The vertices passed in should be the collection of *all* vertices in the mesh.
    /// Returns `None` if the connectivity references vertices out of bounds.
    fn element(&self, vertices: &[Point2<T>]) -> Option<Self::Element>;
}

/// Implements `ReferenceFiniteElement` for an element providing fixed-size `evaluate_basis`
/// and `gradients` methods.
macro_rules! impl_reference_finite_element_for_fixed {
    ($element:ident, $num_nodes:expr) => {
        impl<T> $crate::element::ReferenceFiniteElement<T> for $element<T>
        where
            T: $crate::Real,
        {
            fn num_nodes(&self) -> usize {
                $num_nodes
            }

            fn populate_basis(&self, result: &mut [T], reference_coords: &Point2<T>) {
                let basis_values = self.evaluate_basis(reference_coords);
                result.clone_from_slice(basis_values.as_slice());
            }

            fn populate_basis_gradients(
                &self,
                mut result: $crate::nalgebra::DMatrixViewMut<T>,
                reference_coords: &Point2<T>,
            ) {
                let gradients = self.gradients(reference_coords);
                result.copy_from(&gradients);
            }
        }
    };
}

/// Looks up the corners of a cell in the mesh vertices. `None` if an index is out of bounds.
fn gather_vertices<T: Real, const N: usize>(indices: &[usize; N], vertices: &[Point2<T>]) -> Option<[Point2<T>; N]> {
    let mut corners = [Point2::origin(); N];
    for (corner, &index) in corners.iter_mut().zip(indices) {
        *corner = *vertices.get(index)?;
    }
    Some(corners)
}

/// Largest distance between two corners. Equals the diameter for convex cells.
fn max_vertex_distance<T: Real>(vertices: &[Point2<T>]) -> T {
    vertices
        .iter()
        .tuple_combinations()
        .map(|(x, y)| distance(x, y))
        .fold(T::zero(), |a, b| a.max(b))
}

mod quadrilateral;
mod triangle;

pub use quadrilateral::*;
pub use triangle::*;
