use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Vertex indices of a mesh entity, together with the entities bounding it.
pub trait Connectivity: Clone {
    type FaceConnectivity: Connectivity;

    fn num_faces(&self) -> usize;
    fn get_face_connectivity(&self, index: usize) -> Option<Self::FaceConnectivity>;

    fn vertex_indices(&self) -> &[usize];
}

/// Side `index` of a polygon whose vertices are listed counter-clockwise.
fn polygon_side<const N: usize>(vertices: &[usize; N], index: usize) -> Option<Segment2d2Connectivity> {
    let start = *vertices.get(index)?;
    Some(Segment2d2Connectivity([start, vertices[(index + 1) % N]]))
}

/// A side of a two-dimensional cell.
///
/// Sides are the lowest-dimensional entity the meshes deal with, so they report no faces
/// of their own.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment2d2Connectivity(pub [usize; 2]);

impl Connectivity for Segment2d2Connectivity {
    type FaceConnectivity = Self;

    fn num_faces(&self) -> usize {
        0
    }

    fn get_face_connectivity(&self, _index: usize) -> Option<Self> {
        None
    }

    fn vertex_indices(&self) -> &[usize] {
        &self.0
    }
}

/// Corner indices of a bilinear quadrilateral cell, counter-clockwise.
///
/// Side `i` runs from corner `i` to corner `(i + 1) % 4`. On the structured grids this
/// makes side 0 the bottom and side 3 the left side of the cell.
///
/// ```text
/// 3 ----- 2
/// |       |
/// |       |
/// 0 ----- 1
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quad4d2Connectivity(pub [usize; 4]);

impl Quad4d2Connectivity {
    /// The two triangles obtained by cutting along the diagonal between corners 0 and 2.
    ///
    /// Both triangles keep the orientation of the quad.
    pub fn split_into_triangles(&self) -> [Tri3d2Connectivity; 2] {
        let [a, b, c, d] = self.0;
        [Tri3d2Connectivity([a, b, c]), Tri3d2Connectivity([a, c, d])]
    }
}

/// Corner indices of a linear triangle cell, counter-clockwise.
///
/// ```text
/// 2
/// | \
/// |   \
/// 0 --- 1
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tri3d2Connectivity(pub [usize; 3]);

macro_rules! impl_polygon_connectivity {
    ($connectivity:ident, $corners:literal) => {
        impl Connectivity for $connectivity {
            type FaceConnectivity = Segment2d2Connectivity;

            fn num_faces(&self) -> usize {
                $corners
            }

            fn get_face_connectivity(&self, index: usize) -> Option<Segment2d2Connectivity> {
                polygon_side(&self.0, index)
            }

            fn vertex_indices(&self) -> &[usize] {
                &self.0
            }
        }

        impl Deref for $connectivity {
            type Target = [usize; $corners];

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

impl_polygon_connectivity!(Quad4d2Connectivity, 4);
impl_polygon_connectivity!(Tri3d2Connectivity, 3);
