use crate::connectivity::{Connectivity, Quad4d2Connectivity, Tri3d2Connectivity};
use crate::element::{ElementConnectivity, ElementShape};
use crate::nalgebra::{Point2, Scalar};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod boundary;
pub mod procedural;

/// Index-based data structure for conforming two-dimensional meshes.
///
/// Every element carries an *active* flag. Elements are active on construction, and only
/// active elements take part in assembly and output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(bound(
    serialize = "T: Serialize, Connectivity: Serialize",
    deserialize = "T: Deserialize<'de>, Connectivity: Deserialize<'de>"
))]
pub struct Mesh<T: Scalar, Connectivity> {
    vertices: Vec<Point2<T>>,
    connectivity: Vec<Connectivity>,
    active: Vec<bool>,
}

pub type TriangleMesh2d<T> = Mesh<T, Tri3d2Connectivity>;
pub type QuadMesh2d<T> = Mesh<T, Quad4d2Connectivity>;

impl<T, Connectivity> Mesh<T, Connectivity>
where
    T: Scalar,
{
    /// Construct a mesh from vertices and connectivity, with all elements active.
    ///
    /// The connectivity is not checked here. Element lookups return `None` for connectivity
    /// referencing vertices out of bounds, and assembly reports such elements as errors.
    pub fn from_vertices_and_connectivity(vertices: Vec<Point2<T>>, connectivity: Vec<Connectivity>) -> Self {
        let active = vec![true; connectivity.len()];
        Self {
            vertices,
            connectivity,
            active,
        }
    }

    pub fn vertices(&self) -> &[Point2<T>] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[Connectivity] {
        &self.connectivity
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_elements(&self) -> usize {
        self.connectivity.len()
    }

    /// Returns `false` for indices out of bounds.
    pub fn is_active(&self, element_index: usize) -> bool {
        self.active.get(element_index).copied().unwrap_or(false)
    }

    /// Excludes the element from assembly and output.
    ///
    /// Returns whether the element was active before the call.
    pub fn deactivate_element(&mut self, element_index: usize) -> bool {
        match self.active.get_mut(element_index) {
            Some(active) => std::mem::replace(active, false),
            None => false,
        }
    }

    pub fn active_element_indices(&self) -> impl '_ + Iterator<Item = usize> {
        self.active
            .iter()
            .enumerate()
            .filter_map(|(i, &active)| active.then_some(i))
    }

    pub fn num_active_elements(&self) -> usize {
        self.active.iter().filter(|&&active| active).count()
    }
}

impl<T, C> Mesh<T, C>
where
    T: Scalar,
    C: ElementConnectivity<T>,
{
    pub fn get_element(&self, index: usize) -> Option<C::Element> {
        self.connectivity()
            .get(index)
            .and_then(|conn| conn.element(self.vertices()))
    }

    pub fn info(&self) -> MeshInfo {
        MeshInfo {
            mesh_dimension: 2,
            n_nodes: self.num_vertices(),
            n_elem: self.num_elements(),
            n_active_elem: self.num_active_elements(),
            element: C::SHAPE,
        }
    }
}

impl<T, C> Mesh<T, C>
where
    T: Scalar,
    C: Connectivity,
{
    /// Finds faces which are only connected to exactly one element, along with the connected
    /// element index and the local index of the face within that element.
    ///
    /// Faces are returned in the lexicographic order of their sorted vertex indices.
    pub fn find_boundary_faces(&self) -> Vec<(C::FaceConnectivity, usize, usize)> {
        // Use a BTreeMap keyed on sorted vertex indices so that the result is deterministic
        let mut face_counts: BTreeMap<Vec<usize>, ((C::FaceConnectivity, usize, usize), usize)> = BTreeMap::new();

        for (conn_idx, element_conn) in self.connectivity.iter().enumerate() {
            for local_idx in 0..element_conn.num_faces() {
                if let Some(face_conn) = element_conn.get_face_connectivity(local_idx) {
                    let mut key = face_conn.vertex_indices().to_vec();
                    key.sort_unstable();
                    face_counts
                        .entry(key)
                        .and_modify(|(_, count)| *count += 1)
                        .or_insert(((face_conn, conn_idx, local_idx), 1));
                }
            }
        }

        face_counts
            .into_values()
            .filter(|&(_, count)| count == 1)
            .map(|(face, _)| face)
            .collect()
    }
}

impl<T> QuadMesh2d<T>
where
    T: Scalar,
{
    /// Splits every quad into two triangles along the diagonal from its first to its third
    /// node.
    ///
    /// Triangles `2 * i` and `2 * i + 1` stem from quad `i` and inherit its active flag.
    pub fn split_into_triangles(&self) -> TriangleMesh2d<T> {
        let connectivity = self
            .connectivity
            .iter()
            .flat_map(|quad| quad.split_into_triangles())
            .collect();
        let active = self
            .active
            .iter()
            .flat_map(|&active| [active, active])
            .collect();
        Mesh {
            vertices: self.vertices.clone(),
            connectivity,
            active,
        }
    }
}

/// A printable summary of a mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshInfo {
    pub mesh_dimension: usize,
    pub n_nodes: usize,
    pub n_elem: usize,
    pub n_active_elem: usize,
    pub element: ElementShape,
}

impl fmt::Display for MeshInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " Mesh Information:")?;
        writeln!(f, "  mesh_dimension()={}", self.mesh_dimension)?;
        writeln!(f, "  n_nodes()={}", self.n_nodes)?;
        writeln!(f, "  n_elem()={}", self.n_elem)?;
        writeln!(f, "  n_active_elem()={}", self.n_active_elem)?;
        writeln!(f, "  element type: {}", self.element)
    }
}
