//! Boundary ids attached to element sides.
use crate::connectivity::Connectivity;
use crate::mesh::Mesh;
use crate::nalgebra::Scalar;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub type BoundaryId = u32;

/// A side of an element, identified by the element index and the local face index.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BoundarySide {
    pub element: usize,
    pub side: usize,
}

/// Maps boundary ids to the element sides carrying them.
///
/// A side may carry several ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryInfo {
    sides: BTreeMap<BoundaryId, BTreeSet<BoundarySide>>,
}

impl BoundaryInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_side(&mut self, element: usize, side: usize, id: BoundaryId) {
        self.sides
            .entry(id)
            .or_default()
            .insert(BoundarySide { element, side });
    }

    pub fn boundary_ids(&self) -> impl '_ + Iterator<Item = BoundaryId> {
        self.sides.keys().copied()
    }

    pub fn sides_with_id(&self, id: BoundaryId) -> impl '_ + Iterator<Item = BoundarySide> {
        self.sides.get(&id).into_iter().flatten().copied()
    }

    pub fn num_sides(&self) -> usize {
        self.sides.values().map(BTreeSet::len).sum()
    }

    /// Collects the sorted, deduplicated vertex indices of all sides carrying one of the
    /// given ids.
    ///
    /// Sides of inactive elements are ignored, as are sides that do not exist in the mesh.
    pub fn boundary_nodes<T, C>(&self, mesh: &Mesh<T, C>, ids: &[BoundaryId]) -> Vec<usize>
    where
        T: Scalar,
        C: Connectivity,
    {
        let mut nodes = BTreeSet::new();
        for id in ids {
            for BoundarySide { element, side } in self.sides_with_id(*id) {
                if !mesh.is_active(element) {
                    continue;
                }
                let face = mesh
                    .connectivity()
                    .get(element)
                    .and_then(|conn| conn.get_face_connectivity(side));
                if let Some(face) = face {
                    nodes.extend(face.vertex_indices().iter().copied());
                }
            }
        }
        nodes.into_iter().collect()
    }

    pub fn info(&self) -> BoundaryInfoSummary {
        BoundaryInfoSummary {
            sides_per_id: self
                .sides
                .iter()
                .map(|(&id, sides)| (id, sides.len()))
                .collect(),
        }
    }
}

/// A printable summary of boundary information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryInfoSummary {
    pub sides_per_id: Vec<(BoundaryId, usize)>,
}

impl fmt::Display for BoundaryInfoSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " Boundary Information:")?;
        let ids: Vec<_> = self.sides_per_id.iter().map(|(id, _)| id.to_string()).collect();
        writeln!(f, "  boundary ids: {{{}}}", ids.join(", "))?;
        for (id, count) in &self.sides_per_id {
            writeln!(f, "  id {}: {} sides", id, count)?;
        }
        Ok(())
    }
}
