//! Basic procedural mesh generation routines.
use crate::connectivity::{Connectivity, Quad4d2Connectivity, Tri3d2Connectivity};
use crate::mesh::boundary::{BoundaryId, BoundaryInfo};
use crate::mesh::Mesh;
use crate::nalgebra::Point2;
use crate::Real;
use eyre::eyre;

/// Boundary id of the side `y = y_min`.
pub const BOTTOM: BoundaryId = 0;
/// Boundary id of the side `x = x_max`.
pub const RIGHT: BoundaryId = 1;
/// Boundary id of the side `y = y_max`.
pub const TOP: BoundaryId = 2;
/// Boundary id of the side `x = x_min`.
pub const LEFT: BoundaryId = 3;

/// Connectivity types that can tile a structured grid cell.
pub trait GridCellConnectivity: Connectivity + Sized {
    /// Appends the element(s) covering the grid cell with the given counter-clockwise corners,
    /// starting at the bottom-left corner.
    fn push_grid_cell(cells: &mut Vec<Self>, corners: [usize; 4]);
}

impl GridCellConnectivity for Quad4d2Connectivity {
    fn push_grid_cell(cells: &mut Vec<Self>, corners: [usize; 4]) {
        cells.push(Quad4d2Connectivity(corners));
    }
}

impl GridCellConnectivity for Tri3d2Connectivity {
    fn push_grid_cell(cells: &mut Vec<Self>, corners: [usize; 4]) {
        cells.extend(Quad4d2Connectivity(corners).split_into_triangles());
    }
}

/// Builds a uniform `nx x ny` grid on the rectangle `[x_min, x_max] x [y_min, y_max]` together
/// with its boundary information.
///
/// Vertices are numbered row by row, starting at `(x_min, y_min)`. Elements are ordered the
/// same way, with two consecutive triangles per cell for triangle meshes. Boundary sides are
/// labeled [`BOTTOM`], [`RIGHT`], [`TOP`] and [`LEFT`].
pub fn build_square<T, C>(
    nx: usize,
    ny: usize,
    x_min: T,
    x_max: T,
    y_min: T,
    y_max: T,
) -> eyre::Result<(Mesh<T, C>, BoundaryInfo)>
where
    T: Real,
    C: GridCellConnectivity,
{
    if nx == 0 || ny == 0 {
        return Err(eyre!("grid must have at least one cell per direction, got {} x {}", nx, ny));
    }
    if !(x_min < x_max && y_min < y_max) {
        return Err(eyre!(
            "invalid bounds [{}, {}] x [{}, {}]",
            x_min,
            x_max,
            y_min,
            y_max
        ));
    }

    let to_t = |i: usize| T::from_usize(i).ok_or_else(|| eyre!("index {} does not fit in scalar type", i));
    let (nx_t, ny_t) = (to_t(nx)?, to_t(ny)?);
    let vertex_index = |i: usize, j: usize| (nx + 1) * j + i;

    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        let y = y_min + (y_max - y_min) * to_t(j)? / ny_t;
        for i in 0..=nx {
            let x = x_min + (x_max - x_min) * to_t(i)? / nx_t;
            vertices.push(Point2::new(x, y));
        }
    }

    let mut cells = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            C::push_grid_cell(
                &mut cells,
                [
                    vertex_index(i, j),
                    vertex_index(i + 1, j),
                    vertex_index(i + 1, j + 1),
                    vertex_index(i, j + 1),
                ],
            );
        }
    }

    let mesh = Mesh::from_vertices_and_connectivity(vertices, cells);

    // Sides are labeled from the grid coordinates of their vertices, which is exact
    let grid_coords = |v: usize| (v % (nx + 1), v / (nx + 1));
    let mut boundary_info = BoundaryInfo::new();
    for (face, element, side) in mesh.find_boundary_faces() {
        let coords: Vec<_> = face.vertex_indices().iter().map(|&v| grid_coords(v)).collect();
        let id = if coords.iter().all(|&(_, j)| j == 0) {
            BOTTOM
        } else if coords.iter().all(|&(i, _)| i == nx) {
            RIGHT
        } else if coords.iter().all(|&(_, j)| j == ny) {
            TOP
        } else if coords.iter().all(|&(i, _)| i == 0) {
            LEFT
        } else {
            return Err(eyre!("boundary side {} of element {} is not on the grid boundary", side, element));
        };
        boundary_info.add_side(element, side, id);
    }

    Ok((mesh, boundary_info))
}

/// Builds a uniform grid on the unit square with `cells_per_dim` cells in each direction.
pub fn build_unit_square<T, C>(cells_per_dim: usize) -> eyre::Result<(Mesh<T, C>, BoundaryInfo)>
where
    T: Real,
    C: GridCellConnectivity,
{
    build_square(cells_per_dim, cells_per_dim, T::zero(), T::one(), T::zero(), T::one())
}
