use crate::connectivity::{Connectivity, Quad4d2Connectivity, Segment2d2Connectivity, Tri3d2Connectivity};
use crate::isolines::Isolines;
use crate::mesh::Mesh;
use crate::nalgebra::Point2;
use crate::vtkio::model::{
    Attribute, Attributes, ByteOrder, CellType, Cells, DataArray, DataSet, ElementType, IOBuffer, Piece,
    UnstructuredGridPiece, Version, VertexNumbers, Vtk,
};
use crate::Real;
use eyre::eyre;
use std::convert::TryFrom;
use std::path::Path;

/// Represents connectivity that is supported by VTK.
pub trait VtkCellConnectivity: Connectivity {
    fn num_nodes(&self) -> usize {
        self.vertex_indices().len()
    }

    fn cell_type(&self) -> CellType;

    /// Write connectivity.
    ///
    /// Panics if `connectivity.len() != self.num_nodes()`.
    fn write_vtk_connectivity(&self, connectivity: &mut [usize]) {
        assert_eq!(connectivity.len(), self.num_nodes());
        connectivity.clone_from_slice(self.vertex_indices());
    }
}

impl VtkCellConnectivity for Segment2d2Connectivity {
    fn cell_type(&self) -> CellType {
        CellType::Line
    }
}

impl VtkCellConnectivity for Tri3d2Connectivity {
    fn cell_type(&self) -> CellType {
        CellType::Triangle
    }
}

impl VtkCellConnectivity for Quad4d2Connectivity {
    fn cell_type(&self) -> CellType {
        CellType::Quad
    }
}

fn to_f64<T: Real>(value: T) -> eyre::Result<f64> {
    value
        .to_f64()
        .ok_or_else(|| eyre!("value cannot be represented as f64"))
}

fn to_u32(value: usize) -> eyre::Result<u32> {
    u32::try_from(value).map_err(|_| eyre!("index {} is too large for VTK output", value))
}

/// Pads 2D points to the 3D point buffer VTK expects.
fn point_buffer<T: Real>(points: &[Point2<T>]) -> eyre::Result<IOBuffer> {
    let mut coords = Vec::with_capacity(3 * points.len());
    for p in points {
        coords.push(to_f64(p.x)?);
        coords.push(to_f64(p.y)?);
        coords.push(0.0);
    }
    Ok(IOBuffer::from(coords))
}

fn scalar_attribute<T: Real>(name: &str, values: &[T]) -> eyre::Result<Attribute> {
    let data = values
        .iter()
        .map(|&v| to_f64(v))
        .collect::<eyre::Result<Vec<_>>>()?;
    Ok(Attribute::DataArray(DataArray {
        name: name.to_string(),
        elem: ElementType::Scalars {
            num_comp: 1,
            lookup_table: None,
        },
        data: IOBuffer::from(data),
    }))
}

fn export_dataset(title: &str, dataset: DataSet, filepath: &Path) -> eyre::Result<()> {
    if let Some(dir) = filepath.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    Vtk {
        version: Version { major: 4, minor: 1 },
        title: title.to_string(),
        byte_order: ByteOrder::BigEndian,
        data: dataset,
        file_path: None,
    }
    .export(filepath)
    .map_err(|err| eyre!("failed to export VTK file {}: {}", filepath.display(), err))
}

fn unstructured_grid(
    points: IOBuffer,
    num_cells: usize,
    vertices: Vec<u32>,
    types: Vec<CellType>,
    data: Attributes,
) -> eyre::Result<DataSet> {
    let piece = UnstructuredGridPiece {
        points,
        cells: Cells {
            cell_verts: VertexNumbers::Legacy {
                num_cells: to_u32(num_cells)?,
                vertices,
            },
            types,
        },
        data,
    };
    Ok(DataSet::UnstructuredGrid {
        meta: None,
        pieces: vec![Piece::Inline(Box::new(piece))],
    })
}

/// Builds a VTK unstructured grid from the active elements of a mesh, optionally with nodal
/// scalar fields attached.
pub struct FiniteElementMeshDataSetBuilder<'a, T: Real, C> {
    mesh: &'a Mesh<T, C>,
    title: Option<String>,
    point_scalars: Vec<(String, &'a [T])>,
}

impl<'a, T, C> FiniteElementMeshDataSetBuilder<'a, T, C>
where
    T: Real,
    C: VtkCellConnectivity,
{
    pub fn from_mesh(mesh: &'a Mesh<T, C>) -> Self {
        Self {
            mesh,
            title: None,
            point_scalars: Vec::new(),
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }

    /// Attaches a scalar field with one value per mesh vertex.
    pub fn with_point_scalar_attributes(mut self, name: impl Into<String>, values: &'a [T]) -> Self {
        self.point_scalars.push((name.into(), values));
        self
    }

    pub fn try_build(&self) -> eyre::Result<DataSet> {
        let num_vertices = self.mesh.num_vertices();
        let mut vertices = Vec::new();
        let mut types = Vec::new();
        let mut cell_connectivity = Vec::new();
        for element in self.mesh.active_element_indices() {
            let cell = &self.mesh.connectivity()[element];
            cell_connectivity.resize(cell.num_nodes(), 0);
            cell.write_vtk_connectivity(&mut cell_connectivity);

            vertices.push(to_u32(cell.num_nodes())?);
            for &v in &cell_connectivity {
                vertices.push(to_u32(v)?);
            }
            types.push(cell.cell_type());
        }

        let mut data = Attributes::new();
        for (name, values) in &self.point_scalars {
            if values.len() != num_vertices {
                return Err(eyre!(
                    "point attribute \"{}\" has {} values, but the mesh has {} vertices",
                    name,
                    values.len(),
                    num_vertices
                ));
            }
            data.point.push(scalar_attribute(name, values)?);
        }

        unstructured_grid(point_buffer(self.mesh.vertices())?, types.len(), vertices, types, data)
    }

    pub fn try_export(&self, filepath: impl AsRef<Path>) -> eyre::Result<()> {
        let dataset = self.try_build()?;
        let title = self.title.as_deref().unwrap_or("isodist");
        export_dataset(title, dataset, filepath.as_ref())
    }
}

/// Builds a VTK unstructured grid of line cells from extracted isolines.
///
/// Every point and every line carries its isovalue in an attribute named `isovalue`.
pub struct IsolineDataSetBuilder<'a, T: Real> {
    isolines: &'a Isolines<T>,
    title: Option<String>,
}

impl<'a, T: Real> IsolineDataSetBuilder<'a, T> {
    pub fn from_isolines(isolines: &'a Isolines<T>) -> Self {
        Self { isolines, title: None }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }

    pub fn try_build(&self) -> eyre::Result<DataSet> {
        let segments = self.isolines.segments();
        let mut vertices = Vec::with_capacity(3 * segments.len());
        for &[p, q] in segments {
            vertices.extend([2, to_u32(p)?, to_u32(q)?]);
        }
        let types = vec![CellType::Line; segments.len()];

        let point_isovalues: Vec<T> = self.isolines.point_isovalues().collect();
        let segment_isovalues: Vec<T> = self.isolines.segment_isovalues().collect();
        let data = Attributes {
            point: vec![scalar_attribute("isovalue", &point_isovalues)?],
            cell: vec![scalar_attribute("isovalue", &segment_isovalues)?],
        };

        unstructured_grid(point_buffer(self.isolines.points())?, segments.len(), vertices, types, data)
    }

    pub fn try_export(&self, filepath: impl AsRef<Path>) -> eyre::Result<()> {
        let dataset = self.try_build()?;
        let title = self.title.as_deref().unwrap_or("isolines");
        export_dataset(title, dataset, filepath.as_ref())
    }
}
