use isodist::connectivity::{Quad4d2Connectivity, Tri3d2Connectivity};
use isodist::io::vtk::{FiniteElementMeshDataSetBuilder, IsolineDataSetBuilder};
use isodist::isolines::extract_isolines;
use isodist::mesh::procedural::build_unit_square;
use isodist::vtkio::model::{Attribute, CellType, DataSet, Piece, UnstructuredGridPiece, VertexNumbers};
use nalgebra::Point2;
use std::path::Path;

fn single_piece(dataset: DataSet) -> UnstructuredGridPiece {
    match dataset {
        DataSet::UnstructuredGrid { mut pieces, .. } => {
            assert_eq!(pieces.len(), 1);
            match pieces.remove(0) {
                Piece::Inline(piece) => *piece,
                _ => panic!("Expected inline piece"),
            }
        }
        _ => panic!("Expected unstructured grid"),
    }
}

fn legacy_cell_vertices(piece: &UnstructuredGridPiece) -> (u32, &[u32]) {
    match &piece.cells.cell_verts {
        VertexNumbers::Legacy { num_cells, vertices } => (*num_cells, vertices),
        _ => panic!("Expected legacy cell vertices"),
    }
}

fn attribute_name(attribute: &Attribute) -> &str {
    match attribute {
        Attribute::DataArray(array) => &array.name,
        Attribute::Field { name, .. } => name,
    }
}

#[test]
fn quad_mesh_dataset_contains_active_cells() {
    let (mut mesh, _) = build_unit_square::<f64, Quad4d2Connectivity>(2).unwrap();
    mesh.deactivate_element(1);
    let values: Vec<_> = mesh.vertices().iter().map(|p| p.x).collect();
    let dataset = FiniteElementMeshDataSetBuilder::from_mesh(&mesh)
        .with_point_scalar_attributes("d", &values)
        .try_build()
        .unwrap();
    let piece = single_piece(dataset);

    // Points are padded to three dimensions
    assert_eq!(piece.points.len(), 3 * 9);
    assert_eq!(piece.cells.types, vec![CellType::Quad; 3]);
    let (num_cells, vertices) = legacy_cell_vertices(&piece);
    assert_eq!(num_cells, 3);
    assert_eq!(&vertices[..5], &[4, 0, 1, 4, 3]);
    assert_eq!(vertices.len(), 3 * 5);

    assert_eq!(piece.data.point.len(), 1);
    assert_eq!(attribute_name(&piece.data.point[0]), "d");
    assert!(piece.data.cell.is_empty());
}

#[test]
fn triangle_mesh_dataset_has_triangle_cells() {
    let (mesh, _) = build_unit_square::<f64, Tri3d2Connectivity>(1).unwrap();
    let piece = single_piece(FiniteElementMeshDataSetBuilder::from_mesh(&mesh).try_build().unwrap());
    assert_eq!(piece.cells.types, vec![CellType::Triangle; 2]);
    let (num_cells, vertices) = legacy_cell_vertices(&piece);
    assert_eq!(num_cells, 2);
    assert_eq!(vertices, &[3, 0, 1, 3, 3, 0, 3, 2]);
}

#[test]
fn point_attributes_must_match_vertex_count() {
    let (mesh, _) = build_unit_square::<f64, Tri3d2Connectivity>(2).unwrap();
    let values = vec![0.0; 4];
    let result = FiniteElementMeshDataSetBuilder::from_mesh(&mesh)
        .with_point_scalar_attributes("d", &values)
        .try_build();
    assert!(result.is_err());
}

#[test]
fn isoline_dataset_has_line_cells_with_isovalues() {
    let vertices = vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
    ];
    let triangles = [[0, 1, 2], [0, 2, 3]];
    let isolines = extract_isolines(&vertices, &triangles, &[0.0, 1.0, 2.0, 1.0], &[0.5, 1.5]).unwrap();
    assert_eq!(isolines.num_segments(), 4);

    let piece = single_piece(IsolineDataSetBuilder::from_isolines(&isolines).try_build().unwrap());
    assert_eq!(piece.cells.types, vec![CellType::Line; 4]);
    let (num_cells, vertices) = legacy_cell_vertices(&piece);
    assert_eq!(num_cells, 4);
    assert!(vertices.chunks(3).all(|cell| cell[0] == 2));
    assert_eq!(piece.points.len(), 3 * isolines.points().len());
    assert_eq!(attribute_name(&piece.data.point[0]), "isovalue");
    assert_eq!(attribute_name(&piece.data.cell[0]), "isovalue");
}

#[test]
fn export_mesh_and_isolines() {
    let (mesh, _) = build_unit_square::<f64, Quad4d2Connectivity>(4).unwrap();
    let values: Vec<_> = mesh.vertices().iter().map(|p| p.x - 0.5 * p.x * p.x).collect();
    let triangles: Vec<_> = mesh
        .connectivity()
        .iter()
        .flat_map(|quad| quad.split_into_triangles())
        .map(|tri| tri.0)
        .collect();
    let isolines = extract_isolines(mesh.vertices(), &triangles, &values, &[0.1, 0.2, 0.3, 0.4]).unwrap();

    let dir = Path::new("data/unit_tests/vtk/export_mesh_and_isolines");
    let mesh_path = dir.join("distance.vtu");
    let isoline_path = dir.join("distance_isolines.vtu");
    FiniteElementMeshDataSetBuilder::from_mesh(&mesh)
        .with_title("distance")
        .with_point_scalar_attributes("d", &values)
        .try_export(&mesh_path)
        .unwrap();
    IsolineDataSetBuilder::from_isolines(&isolines)
        .try_export(&isoline_path)
        .unwrap();

    assert!(mesh_path.metadata().unwrap().len() > 0);
    assert!(isoline_path.metadata().unwrap().len() > 0);
}
