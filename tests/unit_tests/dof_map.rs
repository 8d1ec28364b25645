use crate::unit_square_distance_problem;
use isodist::assembly::local::{element_stiffness_matrix, StiffnessUpdate};
use isodist::assembly::AssemblyError;
use isodist::connectivity::{Connectivity, Quad4d2Connectivity, Tri3d2Connectivity};
use isodist::dof_map::{DirichletBoundary, DofMap};
use isodist::element::{FeOrder, FeType};
use isodist::mesh::boundary::BoundaryInfo;
use isodist::mesh::procedural::{build_unit_square, BOTTOM, LEFT, RIGHT};
use isodist::mesh::TriangleMesh2d;
use isodist::quadrature::quadrilateral_gauss;
use nalgebra::{DMatrix, DVector, Point2};
use util::assert_approx_matrix_eq;

#[test]
fn dofs_are_numbered_node_by_node() {
    let (mesh, boundary_info) = build_unit_square::<f64, Quad4d2Connectivity>(2).unwrap();
    let mut dof_map = DofMap::<f64>::new();
    assert_eq!(dof_map.add_variable("u", FeType::default()), 0);
    assert_eq!(dof_map.add_variable("v", FeType::default()), 1);
    dof_map.init(&mesh, &boundary_info).unwrap();

    assert_eq!(dof_map.n_dofs(), 18);
    assert_eq!(dof_map.dof_index(4, 1), 9);
    assert_eq!(dof_map.variable_number("v"), Some(1));
    assert_eq!(dof_map.variable_number("w"), None);

    let mut dofs = Vec::new();
    dof_map.dof_indices(mesh.connectivity()[0].vertex_indices(), &mut dofs);
    // Quad [0, 1, 4, 3], first all DOFs of u, then all DOFs of v
    assert_eq!(dofs, vec![0, 2, 8, 6, 1, 3, 9, 7]);

    dof_map.variable_dof_indices(mesh.connectivity()[0].vertex_indices(), 1, &mut dofs);
    assert_eq!(dofs, vec![1, 3, 9, 7]);
}

#[test]
fn init_constrains_nodes_on_dirichlet_boundaries() {
    let (mesh, _, dof_map) = unit_square_distance_problem::<Tri3d2Connectivity>(4);

    assert!(dof_map.is_initialized());
    assert_eq!(dof_map.n_dofs(), 25);
    assert_eq!(dof_map.n_constrained_dofs(), 5);
    for (i, v) in mesh.vertices().iter().enumerate() {
        assert_eq!(dof_map.is_constrained_dof(i), v.x == 0.0);
        if v.x == 0.0 {
            assert_eq!(dof_map.constraint_value(i), Some(0.0));
        } else {
            assert_eq!(dof_map.constraint_value(i), None);
        }
    }
    assert_eq!(dof_map.constraint_value(100), None);
}

#[test]
fn heterogeneous_constraints_evaluate_boundary_function() {
    let (mesh, boundary_info) = build_unit_square::<f64, Quad4d2Connectivity>(2).unwrap();
    let mut dof_map = DofMap::new();
    let u = dof_map.add_variable("u", FeType::default());
    dof_map.add_dirichlet_boundary(DirichletBoundary::new(vec![BOTTOM, RIGHT], vec![u], |p| p.x + 2.0 * p.y));
    dof_map.init(&mesh, &boundary_info).unwrap();

    // Bottom: nodes 0, 1, 2. Right: nodes 2, 5, 8
    assert_eq!(dof_map.n_constrained_dofs(), 5);
    assert_eq!(dof_map.constraint_value(1), Some(0.5));
    assert_eq!(dof_map.constraint_value(5), Some(2.0));
    assert_eq!(dof_map.constraint_value(8), Some(3.0));
    assert_eq!(dof_map.constraint_value(4), None);

    let mut solution = DVector::repeat(9, -1.0);
    dof_map.enforce_constraints_exactly(&mut solution);
    assert_eq!(
        solution,
        DVector::from_column_slice(&[0.0, 0.5, 1.0, -1.0, -1.0, 2.0, -1.0, -1.0, 3.0])
    );
}

#[test]
fn init_rejects_invalid_setup() {
    let (mesh, boundary_info) = build_unit_square::<f64, Quad4d2Connectivity>(1).unwrap();

    let mut dof_map = DofMap::<f64>::new();
    dof_map.add_variable("u", FeType::default());
    dof_map.add_dirichlet_boundary(DirichletBoundary::homogeneous(vec![LEFT], vec![1]));
    assert!(dof_map.init(&mesh, &boundary_info).is_err());
    assert!(!dof_map.is_initialized());

    let mut dof_map = DofMap::<f64>::new();
    dof_map.add_variable("u", FeType::lagrange(FeOrder::Second));
    let err = dof_map.init(&mesh, &boundary_info).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AssemblyError>(),
        Some(AssemblyError::MissingBasis { .. })
    ));
}

#[test]
fn init_rejects_connectivity_referencing_missing_vertices() {
    let vertices = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
    let mesh = TriangleMesh2d::from_vertices_and_connectivity(vertices, vec![Tri3d2Connectivity([0, 1, 7])]);
    let mut boundary_info = BoundaryInfo::new();
    boundary_info.add_side(0, 1, LEFT);

    let mut dof_map = DofMap::<f64>::new();
    dof_map.add_variable("u", FeType::default());
    dof_map.add_dirichlet_boundary(DirichletBoundary::homogeneous(vec![LEFT], vec![0]));
    let err = dof_map.init(&mesh, &boundary_info).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AssemblyError>(),
        Some(AssemblyError::InvalidConnectivity { element: 0 })
    ));
    assert!(!dof_map.is_initialized());
}

#[test]
fn adding_variables_invalidates_initialization() {
    let (_, _, mut dof_map) = unit_square_distance_problem::<Quad4d2Connectivity>(1);
    assert!(dof_map.is_initialized());
    dof_map.add_variable("w", FeType::default());
    assert!(!dof_map.is_initialized());
}

/// Single unit square element with the left side constrained to `g`.
fn single_quad_with_left_constraint(g: f64) -> (DofMap<f64>, Vec<usize>, DMatrix<f64>) {
    let (mesh, boundary_info) = build_unit_square::<f64, Quad4d2Connectivity>(1).unwrap();
    let mut dof_map = DofMap::new();
    let u = dof_map.add_variable("u", FeType::default());
    dof_map.add_dirichlet_boundary(DirichletBoundary::new(vec![LEFT], vec![u], move |_| g));
    dof_map.init(&mesh, &boundary_info).unwrap();

    let mut dofs = Vec::new();
    dof_map.dof_indices(mesh.connectivity()[0].vertex_indices(), &mut dofs);
    let element = mesh.get_element(0).unwrap();
    let stiffness = element_stiffness_matrix(&element, &quadrilateral_gauss(2), StiffnessUpdate::Accumulate).unwrap();
    (dof_map, dofs, stiffness)
}

#[test]
fn constrained_element_system_eliminates_constrained_dofs() {
    let g = 3.0;
    let (dof_map, dofs, stiffness) = single_quad_with_left_constraint(g);
    // Vertices 0 and 2 are on the left side, at local indices 0 and 3
    assert_eq!(dofs, vec![0, 1, 3, 2]);
    let constrained = [true, false, false, true];

    let load = DVector::from_column_slice(&[0.25, 0.25, 0.25, 0.25]);
    let mut matrix = stiffness.clone();
    let mut vector = load.clone();
    dof_map
        .heterogeneously_constrain_element_matrix_and_vector(0, (&mut matrix).into(), (&mut vector).into(), &dofs)
        .unwrap();

    for i in 0..4 {
        if constrained[i] {
            assert_eq!(vector[i], g);
            for j in 0..4 {
                assert_eq!(matrix[(i, j)], if i == j { 1.0 } else { 0.0 });
            }
        } else {
            let expected_rhs = load[i] - g * (stiffness[(i, 0)] + stiffness[(i, 3)]);
            assert!((vector[i] - expected_rhs).abs() < 1e-14);
            for j in 0..4 {
                let expected = if constrained[j] { 0.0 } else { stiffness[(i, j)] };
                assert_eq!(matrix[(i, j)], expected);
            }
        }
    }

    // The result stays symmetric
    assert_approx_matrix_eq!(&matrix, matrix.transpose(), abstol = 1e-14);
}

#[test]
fn constrained_element_system_reproduces_constant_solution() {
    // Without a source, the constant boundary value extends to the whole element
    let g = -1.5;
    let (dof_map, dofs, mut matrix) = single_quad_with_left_constraint(g);
    let mut vector = DVector::zeros(4);
    dof_map
        .heterogeneously_constrain_element_matrix_and_vector(0, (&mut matrix).into(), (&mut vector).into(), &dofs)
        .unwrap();

    let solution = matrix.lu().solve(&vector).unwrap();
    assert_approx_matrix_eq!(&solution, DVector::repeat(4, g), abstol = 1e-12);
}

#[test]
fn constraining_mismatched_element_system_fails() {
    let (dof_map, dofs, mut matrix) = single_quad_with_left_constraint(0.0);
    let mut vector = DVector::zeros(3);
    let result =
        dof_map.heterogeneously_constrain_element_matrix_and_vector(7, (&mut matrix).into(), (&mut vector).into(), &dofs);
    assert_eq!(
        result,
        Err(AssemblyError::InconsistentSizing {
            element: 7,
            expected: 4,
            actual: 3
        })
    );
}

#[test]
fn dof_map_info_display() {
    let (_, _, dof_map) = unit_square_distance_problem::<Quad4d2Connectivity>(2);
    let expected = concat!(
        "  DofMap:\n",
        "   n_dofs()=9\n",
        "   n_variables()=1\n",
        "   n_constrained_dofs()=3\n",
        "   n_dirichlet_boundaries()=1\n",
    );
    assert_eq!(dof_map.info().to_string(), expected);
}
