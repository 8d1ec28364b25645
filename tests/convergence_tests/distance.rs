//! Convergence of the distance solve `-Δd = 1` on the unit square with `d = 0` on the left side.
//!
//! The exact solution is `d(x, y) = x - x^2 / 2`.
use isodist::assembly::local::DISTANCE_SYSTEM_NAME;
use isodist::connectivity::{Quad4d2Connectivity, Tri3d2Connectivity};
use isodist::element::{ElementConnectivity, FeType};
use isodist::error::{estimate_H1_seminorm_error, estimate_L2_error};
use isodist::io::vtk::{FiniteElementMeshDataSetBuilder, VtkCellConnectivity};
use isodist::mesh::procedural::{build_unit_square, GridCellConnectivity, LEFT};
use isodist::dof_map::DirichletBoundary;
use isodist::quadrature::element_quadrature;
use isodist::system::{DistanceSystemAssembler, EquationSystems, SolverSettings};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

fn d_exact(p: &Point2<f64>) -> f64 {
    p.x - 0.5 * p.x * p.x
}

fn d_exact_grad(p: &Point2<f64>) -> Vector2<f64> {
    Vector2::new(1.0 - p.x, 0.0)
}

/// For serializing to JSON for subsequent analysis/plots
#[derive(Debug, Default, Serialize, Deserialize)]
#[allow(non_snake_case)]
struct ErrorSummary {
    element_name: String,
    L2_errors: Vec<f64>,
    H1_seminorm_errors: Vec<f64>,
    max_nodal_errors: Vec<f64>,
    /// Cell size `h` of each mesh.
    resolutions: Vec<f64>,
}

fn export_summary(summary: &ErrorSummary) {
    let dir = Path::new("data/convergence_tests/distance");
    std::fs::create_dir_all(dir).expect("Failed to create output directory");
    let file = File::create(dir.join(format!("{}_summary.json", summary.element_name)))
        .expect("Failed to create summary file");
    serde_json::to_writer_pretty(file, summary).expect("Failed to write summary");
}

fn solve_distance_problems<C>(element_name: &str, resolutions: &[usize]) -> ErrorSummary
where
    C: ElementConnectivity<f64> + GridCellConnectivity + VtkCellConnectivity + Sync + 'static,
{
    let mut summary = ErrorSummary {
        element_name: element_name.to_string(),
        ..ErrorSummary::default()
    };

    for &cells_per_dim in resolutions {
        let (mesh, boundary_info) = build_unit_square::<f64, C>(cells_per_dim).unwrap();
        let mut equation_systems = EquationSystems::new(mesh, boundary_info);
        let system = equation_systems.add_system(DISTANCE_SYSTEM_NAME).unwrap();
        let d = system.add_variable("d", FeType::default());
        system.add_dirichlet_boundary(DirichletBoundary::homogeneous(vec![LEFT], vec![d]));
        system.attach_assembler(DistanceSystemAssembler::default());
        system.set_solver_settings(SolverSettings {
            tolerance: 1e-13,
            max_iterations: None,
        });
        equation_systems.init().unwrap();
        equation_systems.solve(DISTANCE_SYSTEM_NAME).unwrap();

        let mesh = equation_systems.mesh();
        let system = equation_systems.system(DISTANCE_SYSTEM_NAME).unwrap();
        let solution = system.solution();
        let quadrature = element_quadrature(C::SHAPE, 6).unwrap();
        let l2 = estimate_L2_error(mesh, system.dof_map(), d, d_exact, solution, &quadrature).unwrap();
        let h1 =
            estimate_H1_seminorm_error(mesh, system.dof_map(), d, d_exact_grad, solution, &quadrature).unwrap();
        let max_nodal = mesh
            .vertices()
            .iter()
            .zip(solution.iter())
            .map(|(p, &d_h)| (d_h - d_exact(p)).abs())
            .fold(0.0, f64::max);

        summary.L2_errors.push(l2);
        summary.H1_seminorm_errors.push(h1);
        summary.max_nodal_errors.push(max_nodal);
        summary.resolutions.push(1.0 / cells_per_dim as f64);

        let output_path = format!("data/convergence_tests/distance/{}_{}.vtu", element_name, cells_per_dim);
        FiniteElementMeshDataSetBuilder::from_mesh(mesh)
            .with_point_scalar_attributes("d", solution.as_slice())
            .try_export(output_path)
            .unwrap();
    }

    export_summary(&summary);
    summary
}

/// Asserts that each error is at least `min_factor` times smaller than the previous one.
fn assert_errors_decrease(errors: &[f64], min_factor: f64) {
    for pair in errors.windows(2) {
        assert!(
            pair[0] / pair[1] > min_factor,
            "Error decreased from {:e} to {:e}, expected at least a factor {}",
            pair[0],
            pair[1],
            min_factor
        );
    }
}

#[test]
fn distance_quad4_converges_and_is_nodally_exact() {
    let summary = solve_distance_problems::<Quad4d2Connectivity>("quad4", &[2, 4, 8, 16]);

    // The discrete solution of a 1D problem on a tensor grid interpolates the exact one
    for &nodal_error in &summary.max_nodal_errors {
        assert!(nodal_error < 1e-8, "max nodal error {:e}", nodal_error);
    }
    // Halving h reduces the L2 error by about 4 and the H1 seminorm error by about 2
    assert_errors_decrease(&summary.L2_errors, 3.5);
    assert_errors_decrease(&summary.H1_seminorm_errors, 1.8);
}

#[test]
fn distance_tri3_converges() {
    let summary = solve_distance_problems::<Tri3d2Connectivity>("tri3", &[2, 4, 8, 16]);
    assert_errors_decrease(&summary.L2_errors, 3.0);
    assert_errors_decrease(&summary.H1_seminorm_errors, 1.8);
    assert!(summary.H1_seminorm_errors.last().unwrap() < &0.05);
}
