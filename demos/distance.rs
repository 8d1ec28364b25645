use eyre::eyre;
use isodist::assembly::local::DISTANCE_SYSTEM_NAME;
use isodist::config::DistanceProblemConfig;
use isodist::connectivity::{Quad4d2Connectivity, Tri3d2Connectivity};
use isodist::dof_map::DirichletBoundary;
use isodist::element::{ElementConnectivity, ElementShape, FeOrder, FeType};
use isodist::io::vtk::{FiniteElementMeshDataSetBuilder, IsolineDataSetBuilder, VtkCellConnectivity};
use isodist::isolines::{evenly_spaced_isovalues, IsolineInput};
use isodist::mesh::procedural::{build_unit_square, GridCellConnectivity};
use isodist::system::EquationSystems;
use log::info;
use std::env;

fn main() -> eyre::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("ISODIST_LOG", "info")).init();

    let config = match env::args().nth(1) {
        Some(path) => DistanceProblemConfig::from_json_file(path)?,
        None => DistanceProblemConfig::default(),
    };
    info!("Configuration: {:?}", config);

    match config.element {
        ElementShape::Quad4 => run::<Quad4d2Connectivity>(&config),
        ElementShape::Tri3 => run::<Tri3d2Connectivity>(&config),
    }
}

fn run<C>(config: &DistanceProblemConfig) -> eyre::Result<()>
where
    C: ElementConnectivity<f64> + GridCellConnectivity + VtkCellConnectivity + Send + Sync + 'static,
{
    let (mesh, boundary_info) = build_unit_square::<f64, C>(config.cells_per_dim)?;
    println!("{}", mesh.info());
    println!("{}", boundary_info.info());

    let mut systems = EquationSystems::new(mesh, boundary_info);
    let system = systems.add_system(DISTANCE_SYSTEM_NAME)?;
    let d = system.add_variable("d", FeType::lagrange(FeOrder::First));
    system.add_dirichlet_boundary(DirichletBoundary::homogeneous(
        config.dirichlet_boundary_ids.clone(),
        vec![d],
    ));
    system.attach_assembler(config.system_assembler());
    system.set_solver_settings(config.solver_settings()?);

    systems.init()?;
    println!("{}", systems.info());

    let output = systems.solve(DISTANCE_SYSTEM_NAME)?;
    println!(
        "Converged in {} iterations, residual norm {:e}",
        output.num_iterations, output.residual_norm
    );

    let system = systems.system(DISTANCE_SYSTEM_NAME)?;
    FiniteElementMeshDataSetBuilder::from_mesh(systems.mesh())
        .with_title("Distance")
        .with_point_scalar_attributes("d", system.solution().as_slice())
        .try_export(&config.output)?;
    info!("Wrote {}", config.output.display());

    let input = IsolineInput::from_solution(systems.mesh(), system.dof_map(), d, system.solution())?;
    let (min, max) = input
        .value_range()
        .ok_or_else(|| eyre!("cannot extract isolines from an empty mesh"))?;
    let isolines = input.extract(&evenly_spaced_isovalues(min, max, config.isolines));
    let polylines = isolines.polylines();
    println!(
        "Extracted {} isoline segments in {} polylines for {} isovalues in [{}, {}]",
        isolines.num_segments(),
        polylines.len(),
        isolines.isovalues().len(),
        min,
        max
    );

    let isoline_output = config.isoline_output();
    IsolineDataSetBuilder::from_isolines(&isolines)
        .with_title("Distance isolines")
        .try_export(&isoline_output)?;
    info!("Wrote {}", isoline_output.display());

    Ok(())
}
