//! Named linear systems on a shared mesh.
use crate::assembly::global::{allocate_system, AssemblyStrategy};
use crate::assembly::local::{DistanceAssembler, MeshDofConnectivity, StiffnessUpdate, DEFAULT_QUADRATURE_STRENGTH};
use crate::dof_map::{DirichletBoundary, DofMap};
use crate::element::{ElementConnectivity, FeType};
use crate::mesh::boundary::BoundaryInfo;
use crate::mesh::Mesh;
use crate::nalgebra::{DVector, Scalar};
use crate::nalgebra_sparse::CsrMatrix;
use crate::Real;
use isodist_sparse::cg::{CgOutput, ConjugateGradient, RelativeResidualCriterion};
use isodist_sparse::JacobiPreconditioner;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemError {
    UnknownSystem { name: String },
    DuplicateSystem { name: String },
    NotInitialized { name: String },
    NoAssembler { name: String },
}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSystem { name } => write!(f, "no system named \"{}\"", name),
            Self::DuplicateSystem { name } => write!(f, "a system named \"{}\" already exists", name),
            Self::NotInitialized { name } => write!(f, "system \"{}\" has not been initialized", name),
            Self::NoAssembler { name } => write!(f, "no assembler attached to system \"{}\"", name),
        }
    }
}

impl Error for SystemError {}

/// Everything an assembler needs to fill in the global system.
///
/// The matrix carries the sparsity pattern of the system and, like the right-hand side, is
/// zeroed before the assembler is invoked.
#[derive(Debug)]
pub struct AssemblyContext<'a, T: Scalar, C> {
    pub system_name: &'a str,
    pub mesh: &'a Mesh<T, C>,
    pub dof_map: &'a DofMap<T>,
    pub matrix: &'a mut CsrMatrix<T>,
    pub rhs: &'a mut DVector<T>,
}

/// Assembles the matrix and right-hand side of a system.
pub trait SystemAssembler<T: Scalar, C>: Send + Sync {
    fn assemble(&self, context: AssemblyContext<'_, T, C>) -> eyre::Result<()>;
}

impl<T, C, F> SystemAssembler<T, C> for F
where
    T: Scalar,
    F: Send + Sync + Fn(AssemblyContext<'_, T, C>) -> eyre::Result<()>,
{
    fn assemble(&self, context: AssemblyContext<'_, T, C>) -> eyre::Result<()> {
        self(context)
    }
}

/// Attaches a [`DistanceAssembler`] to a system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceSystemAssembler {
    pub quadrature_strength: usize,
    pub stiffness_update: StiffnessUpdate,
    pub strategy: AssemblyStrategy,
}

impl Default for DistanceSystemAssembler {
    fn default() -> Self {
        Self {
            quadrature_strength: DEFAULT_QUADRATURE_STRENGTH,
            stiffness_update: StiffnessUpdate::default(),
            strategy: AssemblyStrategy::default(),
        }
    }
}

impl<T, C> SystemAssembler<T, C> for DistanceSystemAssembler
where
    T: Real,
    C: ElementConnectivity<T> + Sync,
{
    fn assemble(&self, context: AssemblyContext<'_, T, C>) -> eyre::Result<()> {
        DistanceAssembler::new(context.mesh, context.dof_map)?
            .with_quadrature_strength(self.quadrature_strength)?
            .with_stiffness_update(self.stiffness_update)
            .assemble_system(context.system_name, context.matrix, context.rhs, self.strategy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings<T> {
    /// Relative residual tolerance of the conjugate gradient solver.
    pub tolerance: T,
    pub max_iterations: Option<usize>,
}

impl<T: Real> Default for SolverSettings<T> {
    fn default() -> Self {
        Self {
            tolerance: T::from_f64(1e-10).expect("Literal must fit in T"),
            max_iterations: None,
        }
    }
}

/// A linear system `K u = F` with its variables, DOF map and attached assembler.
pub struct LinearSystem<T: Scalar, C> {
    name: String,
    dof_map: DofMap<T>,
    assembler: Option<Box<dyn SystemAssembler<T, C>>>,
    solver_settings: SolverSettings<T>,
    matrix: Option<CsrMatrix<T>>,
    rhs: DVector<T>,
    solution: DVector<T>,
    last_solve: Option<CgOutput<T>>,
}

impl<T: Scalar, C> fmt::Debug for LinearSystem<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearSystem")
            .field("name", &self.name)
            .field("dof_map", &self.dof_map)
            .field("has_assembler", &self.assembler.is_some())
            .field("initialized", &self.matrix.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Real, C> LinearSystem<T, C> {
    fn new(name: String) -> Self {
        Self {
            name,
            dof_map: DofMap::new(),
            assembler: None,
            solver_settings: SolverSettings::default(),
            matrix: None,
            rhs: DVector::zeros(0),
            solution: DVector::zeros(0),
            last_solve: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a variable and returns its index.
    ///
    /// Invalidates a previous initialization.
    pub fn add_variable(&mut self, name: impl Into<String>, fe_type: FeType) -> usize {
        self.matrix = None;
        self.dof_map.add_variable(name, fe_type)
    }

    /// Invalidates a previous initialization.
    pub fn add_dirichlet_boundary(&mut self, boundary: DirichletBoundary<T>) {
        self.matrix = None;
        self.dof_map.add_dirichlet_boundary(boundary);
    }

    pub fn dof_map(&self) -> &DofMap<T> {
        &self.dof_map
    }

    pub fn attach_assembler(&mut self, assembler: impl SystemAssembler<T, C> + 'static) {
        self.assembler = Some(Box::new(assembler));
    }

    pub fn solver_settings(&self) -> &SolverSettings<T> {
        &self.solver_settings
    }

    pub fn set_solver_settings(&mut self, settings: SolverSettings<T>) {
        self.solver_settings = settings;
    }

    pub fn is_initialized(&self) -> bool {
        self.matrix.is_some()
    }

    pub fn n_dofs(&self) -> usize {
        self.dof_map.n_dofs()
    }

    /// The system matrix, available after initialization.
    pub fn matrix(&self) -> Option<&CsrMatrix<T>> {
        self.matrix.as_ref()
    }

    pub fn rhs(&self) -> &DVector<T> {
        &self.rhs
    }

    pub fn solution(&self) -> &DVector<T> {
        &self.solution
    }

    /// Statistics of the most recent successful solve.
    pub fn last_solve(&self) -> Option<&CgOutput<T>> {
        self.last_solve.as_ref()
    }
}

/// A collection of named linear systems sharing a mesh and its boundary information.
#[derive(Debug)]
pub struct EquationSystems<T: Scalar, C> {
    mesh: Mesh<T, C>,
    boundary_info: BoundaryInfo,
    systems: Vec<LinearSystem<T, C>>,
}

impl<T, C> EquationSystems<T, C>
where
    T: Real,
    C: ElementConnectivity<T>,
{
    pub fn new(mesh: Mesh<T, C>, boundary_info: BoundaryInfo) -> Self {
        Self {
            mesh,
            boundary_info,
            systems: Vec::new(),
        }
    }

    pub fn mesh(&self) -> &Mesh<T, C> {
        &self.mesh
    }

    pub fn boundary_info(&self) -> &BoundaryInfo {
        &self.boundary_info
    }

    pub fn n_systems(&self) -> usize {
        self.systems.len()
    }

    pub fn add_system(&mut self, name: impl Into<String>) -> Result<&mut LinearSystem<T, C>, SystemError> {
        let name = name.into();
        if self.systems.iter().any(|system| system.name == name) {
            return Err(SystemError::DuplicateSystem { name });
        }
        self.systems.push(LinearSystem::new(name));
        let idx = self.systems.len() - 1;
        Ok(&mut self.systems[idx])
    }

    pub fn system(&self, name: &str) -> Result<&LinearSystem<T, C>, SystemError> {
        self.systems
            .iter()
            .find(|system| system.name == name)
            .ok_or_else(|| SystemError::UnknownSystem { name: name.to_string() })
    }

    pub fn system_mut(&mut self, name: &str) -> Result<&mut LinearSystem<T, C>, SystemError> {
        self.systems
            .iter_mut()
            .find(|system| system.name == name)
            .ok_or_else(|| SystemError::UnknownSystem { name: name.to_string() })
    }

    /// Distributes DOFs, evaluates constraints and allocates the matrix and vectors of every
    /// system.
    pub fn init(&mut self) -> eyre::Result<()> {
        for system in &mut self.systems {
            system.dof_map.init(&self.mesh, &self.boundary_info)?;
            let connectivity = MeshDofConnectivity::new(&self.mesh, &system.dof_map);
            let (matrix, rhs) = allocate_system(&connectivity)?;
            info!(
                "Initialized system \"{}\": {} DOFs, {} matrix entries",
                system.name,
                system.n_dofs(),
                matrix.nnz()
            );
            system.solution = DVector::zeros(rhs.len());
            system.rhs = rhs;
            system.matrix = Some(matrix);
            system.last_solve = None;
        }
        Ok(())
    }

    /// Assembles and solves the named system.
    ///
    /// The matrix and right-hand side are zeroed and filled by the attached assembler. The
    /// system is then solved by Jacobi-preconditioned conjugate gradients, starting from the
    /// previous solution. Finally the constrained DOFs are set to their exact values.
    pub fn solve(&mut self, name: &str) -> eyre::Result<CgOutput<T>> {
        let mesh = &self.mesh;
        let system = self
            .systems
            .iter_mut()
            .find(|system| system.name == name)
            .ok_or_else(|| SystemError::UnknownSystem { name: name.to_string() })?;

        let assembler = system
            .assembler
            .as_deref()
            .ok_or_else(|| SystemError::NoAssembler { name: name.to_string() })?;
        let matrix = system
            .matrix
            .as_mut()
            .ok_or_else(|| SystemError::NotInitialized { name: name.to_string() })?;

        matrix.values_mut().fill(T::zero());
        system.rhs.fill(T::zero());
        assembler.assemble(AssemblyContext {
            system_name: &system.name,
            mesh,
            dof_map: &system.dof_map,
            matrix: &mut *matrix,
            rhs: &mut system.rhs,
        })?;

        let preconditioner = JacobiPreconditioner::from_csr(matrix);
        let output = ConjugateGradient::new(RelativeResidualCriterion::new(system.solver_settings.tolerance))
            .with_max_iter(system.solver_settings.max_iterations)
            .solve_with_guess(&*matrix, &preconditioner, &system.rhs, &mut system.solution)?;
        system.dof_map.enforce_constraints_exactly(&mut system.solution);

        info!(
            "Solved system \"{}\" in {} CG iterations (residual norm {})",
            name, output.num_iterations, output.residual_norm
        );
        system.last_solve = Some(output.clone());
        Ok(output)
    }

    pub fn info(&self) -> EquationSystemsInfo {
        EquationSystemsInfo {
            systems: self
                .systems
                .iter()
                .map(|system| SystemInfo {
                    name: system.name.clone(),
                    variables: system
                        .dof_map
                        .variables()
                        .iter()
                        .map(|var| (var.name.clone(), var.fe_type))
                        .collect(),
                    n_dofs: system.n_dofs(),
                    n_constrained_dofs: system.dof_map.n_constrained_dofs(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub name: String,
    pub variables: Vec<(String, FeType)>,
    pub n_dofs: usize,
    pub n_constrained_dofs: usize,
}

/// A printable summary of equation systems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquationSystemsInfo {
    pub systems: Vec<SystemInfo>,
}

impl fmt::Display for EquationSystemsInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " EquationSystems")?;
        writeln!(f, "  n_systems()={}", self.systems.len())?;
        for system in &self.systems {
            writeln!(f, "   System #\"{}\"", system.name)?;
            let names: Vec<_> = system.variables.iter().map(|(name, _)| format!("\"{}\"", name)).collect();
            writeln!(f, "    Variables={{ {} }}", names.join(" "))?;
            for (name, fe_type) in &system.variables {
                writeln!(f, "    Finite Element Type(\"{}\")=\"{}\"", name, fe_type)?;
            }
            writeln!(f, "    n_dofs()={}", system.n_dofs)?;
            writeln!(f, "    n_constrained_dofs()={}", system.n_constrained_dofs)?;
        }
        Ok(())
    }
}
