//! Numbering of degrees of freedom and Dirichlet constraints.
use crate::assembly::AssemblyError;
use crate::element::{ElementConnectivity, FeType};
use crate::mesh::boundary::{BoundaryId, BoundaryInfo};
use crate::mesh::Mesh;
use crate::nalgebra::{DMatrixViewMut, DVector, DVectorViewMut, Point2, Scalar};
use crate::Real;
use eyre::eyre;
use log::debug;
use std::fmt;
use std::sync::Arc;

/// Function prescribing the value of a constrained DOF at a vertex.
pub type BoundaryFunction<T> = Arc<dyn Fn(&Point2<T>) -> T + Send + Sync>;

/// A Dirichlet condition imposing `u_var(x) = function(x)` on all sides carrying one of
/// `boundary_ids`, for each variable in `variables`.
#[derive(Clone)]
pub struct DirichletBoundary<T: Scalar> {
    pub boundary_ids: Vec<BoundaryId>,
    pub variables: Vec<usize>,
    pub function: BoundaryFunction<T>,
}

impl<T: Scalar> DirichletBoundary<T> {
    pub fn new(
        boundary_ids: Vec<BoundaryId>,
        variables: Vec<usize>,
        function: impl Fn(&Point2<T>) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            boundary_ids,
            variables,
            function: Arc::new(function),
        }
    }
}

impl<T: Real> DirichletBoundary<T> {
    /// A condition prescribing zero.
    pub fn homogeneous(boundary_ids: Vec<BoundaryId>, variables: Vec<usize>) -> Self {
        Self::new(boundary_ids, variables, |_| T::zero())
    }
}

impl<T: Scalar> fmt::Debug for DirichletBoundary<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirichletBoundary")
            .field("boundary_ids", &self.boundary_ids)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub fe_type: FeType,
}

/// Maps mesh nodes and variables to global DOF indices and stores Dirichlet constraints.
///
/// DOFs are numbered node by node: the DOF of variable `v` at node `i` is `i * n_vars + v`.
/// Element DOFs are listed variable by variable, each in the local node order of the element.
#[derive(Debug, Clone)]
pub struct DofMap<T: Scalar> {
    variables: Vec<Variable>,
    dirichlet_boundaries: Vec<DirichletBoundary<T>>,
    num_nodes: usize,
    constraint_values: Vec<Option<T>>,
    initialized: bool,
}

impl<T: Scalar> Default for DofMap<T> {
    fn default() -> Self {
        Self {
            variables: Vec::new(),
            dirichlet_boundaries: Vec::new(),
            num_nodes: 0,
            constraint_values: Vec::new(),
            initialized: false,
        }
    }
}

impl<T: Scalar> DofMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable and returns its index.
    pub fn add_variable(&mut self, name: impl Into<String>, fe_type: FeType) -> usize {
        self.variables.push(Variable {
            name: name.into(),
            fe_type,
        });
        self.initialized = false;
        self.variables.len() - 1
    }

    pub fn add_dirichlet_boundary(&mut self, boundary: DirichletBoundary<T>) {
        self.dirichlet_boundaries.push(boundary);
        self.initialized = false;
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn n_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn variable_number(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|var| var.name == name)
    }

    pub fn dirichlet_boundaries(&self) -> &[DirichletBoundary<T>] {
        &self.dirichlet_boundaries
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn n_dofs(&self) -> usize {
        self.num_nodes * self.n_variables()
    }

    pub fn dof_index(&self, node: usize, variable: usize) -> usize {
        node * self.n_variables() + variable
    }

    /// Replaces the contents of `dofs` with the DOFs of all variables on the given element
    /// nodes.
    pub fn dof_indices(&self, element_nodes: &[usize], dofs: &mut Vec<usize>) {
        dofs.clear();
        for variable in 0..self.n_variables() {
            dofs.extend(element_nodes.iter().map(|&node| self.dof_index(node, variable)));
        }
    }

    /// Replaces the contents of `dofs` with the DOFs of a single variable on the given element
    /// nodes.
    pub fn variable_dof_indices(&self, element_nodes: &[usize], variable: usize, dofs: &mut Vec<usize>) {
        dofs.clear();
        dofs.extend(element_nodes.iter().map(|&node| self.dof_index(node, variable)));
    }

    pub fn constraint_value(&self, dof: usize) -> Option<T> {
        self.constraint_values.get(dof).cloned().flatten()
    }

    pub fn is_constrained_dof(&self, dof: usize) -> bool {
        matches!(self.constraint_values.get(dof), Some(Some(_)))
    }

    pub fn n_constrained_dofs(&self) -> usize {
        self.constraint_values.iter().filter(|value| value.is_some()).count()
    }

    /// Overwrites the constrained entries of `solution` with their prescribed values.
    pub fn enforce_constraints_exactly(&self, solution: &mut DVector<T>) {
        for (dof, value) in self.constraint_values.iter().enumerate() {
            if let (Some(value), Some(entry)) = (value, solution.get_mut(dof)) {
                *entry = value.clone();
            }
        }
    }

    pub fn info(&self) -> DofMapInfo {
        DofMapInfo {
            n_dofs: self.n_dofs(),
            n_variables: self.n_variables(),
            n_constrained_dofs: self.n_constrained_dofs(),
            n_dirichlet_boundaries: self.dirichlet_boundaries.len(),
        }
    }
}

impl<T: Real> DofMap<T> {
    /// Numbers the DOFs of the mesh and evaluates the Dirichlet constraints.
    ///
    /// Fails if a variable has no basis on the elements of the mesh, if an active element
    /// references vertices out of bounds, or if a Dirichlet boundary refers to a variable that
    /// does not exist.
    pub fn init<C>(&mut self, mesh: &Mesh<T, C>, boundary_info: &BoundaryInfo) -> eyre::Result<()>
    where
        C: ElementConnectivity<T>,
    {
        for var in &self.variables {
            if !C::SHAPE.supports(&var.fe_type) {
                return Err(AssemblyError::MissingBasis {
                    element: C::SHAPE,
                    fe_type: var.fe_type,
                }
                .into());
            }
        }

        for element in mesh.active_element_indices() {
            let nodes = mesh.connectivity()[element].vertex_indices();
            if nodes.iter().any(|&node| node >= mesh.num_vertices()) {
                return Err(AssemblyError::InvalidConnectivity { element }.into());
            }
        }

        self.num_nodes = mesh.num_vertices();
        let mut constraint_values = vec![None; self.n_dofs()];
        for boundary in &self.dirichlet_boundaries {
            if let Some(&var) = boundary.variables.iter().find(|&&var| var >= self.n_variables()) {
                return Err(eyre!(
                    "Dirichlet boundary on ids {:?} refers to unknown variable {}",
                    boundary.boundary_ids,
                    var
                ));
            }

            for node in boundary_info.boundary_nodes(mesh, &boundary.boundary_ids) {
                let vertex = mesh
                    .vertices()
                    .get(node)
                    .ok_or_else(|| eyre!("boundary node {} is not a vertex of the mesh", node))?;
                let value = (boundary.function)(vertex);
                for &var in &boundary.variables {
                    constraint_values[self.dof_index(node, var)] = Some(value);
                }
            }
        }
        self.constraint_values = constraint_values;
        self.initialized = true;

        debug!(
            "Initialized DOF map with {} DOFs, {} of them constrained",
            self.n_dofs(),
            self.n_constrained_dofs()
        );
        Ok(())
    }

    /// Eliminates the constrained DOFs from a local element system.
    ///
    /// For a constrained DOF `c` with value `g`, every unconstrained row `i` gets
    /// `F[i] -= K[i][c] * g` and `K[i][c] = 0`. Row `c` becomes the identity row with
    /// `F[c] = g`. The sum of the modified element systems keeps the constrained DOFs at their
    /// prescribed values and preserves symmetry.
    pub fn heterogeneously_constrain_element_matrix_and_vector(
        &self,
        element: usize,
        mut matrix: DMatrixViewMut<T>,
        mut vector: DVectorViewMut<T>,
        dofs: &[usize],
    ) -> Result<(), AssemblyError> {
        let n = dofs.len();
        for actual in [matrix.nrows(), matrix.ncols(), vector.len()] {
            if actual != n {
                return Err(AssemblyError::InconsistentSizing {
                    element,
                    expected: n,
                    actual,
                });
            }
        }

        for (c, &dof_c) in dofs.iter().enumerate() {
            let Some(g) = self.constraint_value(dof_c) else {
                continue;
            };

            for (i, &dof_i) in dofs.iter().enumerate() {
                if !self.is_constrained_dof(dof_i) {
                    let k_ic = matrix[(i, c)];
                    vector[i] -= k_ic * g;
                }
                matrix[(i, c)] = T::zero();
            }

            matrix.row_mut(c).fill(T::zero());
            matrix[(c, c)] = T::one();
            vector[c] = g;
        }

        Ok(())
    }
}

/// A printable summary of a DOF map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DofMapInfo {
    pub n_dofs: usize,
    pub n_variables: usize,
    pub n_constrained_dofs: usize,
    pub n_dirichlet_boundaries: usize,
}

impl fmt::Display for DofMapInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  DofMap:")?;
        writeln!(f, "   n_dofs()={}", self.n_dofs)?;
        writeln!(f, "   n_variables()={}", self.n_variables)?;
        writeln!(f, "   n_constrained_dofs()={}", self.n_constrained_dofs)?;
        writeln!(f, "   n_dirichlet_boundaries()={}", self.n_dirichlet_boundaries)
    }
}
