use crate::assembly::buffers::ElementValues;
use crate::assembly::global::{color_elements, AssemblyStrategy, CsrAssembler, CsrParAssembler};
use crate::assembly::{check_system_name, AssemblyError};
use crate::connectivity::Connectivity;
use crate::dof_map::DofMap;
use crate::element::{ElementConnectivity, FiniteElement, ReferenceFiniteElement};
use crate::mesh::Mesh;
use crate::nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorViewMut, Scalar};
use crate::nalgebra_sparse::CsrMatrix;
use crate::quadrature::{element_quadrature, QuadraturePair2d};
use crate::Real;
use davenport::{define_thread_local_workspace, with_thread_local_workspace};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Connectivity of the element systems making up a global system.
pub trait ElementConnectivityAssembler {
    fn num_elements(&self) -> usize;

    /// Dimension of the global system.
    fn num_dofs(&self) -> usize;

    /// Inactive elements are skipped by the global assemblers.
    fn is_element_active(&self, element_index: usize) -> bool;

    fn element_dof_count(&self, element_index: usize) -> usize;

    /// Writes the global DOF indices of the element into `output`, which has length
    /// `element_dof_count(element_index)`.
    fn populate_element_dofs(&self, output: &mut [usize], element_index: usize);
}

/// Assembles the local matrix and vector of individual elements.
pub trait ElementSystemAssembler<T: Scalar>: ElementConnectivityAssembler {
    /// Computes the local system of the element.
    ///
    /// The outputs are zeroed and sized to `element_dof_count(element_index)` by the caller.
    fn assemble_element_system_into(
        &self,
        element_index: usize,
        matrix: DMatrixViewMut<T>,
        vector: DVectorViewMut<T>,
    ) -> eyre::Result<()>;
}

/// How the contributions of quadrature points enter the element stiffness matrix.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StiffnessUpdate {
    /// Sum the contributions of all quadrature points.
    #[default]
    Accumulate,
    /// Overwrite the entries at every quadrature point, so that only the last quadrature
    /// point contributes.
    LastQuadraturePoint,
}

/// Computes the stiffness matrix `K_ij = sum_q JxW[q] dphi_j(x_q) . dphi_i(x_q)` of the
/// Laplace operator into `output`.
///
/// # Panics
///
/// Panics if `output` is not `n x n`, where `n` is the number of nodes in `values`.
pub fn assemble_element_stiffness<T: Real>(mut output: DMatrixViewMut<T>, values: &ElementValues<T>, update: StiffnessUpdate) {
    let n = values.num_nodes();
    assert_eq!(output.nrows(), n, "Output matrix dimension mismatch");
    assert_eq!(output.ncols(), n, "Output matrix dimension mismatch");

    for (q, &jxw) in values.jxw().iter().enumerate() {
        for i in 0..n {
            for j in 0..n {
                let contribution = jxw * values.dphi(j, q).dot(values.dphi(i, q));
                match update {
                    StiffnessUpdate::Accumulate => output[(i, j)] += contribution,
                    StiffnessUpdate::LastQuadraturePoint => output[(i, j)] = contribution,
                }
            }
        }
    }
}

/// Adds the load vector `F_i = sum_q JxW[q] source phi_i(x_q)` of a constant source to
/// `output`.
///
/// # Panics
///
/// Panics if the length of `output` differs from the number of nodes in `values`.
pub fn assemble_element_load<T: Real>(mut output: DVectorViewMut<T>, values: &ElementValues<T>, source: T) {
    let n = values.num_nodes();
    assert_eq!(output.len(), n, "Output vector dimension mismatch");

    for (q, &jxw) in values.jxw().iter().enumerate() {
        for i in 0..n {
            output[i] += jxw * source * values.phi(i, q);
        }
    }
}

/// Convenience function for computing the stiffness matrix of a single element.
pub fn element_stiffness_matrix<T, Element>(
    element: &Element,
    quadrature: &QuadraturePair2d<T>,
    update: StiffnessUpdate,
) -> Result<DMatrix<T>, AssemblyError>
where
    T: Real,
    Element: FiniteElement<T>,
{
    let mut values = ElementValues::default();
    values.reinit(element, quadrature, 0)?;
    let n = element.num_nodes();
    let mut matrix = DMatrix::zeros(n, n);
    assemble_element_stiffness(DMatrixViewMut::from(&mut matrix), &values, update);
    Ok(matrix)
}

/// Convenience function for computing the load vector of a single element.
pub fn element_load_vector<T, Element>(
    element: &Element,
    quadrature: &QuadraturePair2d<T>,
    source: T,
) -> Result<DVector<T>, AssemblyError>
where
    T: Real,
    Element: FiniteElement<T>,
{
    let mut values = ElementValues::default();
    values.reinit(element, quadrature, 0)?;
    let mut vector = DVector::zeros(element.num_nodes());
    assemble_element_load(DVectorViewMut::from(&mut vector), &values, source);
    Ok(vector)
}

define_thread_local_workspace!(WORKSPACE);

/// Name of the system handled by [`DistanceAssembler`].
pub const DISTANCE_SYSTEM_NAME: &str = "distance";

/// Quadrature strength used by [`DistanceAssembler::new`].
pub const DEFAULT_QUADRATURE_STRENGTH: usize = 5;

/// Assembles the system of `-Δd = source` with the Dirichlet constraints of a [`DofMap`].
///
/// Handles the single variable of the system named [`DistanceAssembler::SYSTEM_NAME`].
/// Constrained DOFs are eliminated element by element.
#[derive(Debug, Clone)]
pub struct DistanceAssembler<'a, T: Scalar, C> {
    mesh: &'a Mesh<T, C>,
    dof_map: &'a DofMap<T>,
    quadrature: QuadraturePair2d<T>,
    source: T,
    update: StiffnessUpdate,
}

impl<'a, T: Scalar, C> DistanceAssembler<'a, T, C> {
    pub fn connectivity(&self) -> MeshDofConnectivity<'a, T, C> {
        MeshDofConnectivity::new(self.mesh, self.dof_map)
    }
}

impl<'a, T, C> DistanceAssembler<'a, T, C>
where
    T: Real,
    C: ElementConnectivity<T>,
{
    pub const SYSTEM_NAME: &'static str = DISTANCE_SYSTEM_NAME;

    /// Creates an assembler with unit source, accumulating stiffness updates and a Gauss rule
    /// of strength 5.
    pub fn new(mesh: &'a Mesh<T, C>, dof_map: &'a DofMap<T>) -> eyre::Result<Self> {
        let quadrature = element_quadrature(C::SHAPE, DEFAULT_QUADRATURE_STRENGTH)?;
        Ok(Self {
            mesh,
            dof_map,
            quadrature,
            source: T::one(),
            update: StiffnessUpdate::default(),
        })
    }

    pub fn with_quadrature(self, quadrature: QuadraturePair2d<T>) -> Self {
        Self { quadrature, ..self }
    }

    pub fn with_quadrature_strength(self, strength: usize) -> eyre::Result<Self> {
        let quadrature = element_quadrature(C::SHAPE, strength)?;
        Ok(self.with_quadrature(quadrature))
    }

    pub fn with_source(self, source: T) -> Self {
        Self { source, ..self }
    }

    pub fn with_stiffness_update(self, update: StiffnessUpdate) -> Self {
        if update == StiffnessUpdate::LastQuadraturePoint {
            warn!("Stiffness entries are overwritten per quadrature point, only the last point contributes");
        }
        Self { update, ..self }
    }

    pub fn quadrature(&self) -> &QuadraturePair2d<T> {
        &self.quadrature
    }

    pub fn stiffness_update(&self) -> StiffnessUpdate {
        self.update
    }

    /// Assembles the global matrix and right-hand side of the named system.
    ///
    /// `matrix` must carry a pattern containing all element couplings (see
    /// [`assemble_pattern`](crate::assembly::global::assemble_pattern)). Contributions are
    /// added to the existing values.
    pub fn assemble_system(
        &self,
        system_name: &str,
        matrix: &mut CsrMatrix<T>,
        rhs: &mut DVector<T>,
        strategy: AssemblyStrategy,
    ) -> eyre::Result<()>
    where
        Self: Sync,
    {
        check_system_name(Self::SYSTEM_NAME, system_name)?;
        debug!(
            "Assembling system \"{}\" with {} active elements ({:?})",
            system_name,
            self.mesh.num_active_elements(),
            strategy
        );
        match strategy {
            AssemblyStrategy::Serial => CsrAssembler::default().assemble_system_into(matrix, rhs, self),
            AssemblyStrategy::Parallel => {
                let colors = color_elements(self);
                debug!("Partitioned elements into {} colors", colors.len());
                CsrParAssembler::default().assemble_system_into(matrix, rhs, &colors, self)
            }
        }
    }
}

/// The DOF connectivity of a mesh under a [`DofMap`].
#[derive(Debug)]
pub struct MeshDofConnectivity<'a, T: Scalar, C> {
    mesh: &'a Mesh<T, C>,
    dof_map: &'a DofMap<T>,
}

impl<'a, T: Scalar, C> Clone for MeshDofConnectivity<'a, T, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T: Scalar, C> Copy for MeshDofConnectivity<'a, T, C> {}

impl<'a, T: Scalar, C> MeshDofConnectivity<'a, T, C> {
    pub fn new(mesh: &'a Mesh<T, C>, dof_map: &'a DofMap<T>) -> Self {
        Self { mesh, dof_map }
    }
}

impl<'a, T, C> ElementConnectivityAssembler for MeshDofConnectivity<'a, T, C>
where
    T: Scalar,
    C: Connectivity,
{
    fn num_elements(&self) -> usize {
        self.mesh.num_elements()
    }

    fn num_dofs(&self) -> usize {
        self.dof_map.n_dofs()
    }

    fn is_element_active(&self, element_index: usize) -> bool {
        self.mesh.is_active(element_index)
    }

    fn element_dof_count(&self, element_index: usize) -> usize {
        self.mesh.connectivity()[element_index].vertex_indices().len() * self.dof_map.n_variables()
    }

    fn populate_element_dofs(&self, output: &mut [usize], element_index: usize) {
        let nodes = self.mesh.connectivity()[element_index].vertex_indices();
        for variable in 0..self.dof_map.n_variables() {
            for (local, &node) in nodes.iter().enumerate() {
                output[variable * nodes.len() + local] = self.dof_map.dof_index(node, variable);
            }
        }
    }
}

impl<'a, T, C> ElementConnectivityAssembler for DistanceAssembler<'a, T, C>
where
    T: Scalar,
    C: Connectivity,
{
    fn num_elements(&self) -> usize {
        self.connectivity().num_elements()
    }

    fn num_dofs(&self) -> usize {
        self.connectivity().num_dofs()
    }

    fn is_element_active(&self, element_index: usize) -> bool {
        self.connectivity().is_element_active(element_index)
    }

    fn element_dof_count(&self, element_index: usize) -> usize {
        self.connectivity().element_dof_count(element_index)
    }

    fn populate_element_dofs(&self, output: &mut [usize], element_index: usize) {
        self.connectivity()
            .populate_element_dofs(output, element_index)
    }
}

impl<'a, T, C> ElementSystemAssembler<T> for DistanceAssembler<'a, T, C>
where
    T: Real,
    C: ElementConnectivity<T>,
{
    fn assemble_element_system_into(
        &self,
        element_index: usize,
        mut matrix: DMatrixViewMut<T>,
        mut vector: DVectorViewMut<T>,
    ) -> eyre::Result<()> {
        for variable in self.dof_map.variables() {
            if !C::SHAPE.supports(&variable.fe_type) {
                return Err(AssemblyError::MissingBasis {
                    element: C::SHAPE,
                    fe_type: variable.fe_type,
                }
                .into());
            }
        }

        let element = self
            .mesh
            .get_element(element_index)
            .ok_or(AssemblyError::InvalidConnectivity { element: element_index })?;

        // The local buffers and the basis must both match the DOF map
        let n = self.element_dof_count(element_index);
        for actual in [matrix.nrows(), matrix.ncols(), vector.len(), element.num_nodes()] {
            if actual != n {
                return Err(AssemblyError::InconsistentSizing {
                    element: element_index,
                    expected: n,
                    actual,
                }
                .into());
            }
        }

        with_thread_local_workspace(&WORKSPACE, |ws: &mut DistanceWorkspace<T>| {
            ws.values.reinit(&element, &self.quadrature, element_index)?;
            assemble_element_load(DVectorViewMut::from(&mut vector), &ws.values, self.source);
            assemble_element_stiffness(DMatrixViewMut::from(&mut matrix), &ws.values, self.update);

            ws.dofs.resize(n, usize::MAX);
            self.populate_element_dofs(&mut ws.dofs, element_index);
            self.dof_map
                .heterogeneously_constrain_element_matrix_and_vector(element_index, matrix, vector, &ws.dofs)?;
            Ok(())
        })
    }
}

struct DistanceWorkspace<T: Scalar> {
    values: ElementValues<T>,
    dofs: Vec<usize>,
}

impl<T: Real> Default for DistanceWorkspace<T> {
    fn default() -> Self {
        Self {
            values: ElementValues::default(),
            dofs: Vec::new(),
        }
    }
}
