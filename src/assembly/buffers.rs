use crate::assembly::AssemblyError;
use crate::element::FiniteElement;
use crate::nalgebra::{DMatrix, DMatrixViewMut, DVector, Point2, Scalar, Vector2};
use crate::quadrature::Quadrature;
use crate::Real;
use itertools::izip;

/// Basis function data of an element evaluated at the quadrature points.
///
/// Holds the quadrature weights scaled by the Jacobian determinant (`JxW`), the basis values
/// (`phi`), the basis gradients with respect to physical coordinates (`dphi`) and the physical
/// quadrature points (`xyz`). Values are recomputed by [`ElementValues::reinit`], reusing the
/// allocated storage.
#[derive(Debug)]
pub struct ElementValues<T: Scalar> {
    num_nodes: usize,
    jxw: Vec<T>,
    phi: Vec<T>,
    dphi: Vec<Vector2<T>>,
    xyz: Vec<Point2<T>>,
    basis_values: Vec<T>,
    reference_gradients: DMatrix<T>,
}

impl<T: Real> Default for ElementValues<T> {
    fn default() -> Self {
        Self {
            num_nodes: 0,
            jxw: Vec::new(),
            phi: Vec::new(),
            dphi: Vec::new(),
            xyz: Vec::new(),
            basis_values: Vec::new(),
            reference_gradients: DMatrix::zeros(2, 0),
        }
    }
}

impl<T: Real> ElementValues<T> {
    /// Evaluates the basis of `element` at the points of `quadrature`.
    ///
    /// Returns [`AssemblyError::DegenerateElement`] if the Jacobian determinant vanishes or is
    /// not finite at some quadrature point. Inverted elements are accepted, their `JxW`
    /// uses the absolute determinant.
    pub fn reinit<Element>(
        &mut self,
        element: &Element,
        quadrature: &impl Quadrature<T>,
        element_index: usize,
    ) -> Result<(), AssemblyError>
    where
        Element: FiniteElement<T>,
    {
        let n = element.num_nodes();
        let nq = quadrature.num_points();
        self.num_nodes = n;
        self.jxw.clear();
        self.phi.clear();
        self.dphi.clear();
        self.xyz.clear();
        self.basis_values.resize(n, T::zero());
        self.reference_gradients.resize_mut(2, n, T::zero());

        let degenerate = || AssemblyError::DegenerateElement { element: element_index };

        for (&weight, xi) in izip!(quadrature.weights(), quadrature.points()) {
            let j = element.reference_jacobian(xi);
            let j_det = j.determinant();
            if j_det == T::zero() || !j_det.is_finite() {
                return Err(degenerate());
            }
            let j_inv_t = j.try_inverse().ok_or_else(degenerate)?.transpose();

            element.populate_basis(&mut self.basis_values, xi);
            element.populate_basis_gradients(DMatrixViewMut::from(&mut self.reference_gradients), xi);

            self.jxw.push(weight * j_det.abs());
            self.xyz.push(element.map_reference_coords(xi));
            self.phi.extend_from_slice(&self.basis_values);
            self.dphi.extend(
                self.reference_gradients
                    .column_iter()
                    .map(|grad_ref| &j_inv_t * grad_ref),
            );
        }

        debug_assert_eq!(self.jxw.len(), nq);
        debug_assert_eq!(self.phi.len(), n * nq);
        Ok(())
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_quadrature_points(&self) -> usize {
        self.jxw.len()
    }

    pub fn jxw(&self) -> &[T] {
        &self.jxw
    }

    /// Value of basis function `i` at quadrature point `q`.
    pub fn phi(&self, i: usize, q: usize) -> T {
        self.phi[q * self.num_nodes + i]
    }

    /// Physical gradient of basis function `i` at quadrature point `q`.
    pub fn dphi(&self, i: usize, q: usize) -> &Vector2<T> {
        &self.dphi[q * self.num_nodes + i]
    }

    pub fn xyz(&self) -> &[Point2<T>] {
        &self.xyz
    }
}

/// Element-sized scratch buffers for scattering a local system into a global one.
#[derive(Debug, Clone)]
pub struct ElementAssemblyWorkspace<T: Scalar> {
    pub dofs: Vec<usize>,
    pub sorted_permutation: Vec<usize>,
    pub matrix: DMatrix<T>,
    pub vector: DVector<T>,
}

impl<T: Real> Default for ElementAssemblyWorkspace<T> {
    fn default() -> Self {
        Self {
            dofs: Vec::new(),
            sorted_permutation: Vec::new(),
            matrix: DMatrix::zeros(0, 0),
            vector: DVector::zeros(0),
        }
    }
}

impl<T: Real> ElementAssemblyWorkspace<T> {
    /// Resizes the local matrix and vector to dimension `n` and zeroes them.
    pub fn prepare(&mut self, n: usize) {
        self.matrix.resize_mut(n, n, T::zero());
        self.matrix.fill(T::zero());
        self.vector.resize_vertically_mut(n, T::zero());
        self.vector.fill(T::zero());
    }

    /// Computes the permutation of local indices that sorts the current DOFs.
    pub fn sort_dofs(&mut self) {
        let dofs = &self.dofs;
        self.sorted_permutation.clear();
        self.sorted_permutation.extend(0..dofs.len());
        self.sorted_permutation.sort_unstable_by_key(|&i| dofs[i]);
    }
}
