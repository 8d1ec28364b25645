use crate::assembly::buffers::ElementAssemblyWorkspace;
use crate::assembly::local::{ElementConnectivityAssembler, ElementSystemAssembler};
use crate::assembly::AssemblyError;
use crate::nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut, Scalar};
use crate::nalgebra_sparse::pattern::SparsityPattern;
use crate::nalgebra_sparse::CsrMatrix;
use crate::Real;
use eyre::eyre;
use rayon::iter::{IntoParallelRefMutIterator, ParallelIterator};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thread_local::ThreadLocal;

use std::cell::RefCell;
use std::collections::BTreeSet;

/// Whether elements are assembled on the current thread or in parallel.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyStrategy {
    #[default]
    Serial,
    /// Color-based parallel assembly with rayon.
    Parallel,
}

/// Computes the sparsity pattern of the global system.
///
/// The pattern holds all couplings between DOFs of active elements, and the diagonal entry of
/// every row, so that DOFs not touched by any active element still have a diagonal entry.
pub fn assemble_pattern<A>(element_assembler: &A) -> eyre::Result<SparsityPattern>
where
    A: ?Sized + ElementConnectivityAssembler,
{
    // Collecting into a BTreeSet stores each entry exactly once, in row-major order
    let num_rows = element_assembler.num_dofs();
    let mut matrix_entries: BTreeSet<_> = (0..num_rows).map(|i| (i, i)).collect();
    let mut element_dofs = Vec::new();
    for element in 0..element_assembler.num_elements() {
        if !element_assembler.is_element_active(element) {
            continue;
        }
        element_dofs.resize(element_assembler.element_dof_count(element), usize::MAX);
        element_assembler.populate_element_dofs(&mut element_dofs, element);

        for &dof_i in &element_dofs {
            for &dof_j in &element_dofs {
                matrix_entries.insert((dof_i, dof_j));
            }
        }
    }

    let mut offsets = Vec::with_capacity(num_rows + 1);
    let mut column_indices = Vec::with_capacity(matrix_entries.len());

    offsets.push(0);
    for (i, j) in matrix_entries {
        while i + 1 > offsets.len() {
            offsets.push(column_indices.len());
        }
        column_indices.push(j);
    }
    while offsets.len() < num_rows + 1 {
        offsets.push(column_indices.len());
    }

    SparsityPattern::try_from_offsets_and_indices(num_rows, num_rows, offsets, column_indices)
        .map_err(|err| eyre!("invalid sparsity pattern: {}", err))
}

/// Creates a zero CSR matrix and a zero vector for the global system.
pub fn allocate_system<T, A>(element_assembler: &A) -> eyre::Result<(CsrMatrix<T>, DVector<T>)>
where
    T: Real,
    A: ?Sized + ElementConnectivityAssembler,
{
    let pattern = assemble_pattern(element_assembler)?;
    let values = vec![T::zero(); pattern.nnz()];
    let matrix = CsrMatrix::try_from_pattern_and_values(pattern, values)
        .map_err(|err| eyre!("failed to allocate system matrix: {}", err))?;
    Ok((matrix, DVector::zeros(element_assembler.num_dofs())))
}

/// A serial assembler for CSR systems.
#[derive(Debug, Clone)]
pub struct CsrAssembler<T: Scalar> {
    workspace: RefCell<ElementAssemblyWorkspace<T>>,
}

impl<T: Real> Default for CsrAssembler<T> {
    fn default() -> Self {
        Self {
            workspace: RefCell::new(ElementAssemblyWorkspace::default()),
        }
    }
}

impl<T: Real> CsrAssembler<T> {
    pub fn assemble_system(
        &self,
        element_assembler: &dyn ElementSystemAssembler<T>,
    ) -> eyre::Result<(CsrMatrix<T>, DVector<T>)> {
        let (mut matrix, mut rhs) = allocate_system(element_assembler)?;
        self.assemble_system_into(&mut matrix, &mut rhs, element_assembler)?;
        Ok((matrix, rhs))
    }

    /// Adds the element systems of all active elements to `csr` and `rhs`.
    pub fn assemble_system_into(
        &self,
        csr: &mut CsrMatrix<T>,
        rhs: &mut DVector<T>,
        element_assembler: &dyn ElementSystemAssembler<T>,
    ) -> eyre::Result<()> {
        check_system_dimensions(csr, rhs, element_assembler.num_dofs())?;
        let ws = &mut *self.workspace.borrow_mut();

        for element in 0..element_assembler.num_elements() {
            if !element_assembler.is_element_active(element) {
                continue;
            }
            let n = element_assembler.element_dof_count(element);
            ws.prepare(n);
            ws.dofs.resize(n, usize::MAX);
            element_assembler.populate_element_dofs(&mut ws.dofs, element);
            ws.sort_dofs();

            element_assembler.assemble_element_system_into(
                element,
                DMatrixViewMut::from(&mut ws.matrix),
                DVectorViewMut::from(&mut ws.vector),
            )?;

            for (local_row, &global_row) in ws.dofs.iter().enumerate() {
                let mut csr_row = csr.row_mut(global_row);
                let (columns, values) = csr_row.cols_and_values_mut();
                add_element_row_to_csr_row(
                    columns,
                    values,
                    global_row,
                    &ws.dofs,
                    &ws.sorted_permutation,
                    &ws.matrix,
                    local_row,
                )?;
                rhs[global_row] += ws.vector[local_row];
            }
        }

        Ok(())
    }
}

/// A parallel assembler for CSR systems relying on a coloring of elements.
///
/// Elements of one color share no DOFs, so each element task has exclusive access to the
/// matrix rows and right-hand side entries of its DOFs.
#[derive(Debug)]
pub struct CsrParAssembler<T: Scalar + Send> {
    workspace: ThreadLocal<RefCell<ElementAssemblyWorkspace<T>>>,
}

impl<T: Scalar + Send> Default for CsrParAssembler<T> {
    fn default() -> Self {
        Self {
            workspace: Default::default(),
        }
    }
}

/// The global rows and right-hand side entries owned by one element during a color pass.
struct ElementTask<'a, T> {
    element: usize,
    dofs: Vec<usize>,
    rows: Vec<&'a mut [T]>,
    rhs: Vec<&'a mut T>,
}

impl<T: Real + Send> CsrParAssembler<T> {
    pub fn assemble_system(
        &self,
        element_assembler: &(dyn Sync + ElementSystemAssembler<T>),
    ) -> eyre::Result<(CsrMatrix<T>, DVector<T>)> {
        let (mut matrix, mut rhs) = allocate_system(element_assembler)?;
        let colors = color_elements(element_assembler);
        self.assemble_system_into(&mut matrix, &mut rhs, &colors, element_assembler)?;
        Ok((matrix, rhs))
    }

    /// Adds the element systems of the colored elements to `csr` and `rhs`.
    ///
    /// Colors are processed one after another, the elements of a color in parallel.
    /// Fails if two elements of the same color share a DOF.
    pub fn assemble_system_into(
        &self,
        csr: &mut CsrMatrix<T>,
        rhs: &mut DVector<T>,
        colors: &[Vec<usize>],
        element_assembler: &(dyn Sync + ElementSystemAssembler<T>),
    ) -> eyre::Result<()> {
        check_system_dimensions(csr, rhs, element_assembler.num_dofs())?;

        let (offsets, column_indices, values) = csr.csr_data_mut();
        let mut rows = Vec::with_capacity(offsets.len().saturating_sub(1));
        let mut remaining = values;
        for window in offsets.windows(2) {
            let (row, rest) = std::mem::take(&mut remaining).split_at_mut(window[1] - window[0]);
            rows.push(Some(row));
            remaining = rest;
        }
        let mut rhs_entries: Vec<_> = rhs.iter_mut().map(Some).collect();

        for color in colors {
            let mut tasks = Vec::with_capacity(color.len());
            for &element in color {
                let mut dofs = vec![usize::MAX; element_assembler.element_dof_count(element)];
                element_assembler.populate_element_dofs(&mut dofs, element);
                let mut task = ElementTask {
                    element,
                    rows: Vec::with_capacity(dofs.len()),
                    rhs: Vec::with_capacity(dofs.len()),
                    dofs,
                };
                for &dof in &task.dofs {
                    let row = rows.get_mut(dof).and_then(Option::take);
                    let rhs_entry = rhs_entries.get_mut(dof).and_then(Option::take);
                    match (row, rhs_entry) {
                        (Some(row), Some(rhs_entry)) => {
                            task.rows.push(row);
                            task.rhs.push(rhs_entry);
                        }
                        _ => return Err(eyre!("DOF {} of element {} is shared within its color", dof, element)),
                    }
                }
                tasks.push(task);
            }

            tasks
                .par_iter_mut()
                .map(|task| self.assemble_element_task(task, offsets, column_indices, element_assembler))
                .collect::<eyre::Result<()>>()?;

            for task in tasks {
                for ((dof, row), rhs_entry) in task.dofs.into_iter().zip(task.rows).zip(task.rhs) {
                    rows[dof] = Some(row);
                    rhs_entries[dof] = Some(rhs_entry);
                }
            }
        }

        Ok(())
    }

    fn assemble_element_task(
        &self,
        task: &mut ElementTask<'_, T>,
        offsets: &[usize],
        column_indices: &[usize],
        element_assembler: &(dyn Sync + ElementSystemAssembler<T>),
    ) -> eyre::Result<()> {
        let ws = &mut *self.workspace.get_or_default().borrow_mut();
        let n = task.dofs.len();
        ws.prepare(n);
        ws.dofs.clear();
        ws.dofs.extend_from_slice(&task.dofs);
        ws.sort_dofs();

        element_assembler.assemble_element_system_into(
            task.element,
            DMatrixViewMut::from(&mut ws.matrix),
            DVectorViewMut::from(&mut ws.vector),
        )?;

        for (local_row, &global_row) in task.dofs.iter().enumerate() {
            let columns = &column_indices[offsets[global_row]..offsets[global_row + 1]];
            add_element_row_to_csr_row(
                columns,
                &mut *task.rows[local_row],
                global_row,
                &ws.dofs,
                &ws.sorted_permutation,
                &ws.matrix,
                local_row,
            )?;
            *task.rhs[local_row] += ws.vector[local_row];
        }

        Ok(())
    }
}

fn check_system_dimensions<T: Scalar>(csr: &CsrMatrix<T>, rhs: &DVector<T>, n: usize) -> eyre::Result<()> {
    if csr.nrows() != n || csr.ncols() != n || rhs.len() != n {
        return Err(eyre!(
            "system of dimension {} cannot hold {}x{} matrix and rhs of length {}",
            n,
            csr.nrows(),
            csr.ncols(),
            rhs.len()
        ));
    }
    Ok(())
}

/// Add a row of a local element matrix to the corresponding row of a CSR matrix.
///
/// `element_dofs`: The global indices of the element DOFs.
/// `sorted_permutation`: The local indices of the DOFs, ordered such that the corresponding
///    global indices are sorted.
/// `local_row`: The row of the element matrix that should be added to the CSR row.
fn add_element_row_to_csr_row<T: Real>(
    csr_columns: &[usize],
    csr_values: &mut [T],
    global_row: usize,
    element_dofs: &[usize],
    sorted_permutation: &[usize],
    element_matrix: &DMatrix<T>,
    local_row: usize,
) -> Result<(), AssemblyError> {
    assert_eq!(element_dofs.len(), sorted_permutation.len());
    assert_eq!(element_matrix.ncols(), element_dofs.len());

    // Columns are visited in ascending order, so a single forward pass over the row suffices
    let mut csr_col_iter = csr_columns.iter().copied().enumerate();
    for &local_col in sorted_permutation {
        let global_col = element_dofs[local_col];
        let (csr_idx, _) = csr_col_iter
            .find(|&(_, col)| col == global_col)
            .ok_or(AssemblyError::MissingSparsityEntry {
                row: global_row,
                col: global_col,
            })?;
        csr_values[csr_idx] += element_matrix[(local_row, local_col)];
    }
    Ok(())
}

/// Greedily partitions the active elements into colors such that no two elements of the same
/// color share a DOF.
pub fn color_elements<A>(element_assembler: &A) -> Vec<Vec<usize>>
where
    A: ?Sized + ElementConnectivityAssembler,
{
    let mut colors: Vec<(FxHashSet<usize>, Vec<usize>)> = Vec::new();
    let mut dofs = Vec::new();

    for element in 0..element_assembler.num_elements() {
        if !element_assembler.is_element_active(element) {
            continue;
        }
        dofs.resize(element_assembler.element_dof_count(element), usize::MAX);
        element_assembler.populate_element_dofs(&mut dofs, element);

        let free_color = colors
            .iter_mut()
            .find(|(used_dofs, _)| dofs.iter().all(|dof| !used_dofs.contains(dof)));
        match free_color {
            Some((used_dofs, elements)) => {
                used_dofs.extend(dofs.iter().copied());
                elements.push(element);
            }
            None => colors.push((dofs.iter().copied().collect(), vec![element])),
        }
    }

    colors.into_iter().map(|(_, elements)| elements).collect()
}

/// Copies the entries of `u_global` at the given DOFs into `u_local`.
pub fn gather_global_to_local<T: Scalar>(u_global: DVectorView<T>, u_local: &mut DVector<T>, dofs: &[usize]) {
    assert_eq!(u_local.len(), dofs.len());
    for (local, &dof) in u_local.iter_mut().zip(dofs) {
        *local = u_global[dof].clone();
    }
}
