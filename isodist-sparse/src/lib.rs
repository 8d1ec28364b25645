//! Linear operators and iterative solvers for the sparse systems produced by `isodist`.

use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut, RealField, Scalar};
use nalgebra_sparse::CsrMatrix;
use std::error::Error;
use std::fmt;

pub mod cg;

pub type OperatorError = Box<dyn Error + Send + Sync>;

/// An operator `y = A x` acting on dense vectors.
pub trait LinearOperator<T: Scalar> {
    fn apply(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError>;
}

impl<'a, T, A> LinearOperator<T> for &'a A
where
    T: Scalar,
    A: ?Sized + LinearOperator<T>,
{
    fn apply(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError> {
        <A as LinearOperator<T>>::apply(self, y, x)
    }
}

impl<T: RealField> LinearOperator<T> for DMatrix<T> {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError> {
        check_dimensions(self.nrows(), self.ncols(), y.len(), x.len())?;
        y.gemv(T::one(), self, &x, T::zero());
        Ok(())
    }
}

impl<T: RealField> LinearOperator<T> for CsrMatrix<T> {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError> {
        check_dimensions(self.nrows(), self.ncols(), y.len(), x.len())?;
        for (y_i, row) in y.iter_mut().zip(self.row_iter()) {
            let mut sum = T::zero();
            for (&j, a_ij) in row.col_indices().iter().zip(row.values()) {
                sum += a_ij.clone() * x[j].clone();
            }
            *y_i = sum;
        }
        Ok(())
    }
}

fn check_dimensions(nrows: usize, ncols: usize, y_len: usize, x_len: usize) -> Result<(), OperatorError> {
    if nrows == y_len && ncols == x_len {
        Ok(())
    } else {
        Err(Box::new(DimensionMismatch {
            nrows,
            ncols,
            y_len,
            x_len,
        }))
    }
}

/// Returned by operators when the vectors do not match the operator's shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionMismatch {
    pub nrows: usize,
    pub ncols: usize,
    pub y_len: usize,
    pub x_len: usize,
}

impl fmt::Display for DimensionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot apply {}x{} operator to vector of length {} with output of length {}",
            self.nrows, self.ncols, self.x_len, self.y_len
        )
    }
}

impl Error for DimensionMismatch {}

pub struct IdentityOperator;

impl<T: Scalar> LinearOperator<T> for IdentityOperator {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError> {
        y.copy_from(&x);
        Ok(())
    }
}

/// Diagonal (Jacobi) preconditioner `P = diag(A)^{-1}`.
///
/// Zero diagonal entries are treated as ones, so that rows without a diagonal entry pass
/// through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct JacobiPreconditioner<T: Scalar> {
    inverse_diagonal: DVector<T>,
}

impl<T: RealField> JacobiPreconditioner<T> {
    pub fn from_diagonal(diagonal: &DVector<T>) -> Self {
        let inverse_diagonal = diagonal.map(|d_i| {
            if d_i == T::zero() {
                T::one()
            } else {
                T::one() / d_i
            }
        });
        Self { inverse_diagonal }
    }

    pub fn from_csr(matrix: &CsrMatrix<T>) -> Self {
        let mut diagonal = DVector::zeros(matrix.nrows());
        for (i, j, a_ij) in matrix.triplet_iter() {
            if i == j {
                diagonal[i] += a_ij.clone();
            }
        }
        Self::from_diagonal(&diagonal)
    }

    pub fn inverse_diagonal(&self) -> &DVector<T> {
        &self.inverse_diagonal
    }
}

impl<T: RealField> LinearOperator<T> for JacobiPreconditioner<T> {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError> {
        let n = self.inverse_diagonal.len();
        check_dimensions(n, n, y.len(), x.len())?;
        for ((y_i, x_i), d_i) in y.iter_mut().zip(x.iter()).zip(self.inverse_diagonal.iter()) {
            *y_i = x_i.clone() * d_i.clone();
        }
        Ok(())
    }
}
