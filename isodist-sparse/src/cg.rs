//! Preconditioned Conjugate Gradient for symmetric positive definite operators.
use crate::{LinearOperator, OperatorError};
use log::{debug, trace};
use nalgebra::{DVector, DVectorView, DVectorViewMut, RealField, Scalar};
use std::error::Error;
use std::fmt;

pub trait CgStoppingCriterion<T: Scalar> {
    fn has_converged(&self, b_norm: T, iteration: usize, approx_residual: DVectorView<T>) -> bool;
}

/// Relative residual tolerance `||r|| <= tol * ||b||`.
///
/// Uses the residual recurrence maintained by CG rather than recomputing `b - Ax`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeResidualCriterion<T: Scalar> {
    tol: T,
}

impl<T: Scalar> RelativeResidualCriterion<T> {
    pub fn new(tol: T) -> Self {
        Self { tol }
    }

    pub fn tolerance(&self) -> &T {
        &self.tol
    }
}

impl Default for RelativeResidualCriterion<f64> {
    fn default() -> Self {
        Self::new(1e-8)
    }
}

impl<T: RealField> CgStoppingCriterion<T> for RelativeResidualCriterion<T> {
    fn has_converged(&self, b_norm: T, _iteration: usize, approx_residual: DVectorView<T>) -> bool {
        approx_residual.norm() <= self.tol.clone() * b_norm
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum SolveErrorKind {
    OperatorError(OperatorError),
    PreconditionerError(OperatorError),
    DimensionMismatch { rhs: usize, solution: usize },
    IndefiniteOperator,
    IndefinitePreconditioner,
    MaxIterationsReached { max_iter: usize },
}

impl fmt::Display for SolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperatorError(err) => write!(f, "error applying operator: {}", err),
            Self::PreconditionerError(err) => write!(f, "error applying preconditioner: {}", err),
            Self::DimensionMismatch { rhs, solution } => write!(
                f,
                "right-hand side has length {} but solution has length {}",
                rhs, solution
            ),
            Self::IndefiniteOperator => write!(f, "operator appears to be indefinite"),
            Self::IndefinitePreconditioner => write!(f, "preconditioner appears to be indefinite"),
            Self::MaxIterationsReached { max_iter } => {
                write!(f, "max iterations ({}) reached", max_iter)
            }
        }
    }
}

/// A failed solve, together with the state of the iteration when it stopped.
#[derive(Debug)]
pub struct SolveError<T> {
    pub output: CgOutput<T>,
    pub kind: SolveErrorKind,
}

impl<T> fmt::Display for SolveError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CG solve failed after {} iterations: {}",
            self.output.num_iterations, self.kind
        )
    }
}

impl<T: fmt::Debug> Error for SolveError<T> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            SolveErrorKind::OperatorError(err) | SolveErrorKind::PreconditionerError(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CgOutput<T> {
    /// Number of updates made to the (initial) solution vector.
    pub num_iterations: usize,
    /// Norm of the residual recurrence when the solver stopped.
    pub residual_norm: T,
}

/// y = Ax
fn apply<T, A>(operator: &A, y: &mut DVector<T>, x: DVectorView<T>) -> Result<(), OperatorError>
where
    T: Scalar,
    A: ?Sized + LinearOperator<T>,
{
    operator.apply(DVectorViewMut::from(y), x)
}

/// Residual, preconditioned residual, search direction and operator applied to the search
/// direction.
#[derive(Debug, Clone)]
struct Workspace<T: Scalar> {
    r: DVector<T>,
    z: DVector<T>,
    p: DVector<T>,
    ap: DVector<T>,
}

impl<T: RealField> Workspace<T> {
    fn empty() -> Self {
        Self {
            r: DVector::zeros(0),
            z: DVector::zeros(0),
            p: DVector::zeros(0),
            ap: DVector::zeros(0),
        }
    }

    fn resize(&mut self, dim: usize) {
        for buffer in [&mut self.r, &mut self.z, &mut self.p, &mut self.ap] {
            buffer.resize_vertically_mut(dim, T::zero());
        }
    }
}

/// Conjugate Gradient solver.
///
/// The solver keeps its work vectors between solves, so repeatedly solving systems of the
/// same size does not allocate. The vectors carry no state from one solve to the next.
///
/// ```ignore
/// let mut cg = ConjugateGradient::new(RelativeResidualCriterion::new(1e-10));
/// let output = cg.solve_with_guess(&matrix, &JacobiPreconditioner::from_csr(&matrix), &b, &mut x)?;
/// ```
#[derive(Debug, Clone)]
pub struct ConjugateGradient<T: Scalar, Criterion> {
    stopping_criterion: Criterion,
    max_iter: Option<usize>,
    workspace: Workspace<T>,
}

impl<T, Criterion> ConjugateGradient<T, Criterion>
where
    T: RealField + Copy,
    Criterion: CgStoppingCriterion<T>,
{
    pub fn new(stopping_criterion: Criterion) -> Self {
        Self {
            stopping_criterion,
            max_iter: None,
            workspace: Workspace::empty(),
        }
    }

    /// Limits the number of iterations. `None` lets CG run until convergence.
    pub fn with_max_iter(self, max_iter: Option<usize>) -> Self {
        Self { max_iter, ..self }
    }

    /// Solves `A x = b`, starting from the current contents of `x`.
    ///
    /// `preconditioner` applies an approximation of `A^{-1}`. Pass
    /// [`IdentityOperator`](crate::IdentityOperator) for plain CG.
    pub fn solve_with_guess<'b, A, P>(
        &mut self,
        operator: &A,
        preconditioner: &P,
        b: impl Into<DVectorView<'b, T>>,
        x: impl Into<DVectorViewMut<'b, T>>,
    ) -> Result<CgOutput<T>, SolveError<T>>
    where
        A: ?Sized + LinearOperator<T>,
        P: ?Sized + LinearOperator<T>,
    {
        let mut output = CgOutput {
            num_iterations: 0,
            residual_norm: T::zero(),
        };
        match self.iterate(operator, preconditioner, b.into(), x.into(), &mut output) {
            Ok(()) => Ok(output),
            Err(kind) => Err(SolveError { output, kind }),
        }
    }

    fn iterate<A, P>(
        &mut self,
        operator: &A,
        preconditioner: &P,
        b: DVectorView<T>,
        mut x: DVectorViewMut<T>,
        output: &mut CgOutput<T>,
    ) -> Result<(), SolveErrorKind>
    where
        A: ?Sized + LinearOperator<T>,
        P: ?Sized + LinearOperator<T>,
    {
        use SolveErrorKind::*;

        if b.len() != x.len() {
            return Err(DimensionMismatch {
                rhs: b.len(),
                solution: x.len(),
            });
        }

        let b_norm = b.norm();
        if b_norm == T::zero() {
            x.fill(T::zero());
            return Ok(());
        }

        self.workspace.resize(x.len());
        let Workspace { r, z, p, ap } = &mut self.workspace;
        // r = b - A x, z = P r, p = z
        apply(operator, r, DVectorView::from(&x)).map_err(OperatorError)?;
        r.axpy(T::one(), &b, -T::one());
        apply(preconditioner, z, DVectorView::from(&*r)).map_err(PreconditionerError)?;
        p.copy_from(z);
        let mut z_dot_r = z.dot(r);

        loop {
            output.residual_norm = r.norm();
            trace!(
                "CG iteration {}: residual norm {}",
                output.num_iterations,
                output.residual_norm
            );

            if self
                .stopping_criterion
                .has_converged(b_norm, output.num_iterations, DVectorView::from(&*r))
            {
                break;
            }
            if let Some(max_iter) = self.max_iter {
                if output.num_iterations >= max_iter {
                    return Err(MaxIterationsReached { max_iter });
                }
            }

            apply(operator, ap, DVectorView::from(&*p)).map_err(OperatorError)?;
            let p_dot_ap = p.dot(ap);
            if p_dot_ap <= T::zero() {
                return Err(IndefiniteOperator);
            }
            if z_dot_r <= T::zero() {
                return Err(IndefinitePreconditioner);
            }

            let alpha = z_dot_r / p_dot_ap;
            x.axpy(alpha, &*p, T::one());
            r.axpy(-alpha, &*ap, T::one());
            output.num_iterations += 1;

            apply(preconditioner, z, DVectorView::from(&*r)).map_err(PreconditionerError)?;
            let z_dot_r_next = z.dot(r);
            // p <- z + beta p
            p.axpy(T::one(), &*z, z_dot_r_next / z_dot_r);
            z_dot_r = z_dot_r_next;
        }

        debug!(
            "CG converged in {} iterations (residual norm {}, rhs norm {})",
            output.num_iterations, output.residual_norm, b_norm
        );
        Ok(())
    }
}
