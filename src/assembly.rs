//! Element-level and global assembly of the distance system.
use crate::element::{ElementShape, FeType};
use std::error::Error;
use std::fmt;

pub mod buffers;
pub mod global;
pub mod local;

/// Errors that abort the assembly of a system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// Assembly was requested for a system other than the one the assembler handles.
    SystemNameMismatch { expected: String, actual: String },
    /// No basis is implemented for the combination of element geometry and variable type.
    MissingBasis { element: ElementShape, fe_type: FeType },
    /// The local matrix or vector dimension differs from the number of element DOFs.
    InconsistentSizing {
        element: usize,
        expected: usize,
        actual: usize,
    },
    /// The element Jacobian is singular or not finite at some quadrature point.
    DegenerateElement { element: usize },
    /// A local entry has no corresponding entry in the global sparsity pattern.
    MissingSparsityEntry { row: usize, col: usize },
    /// The element references vertices that do not exist in the mesh.
    InvalidConnectivity { element: usize },
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemNameMismatch { expected, actual } => {
                write!(f, "assembler for system \"{}\" invoked on system \"{}\"", expected, actual)
            }
            Self::MissingBasis { element, fe_type } => {
                write!(f, "no basis available for {} on {} elements", fe_type, element)
            }
            Self::InconsistentSizing {
                element,
                expected,
                actual,
            } => write!(
                f,
                "element {} has {} local DOFs, but local buffers have dimension {}",
                element, expected, actual
            ),
            Self::DegenerateElement { element } => {
                write!(f, "element {} has a singular Jacobian", element)
            }
            Self::MissingSparsityEntry { row, col } => {
                write!(f, "entry ({}, {}) is not part of the sparsity pattern", row, col)
            }
            Self::InvalidConnectivity { element } => {
                write!(f, "element {} references vertices out of bounds", element)
            }
        }
    }
}

impl Error for AssemblyError {}

/// Checks that an assembler for `expected` is invoked on the system `actual`.
pub fn check_system_name(expected: &str, actual: &str) -> Result<(), AssemblyError> {
    if expected == actual {
        Ok(())
    } else {
        Err(AssemblyError::SystemNameMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}
