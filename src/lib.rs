//! Finite element "distance" solves on two-dimensional meshes, with isoline extraction.
//!
//! The crate assembles and solves the Poisson problem `-∇²d = 1` with Dirichlet conditions on
//! selected boundaries, using first-order Lagrange elements on triangle or quadrilateral meshes,
//! and extracts isolines from the resulting piecewise linear field.
use nalgebra::RealField;
use num::ToPrimitive;

pub mod assembly;
pub mod config;
pub mod connectivity;
pub mod dof_map;
pub mod element;
pub mod error;
pub mod io;
pub mod isolines;
pub mod mesh;
pub mod quadrature;
pub mod system;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
pub extern crate vtkio;

pub use isodist_sparse as sparse;

/// Scalar types supported by the finite element routines.
///
/// Used as a trait alias for the traits frequently needed by generic `isodist` routines.
pub trait Real: RealField + Copy + ToPrimitive {}

impl<T> Real for T where T: RealField + Copy + ToPrimitive {}
