//! Configuration of the distance problem.
use crate::assembly::global::AssemblyStrategy;
use crate::assembly::local::{StiffnessUpdate, DEFAULT_QUADRATURE_STRENGTH};
use crate::element::ElementShape;
use crate::mesh::boundary::BoundaryId;
use crate::mesh::procedural::LEFT;
use crate::quadrature::MAX_QUADRATURE_STRENGTH;
use crate::system::{DistanceSystemAssembler, SolverSettings};
use crate::Real;
use eyre::{eyre, WrapErr};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Parameters of a distance solve on the unit square.
///
/// Missing fields take their default values, unknown fields are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DistanceProblemConfig {
    /// Number of grid cells along each side of the unit square.
    pub cells_per_dim: usize,
    pub element: ElementShape,
    /// Boundaries with the homogeneous Dirichlet condition `d = 0`.
    pub dirichlet_boundary_ids: Vec<BoundaryId>,
    pub quadrature_strength: usize,
    pub stiffness_update: StiffnessUpdate,
    pub assembly: AssemblyStrategy,
    pub tolerance: f64,
    pub max_iterations: Option<usize>,
    /// Path of the VTK file with the mesh and solution.
    pub output: PathBuf,
    /// Number of isolines to extract.
    pub isolines: usize,
}

impl Default for DistanceProblemConfig {
    fn default() -> Self {
        Self {
            cells_per_dim: 20,
            element: ElementShape::Quad4,
            dirichlet_boundary_ids: vec![LEFT],
            quadrature_strength: DEFAULT_QUADRATURE_STRENGTH,
            stiffness_update: StiffnessUpdate::Accumulate,
            assembly: AssemblyStrategy::Serial,
            tolerance: 1e-10,
            max_iterations: None,
            output: PathBuf::from("out.vtu"),
            isolines: 10,
        }
    }
}

impl DistanceProblemConfig {
    pub fn from_json_str(json: &str) -> eyre::Result<Self> {
        let config: Self = serde_json::from_str(json).wrap_err("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))?;
        Self::from_json_str(&json).wrap_err_with(|| format!("invalid configuration in {}", path.display()))
    }

    pub fn validate(&self) -> eyre::Result<()> {
        if self.cells_per_dim == 0 {
            return Err(eyre!("cells_per_dim must be positive"));
        }
        if self.quadrature_strength < DEFAULT_QUADRATURE_STRENGTH {
            // Weaker rules underintegrate the bilinear stiffness on general quads
            return Err(eyre!(
                "quadrature_strength {} is below the minimum of {}",
                self.quadrature_strength,
                DEFAULT_QUADRATURE_STRENGTH
            ));
        }
        if self.quadrature_strength > MAX_QUADRATURE_STRENGTH {
            return Err(eyre!(
                "quadrature_strength {} exceeds the maximum of {}",
                self.quadrature_strength,
                MAX_QUADRATURE_STRENGTH
            ));
        }
        if !(self.tolerance > 0.0) {
            return Err(eyre!("tolerance must be positive, got {}", self.tolerance));
        }
        Ok(())
    }

    /// The path of the isoline output, derived from [`DistanceProblemConfig::output`].
    pub fn isoline_output(&self) -> PathBuf {
        let stem = self
            .output
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "out".to_string());
        let extension = self
            .output
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vtu".to_string());
        self.output
            .with_file_name(format!("{}_isolines.{}", stem, extension))
    }

    pub fn system_assembler(&self) -> DistanceSystemAssembler {
        DistanceSystemAssembler {
            quadrature_strength: self.quadrature_strength,
            stiffness_update: self.stiffness_update,
            strategy: self.assembly,
        }
    }

    pub fn solver_settings<T: Real>(&self) -> eyre::Result<SolverSettings<T>> {
        let tolerance =
            T::from_f64(self.tolerance).ok_or_else(|| eyre!("tolerance {} cannot be represented", self.tolerance))?;
        Ok(SolverSettings {
            tolerance,
            max_iterations: self.max_iterations,
        })
    }
}
