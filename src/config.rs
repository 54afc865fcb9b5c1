//! Configuration management for orthogonal mesh generation
//!
//! Reads TOML configuration files and provides the immutable set of tunables
//! that every meshing run is parameterized by.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{MeshError, MeshResult};

/// Kind of intermediate mesh the harmonic fields are solved on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntermediateKind {
    /// Boundary-conforming triangulation of the Bezier boundary
    Tri,
    /// Rectilinear index-space patches, smoothed with sliding boundary nodes
    Quad,
}

/// Kind of final mesh produced from the fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalKind {
    /// Quad grid in the user-supplied ij resolution
    Anisotropic,
    /// Quad grid in the nominal IJ resolution, relabelled with user ij
    Isotropic,
    /// The triangular intermediate mesh labelled with ij from the fields
    Triangle,
}

/// Weight of the psi/phi coupling rows relative to the boundary rows
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientScale {
    /// Constant factor
    Fixed(f64),
    /// dofs / (2 * node count)
    Scaled,
}

/// Linear solver settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SolverSettings {
    /// Systems with at most this many unknowns are solved densely
    #[serde(default = "default_dense_limit")]
    pub dense_limit: usize,
    #[serde(default = "default_lsqr_max_iterations")]
    pub lsqr_max_iterations: usize,
    #[serde(default = "default_lsqr_tolerance")]
    pub lsqr_tolerance: f64,
}

fn default_dense_limit() -> usize { 3000 }
fn default_lsqr_max_iterations() -> usize { 20_000 }
fn default_lsqr_tolerance() -> f64 { 1e-12 }

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            dense_limit: default_dense_limit(),
            lsqr_max_iterations: default_lsqr_max_iterations(),
            lsqr_tolerance: default_lsqr_tolerance(),
        }
    }
}

/// Main meshing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MeshingConfig {
    /// Cell spacing in geographic units for the nominal, isotropic grid
    #[serde(default = "default_nom_res")]
    pub nom_res: f64,
    /// Minimum number of steps along a boundary segment of the nominal grid
    #[serde(default = "default_min_steps")]
    pub min_steps: usize,
    /// Iterations of the boundary-sliding smoother (quad intermediate)
    #[serde(default = "default_smooth_iterations")]
    pub smooth_iterations: usize,
    /// Allowed index-space offset when matching nodes to ragged edges
    #[serde(default = "default_max_ragged_node_offset")]
    pub max_ragged_node_offset: f64,
    /// Allowed index-space offset when matching nodes to axis-aligned edges
    #[serde(default = "default_axis_node_offset")]
    pub axis_node_offset: f64,
    /// Scale of the Cauchy-Riemann coupling rows
    #[serde(default = "default_gradient_scale")]
    pub gradient_scale: GradientScale,
    #[serde(default = "default_intermediate")]
    pub intermediate: IntermediateKind,
    #[serde(default = "default_final_kind")]
    pub final_kind: FinalKind,
    /// Geographic distance under which sampled boundary points are merged
    #[serde(default = "default_node_snap_tolerance")]
    pub node_snap_tolerance: f64,
    /// Longest boundary cycle accepted before giving up
    #[serde(default = "default_max_cycle_len")]
    pub max_cycle_len: usize,
    /// Samples per generating edge when approximating Bezier curves
    #[serde(default = "default_bezier_samples")]
    pub bezier_samples_per_edge: usize,
    /// Growth rate of the hole-filling length scale away from the boundary
    #[serde(default = "default_hole_fill_growth")]
    pub hole_fill_growth: f64,
    #[serde(default)]
    pub solver: SolverSettings,
}

fn default_nom_res() -> f64 { 4.0 }
fn default_min_steps() -> usize { 2 }
fn default_smooth_iterations() -> usize { 3 }
fn default_max_ragged_node_offset() -> f64 { 2.0 }
fn default_axis_node_offset() -> f64 { 0.1 }
fn default_gradient_scale() -> GradientScale { GradientScale::Fixed(1.0) }
fn default_intermediate() -> IntermediateKind { IntermediateKind::Tri }
fn default_final_kind() -> FinalKind { FinalKind::Anisotropic }
fn default_node_snap_tolerance() -> f64 { 0.1 }
fn default_max_cycle_len() -> usize { 1000 }
fn default_bezier_samples() -> usize { 10 }
fn default_hole_fill_growth() -> f64 { 1.15 }

impl Default for MeshingConfig {
    fn default() -> Self {
        Self {
            nom_res: default_nom_res(),
            min_steps: default_min_steps(),
            smooth_iterations: default_smooth_iterations(),
            max_ragged_node_offset: default_max_ragged_node_offset(),
            axis_node_offset: default_axis_node_offset(),
            gradient_scale: default_gradient_scale(),
            intermediate: default_intermediate(),
            final_kind: default_final_kind(),
            node_snap_tolerance: default_node_snap_tolerance(),
            max_cycle_len: default_max_cycle_len(),
            bezier_samples_per_edge: default_bezier_samples(),
            hole_fill_growth: default_hole_fill_growth(),
            solver: SolverSettings::default(),
        }
    }
}

impl MeshingConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> MeshResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> MeshResult<Self> {
        let config: MeshingConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_nom_res(mut self, nom_res: f64) -> Self {
        self.nom_res = nom_res;
        self
    }

    pub fn with_intermediate(mut self, intermediate: IntermediateKind) -> Self {
        self.intermediate = intermediate;
        self
    }

    pub fn with_final_kind(mut self, final_kind: FinalKind) -> Self {
        self.final_kind = final_kind;
        self
    }

    pub fn with_gradient_scale(mut self, gradient_scale: GradientScale) -> Self {
        self.gradient_scale = gradient_scale;
        self
    }

    /// Reject values the algorithms cannot work with
    pub fn validate(&self) -> MeshResult<()> {
        if !(self.nom_res.is_finite() && self.nom_res > 0.0) {
            return Err(MeshError::invalid_config(format!("nom_res must be positive, got {}", self.nom_res)));
        }
        if self.min_steps == 0 {
            return Err(MeshError::invalid_config("min_steps must be at least 1"));
        }
        if !(self.max_ragged_node_offset > 0.0 && self.axis_node_offset > 0.0) {
            return Err(MeshError::invalid_config("node offsets must be positive"));
        }
        if let GradientScale::Fixed(s) = self.gradient_scale {
            if !s.is_finite() {
                return Err(MeshError::invalid_config("gradient_scale must be finite"));
            }
        }
        if self.bezier_samples_per_edge == 0 {
            return Err(MeshError::invalid_config("bezier_samples_per_edge must be at least 1"));
        }
        if !(self.hole_fill_growth >= 1.0) {
            return Err(MeshError::invalid_config("hole_fill_growth must be >= 1"));
        }
        if self.final_kind == FinalKind::Triangle && self.intermediate != IntermediateKind::Tri {
            return Err(MeshError::invalid_config("triangle output requires a triangle intermediate"));
        }
        Ok(())
    }

    /// One-line summary for logging
    pub fn summary(&self) -> String {
        format!(
            "nom_res={}, min_steps={}, intermediate={:?}, final={:?}, gradient_scale={:?}",
            self.nom_res, self.min_steps, self.intermediate, self.final_kind, self.gradient_scale
        )
    }
}
