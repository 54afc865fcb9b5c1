//! Error handling for orthogonal mesh generation
//!
//! Fatal conditions are `MeshError` values and abort the current meshing run.
//! Soft conditions are `Advisory` values: they are logged and handed back to
//! the caller next to the result, and the run carries on.

use thiserror::Error;

/// Result type alias for meshing operations
pub type MeshResult<T> = Result<T, MeshError>;

/// Broad classification of a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller mistake: malformed generating grid or configuration
    Configuration,
    /// Degenerate geometry or an unsolvable linear system
    NumericalDegeneracy,
    /// File or parse failure outside the algorithm itself
    Environment,
}

/// Fatal errors raised while building a mesh
#[derive(Error, Debug)]
pub enum MeshError {
    /// Generating grid is structurally unusable
    #[error("Malformed generating grid: {details}")]
    MalformedGrid { details: String },

    /// Directed index deltas around a cell do not sum to zero
    #[error("Index deltas around cell {cell} do not close: residual ({di:.3e}, {dj:.3e})")]
    OpenIndexCycle { cell: usize, di: f64, dj: f64 },

    /// A node on a boundary cycle does not have exactly two boundary edges
    #[error("Node {node} has {degree} boundary edges, expected 2")]
    NodeDegree { node: usize, degree: usize },

    /// Neither index coordinate is constant on an edge that needs one
    #[error("Neither index coordinate is constant on generating edge {edge}")]
    NonAxisEdge { edge: usize },

    /// No generating edge brackets a boundary node in index space
    #[error("Failed to match boundary node {node} to a generating edge: no candidates")]
    NoCandidateEdge { node: usize },

    /// Best generating edge is further away than allowed
    #[error("Failed to match boundary node {node}: offset {offset:.2} > allowable {allowable:.2}")]
    BoundaryMatch {
        node: usize,
        offset: f64,
        allowable: f64,
    },

    /// Too few tangential groups to pin the harmonic fields
    #[error("Degrees of freedom must be > 0, got {dofs} ({psi_groups} psi groups, {phi_groups} phi groups)")]
    InsufficientDof {
        dofs: i64,
        psi_groups: usize,
        phi_groups: usize,
    },

    /// Stencil with a zero-area or non-finite fan triangle
    #[error("Degenerate stencil at node {node}: {details}")]
    DegenerateStencil { node: usize, details: String },

    /// dx and dy stencils reference different neighbour sets
    #[error("dx/dy stencils at node {node} use different neighbours, have to be cleverer")]
    NeighborSetMismatch { node: usize },

    /// Hole filling did not produce a conforming triangulation
    #[error("Triangulation failed: {details}")]
    Triangulation { details: String },

    /// Linear solve failed
    #[error("Linear solver failed: {details}")]
    Solver { details: String },

    /// Configuration values out of range
    #[error("Invalid configuration: {details}")]
    InvalidConfig { details: String },

    /// File I/O errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// TOML parsing errors
    #[error("TOML error: {source}")]
    Toml {
        #[from]
        source: toml::de::Error,
    },
}

impl MeshError {
    pub fn malformed_grid(details: impl Into<String>) -> Self {
        Self::MalformedGrid {
            details: details.into(),
        }
    }

    pub fn degenerate_stencil(node: usize, details: impl Into<String>) -> Self {
        Self::DegenerateStencil {
            node,
            details: details.into(),
        }
    }

    pub fn triangulation(details: impl Into<String>) -> Self {
        Self::Triangulation {
            details: details.into(),
        }
    }

    pub fn solver(details: impl Into<String>) -> Self {
        Self::Solver {
            details: details.into(),
        }
    }

    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig {
            details: details.into(),
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedGrid { .. }
            | Self::OpenIndexCycle { .. }
            | Self::NodeDegree { .. }
            | Self::NonAxisEdge { .. }
            | Self::NoCandidateEdge { .. }
            | Self::BoundaryMatch { .. }
            | Self::InsufficientDof { .. }
            | Self::InvalidConfig { .. } => ErrorKind::Configuration,
            Self::DegenerateStencil { .. }
            | Self::NeighborSetMismatch { .. }
            | Self::Triangulation { .. }
            | Self::Solver { .. } => ErrorKind::NumericalDegeneracy,
            Self::Io { .. } | Self::Toml { .. } => ErrorKind::Environment,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

/// Soft conditions recorded during a run
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    /// Query points fell outside the convex hull and were extrapolated
    Extrapolated { stage: &'static str, count: usize },
    /// Local smoothing produced a non-finite position for a node
    SkippedNode { node: usize, iteration: usize },
    /// Bezier parameter of a boundary node was clipped to [0, 1]
    ClippedParameter { edge: usize, count: usize },
    /// A generating node matched a mesh node only approximately
    LooseNodeMatch { gen_node: usize, node: usize, offset: f64 },
}

impl Advisory {
    /// Log the advisory at warn level
    pub fn log(&self) {
        match self {
            Advisory::Extrapolated { stage, count } => {
                log::warn!("{}: {} point(s) extrapolated outside the valid domain", stage, count)
            }
            Advisory::SkippedNode { node, iteration } => {
                log::debug!("local smoothing skipped node {} on iteration {} (non-finite fit)", node, iteration)
            }
            Advisory::ClippedParameter { edge, count } => {
                log::warn!("generating edge {}: {} boundary node(s) clipped to curve ends", edge, count)
            }
            Advisory::LooseNodeMatch { gen_node, node, offset } => {
                log::warn!("generating node {} matched mesh node {} with offset {:.3e}", gen_node, node, offset)
            }
        }
    }
}
