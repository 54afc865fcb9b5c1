pub mod error;
pub mod config;
pub mod geometry;
pub mod grid;
pub mod bezier;
pub mod parameterization;
pub mod triangulate;
pub mod interpolate;
pub mod discretization;
pub mod linalg;
pub mod intermediate;
pub mod fields;     // psi/phi solve
pub mod mapping;    // fields back to geography
pub mod relax;
pub mod quality;
pub mod quadgen;

pub use error::{Advisory, ErrorKind, MeshError, MeshResult};
pub use config::{FinalKind, GradientScale, IntermediateKind, MeshingConfig, SolverSettings};
pub use grid::{GenNode, GeneratingGrid, GeneratingGridSpec, NodeLocator, UnstructuredGrid};
pub use bezier::BoundaryCurve;
pub use parameterization::{BoundaryParameterization, IndexField, IndexScale};
pub use triangulate::{DelaunayHoleFiller, HoleFill, HoleFiller};
pub use interpolate::LinearExtrapolator;
pub use discretization::{BoundaryConditions, NodeDiscretization, OperatorKind, Stencil};
pub use linalg::{DirectSolver, Lsqr, Solver, SolverStats};
pub use intermediate::{IntNode, IntermediateBuilder, IntermediateGrid, IntermediateMesh, NodeRole};
pub use fields::{calc_psi_phi, HarmonicFields};
pub use mapping::{FieldCorrespondence, FinalGrid, FinalNode};
pub use relax::{smooth_interior_quads, LocalSmoothParams, SmoothReport, Tweaker};
pub use quality::{assess_orthogonality, OrthogonalityReport};
pub use quadgen::{QuadGen, QuadGenOutput, QuadsGen, QuadsGenOutput};
