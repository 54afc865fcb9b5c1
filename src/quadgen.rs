//! Meshing pipeline
//!
//! `QuadGen` meshes the region covered by a whole generating grid:
//! boundary parameterization, intermediate mesh, psi/phi solve, field
//! correspondence and final placement. `QuadsGen` runs one `QuadGen` per
//! generating cell and merges the results.

use nalgebra::Vector2;

use crate::config::{FinalKind, IntermediateKind, MeshingConfig};
use crate::discretization::BoundaryConditions;
use crate::error::{Advisory, MeshError, MeshResult};
use crate::fields::{calc_psi_phi, HarmonicFields};
use crate::grid::GeneratingGrid;
use crate::intermediate::{IntermediateBuilder, IntermediateMesh};
use crate::interpolate::LinearExtrapolator;
use crate::linalg::SolverStats;
use crate::mapping::{adjust_by_psi_phi, psiphi_interpolator, remap_ij, FieldCorrespondence, FinalGrid, FinalNode};
use crate::parameterization::{BoundaryParameterization, IndexScale};
use crate::relax::smooth_interior_quads;
use crate::triangulate::{DelaunayHoleFiller, HoleFiller};

/// Everything a single meshing run produced
#[derive(Debug, Clone)]
pub struct QuadGenOutput {
    /// Final mesh; node payload is the user index coordinate
    pub grid: FinalGrid,
    pub param: BoundaryParameterization,
    pub intermediate: IntermediateMesh,
    pub fields: HarmonicFields,
    pub correspondence: FieldCorrespondence,
    /// (psi, phi) to geographic position
    pub interpolator: LinearExtrapolator<2>,
    /// Final solve of the boundary-sliding smoother, quad intermediates only
    pub smoother_stats: Option<SolverStats>,
    pub advisories: Vec<Advisory>,
}

impl QuadGenOutput {
    pub fn psi_bcs(&self) -> &BoundaryConditions {
        &self.fields.psi_bcs
    }

    pub fn phi_bcs(&self) -> &BoundaryConditions {
        &self.fields.phi_bcs
    }

    /// Per generating node: geographic minus index-space turning angle
    pub fn theta_err(&self) -> &[Option<f64>] {
        &self.param.bezier.theta_err
    }
}

/// One meshing run over a generating grid
pub struct QuadGen {
    gen: GeneratingGrid,
    config: MeshingConfig,
    filler: Box<dyn HoleFiller>,
}

impl QuadGen {
    pub fn new(gen: GeneratingGrid, config: MeshingConfig) -> MeshResult<Self> {
        config.validate()?;
        let filler = Box::new(DelaunayHoleFiller::new(config.hole_fill_growth));
        Ok(Self { gen, config, filler })
    }

    /// Replace the triangulator used for triangle intermediates
    pub fn with_hole_filler(mut self, filler: Box<dyn HoleFiller>) -> Self {
        self.filler = filler;
        self
    }

    pub fn generating_grid(&self) -> &GeneratingGrid {
        &self.gen
    }

    pub fn config(&self) -> &MeshingConfig {
        &self.config
    }

    pub fn execute(&self) -> MeshResult<QuadGenOutput> {
        let gen = &self.gen;
        let config = &self.config;
        log::info!("meshing {} generating cell(s): {}", gen.count_valid_cells(), config.summary());
        let mut advisories = Vec::new();

        let param = BoundaryParameterization::new(gen, config)?;
        let builder = IntermediateBuilder::new(gen, &param, config);

        let mut smoother_stats = None;
        let intermediate = match config.intermediate {
            IntermediateKind::Tri => builder.build_tri(self.filler.as_ref())?,
            IntermediateKind::Quad => {
                let mut mesh = builder.build_quad(&mut advisories)?;
                advisories.extend(builder.adjust_intermediate_bounds(&mut mesh));
                smoother_stats = Some(smooth_interior_quads(gen, &param, &mut mesh, config)?);
                mesh
            }
        };

        let fields = calc_psi_phi(&intermediate, config)?;
        let interpolator = psiphi_interpolator(&intermediate.grid, &fields)?;

        let scale = match config.final_kind {
            FinalKind::Isotropic => IndexScale::Nominal,
            FinalKind::Anisotropic | FinalKind::Triangle => IndexScale::User,
        };
        let correspondence = FieldCorrespondence::build(gen, param.field(scale), &intermediate.grid, &fields)?;
        if !correspondence.is_monotonic() {
            return Err(MeshError::malformed_grid(
                "index to field correspondence is not monotonic",
            ));
        }

        let grid = match config.final_kind {
            FinalKind::Triangle => intermediate.grid.map_nodes(|n, _| FinalNode {
                ij: correspondence.psiphi_to_ij(&Vector2::new(fields.psi[n], fields.phi[n])),
            }),
            FinalKind::Anisotropic | FinalKind::Isotropic => {
                // patch positions are replaced below, so their advisories are dropped
                let patches = builder.quad_patches(scale, &mut Vec::new())?;
                let mut grid = patches.map_nodes(|_, node| FinalNode {
                    ij: node.data.ij.unwrap_or_else(|| Vector2::repeat(f64::NAN)),
                });
                advisories.extend(adjust_by_psi_phi(&mut grid, &correspondence, &interpolator));
                if config.final_kind == FinalKind::Isotropic {
                    let (ij, remap_advisories) = remap_ij(gen, &param.ij, &grid)?;
                    advisories.extend(remap_advisories);
                    let nodes: Vec<usize> = grid.valid_nodes().collect();
                    for n in nodes {
                        grid.node_mut(n).data.ij = ij[n];
                    }
                }
                grid
            }
        };

        log::info!(
            "final {:?} mesh: {} nodes, {} cells, {} advisories",
            config.final_kind,
            grid.count_valid_nodes(),
            grid.count_valid_cells(),
            advisories.len()
        );
        Ok(QuadGenOutput {
            grid,
            param,
            intermediate,
            fields,
            correspondence,
            interpolator,
            smoother_stats,
            advisories,
        })
    }
}

/// Merged result of meshing each generating cell on its own
#[derive(Debug, Clone)]
pub struct QuadsGenOutput {
    pub grid: FinalGrid,
    /// One run per generating cell, in cell order
    pub runs: Vec<QuadGenOutput>,
}

impl QuadsGenOutput {
    pub fn advisories(&self) -> impl Iterator<Item = &Advisory> + '_ {
        self.runs.iter().flat_map(|r| r.advisories.iter())
    }
}

/// Mesh every generating cell independently and stitch the results
pub struct QuadsGen {
    gen: GeneratingGrid,
    config: MeshingConfig,
}

impl QuadsGen {
    pub fn new(gen: GeneratingGrid, config: MeshingConfig) -> MeshResult<Self> {
        config.validate()?;
        Ok(Self { gen, config })
    }

    pub fn execute(&self) -> MeshResult<QuadsGenOutput> {
        let mut grid = FinalGrid::new();
        let mut runs = Vec::new();
        for c in self.gen.valid_cells() {
            log::info!("generating cell {}", c);
            let local = self.gen.extract_cell(c)?;
            let run = QuadGen::new(local, self.config.clone())?.execute()?;
            grid.add_grid(&run.grid, self.config.node_snap_tolerance)?;
            runs.push(run);
        }
        log::info!(
            "merged {} run(s): {} nodes, {} cells",
            runs.len(),
            grid.count_valid_nodes(),
            grid.count_valid_cells()
        );
        Ok(QuadsGenOutput { grid, runs })
    }
}
