//! Boundary-sliding smoother for quad intermediate meshes
//!
//! One 2N x 2N system per iteration, x components first then y:
//! - rigid nodes keep their position,
//! - slidable nodes stay on the tangent line of their generating curve and
//!   their edge into the interior is made perpendicular to it,
//! - interior nodes satisfy a graph Laplacian weighted by index-space
//!   direction and geographic edge length.
//!
//! After each solve slidable nodes are projected back onto their curve.

use nalgebra::Vector2;
use sprs::{CsMat, TriMat};
use std::collections::HashMap;

use crate::bezier::BoundaryCurve;
use crate::config::MeshingConfig;
use crate::error::{MeshError, MeshResult};
use crate::grid::GeneratingGrid;
use crate::intermediate::{IntermediateMesh, NodeRole};
use crate::linalg::{DirectSolver, Lsqr, Solver, SolverStats};
use crate::parameterization::BoundaryParameterization;

fn pin(triplets: &mut TriMat<f64>, rhs: &mut [f64], n: usize, big_n: usize, x: f64, y: f64) {
    triplets.add_triplet(n, n, 1.0);
    rhs[n] = x;
    triplets.add_triplet(big_n + n, big_n + n, 1.0);
    rhs[big_n + n] = y;
}

/// Run `config.smooth_iterations` passes of the sliding smoother
pub fn smooth_interior_quads(
    gen: &GeneratingGrid,
    param: &BoundaryParameterization,
    mesh: &mut IntermediateMesh,
    config: &MeshingConfig,
) -> MeshResult<SolverStats> {
    let grid = &mut mesh.grid;
    let samples = config.bezier_samples_per_edge;

    let mut curves: HashMap<usize, BoundaryCurve> = HashMap::new();
    for n in grid.valid_nodes() {
        if let Some(j) = grid.node(n).data.gen_edge {
            if !curves.contains_key(&j) {
                let curve = match param.bezier_curve(gen, Some(j), samples, true) {
                    // ragged edges only span themselves
                    Err(MeshError::NonAxisEdge { .. }) => param.bezier_curve(gen, Some(j), samples, false)?,
                    other => other?,
                };
                curves.insert(j, curve);
            }
        }
    }
    let curve_of = |data_edge: Option<usize>| data_edge.and_then(|j| curves.get(&j));

    let big_n = grid.n_nodes();
    let mut stats = SolverStats::new();
    for iteration in 0..config.smooth_iterations {
        let mut triplets = TriMat::new((2 * big_n, 2 * big_n));
        let mut rhs = vec![0.0; 2 * big_n];
        let mut fallback = 0;

        for n in 0..big_n {
            let x = grid.x(n);
            if grid.is_node_deleted(n) {
                pin(&mut triplets, &mut rhs, n, big_n, x.x, x.y);
                continue;
            }
            let data = &grid.node(n).data;
            if grid.is_boundary_node(n) {
                let slidable = data.role == NodeRole::Slidable;
                let (boundary_nbrs, interior_nbrs): (Vec<usize>, Vec<usize>) = grid
                    .node_to_nodes(n)
                    .into_iter()
                    .partition(|&m| grid.node(m).data.gen_edge.is_some());
                let curve = curve_of(data.gen_edge);
                match curve {
                    Some(curve) if slidable && boundary_nbrs.len() == 2 && interior_nbrs.len() == 1 => {
                        let tng = curve.tangent(curve.point_to_f(&x));
                        let nrm = Vector2::new(-tng.y, tng.x);
                        // on the tangent line
                        triplets.add_triplet(n, n, nrm.x);
                        triplets.add_triplet(n, big_n + n, nrm.y);
                        rhs[n] = nrm.dot(&x.coords);
                        // edge to the interior neighbour along the normal
                        let inbr = interior_nbrs[0];
                        triplets.add_triplet(big_n + n, n, tng.x);
                        triplets.add_triplet(big_n + n, inbr, -tng.x);
                        triplets.add_triplet(big_n + n, big_n + n, tng.y);
                        triplets.add_triplet(big_n + n, big_n + inbr, -tng.y);
                    }
                    _ => {
                        if slidable {
                            fallback += 1;
                        }
                        pin(&mut triplets, &mut rhs, n, big_n, x.x, x.y);
                    }
                }
                continue;
            }

            let ij = data
                .ij
                .ok_or_else(|| MeshError::malformed_grid(format!("interior node {} has no index coordinate", n)))?;
            let nbrs = grid.node_to_nodes(n);
            let mut deltas = Vec::with_capacity(nbrs.len());
            let mut weight_sums = Vector2::zeros();
            for &m in &nbrs {
                let ij_m = grid.node(m).data.ij.ok_or_else(|| {
                    MeshError::malformed_grid(format!("interior node {} has no index coordinate", m))
                })?;
                let delta = (ij - ij_m).abs();
                let dist = (grid.x(m) - x).norm();
                weight_sums += delta * dist;
                deltas.push(delta);
            }
            let scales = Vector2::new(1.0 / weight_sums.x, 1.0 / weight_sums.y);
            if !(scales.x.is_finite() && scales.y.is_finite()) {
                return Err(MeshError::degenerate_stencil(n, "zero length scale in sliding smoother"));
            }
            let mut diag = 0.0;
            for (&m, delta) in nbrs.iter().zip(&deltas) {
                let fac = delta.dot(&scales);
                triplets.add_triplet(n, m, fac);
                triplets.add_triplet(big_n + n, big_n + m, fac);
                diag -= fac;
            }
            triplets.add_triplet(n, n, diag);
            triplets.add_triplet(big_n + n, big_n + n, diag);
        }
        if fallback > 0 {
            log::debug!("sliding smoother: {} slidable node(s) held in place", fallback);
        }

        let a: CsMat<f64> = triplets.to_csr();
        let (xy, s) = if 2 * big_n <= config.solver.dense_limit {
            DirectSolver::new().solve(&a, &rhs)?
        } else {
            Lsqr::new()
                .with_max_iterations(config.solver.lsqr_max_iterations)
                .with_tolerance(config.solver.lsqr_tolerance)
                .solve(&a, &rhs)?
        };
        stats = s;

        for n in 0..big_n {
            if grid.is_node_deleted(n) {
                continue;
            }
            let mut p = nalgebra::Point2::new(xy[n], xy[big_n + n]);
            let data = &grid.node(n).data;
            if data.role == NodeRole::Slidable {
                if let Some(curve) = curve_of(data.gen_edge) {
                    p = curve.project(&p);
                }
            }
            grid.set_x(n, p);
        }
        log::debug!(
            "sliding smoother iteration {}: residual {:.3e}",
            iteration,
            stats.residual_norm
        );
    }
    Ok(stats)
}
