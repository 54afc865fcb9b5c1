//! Harmonic stream function (psi) and velocity potential (phi)
//!
//! The boundary of the intermediate mesh is split into runs of constant `i`
//! (psi is constant along them) and runs of constant `j` (phi is constant).
//! Edges on neither kind of run get a prescribed gradient direction instead.
//! Both Laplacians, their boundary rows and the Cauchy-Riemann coupling
//! rows go into one over-determined system solved by least squares.

use nalgebra::Vector2;
use sprs::{CsMat, TriMat};
use std::collections::BTreeMap;

use crate::config::{GradientScale, MeshingConfig};
use crate::discretization::{BoundaryConditions, NodeDiscretization, OperatorKind};
use crate::error::{MeshError, MeshResult};
use crate::geometry;
use crate::intermediate::{IntermediateGrid, IntermediateMesh};
use crate::linalg::{solve_least_squares, SolverStats};

/// A run of boundary nodes sharing one index value
#[derive(Debug, Clone)]
pub struct TangentialGroup {
    pub value: f64,
    pub nodes: Vec<usize>,
}

/// Boundary-condition sets derived from the boundary cycle
#[derive(Debug, Clone)]
pub struct BoundaryClassification {
    /// Constant-i runs
    pub psi_groups: Vec<TangentialGroup>,
    /// Constant-j runs
    pub phi_groups: Vec<TangentialGroup>,
    pub psi_gradient: BTreeMap<usize, Vector2<f64>>,
    pub phi_gradient: BTreeMap<usize, Vector2<f64>>,
}

/// Solved fields and the constraints that produced them
#[derive(Debug, Clone)]
pub struct HarmonicFields {
    pub psi: Vec<f64>,
    pub phi: Vec<f64>,
    pub psi_bcs: BoundaryConditions,
    pub phi_bcs: BoundaryConditions,
    /// Surplus degrees of freedom left to the coupling rows
    pub dofs: i64,
    pub gradient_scale: f64,
    pub stats: SolverStats,
}

fn node_ij(grid: &IntermediateGrid, n: usize) -> MeshResult<Vector2<f64>> {
    grid.node(n)
        .data
        .ij
        .ok_or_else(|| MeshError::malformed_grid(format!("boundary node {} has no index coordinate", n)))
}

/// Gradient directions of psi and phi at each boundary node
///
/// Per edge, the geographic tangent is rotated by the angle that takes the
/// index-space tangent onto the i axis. Node values average the two
/// adjacent edges, closing edge included. phi is psi turned 90 degrees
/// clockwise.
pub fn calc_bc_gradients(
    grid: &IntermediateGrid,
    cycle: &[usize],
) -> MeshResult<(BTreeMap<usize, Vector2<f64>>, BTreeMap<usize, Vector2<f64>>)> {
    let m = cycle.len();
    let mut edge_grad = Vec::with_capacity(m);
    for k in 0..m {
        let (a, b) = (cycle[k], cycle[(k + 1) % m]);
        let tang_xy = geometry::to_unit(&(grid.x(b) - grid.x(a)));
        let t = geometry::to_unit(&(node_ij(grid, b)? - node_ij(grid, a)?));
        edge_grad.push(Vector2::new(
            t.x * tang_xy.x + t.y * tang_xy.y,
            -t.y * tang_xy.x + t.x * tang_xy.y,
        ));
    }

    let mut grad_psi = BTreeMap::new();
    let mut grad_phi = BTreeMap::new();
    for k in 0..m {
        let g = (edge_grad[k] + edge_grad[(k + m - 1) % m]) * 0.5;
        grad_psi.insert(cycle[k], g);
        grad_phi.insert(cycle[k], Vector2::new(g.y, -g.x));
    }
    Ok((grad_psi, grad_phi))
}

/// Split the boundary cycle into tangential groups and gradient nodes
pub fn classify_boundary(grid: &IntermediateGrid, cycle: &[usize]) -> MeshResult<BoundaryClassification> {
    let (grad_psi, grad_phi) = calc_bc_gradients(grid, cycle)?;
    let mut groups: [Vec<TangentialGroup>; 2] = [Vec::new(), Vec::new()];
    let mut open: [bool; 2] = [false, false];
    let mut psi_gradient = BTreeMap::new();
    let mut phi_gradient = BTreeMap::new();

    let m = cycle.len();
    let mut n1 = cycle[m - 1];
    for &n2 in cycle {
        let (ij1, ij2) = (node_ij(grid, n1)?, node_ij(grid, n2)?);
        let mut any = false;
        for axis in 0..2 {
            let matched = geometry::allclose(ij1[axis], ij2[axis]);
            if matched {
                any = true;
                if !open[axis] {
                    groups[axis].push(TangentialGroup {
                        value: ij1[axis],
                        nodes: vec![n1],
                    });
                    open[axis] = true;
                }
                if let Some(group) = groups[axis].last_mut() {
                    group.nodes.push(n2);
                }
            } else {
                open[axis] = false;
            }
        }
        if !any {
            for n in [n1, n2] {
                psi_gradient.insert(n, grad_psi[&n]);
                phi_gradient.insert(n, grad_phi[&n]);
            }
        }
        n1 = n2;
    }

    // the cycle usually starts inside a run
    for axis_groups in groups.iter_mut() {
        if axis_groups.len() > 1 {
            let first_node = axis_groups[0].nodes[0];
            let wraps = axis_groups.last().and_then(|g| g.nodes.last()) == Some(&first_node);
            if wraps {
                if let Some(last) = axis_groups.pop() {
                    let tail = &last.nodes[..last.nodes.len() - 1];
                    axis_groups[0].nodes.extend_from_slice(tail);
                }
            }
        } else if let Some(only) = axis_groups.first_mut() {
            // a single run around the whole cycle repeats its first node
            if only.nodes.len() > 1 && only.nodes.first() == only.nodes.last() {
                only.nodes.pop();
            }
        }
    }

    let [psi_groups, phi_groups] = groups;
    Ok(BoundaryClassification {
        psi_groups,
        phi_groups,
        psi_gradient,
        phi_gradient,
    })
}

/// Copy `block * scale` into `triplets` at the given offsets
fn add_block(triplets: &mut TriMat<f64>, block: &CsMat<f64>, row_off: usize, col_off: usize, scale: f64) {
    for (&val, (row, col)) in block.iter() {
        triplets.add_triplet(row_off + row, col_off + col, val * scale);
    }
}

/// Solve psi and phi on an intermediate mesh
pub fn calc_psi_phi(mesh: &IntermediateMesh, config: &MeshingConfig) -> MeshResult<HarmonicFields> {
    let grid = &mesh.grid;
    let cycle = grid.boundary_cycle()?;
    let classes = classify_boundary(grid, &cycle)?;
    let (gi, gj) = (classes.psi_groups.len(), classes.phi_groups.len());

    let dofs = gi as i64 + gj as i64 - 3;
    if dofs <= 0 || gi < 2 || gj < 2 {
        return Err(MeshError::InsufficientDof {
            dofs,
            psi_groups: gi,
            phi_groups: gj,
        });
    }

    // psi spans [-1, 1] between the extreme i groups; one j group pins phi
    let low_i = (0..gi)
        .min_by(|&a, &b| classes.psi_groups[a].value.total_cmp(&classes.psi_groups[b].value))
        .unwrap_or(0);
    let high_i = (0..gi)
        .max_by(|&a, &b| classes.psi_groups[a].value.total_cmp(&classes.psi_groups[b].value))
        .unwrap_or(0);

    let mut psi_bcs = BoundaryConditions {
        tangential: classes.psi_groups.iter().map(|g| g.nodes.clone()).collect(),
        gradient: classes.psi_gradient.clone(),
        ..BoundaryConditions::default()
    };
    psi_bcs.dirichlet.insert(classes.psi_groups[low_i].nodes[0], -1.0);
    psi_bcs.dirichlet.insert(classes.psi_groups[high_i].nodes[0], 1.0);

    let mut phi_bcs = BoundaryConditions {
        tangential: classes.phi_groups.iter().map(|g| g.nodes.clone()).collect(),
        gradient: classes.phi_gradient.clone(),
        ..BoundaryConditions::default()
    };
    phi_bcs.dirichlet.insert(classes.phi_groups[1].nodes[0], 1.0);

    let n = grid.n_nodes();
    let gradient_scale = match config.gradient_scale {
        GradientScale::Fixed(s) => s,
        GradientScale::Scaled => dofs as f64 / (2 * n) as f64,
    };

    let disc = NodeDiscretization::new(grid);
    let (m_psi, b_psi) = disc.construct_matrix(&psi_bcs)?;
    let (m_phi, b_phi) = disc.construct_matrix(&phi_bcs)?;
    let m_dx = disc.operator_matrix(OperatorKind::Dx)?;
    let m_dy = disc.operator_matrix(OperatorKind::Dy)?;

    let rows = m_psi.rows() + m_phi.rows() + 2 * n;
    let mut triplets = TriMat::new((rows, 2 * n));
    let r_phi = m_psi.rows();
    let r_cr = r_phi + m_phi.rows();
    add_block(&mut triplets, &m_psi, 0, 0, 1.0);
    add_block(&mut triplets, &m_phi, r_phi, n, 1.0);
    // d psi/dy - d phi/dx = 0
    add_block(&mut triplets, &m_dy, r_cr, 0, gradient_scale);
    add_block(&mut triplets, &m_dx, r_cr, n, -gradient_scale);
    // d psi/dx + d phi/dy = 0
    add_block(&mut triplets, &m_dx, r_cr + n, 0, gradient_scale);
    add_block(&mut triplets, &m_dy, r_cr + n, n, gradient_scale);
    let big: CsMat<f64> = triplets.to_csr();

    let mut rhs = b_psi;
    rhs.extend(b_phi);
    rhs.extend(std::iter::repeat(0.0).take(2 * n));

    let (x, stats) = solve_least_squares(&big, &rhs, &config.solver)?;
    let phi = x[n..].to_vec();
    let mut psi = x;
    psi.truncate(n);

    log::info!(
        "psi/phi: {} nodes, {} psi groups, {} phi groups, dofs {}, residual {:.3e}",
        n,
        gi,
        gj,
        dofs,
        stats.residual_norm
    );
    Ok(HarmonicFields {
        psi,
        phi,
        psi_bcs,
        phi_bcs,
        dofs,
        gradient_scale,
        stats,
    })
}
