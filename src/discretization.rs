//! Node-centred discretization of the Laplacian and gradient operators
//!
//! A node and its angularly sorted neighbours form a fan of triangles. The
//! Laplacian uses cotangent-type weights of each fan triangle; the gradient
//! follows from Green's theorem over the whole fan. Boundary nodes have one
//! wedge fewer than neighbours: the gap that no cell covers.
//!
//! `construct_matrix` stacks one row per active constraint, so the resulting
//! system may have more rows than unknowns and is meant to be solved in the
//! least-squares sense.

use nalgebra::Vector2;
use sprs::{CsMat, TriMat};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{MeshError, MeshResult};
use crate::grid::UnstructuredGrid;

/// Differential operator approximated by a stencil
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    Laplacian,
    Dx,
    Dy,
}

/// Linear combination of node values approximating an operator at a node
///
/// `nodes[0]` is the centre node and `alphas[k]` the weight of `nodes[k]`.
#[derive(Debug, Clone)]
pub struct Stencil {
    pub nodes: Vec<usize>,
    pub alphas: Vec<f64>,
    /// Right-hand side contribution (no-flux correction)
    pub rhs: f64,
}

impl Stencil {
    /// Apply to nodal values
    pub fn apply(&self, values: &[f64]) -> f64 {
        self.nodes
            .iter()
            .zip(&self.alphas)
            .map(|(&n, a)| a * values[n])
            .sum()
    }
}

/// Boundary-condition sets for one scalar field
#[derive(Debug, Clone, Default)]
pub struct BoundaryConditions {
    /// Pinned node values
    pub dirichlet: BTreeMap<usize, f64>,
    /// Groups of nodes sharing one value; the first node leads
    pub tangential: Vec<Vec<usize>>,
    /// Node to unit vector: the derivative normal to it is zero
    pub gradient: BTreeMap<usize, Vector2<f64>>,
}

impl BoundaryConditions {
    /// Nodes with any boundary condition
    pub fn constrained_nodes(&self) -> BTreeSet<usize> {
        let mut nodes: BTreeSet<usize> = self.dirichlet.keys().copied().collect();
        nodes.extend(self.gradient.keys().copied());
        nodes.extend(self.tangential.iter().flatten().copied());
        nodes
    }

    /// Rows contributed beyond the Laplacian rows
    pub fn n_rows(&self) -> usize {
        self.dirichlet.len()
            + self.gradient.len()
            + self.tangential.iter().map(|g| g.len().saturating_sub(1)).sum::<usize>()
    }
}

/// Stencil builder over a grid whose nodes are all valid
pub struct NodeDiscretization<'a, N, E> {
    grid: &'a UnstructuredGrid<N, E>,
}

impl<'a, N: Clone, E: Clone + Default> NodeDiscretization<'a, N, E> {
    pub fn new(grid: &'a UnstructuredGrid<N, E>) -> Self {
        Self { grid }
    }

    /// Neighbours ordered so that wedges `(N[m], N[m+1])` are inside the mesh
    ///
    /// For boundary nodes the list is rotated so the uncovered wedge sits
    /// between the last and the first neighbour.
    fn ordered_neighbors(&self, n0: usize) -> (Vec<usize>, bool) {
        let mut nbrs = self.grid.angle_sort_adjacent_nodes(n0);
        if !self.grid.is_boundary_node(n0) || nbrs.len() < 2 {
            return (nbrs, false);
        }
        let cells = self.grid.node_to_cells(n0);
        let p = nbrs.len();
        let covered = |a: usize, b: usize| {
            cells.iter().any(|&c| {
                let nodes = self.grid.cell_to_nodes(c);
                nodes.contains(&a) && nodes.contains(&b)
            })
        };
        if let Some(gap) = (0..p).find(|&k| !covered(nbrs[k], nbrs[(k + 1) % p])) {
            nbrs.rotate_left((gap + 1) % p);
        }
        (nbrs, true)
    }

    /// Stencil of `op` at node `n0`
    pub fn node_discretization(&self, n0: usize, op: OperatorKind) -> MeshResult<Stencil> {
        let (nbrs, boundary) = self.ordered_neighbors(n0);
        let p = nbrs.len();
        let m = if boundary { p.saturating_sub(1) } else { p };
        if m == 0 || (!boundary && p < 3) {
            return Err(MeshError::degenerate_stencil(n0, format!("only {} neighbours", p)));
        }

        let x0 = self.grid.x(n0);
        let (cx, cy) = (x0.x, x0.y);
        let xs: Vec<f64> = nbrs.iter().map(|&n| self.grid.x(n).x).collect();
        let ys: Vec<f64> = nbrs.iter().map(|&n| self.grid.x(n).y).collect();

        // fan triangle areas
        let areas: Vec<f64> = (0..m)
            .map(|e| {
                let ep = (e + 1) % p;
                0.5 * ((xs[e] - cx) * (ys[ep] - cy) - (xs[ep] - cx) * (ys[e] - cy))
            })
            .collect();
        if let Some(bad) = areas.iter().position(|a| !a.is_finite() || *a == 0.0) {
            return Err(MeshError::degenerate_stencil(
                n0,
                format!("fan triangle {} has area {:e}", bad, areas[bad]),
            ));
        }
        let total: f64 = areas.iter().sum();

        let mut alphas = Vec::with_capacity(p + 1);
        let mut alpha0 = 0.0;
        for e in 0..m {
            let ep = (e + 1) % p;
            alpha0 += match op {
                OperatorKind::Laplacian => {
                    -((ys[e] - ys[ep]).powi(2) + (xs[ep] - xs[e]).powi(2)) / (4.0 * areas[e])
                }
                OperatorKind::Dx => (ys[e] - ys[ep]) / (2.0 * total),
                OperatorKind::Dy => (xs[ep] - xs[e]) / (2.0 * total),
            };
        }
        if !alpha0.is_finite() {
            return Err(MeshError::degenerate_stencil(n0, "self coefficient is not finite"));
        }
        alphas.push(alpha0);

        for k in 0..p {
            let km = (k + p - 1) % p;
            let kp = (k + 1) % p;
            let mut a = 0.0;
            // wedge behind neighbour k
            if k > 0 || p == m {
                a += match op {
                    OperatorKind::Laplacian => {
                        -1.0 / (4.0 * areas[km])
                            * ((ys[km] - ys[k]) * (cy - ys[km]) + (xs[k] - xs[km]) * (xs[km] - cx))
                    }
                    OperatorKind::Dx => (cy - ys[km]) / (2.0 * total),
                    OperatorKind::Dy => (xs[km] - cx) / (2.0 * total),
                };
            }
            // wedge ahead of neighbour k
            if k < m {
                a += match op {
                    OperatorKind::Laplacian => {
                        -1.0 / (4.0 * areas[k])
                            * ((ys[k] - ys[kp]) * (ys[kp] - cy) + (xs[kp] - xs[k]) * (cx - xs[kp]))
                    }
                    OperatorKind::Dx => (ys[kp] - cy) / (2.0 * total),
                    OperatorKind::Dy => (cx - xs[kp]) / (2.0 * total),
                };
            }
            alphas.push(a);
        }

        let mut nodes = Vec::with_capacity(p + 1);
        nodes.push(n0);
        nodes.extend(nbrs);
        Ok(Stencil {
            nodes,
            alphas,
            rhs: 0.0,
        })
    }

    /// Square matrix with one row per node holding its `op` stencil
    pub fn operator_matrix(&self, op: OperatorKind) -> MeshResult<CsMat<f64>> {
        let n = self.grid.n_nodes();
        let mut triplets = TriMat::new((n, n));
        for n0 in self.grid.valid_nodes() {
            let stencil = self.node_discretization(n0, op)?;
            for (&col, &a) in stencil.nodes.iter().zip(&stencil.alphas) {
                triplets.add_triplet(n0, col, a);
            }
        }
        Ok(triplets.to_csr())
    }

    /// Assemble Laplacian rows with mixed boundary rows
    ///
    /// Row order: Laplacian rows of unconstrained nodes, Dirichlet rows,
    /// gradient rows, then one row per non-leading member of each
    /// tangential group.
    pub fn construct_matrix(&self, bcs: &BoundaryConditions) -> MeshResult<(CsMat<f64>, Vec<f64>)> {
        let constrained = bcs.constrained_nodes();
        let laplace_nodes: Vec<usize> = self
            .grid
            .valid_nodes()
            .filter(|n| !constrained.contains(n))
            .collect();
        let n_rows = laplace_nodes.len() + bcs.n_rows();
        let mut triplets = TriMat::new((n_rows, self.grid.n_nodes()));
        let mut rhs = Vec::with_capacity(n_rows);

        for &n0 in &laplace_nodes {
            let stencil = self.node_discretization(n0, OperatorKind::Laplacian)?;
            let row = rhs.len();
            for (&col, &a) in stencil.nodes.iter().zip(&stencil.alphas) {
                triplets.add_triplet(row, col, a);
            }
            rhs.push(stencil.rhs);
        }

        for (&n, &value) in &bcs.dirichlet {
            triplets.add_triplet(rhs.len(), n, 1.0);
            rhs.push(value);
        }

        for (&n, along) in &bcs.gradient {
            let dx = self.node_discretization(n, OperatorKind::Dx)?;
            let dy = self.node_discretization(n, OperatorKind::Dy)?;
            let row = rhs.len();
            for (col, a) in gradient_row(n, &dx, &dy, along)? {
                triplets.add_triplet(row, col, a);
            }
            rhs.push(0.0);
        }

        for group in &bcs.tangential {
            let Some((&leader, rest)) = group.split_first() else {
                continue;
            };
            for &n in rest {
                let row = rhs.len();
                triplets.add_triplet(row, n, 1.0);
                triplets.add_triplet(row, leader, -1.0);
                rhs.push(0.0);
            }
        }

        Ok((triplets.to_csr(), rhs))
    }
}

/// Coefficients of the derivative normal to `along`, from matching dx/dy stencils
fn gradient_row(n: usize, dx: &Stencil, dy: &Stencil, along: &Vector2<f64>) -> MeshResult<Vec<(usize, f64)>> {
    if dx.nodes != dy.nodes {
        return Err(MeshError::NeighborSetMismatch { node: n });
    }
    let normal = Vector2::new(along.y, -along.x);
    Ok(dx
        .nodes
        .iter()
        .enumerate()
        .map(|(k, &col)| (col, dx.alphas[k] * normal.x + dy.alphas[k] * normal.y))
        .collect())
}
