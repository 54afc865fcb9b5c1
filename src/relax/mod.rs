//! Local mesh relaxation
//!
//! `Tweaker` works on any `UnstructuredGrid` and only moves nodes; topology is
//! never changed. The boundary-sliding smoother for quad intermediates lives
//! in `sliding`.

pub mod sliding;

pub use sliding::smooth_interior_quads;

use nalgebra::{DMatrix, DVector, Point2, Vector2};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::error::Advisory;
use crate::geometry;
use crate::grid::UnstructuredGrid;

/// Halo assigned to nodes that cannot reach the outside of the subset
pub const MAX_HALO: usize = 20;

/// Parameters of `Tweaker::local_smooth`
#[derive(Debug, Clone)]
pub struct LocalSmoothParams {
    pub iterations: usize,
    /// Half-width of the square (i, j) stencil
    pub stencil_radius: i64,
    /// Nodes closer than this to the outside of the subset stay put
    pub min_halo: usize,
    /// Restrict movement to these nodes; `None` allows the whole subset
    pub free_nodes: Option<HashSet<usize>>,
}

impl Default for LocalSmoothParams {
    fn default() -> Self {
        Self {
            iterations: 3,
            stencil_radius: 1,
            min_halo: 2,
            free_nodes: None,
        }
    }
}

/// Outcome of a local smoothing pass
#[derive(Debug, Clone, Default)]
pub struct SmoothReport {
    /// Nodes whose position changed by the patch fit
    pub moved: usize,
    /// Nodes that had an orthogonality nudge applied afterwards
    pub nudged: usize,
    pub advisories: Vec<Advisory>,
}

/// Node-moving operations bound to one grid
pub struct Tweaker<'g, N, E> {
    grid: &'g mut UnstructuredGrid<N, E>,
}

impl<'g, N: Clone, E: Clone + Default> Tweaker<'g, N, E> {
    pub fn new(grid: &'g mut UnstructuredGrid<N, E>) -> Self {
        Self { grid }
    }

    /// Move `n` so it sits at the mean corner radius of each adjacent quad
    ///
    /// Triangles carry no orthogonality constraint here. Returns false, and
    /// leaves the node alone, when no adjacent cell has four or more sides.
    pub fn nudge_node_orthogonal(&mut self, n: usize) -> bool {
        let x = self.grid.x(n);
        let mut targets: Vec<Point2<f64>> = Vec::new();
        for c in self.grid.node_to_cells(n) {
            let points = self.grid.cell_points(c);
            if points.len() <= 3 {
                continue;
            }
            let Some(center) = geometry::poly_circumcenter(&points) else {
                continue;
            };
            let radius = points.iter().map(|p| (p - center).norm()).sum::<f64>() / points.len() as f64;
            let dir = geometry::to_unit(&(x - center));
            targets.push(center + dir * radius);
        }
        if targets.is_empty() {
            return false;
        }
        let mean = targets.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / targets.len() as f64;
        if !(mean.x.is_finite() && mean.y.is_finite()) {
            return false;
        }
        self.grid.set_x(n, Point2::from(mean));
        true
    }

    pub fn nudge_cell_orthogonal(&mut self, c: usize) {
        let nodes = self.grid.cell_to_nodes(c).to_vec();
        for n in nodes {
            self.nudge_node_orthogonal(n);
        }
    }

    /// Steps from each node of `nodes` to the nearest node outside the set
    ///
    /// Breadth-first from the outer ring, capped at `max_halo`. Nodes with no
    /// path to the outside get `max_halo`.
    pub fn calc_halo(&self, nodes: &[usize], max_halo: usize) -> Vec<usize> {
        let slot: HashMap<usize, usize> = nodes.iter().enumerate().map(|(k, &n)| (n, k)).collect();
        let mut halo: Vec<Option<usize>> = vec![None; nodes.len()];
        let mut queue = VecDeque::new();

        for (k, &n) in nodes.iter().enumerate() {
            if self.grid.node_to_nodes(n).iter().any(|m| !slot.contains_key(m)) {
                halo[k] = Some(0);
                queue.push_back(k);
            }
        }
        while let Some(k) = queue.pop_front() {
            let h = halo[k].unwrap_or(0);
            if h >= max_halo {
                continue;
            }
            for m in self.grid.node_to_nodes(nodes[k]) {
                if let Some(&km) = slot.get(&m) {
                    if halo[km].is_none() {
                        halo[km] = Some(h + 1);
                        queue.push_back(km);
                    }
                }
            }
        }
        halo.into_iter().map(|h| h.unwrap_or(max_halo)).collect()
    }

    /// Fit an affine (i, j) -> x patch around each deep node and move it there
    ///
    /// `ij` gives the integer address of each entry of `nodes`. Updates within
    /// one iteration are applied together. Moved nodes and their neighbours
    /// get an orthogonality nudge at the end.
    pub fn local_smooth(&mut self, nodes: &[usize], ij: &[(i64, i64)], params: &LocalSmoothParams) -> SmoothReport {
        let mut report = SmoothReport::default();
        let halos = self.calc_halo(nodes, MAX_HALO);
        let mut xy: HashMap<(i64, i64), Point2<f64>> = nodes
            .iter()
            .zip(ij)
            .map(|(&n, &key)| (key, self.grid.x(n)))
            .collect();

        let r = params.stencil_radius;
        let stencil: Vec<(i64, i64)> = (-r..=r).flat_map(|di| (-r..=r).map(move |dj| (di, dj))).collect();
        let is_free = |n: usize| params.free_nodes.as_ref().map_or(true, |f| f.contains(&n));

        let mut moved: BTreeSet<usize> = BTreeSet::new();
        for iteration in 0..params.iterations {
            let mut updates = Vec::new();
            for (k, (&n, &(i, j))) in nodes.iter().zip(ij).enumerate() {
                if halos[k] < params.min_halo || !is_free(n) {
                    continue;
                }
                let Some(&x0) = xy.get(&(i, j)) else {
                    continue;
                };
                let samples: Vec<((i64, i64), Vector2<f64>)> = stencil
                    .iter()
                    .filter_map(|&(di, dj)| xy.get(&(i + di, j + dj)).map(|p| ((di, dj), p - x0)))
                    .collect();
                match affine_offset(&samples) {
                    Some(delta) => updates.push(((i, j), n, x0 + delta)),
                    None => {
                        let advisory = Advisory::SkippedNode { node: n, iteration };
                        advisory.log();
                        report.advisories.push(advisory);
                    }
                }
            }
            for (key, n, x) in updates {
                xy.insert(key, x);
                moved.insert(n);
            }
        }

        for (&n, key) in nodes.iter().zip(ij) {
            if !moved.contains(&n) {
                continue;
            }
            if let Some(&x) = xy.get(key) {
                if (x - self.grid.x(n)).norm() > 1e-6 {
                    self.grid.set_x(n, x);
                    report.moved += 1;
                }
            }
        }

        let mut to_nudge = moved.clone();
        for &n in &moved {
            to_nudge.extend(self.grid.node_to_nodes(n));
        }
        for n in to_nudge {
            if is_free(n) && self.nudge_node_orthogonal(n) {
                report.nudged += 1;
            }
        }
        log::debug!(
            "local smooth over {} nodes: {} moved, {} nudged, {} skipped",
            nodes.len(),
            report.moved,
            report.nudged,
            report.advisories.len()
        );
        report
    }
}

/// Constant term of the least-squares plane through the stencil offsets
fn affine_offset(samples: &[((i64, i64), Vector2<f64>)]) -> Option<Vector2<f64>> {
    if samples.len() < 3 {
        return None;
    }
    let m = DMatrix::from_fn(samples.len(), 3, |r, c| match c {
        0 => samples[r].0 .0 as f64,
        1 => samples[r].0 .1 as f64,
        _ => 1.0,
    });
    let svd = m.svd(true, true);
    let mut delta = Vector2::zeros();
    for axis in 0..2 {
        let rhs = DVector::from_iterator(samples.len(), samples.iter().map(|(_, d)| d[axis]));
        let coefs = svd.solve(&rhs, 1e-12).ok()?;
        delta[axis] = coefs[2];
    }
    (delta.x.is_finite() && delta.y.is_finite()).then_some(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::RectilinearPatch;
    use approx::assert_relative_eq;

    fn lattice(n: usize) -> (UnstructuredGrid<(), ()>, RectilinearPatch) {
        let mut g = UnstructuredGrid::new();
        let size = (n - 1) as f64;
        let patch = g
            .add_rectilinear(Point2::new(0.0, 0.0), Point2::new(size, size), n, n, || ())
            .unwrap();
        (g, patch)
    }

    #[test]
    fn test_nudge_on_triangles_is_noop() {
        let mut g: UnstructuredGrid<(), ()> = UnstructuredGrid::new();
        let a = g.add_node(Point2::new(0.0, 0.0), ());
        let b = g.add_node(Point2::new(1.0, 0.0), ());
        let c = g.add_node(Point2::new(0.3, 0.8), ());
        g.add_cell(vec![a, b, c]).unwrap();
        let before = g.x(c);
        assert!(!Tweaker::new(&mut g).nudge_node_orthogonal(c));
        assert_eq!(g.x(c), before);
    }

    #[test]
    fn test_nudge_keeps_orthogonal_node() {
        let (mut g, patch) = lattice(3);
        let centre = patch.nodes[1][1];
        let mut tweaker = Tweaker::new(&mut g);
        assert!(tweaker.nudge_node_orthogonal(centre));
        assert!(tweaker.nudge_node_orthogonal(centre));
        assert_relative_eq!(g.x(centre).x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(g.x(centre).y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_halo_rings() {
        let (g, patch) = lattice(7);
        // inner 5x5 block
        let mut nodes = Vec::new();
        for ix in 1..6 {
            for iy in 1..6 {
                nodes.push(patch.nodes[ix][iy]);
            }
        }
        let mut g = g;
        let halo = Tweaker::new(&mut g).calc_halo(&nodes, MAX_HALO);
        let at = |ix: usize, iy: usize| halo[(ix - 1) * 5 + (iy - 1)];
        assert_eq!(at(1, 1), 0);
        assert_eq!(at(2, 3), 1);
        assert_eq!(at(3, 3), 2);
    }

    #[test]
    fn test_local_smooth_pulls_node_into_lattice() {
        let (mut g, patch) = lattice(7);
        let victim = patch.nodes[3][3];
        g.set_x(victim, Point2::new(3.3, 2.8));

        let mut nodes = Vec::new();
        let mut ij = Vec::new();
        for ix in 1..6 {
            for iy in 1..6 {
                nodes.push(patch.nodes[ix][iy]);
                ij.push((ix as i64, iy as i64));
            }
        }
        let params = LocalSmoothParams {
            iterations: 10,
            ..LocalSmoothParams::default()
        };
        let report = Tweaker::new(&mut g).local_smooth(&nodes, &ij, &params);
        assert!(report.advisories.is_empty());
        assert!(report.moved >= 1);
        assert_relative_eq!(g.x(victim).x, 3.0, epsilon = 1e-6);
        assert_relative_eq!(g.x(victim).y, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_affine_offset_needs_three_samples() {
        let samples = vec![((0, 0), Vector2::zeros()), ((1, 0), Vector2::new(1.0, 0.0))];
        assert!(affine_offset(&samples).is_none());
    }
}
