//! Unstructured planar grid
//!
//! Nodes, edges and cells live in slot vectors with tombstones, so ids stay
//! stable across deletions until `renumber` compacts them. Each role in the
//! pipeline picks its own node payload `N` and edge payload `E`.

pub mod generating;
pub mod search;

pub use generating::{GenNode, GeneratingGrid, GeneratingGridSpec, NodeSpec};
pub use search::NodeLocator;

use nalgebra::Point2;
use std::collections::{HashMap, HashSet};

use crate::error::{MeshError, MeshResult};
use crate::geometry;

/// Grid node: position plus role-specific payload
#[derive(Debug, Clone)]
pub struct Node<N> {
    pub x: Point2<f64>,
    pub data: N,
    deleted: bool,
}

/// Grid edge
///
/// `cells[0]` lies to the left of `nodes[0] -> nodes[1]`, `cells[1]` to the right.
#[derive(Debug, Clone)]
pub struct Edge<E> {
    pub nodes: [usize; 2],
    pub cells: [Option<usize>; 2],
    pub data: E,
    deleted: bool,
}

impl<E> Edge<E> {
    pub fn n_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

/// Grid cell, nodes in counter-clockwise order
#[derive(Debug, Clone)]
pub struct Cell {
    pub nodes: Vec<usize>,
    deleted: bool,
}

/// Node grid of a rectilinear patch, indexed `[ix][iy]`
#[derive(Debug, Clone)]
pub struct RectilinearPatch {
    pub nodes: Vec<Vec<usize>>,
    pub cells: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct UnstructuredGrid<N, E = ()> {
    nodes: Vec<Node<N>>,
    edges: Vec<Edge<E>>,
    cells: Vec<Cell>,
    node_edges: Vec<Vec<usize>>,
    edge_lookup: HashMap<(usize, usize), usize>,
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

impl<N: Clone, E: Clone + Default> Default for UnstructuredGrid<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Clone, E: Clone + Default> UnstructuredGrid<N, E> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            cells: Vec::new(),
            node_edges: Vec::new(),
            edge_lookup: HashMap::new(),
        }
    }

    // ---- sizes and iteration ----

    /// Node slots, including deleted ones
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn valid_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nodes.len()).filter(move |&n| !self.nodes[n].deleted)
    }

    pub fn valid_edges(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.edges.len()).filter(move |&j| !self.edges[j].deleted)
    }

    pub fn valid_cells(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.cells.len()).filter(move |&c| !self.cells[c].deleted)
    }

    pub fn count_valid_nodes(&self) -> usize {
        self.valid_nodes().count()
    }

    pub fn count_valid_cells(&self) -> usize {
        self.valid_cells().count()
    }

    pub fn is_node_deleted(&self, n: usize) -> bool {
        self.nodes[n].deleted
    }

    pub fn is_cell_deleted(&self, c: usize) -> bool {
        self.cells[c].deleted
    }

    // ---- element access ----

    pub fn node(&self, n: usize) -> &Node<N> {
        &self.nodes[n]
    }

    pub fn node_mut(&mut self, n: usize) -> &mut Node<N> {
        &mut self.nodes[n]
    }

    pub fn edge(&self, j: usize) -> &Edge<E> {
        &self.edges[j]
    }

    pub fn edge_mut(&mut self, j: usize) -> &mut Edge<E> {
        &mut self.edges[j]
    }

    pub fn x(&self, n: usize) -> Point2<f64> {
        self.nodes[n].x
    }

    pub fn set_x(&mut self, n: usize, x: Point2<f64>) {
        self.nodes[n].x = x;
    }

    pub fn points(&self, ns: &[usize]) -> Vec<Point2<f64>> {
        ns.iter().map(|&n| self.nodes[n].x).collect()
    }

    pub fn cell_to_nodes(&self, c: usize) -> &[usize] {
        &self.cells[c].nodes
    }

    pub fn cell_points(&self, c: usize) -> Vec<Point2<f64>> {
        self.points(&self.cells[c].nodes)
    }

    pub fn cell_centroid(&self, c: usize) -> Point2<f64> {
        geometry::centroid(&self.cell_points(c))
    }

    /// Edges of a cell in node order
    pub fn cell_to_edges(&self, c: usize) -> Vec<usize> {
        let nodes = &self.cells[c].nodes;
        let k = nodes.len();
        (0..k)
            .filter_map(|i| self.nodes_to_edge(nodes[i], nodes[(i + 1) % k]))
            .collect()
    }

    // ---- construction ----

    pub fn add_node(&mut self, x: Point2<f64>, data: N) -> usize {
        self.nodes.push(Node {
            x,
            data,
            deleted: false,
        });
        self.node_edges.push(Vec::new());
        self.nodes.len() - 1
    }

    /// Reuse an existing node within `tolerance` of `x`, or add a new one
    pub fn add_or_find_node(&mut self, x: Point2<f64>, tolerance: f64, data: N) -> usize {
        if let Some(n) = self.select_nodes_nearest(&x) {
            if (self.nodes[n].x - x).norm() <= tolerance {
                return n;
            }
        }
        self.add_node(x, data)
    }

    pub fn nodes_to_edge(&self, a: usize, b: usize) -> Option<usize> {
        self.edge_lookup.get(&edge_key(a, b)).copied()
    }

    pub fn add_edge(&mut self, a: usize, b: usize, data: E) -> MeshResult<usize> {
        if a == b {
            return Err(MeshError::malformed_grid(format!("edge from node {} to itself", a)));
        }
        if let Some(j) = self.nodes_to_edge(a, b) {
            return Err(MeshError::malformed_grid(format!(
                "edge {}-{} already exists as {}",
                a, b, j
            )));
        }
        self.edges.push(Edge {
            nodes: [a, b],
            cells: [None, None],
            data,
            deleted: false,
        });
        let j = self.edges.len() - 1;
        self.edge_lookup.insert(edge_key(a, b), j);
        self.node_edges[a].push(j);
        self.node_edges[b].push(j);
        Ok(j)
    }

    /// Add a cell, creating missing edges. Clockwise input is reversed.
    pub fn add_cell(&mut self, mut nodes: Vec<usize>) -> MeshResult<usize> {
        if nodes.len() < 3 {
            return Err(MeshError::malformed_grid(format!(
                "cell needs at least 3 nodes, got {}",
                nodes.len()
            )));
        }
        if geometry::signed_area(&self.points(&nodes)) < 0.0 {
            nodes.reverse();
        }
        let c = self.cells.len();
        let k = nodes.len();
        for i in 0..k {
            let (a, b) = (nodes[i], nodes[(i + 1) % k]);
            let j = match self.nodes_to_edge(a, b) {
                Some(j) => j,
                None => self.add_edge(a, b, E::default())?,
            };
            let side = if self.edges[j].nodes[0] == a { 0 } else { 1 };
            if let Some(other) = self.edges[j].cells[side] {
                return Err(MeshError::malformed_grid(format!(
                    "edge {} already has cell {} on that side",
                    j, other
                )));
            }
            self.edges[j].cells[side] = Some(c);
        }
        self.cells.push(Cell {
            nodes,
            deleted: false,
        });
        Ok(c)
    }

    /// Add a rectilinear patch of `nx` by `ny` nodes spanning `p0` to `p1`
    pub fn add_rectilinear(
        &mut self,
        p0: Point2<f64>,
        p1: Point2<f64>,
        nx: usize,
        ny: usize,
        data: impl Fn() -> N,
    ) -> MeshResult<RectilinearPatch> {
        let step = |k: usize, count: usize| {
            if count > 1 {
                k as f64 / (count - 1) as f64
            } else {
                0.0
            }
        };
        let mut nodes = vec![Vec::with_capacity(ny); nx];
        for (ix, column) in nodes.iter_mut().enumerate() {
            for iy in 0..ny {
                let x = p0.x + (p1.x - p0.x) * step(ix, nx);
                let y = p0.y + (p1.y - p0.y) * step(iy, ny);
                column.push(self.add_node(Point2::new(x, y), data()));
            }
        }
        let mut cells = Vec::new();
        for ix in 0..nx.saturating_sub(1) {
            for iy in 0..ny.saturating_sub(1) {
                let quad = vec![
                    nodes[ix][iy],
                    nodes[ix + 1][iy],
                    nodes[ix + 1][iy + 1],
                    nodes[ix][iy + 1],
                ];
                cells.push(self.add_cell(quad)?);
            }
        }
        Ok(RectilinearPatch { nodes, cells })
    }

    // ---- deletion ----

    pub fn delete_cell(&mut self, c: usize) {
        if self.cells[c].deleted {
            return;
        }
        for j in self.cell_to_edges(c) {
            for side in 0..2 {
                if self.edges[j].cells[side] == Some(c) {
                    self.edges[j].cells[side] = None;
                }
            }
        }
        self.cells[c].deleted = true;
    }

    fn delete_edge(&mut self, j: usize) {
        let [a, b] = self.edges[j].nodes;
        self.edge_lookup.remove(&edge_key(a, b));
        self.node_edges[a].retain(|&e| e != j);
        self.node_edges[b].retain(|&e| e != j);
        self.edges[j].deleted = true;
    }

    /// Delete a node with its edges and cells
    pub fn delete_node_cascade(&mut self, n: usize) {
        for c in self.node_to_cells(n) {
            self.delete_cell(c);
        }
        for j in self.node_edges[n].clone() {
            self.delete_edge(j);
        }
        self.nodes[n].deleted = true;
    }

    /// Delete edges with no adjacent cell
    pub fn delete_orphan_edges(&mut self) {
        let orphans: Vec<usize> = self
            .valid_edges()
            .filter(|&j| self.edges[j].n_cells() == 0)
            .collect();
        for j in orphans {
            self.delete_edge(j);
        }
    }

    /// Delete nodes with no adjacent edge
    pub fn delete_orphan_nodes(&mut self) {
        let orphans: Vec<usize> = self
            .valid_nodes()
            .filter(|&n| self.node_edges[n].is_empty())
            .collect();
        for n in orphans {
            self.nodes[n].deleted = true;
        }
    }

    /// Compact away deleted entities. Returns the old-to-new node map.
    pub fn renumber(&mut self) -> MeshResult<Vec<Option<usize>>> {
        let mut fresh = Self::new();
        let mut node_map = vec![None; self.nodes.len()];
        for n in self.valid_nodes() {
            node_map[n] = Some(fresh.add_node(self.nodes[n].x, self.nodes[n].data.clone()));
        }
        let lookup = |n: usize| {
            node_map[n].ok_or_else(|| MeshError::malformed_grid(format!("reference to deleted node {}", n)))
        };
        for j in self.valid_edges() {
            let [a, b] = self.edges[j].nodes;
            fresh.add_edge(lookup(a)?, lookup(b)?, self.edges[j].data.clone())?;
        }
        for c in self.valid_cells() {
            let nodes = self.cells[c]
                .nodes
                .iter()
                .map(|&n| lookup(n))
                .collect::<MeshResult<Vec<_>>>()?;
            fresh.add_cell(nodes)?;
        }
        *self = fresh;
        Ok(node_map)
    }

    /// Copy another grid in, fusing nodes that coincide within `tolerance`
    pub fn add_grid(&mut self, other: &Self, tolerance: f64) -> MeshResult<Vec<Option<usize>>> {
        let mut node_map = vec![None; other.n_nodes()];
        for n in other.valid_nodes() {
            let node = other.node(n);
            node_map[n] = Some(self.add_or_find_node(node.x, tolerance, node.data.clone()));
        }
        for c in other.valid_cells() {
            let nodes: Vec<usize> = other
                .cell_to_nodes(c)
                .iter()
                .filter_map(|&n| node_map[n])
                .collect();
            self.add_cell(nodes)?;
        }
        Ok(node_map)
    }

    /// Same topology with a different node payload
    pub fn map_nodes<M: Clone>(&self, f: impl Fn(usize, &Node<N>) -> M) -> UnstructuredGrid<M, E> {
        UnstructuredGrid {
            nodes: self
                .nodes
                .iter()
                .enumerate()
                .map(|(n, node)| Node {
                    x: node.x,
                    data: f(n, node),
                    deleted: node.deleted,
                })
                .collect(),
            edges: self.edges.clone(),
            cells: self.cells.clone(),
            node_edges: self.node_edges.clone(),
            edge_lookup: self.edge_lookup.clone(),
        }
    }

    // ---- adjacency ----

    pub fn node_to_edges(&self, n: usize) -> &[usize] {
        &self.node_edges[n]
    }

    pub fn node_to_nodes(&self, n: usize) -> Vec<usize> {
        self.node_edges[n]
            .iter()
            .map(|&j| {
                let [a, b] = self.edges[j].nodes;
                if a == n {
                    b
                } else {
                    a
                }
            })
            .collect()
    }

    pub fn node_to_cells(&self, n: usize) -> Vec<usize> {
        let mut cells: Vec<usize> = self.node_edges[n]
            .iter()
            .flat_map(|&j| self.edges[j].cells.iter().flatten().copied())
            .collect();
        cells.sort_unstable();
        cells.dedup();
        cells
    }

    pub fn edge_to_cells(&self, j: usize) -> [Option<usize>; 2] {
        self.edges[j].cells
    }

    pub fn is_boundary_edge(&self, j: usize) -> bool {
        self.edges[j].n_cells() < 2
    }

    pub fn is_boundary_node(&self, n: usize) -> bool {
        self.node_edges[n].iter().any(|&j| self.is_boundary_edge(j))
    }

    /// Neighbours of `n` sorted counter-clockwise by angle
    pub fn angle_sort_adjacent_nodes(&self, n: usize) -> Vec<usize> {
        let x0 = self.nodes[n].x;
        let mut nbrs: Vec<(f64, usize)> = self
            .node_to_nodes(n)
            .into_iter()
            .map(|m| {
                let d = self.nodes[m].x - x0;
                (d.y.atan2(d.x), m)
            })
            .collect();
        nbrs.sort_by(|a, b| a.0.total_cmp(&b.0));
        nbrs.into_iter().map(|(_, m)| m).collect()
    }

    // ---- boundaries and strings ----

    /// Boundary edges as directed pairs with the interior on the left
    pub fn boundary_half_edges(&self) -> Vec<(usize, usize)> {
        self.valid_edges()
            .filter(|&j| self.edges[j].n_cells() == 1)
            .map(|j| {
                let [a, b] = self.edges[j].nodes;
                if self.edges[j].cells[0].is_some() {
                    (a, b)
                } else {
                    (b, a)
                }
            })
            .collect()
    }

    /// Outer boundary of the cells, counter-clockwise
    pub fn boundary_cycle(&self) -> MeshResult<Vec<usize>> {
        let half_edges = self.boundary_half_edges();
        let mut next: HashMap<usize, usize> = HashMap::new();
        for &(a, b) in &half_edges {
            if next.insert(a, b).is_some() {
                return Err(MeshError::malformed_grid(format!(
                    "boundary touches itself at node {}",
                    a
                )));
            }
        }
        let mut starts: Vec<usize> = next.keys().copied().collect();
        starts.sort_unstable();

        let mut seen = HashSet::new();
        let mut best: Option<(f64, Vec<usize>)> = None;
        for start in starts {
            if seen.contains(&start) {
                continue;
            }
            let mut cycle = Vec::new();
            let mut n = start;
            loop {
                if !seen.insert(n) {
                    break;
                }
                cycle.push(n);
                n = match next.get(&n) {
                    Some(&m) => m,
                    None => {
                        return Err(MeshError::malformed_grid(format!(
                            "boundary is open at node {}",
                            n
                        )))
                    }
                };
            }
            if n != start {
                return Err(MeshError::malformed_grid("boundary walk did not close"));
            }
            let area = geometry::signed_area(&self.points(&cycle));
            if best.as_ref().map_or(true, |(a, _)| area > *a) {
                best = Some((area, cycle));
            }
        }
        best.map(|(_, cycle)| cycle)
            .ok_or_else(|| MeshError::malformed_grid("grid has no boundary"))
    }

    /// Counter-clockwise faces of the edge graph, ignoring cells
    ///
    /// Faces longer than `max_cycle_len` nodes are skipped.
    pub fn find_cycles(&self, max_cycle_len: usize) -> Vec<Vec<usize>> {
        let sorted: HashMap<usize, Vec<usize>> = self
            .valid_nodes()
            .map(|n| (n, self.angle_sort_adjacent_nodes(n)))
            .collect();

        let mut visited: HashSet<(usize, usize)> = HashSet::new();
        let mut cycles = Vec::new();
        for j in self.valid_edges() {
            let [a, b] = self.edges[j].nodes;
            for &(s0, s1) in &[(a, b), (b, a)] {
                if visited.contains(&(s0, s1)) {
                    continue;
                }
                let mut cycle = Vec::new();
                let (mut u, mut v) = (s0, s1);
                loop {
                    visited.insert((u, v));
                    cycle.push(u);
                    let nbrs = &sorted[&v];
                    let pos = nbrs.iter().position(|&m| m == u).unwrap_or(0);
                    let w = nbrs[(pos + nbrs.len() - 1) % nbrs.len()];
                    u = v;
                    v = w;
                    if (u, v) == (s0, s1) {
                        break;
                    }
                }
                if cycle.len() <= max_cycle_len && geometry::signed_area(&self.points(&cycle)) > 0.0 {
                    cycles.push(cycle);
                }
            }
        }
        cycles
    }

    /// Maximal chains through degree-2 nodes
    ///
    /// Closed chains repeat their first node at the end.
    pub fn extract_linear_strings(&self) -> Vec<Vec<usize>> {
        let degree = |n: usize| self.node_edges[n].len();
        let other = |j: usize, n: usize| {
            let [a, b] = self.edges[j].nodes;
            if a == n {
                b
            } else {
                a
            }
        };
        let mut used: HashSet<usize> = HashSet::new();
        let mut strings = Vec::new();

        let walk = |start: usize, first_edge: usize, used: &mut HashSet<usize>| {
            let mut string = vec![start];
            let mut j = first_edge;
            let mut n = start;
            loop {
                used.insert(j);
                n = other(j, n);
                string.push(n);
                if n == start || degree(n) != 2 {
                    break;
                }
                match self.node_edges[n].iter().find(|&&e| e != j) {
                    Some(&e) if !used.contains(&e) => j = e,
                    _ => break,
                }
            }
            string
        };

        for n in self.valid_nodes() {
            if degree(n) == 2 {
                continue;
            }
            for &j in &self.node_edges[n] {
                if !used.contains(&j) {
                    strings.push(walk(n, j, &mut used));
                }
            }
        }
        // remaining edges form pure loops
        for n in self.valid_nodes() {
            if let Some(&j) = self.node_edges[n].iter().find(|&&j| !used.contains(&j)) {
                strings.push(walk(n, j, &mut used));
            }
        }
        strings
    }

    // ---- search ----

    /// Nearest valid node by linear scan
    pub fn select_nodes_nearest(&self, x: &Point2<f64>) -> Option<usize> {
        self.valid_nodes().min_by(|&a, &b| {
            let da = (self.nodes[a].x - x).norm_squared();
            let db = (self.nodes[b].x - x).norm_squared();
            da.total_cmp(&db)
        })
    }

    /// Spatial index over the current node positions
    pub fn node_locator(&self) -> NodeLocator {
        NodeLocator::new(self.valid_nodes().map(|n| (n, self.nodes[n].x)))
    }

    /// Valid cell containing `x`, if any
    pub fn select_cell_containing(&self, x: &Point2<f64>) -> Option<usize> {
        self.valid_cells()
            .find(|&c| geometry::point_in_polygon(x, &self.cell_points(c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> UnstructuredGrid<(), ()> {
        let mut g = UnstructuredGrid::new();
        g.add_rectilinear(Point2::new(0.0, 0.0), Point2::new(2.0, 2.0), 3, 3, || ())
            .unwrap();
        g
    }

    #[test]
    fn test_rectilinear_topology() {
        let g = two_by_two();
        assert_eq!(g.count_valid_nodes(), 9);
        assert_eq!(g.count_valid_cells(), 4);
        assert_eq!(g.n_edges(), 12);
        // centre node
        assert!(!g.is_boundary_node(4));
        assert!(g.is_boundary_node(0));
        assert_eq!(g.node_to_cells(4).len(), 4);
    }

    #[test]
    fn test_boundary_cycle_is_ccw() {
        let g = two_by_two();
        let cycle = g.boundary_cycle().unwrap();
        assert_eq!(cycle.len(), 8);
        assert!(geometry::signed_area(&g.points(&cycle)) > 0.0);
        assert!(!cycle.contains(&4));
    }

    #[test]
    fn test_angle_sort() {
        let g = two_by_two();
        let sorted = g.angle_sort_adjacent_nodes(4);
        // west (pi), south (-pi/2), east (0), north (pi/2)
        let angles: Vec<f64> = sorted
            .iter()
            .map(|&m| {
                let d = g.x(m) - g.x(4);
                d.y.atan2(d.x)
            })
            .collect();
        assert!(angles.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_delete_and_renumber() {
        let mut g = two_by_two();
        g.delete_cell(3);
        g.delete_orphan_edges();
        g.delete_orphan_nodes();
        let map = g.renumber().unwrap();
        assert_eq!(g.count_valid_cells(), 3);
        assert_eq!(g.count_valid_nodes(), 8);
        assert_eq!(map.iter().filter(|m| m.is_none()).count(), 1);
        assert_eq!(g.boundary_cycle().unwrap().len(), 8);
    }

    #[test]
    fn test_find_cycles_and_strings() {
        let mut g: UnstructuredGrid<(), ()> = UnstructuredGrid::new();
        let pts = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let ns: Vec<usize> = pts.iter().map(|&(x, y)| g.add_node(Point2::new(x, y), ())).collect();
        for k in 0..4 {
            g.add_edge(ns[k], ns[(k + 1) % 4], ()).unwrap();
        }
        let cycles = g.find_cycles(100);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 4);

        let strings = g.extract_linear_strings();
        assert_eq!(strings.len(), 1);
        assert_eq!(strings[0].first(), strings[0].last());
        assert_eq!(strings[0].len(), 5);
    }

    #[test]
    fn test_add_or_find_node_snaps() {
        let mut g = two_by_two();
        let n = g.add_or_find_node(Point2::new(1.05, 1.0), 0.1, ());
        assert_eq!(n, 4);
        let n = g.add_or_find_node(Point2::new(1.5, 1.5), 0.1, ());
        assert_eq!(n, 9);
    }
}
