//! Boundary parameterization of the generating grid
//!
//! Two index scales are carried side by side: the user-supplied `ij` and a
//! nominal, near-isotropic `IJ` derived from geographic lengths. Both are
//! completed by interpolation along linear strings, turned into per-edge
//! deltas, and checked for closure around every cell. Bezier control points
//! are derived from the user scale so that corners turn the way index space
//! says they should.

use nalgebra::{Point2, Vector2};
use std::collections::HashMap;

use crate::bezier::{self, BoundaryCurve, ControlPoints};
use crate::config::MeshingConfig;
use crate::error::{MeshError, MeshResult};
use crate::geometry;
use crate::grid::GeneratingGrid;

/// Which index scale to read from the generating grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexScale {
    /// `ij`: user-supplied resolution
    User,
    /// `IJ`: nominal resolution derived from `nom_res`
    Nominal,
}

/// Index coordinates on the generating grid for one scale
#[derive(Debug, Clone)]
pub struct IndexField {
    /// Per node; NaN marks a component not yet known
    pub values: Vec<Vector2<f64>>,
    /// Per node and axis: value came from user input
    pub fixed: Vec<[bool; 2]>,
    /// Per edge: `values[nodes[1]] - values[nodes[0]]`
    pub edge_deltas: Vec<Vector2<f64>>,
}

impl IndexField {
    pub fn value(&self, n: usize) -> Vector2<f64> {
        self.values[n]
    }

    pub fn is_fixed(&self, n: usize, axis: usize) -> bool {
        self.fixed[n][axis]
    }

    /// Smallest and largest value over all nodes, per axis
    pub fn bounds(&self) -> (Vector2<f64>, Vector2<f64>) {
        let mut lo = Vector2::repeat(f64::INFINITY);
        let mut hi = Vector2::repeat(f64::NEG_INFINITY);
        for v in &self.values {
            lo = lo.inf(v);
            hi = hi.sup(v);
        }
        (lo, hi)
    }
}

/// Copy user `i`/`j` into an index field, noting which values were given
pub fn coalesce_ij(gen: &GeneratingGrid) -> IndexField {
    let n = gen.n_nodes();
    let mut values = vec![Vector2::repeat(f64::NAN); n];
    let mut fixed = vec![[false; 2]; n];
    for node in gen.valid_nodes() {
        let data = gen.node(node).data;
        for axis in 0..2 {
            if let Some(v) = data.coord(axis) {
                values[node][axis] = v;
                fixed[node][axis] = true;
            }
        }
    }
    IndexField {
        values,
        fixed,
        edge_deltas: Vec::new(),
    }
}

/// Derive nominal index steps from geographic lengths
///
/// Between consecutive fixed nodes of the boundary cycle the step count is
/// `max(min_steps, distance / nom_res)`, truncated, with the sign of the user
/// delta. The integer residual around the cycle is spread over the steps in
/// proportion to their size so the cycle closes exactly.
pub fn coalesce_ij_nominal(gen: &GeneratingGrid, config: &MeshingConfig) -> MeshResult<IndexField> {
    let user = coalesce_ij(gen);
    let n = gen.n_nodes();
    let mut values = vec![Vector2::repeat(f64::NAN); n];

    let cycle = gen.boundary_cycle()?;
    if cycle.len() > config.max_cycle_len {
        return Err(MeshError::malformed_grid(format!(
            "boundary cycle of {} nodes exceeds max_cycle_len {}",
            cycle.len(),
            config.max_cycle_len
        )));
    }

    for axis in 0..2 {
        let first_fixed = cycle
            .iter()
            .position(|&node| user.fixed[node][axis])
            .ok_or_else(|| {
                MeshError::malformed_grid(format!("no boundary node has a fixed index on axis {}", axis))
            })?;
        let mut s: Vec<usize> = cycle[first_fixed..]
            .iter()
            .chain(cycle[..first_fixed].iter())
            .copied()
            .collect();
        s.push(s[0]);
        let dists = geometry::dist_along(&gen.points(&s));
        let fixed_pos: Vec<usize> = (0..s.len()).filter(|&k| user.fixed[s[k]][axis]).collect();

        // (from node, to node, step)
        let mut steps: Vec<(usize, usize, i64)> = Vec::new();
        for w in fixed_pos.windows(2) {
            let (a, b) = (w[0], w[1]);
            let d_ab = dists[b] - dists[a];
            let dij = user.values[s[b]][axis] - user.values[s[a]][axis];
            let step = if dij == 0.0 {
                0
            } else {
                let n_steps = (config.min_steps as f64).max(d_ab / config.nom_res);
                (dij.signum() * n_steps) as i64
            };
            steps.push((s[a], s[b], step));
        }

        let err: i64 = steps.iter().map(|st| st.2).sum();
        let total: i64 = steps.iter().map(|st| st.2.abs()).sum();
        if err != 0 && total > 0 {
            let mut cum = 0i64;
            let mut prev = 0.0;
            for st in steps.iter_mut() {
                cum += st.2.abs();
                let dist = (err as f64 * cum as f64 / total as f64).round_ties_even();
                st.2 -= (dist - prev) as i64;
                prev = dist;
            }
        }

        values[steps[0].0][axis] = 0.0;
        let mut acc = 0i64;
        for st in &steps[..steps.len() - 1] {
            acc += st.2;
            values[st.1][axis] = acc as f64;
        }
        log::debug!("nominal index axis {}: {} boundary steps, residual {}", axis, steps.len(), err);
    }

    Ok(IndexField {
        values,
        fixed: user.fixed,
        edge_deltas: Vec::new(),
    })
}

/// Fill unknown components by linear interpolation along linear strings
pub fn fill_ij_interp(gen: &GeneratingGrid, field: &mut IndexField) -> MeshResult<()> {
    let strings = gen.extract_linear_strings();
    for axis in 0..2 {
        for string in &strings {
            let mut s = string.clone();
            if s.len() > 1 && s.first() == s.last() {
                if let Some(first) = s.iter().position(|&n| field.values[n][axis].is_finite()) {
                    s.pop();
                    let first = first % s.len();
                    s.rotate_left(first);
                    s.push(s[0]);
                }
            }
            let dists = geometry::dist_along(&gen.points(&s));
            let (known_d, known_v): (Vec<f64>, Vec<f64>) = s
                .iter()
                .zip(&dists)
                .filter(|pair| field.values[*pair.0][axis].is_finite())
                .map(|(&n, &d)| (d, field.values[n][axis]))
                .unzip();
            if known_d.is_empty() {
                continue;
            }
            for (&n, &d) in s.iter().zip(&dists) {
                if !field.values[n][axis].is_finite() {
                    field.values[n][axis] = geometry::interp(d, &known_d, &known_v);
                }
            }
        }
    }
    for n in gen.valid_nodes() {
        if !(field.values[n].x.is_finite() && field.values[n].y.is_finite()) {
            return Err(MeshError::malformed_grid(format!(
                "node {} has no index coordinate and none could be interpolated",
                n
            )));
        }
    }
    Ok(())
}

/// Store per-edge index deltas
pub fn node_ij_to_edge(gen: &GeneratingGrid, field: &mut IndexField) {
    field.edge_deltas = (0..gen.n_edges())
        .map(|j| {
            let [a, b] = gen.edge(j).nodes;
            field.values[b] - field.values[a]
        })
        .collect();
}

/// Index deltas of a cell's edges in traversal order, and the edge ids
pub fn cell_index_deltas(gen: &GeneratingGrid, field: &IndexField, c: usize) -> Vec<(usize, Vector2<f64>)> {
    let nodes = gen.cell_to_nodes(c);
    let k = nodes.len();
    (0..k)
        .filter_map(|i| {
            let (a, b) = (nodes[i], nodes[(i + 1) % k]);
            gen.nodes_to_edge(a, b).map(|j| {
                let d = field.edge_deltas[j];
                if gen.edge(j).nodes[0] == a {
                    (j, d)
                } else {
                    (j, -d)
                }
            })
        })
        .collect()
}

/// Directed deltas around each cell must sum to zero
pub fn check_closure(gen: &GeneratingGrid, field: &IndexField) -> MeshResult<()> {
    for c in gen.valid_cells() {
        let sum = cell_index_deltas(gen, field, c)
            .iter()
            .fold(Vector2::zeros(), |acc, (_, d)| acc + d);
        if !(geometry::allclose(sum.x, 0.0) && geometry::allclose(sum.y, 0.0)) {
            return Err(MeshError::OpenIndexCycle {
                cell: c,
                di: sum.x,
                dj: sum.y,
            });
        }
    }
    Ok(())
}

/// Bezier control points for every generating edge
#[derive(Debug, Clone)]
pub struct BezierSet {
    pub controls: Vec<ControlPoints>,
    /// Per node on the boundary cycle: geographic minus index turning angle
    pub theta_err: Vec<Option<f64>>,
}

/// Place control points at a third of each boundary edge, rotated by half the
/// mismatch between geographic and index-space turning angles
pub fn add_bezier(gen: &GeneratingGrid, ij: &IndexField, cycle: &[usize]) -> MeshResult<BezierSet> {
    let mut controls: Vec<ControlPoints> = (0..gen.n_edges())
        .map(|j| {
            let [a, b] = gen.edge(j).nodes;
            bezier::straight_controls(gen.x(a), gen.x(b))
        })
        .collect();
    let mut theta_err = vec![None; gen.n_nodes()];

    let mut degree: HashMap<usize, usize> = HashMap::new();
    for (a, b) in gen.boundary_half_edges() {
        *degree.entry(a).or_insert(0) += 1;
        *degree.entry(b).or_insert(0) += 1;
    }

    let m = cycle.len();
    for k in 0..m {
        let n = cycle[k];
        let deg = degree.get(&n).copied().unwrap_or(0);
        if deg != 2 {
            return Err(MeshError::NodeDegree { node: n, degree: deg });
        }
        let prev = cycle[(k + m - 1) % m];
        let next = cycle[(k + 1) % m];

        // both edges oriented away from n
        let mut legs = Vec::with_capacity(2);
        for other in [prev, next] {
            let j = gen
                .nodes_to_edge(n, other)
                .ok_or_else(|| MeshError::malformed_grid(format!("no edge {}-{}", n, other)))?;
            let flip = gen.edge(j).nodes[0] != n;
            let dij = if flip { -ij.edge_deltas[j] } else { ij.edge_deltas[j] };
            legs.push((j, flip, dij, gen.x(other) - gen.x(n)));
        }
        let (j0, flip0, dij0, delta0) = legs[0];
        let (j1, flip1, dij1, delta1) = legs[1];

        let theta0_ij = (-dij0.y).atan2(-dij0.x);
        let theta1_ij = dij1.y.atan2(dij1.x);
        let dtheta_ij = geometry::wrap_angle(theta1_ij - theta0_ij);

        let theta0 = (-delta0.y).atan2(-delta0.x);
        let theta1 = delta1.y.atan2(delta1.x);
        let dtheta = geometry::wrap_angle(theta1 - theta0);

        let err = dtheta - dtheta_ij;
        let x = gen.x(n);
        let cp0 = x + geometry::rot(err / 2.0, &(delta0 / 3.0));
        let cp1 = x + geometry::rot(-err / 2.0, &(delta1 / 3.0));
        controls[j0][1 + flip0 as usize] = cp0;
        controls[j1][1 + flip1 as usize] = cp1;
        theta_err[n] = Some(err);
    }

    Ok(BezierSet {
        controls,
        theta_err,
    })
}

/// Everything derived from the generating grid before meshing
#[derive(Debug, Clone)]
pub struct BoundaryParameterization {
    /// Outer boundary cycle of the generating grid, counter-clockwise
    pub boundary: Vec<usize>,
    pub ij: IndexField,
    pub nominal: IndexField,
    pub bezier: BezierSet,
}

impl BoundaryParameterization {
    pub fn new(gen: &GeneratingGrid, config: &MeshingConfig) -> MeshResult<Self> {
        let boundary = gen.boundary_cycle()?;

        let mut ij = coalesce_ij(gen);
        fill_ij_interp(gen, &mut ij)?;
        node_ij_to_edge(gen, &mut ij);
        check_closure(gen, &ij)?;

        let mut nominal = coalesce_ij_nominal(gen, config)?;
        fill_ij_interp(gen, &mut nominal)?;
        node_ij_to_edge(gen, &mut nominal);
        check_closure(gen, &nominal)?;

        let bezier = add_bezier(gen, &ij, &boundary)?;
        log::info!(
            "parameterized generating grid: {} boundary nodes, nominal extent {:?}",
            boundary.len(),
            nominal.bounds().1 - nominal.bounds().0
        );
        Ok(Self {
            boundary,
            ij,
            nominal,
            bezier,
        })
    }

    pub fn field(&self, scale: IndexScale) -> &IndexField {
        match scale {
            IndexScale::User => &self.ij,
            IndexScale::Nominal => &self.nominal,
        }
    }

    /// Upsampled polyline of generating edge `j`, or of the whole boundary
    ///
    /// With `span_fixed`, the curve extends from `j` along the boundary in both
    /// directions until a node with a fixed nominal index is reached on the
    /// axis that varies along `j`.
    pub fn bezier_linestring(
        &self,
        gen: &GeneratingGrid,
        j: Option<usize>,
        samples_per_edge: usize,
        span_fixed: bool,
    ) -> MeshResult<Vec<Point2<f64>>> {
        let node_pairs: Vec<(usize, usize)> = match j {
            None => {
                let m = self.boundary.len();
                (0..m).map(|k| (self.boundary[k], self.boundary[(k + 1) % m])).collect()
            }
            Some(j) if !span_fixed => {
                let [a, b] = gen.edge(j).nodes;
                vec![(a, b)]
            }
            Some(j) => {
                let nodes = self.span_to_fixed(gen, j)?;
                nodes.windows(2).map(|w| (w[0], w[1])).collect()
            }
        };

        let mut points = Vec::new();
        let mut last = None;
        for (a, b) in node_pairs {
            let e = gen
                .nodes_to_edge(a, b)
                .ok_or_else(|| MeshError::malformed_grid(format!("no edge {}-{}", a, b)))?;
            let reversed = gen.edge(e).nodes[0] == b;
            let mut edge_points = bezier::sample_bezier(&self.bezier.controls[e], samples_per_edge, reversed);
            last = edge_points.pop();
            points.extend(edge_points);
        }
        if j.is_some() {
            points.extend(last);
        }
        Ok(points)
    }

    pub fn bezier_curve(
        &self,
        gen: &GeneratingGrid,
        j: Option<usize>,
        samples_per_edge: usize,
        span_fixed: bool,
    ) -> MeshResult<BoundaryCurve> {
        let points = self.bezier_linestring(gen, j, samples_per_edge, span_fixed)?;
        Ok(BoundaryCurve::new(points, j.is_none()))
    }

    /// Boundary nodes from the fixed node behind `j` to the fixed node ahead
    fn span_to_fixed(&self, gen: &GeneratingGrid, j: usize) -> MeshResult<Vec<usize>> {
        let [a, b] = gen.edge(j).nodes;
        let va = self.nominal.value(a);
        let vb = self.nominal.value(b);
        let coord = if va.x == vb.x {
            1
        } else if va.y == vb.y {
            0
        } else {
            return Err(MeshError::NonAxisEdge { edge: j });
        };

        let m = self.boundary.len();
        let pos = |n: usize| self.boundary.iter().position(|&x| x == n);
        let (ka, kb) = match (pos(a), pos(b)) {
            (Some(ka), Some(kb)) => (ka, kb),
            _ => return Ok(vec![a, b]),
        };
        // orient so that tail -> head follows the cycle
        let (tail_k, head_k) = if (ka + 1) % m == kb { (ka, kb) } else { (kb, ka) };
        if (tail_k + 1) % m != head_k {
            return Ok(vec![a, b]);
        }

        let mut ahead = vec![self.boundary[head_k]];
        let mut k = head_k;
        while !self.nominal.is_fixed(self.boundary[k], coord) && ahead.len() < m {
            k = (k + 1) % m;
            ahead.push(self.boundary[k]);
        }
        let mut behind = vec![self.boundary[tail_k]];
        let mut k = tail_k;
        while !self.nominal.is_fixed(self.boundary[k], coord) && behind.len() < m {
            k = (k + m - 1) % m;
            behind.push(self.boundary[k]);
        }
        behind.reverse();
        behind.extend(ahead);
        Ok(behind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::grid::GeneratingGridSpec;
    use approx::assert_relative_eq;

    fn rectangle(w: f64, h: f64, ni: f64, nj: f64) -> GeneratingGrid {
        let spec = GeneratingGridSpec::new()
            .with_node(0.0, 0.0, Some(0.0), Some(0.0))
            .with_node(w, 0.0, Some(ni), Some(0.0))
            .with_node(w, h, Some(ni), Some(nj))
            .with_node(0.0, h, Some(0.0), Some(nj))
            .with_cell(vec![0, 1, 2, 3]);
        GeneratingGrid::from_spec(&spec).unwrap()
    }

    #[test]
    fn test_nominal_steps_follow_lengths() {
        let gen = rectangle(40.0, 20.0, 4.0, 4.0);
        let config = MeshingConfig::default().with_nom_res(4.0);
        let mut nominal = coalesce_ij_nominal(&gen, &config).unwrap();
        fill_ij_interp(&gen, &mut nominal).unwrap();
        node_ij_to_edge(&gen, &mut nominal);
        let (lo, hi) = nominal.bounds();
        assert_relative_eq!(hi.x - lo.x, 10.0);
        assert_relative_eq!(hi.y - lo.y, 5.0);
        check_closure(&gen, &nominal).unwrap();
    }

    #[test]
    fn test_nominal_residual_is_spread() {
        // bottom 10 long, top 30 long: raw steps 2 and -7 leave a residual of -5
        let spec = GeneratingGridSpec::new()
            .with_node(0.0, 0.0, Some(0.0), Some(0.0))
            .with_node(10.0, 0.0, Some(1.0), Some(0.0))
            .with_node(20.0, 10.0, Some(1.0), Some(1.0))
            .with_node(-10.0, 10.0, Some(0.0), Some(1.0))
            .with_cell(vec![0, 1, 2, 3]);
        let gen = GeneratingGrid::from_spec(&spec).unwrap();
        let config = MeshingConfig::default().with_nom_res(4.0);
        let mut nominal = coalesce_ij_nominal(&gen, &config).unwrap();
        fill_ij_interp(&gen, &mut nominal).unwrap();
        node_ij_to_edge(&gen, &mut nominal);
        check_closure(&gen, &nominal).unwrap();
        let di_bottom = nominal.value(1).x - nominal.value(0).x;
        let di_top = nominal.value(2).x - nominal.value(3).x;
        assert_relative_eq!(di_bottom, di_top);
        assert!(di_bottom > 2.0 && di_bottom < 7.0);
    }

    #[test]
    fn test_fill_interp_along_string() {
        let spec = GeneratingGridSpec::new()
            .with_node(0.0, 0.0, Some(0.0), Some(0.0))
            .with_node(5.0, 0.0, None, None)
            .with_node(10.0, 0.0, Some(10.0), Some(0.0))
            .with_node(10.0, 10.0, Some(10.0), Some(10.0))
            .with_node(0.0, 10.0, Some(0.0), Some(10.0))
            .with_cell(vec![0, 1, 2, 3, 4]);
        let gen = GeneratingGrid::from_spec(&spec).unwrap();
        let mut ij = coalesce_ij(&gen);
        fill_ij_interp(&gen, &mut ij).unwrap();
        assert_relative_eq!(ij.value(1).x, 5.0);
        assert_relative_eq!(ij.value(1).y, 0.0);
        assert!(!ij.is_fixed(1, 0));
    }

    #[test]
    fn test_square_corners_need_no_adjustment() {
        let gen = rectangle(10.0, 10.0, 10.0, 10.0);
        let param = BoundaryParameterization::new(&gen, &MeshingConfig::default()).unwrap();
        for n in gen.valid_nodes() {
            assert_relative_eq!(param.bezier.theta_err[n].unwrap(), 0.0, epsilon = 1e-12);
        }
        // controls stay on the straight edges
        for bez in &param.bezier.controls {
            let mid = bezier::bezier_point(bez, 0.5);
            let straight = Point2::from((bez[0].coords + bez[3].coords) / 2.0);
            assert_relative_eq!((mid - straight).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_skewed_corner_is_adjusted() {
        // parallelogram: geographic corners are not 90 degrees
        let spec = GeneratingGridSpec::new()
            .with_node(0.0, 0.0, Some(0.0), Some(0.0))
            .with_node(10.0, 0.0, Some(10.0), Some(0.0))
            .with_node(15.0, 10.0, Some(10.0), Some(10.0))
            .with_node(5.0, 10.0, Some(0.0), Some(10.0))
            .with_cell(vec![0, 1, 2, 3]);
        let gen = GeneratingGrid::from_spec(&spec).unwrap();
        let param = BoundaryParameterization::new(&gen, &MeshingConfig::default()).unwrap();
        let err = param.bezier.theta_err[1].unwrap();
        assert!(err.abs() > 0.1);
    }

    #[test]
    fn test_span_fixed_curve() {
        let spec = GeneratingGridSpec::new()
            .with_node(0.0, 0.0, Some(0.0), Some(0.0))
            .with_node(5.0, 0.0, None, Some(0.0))
            .with_node(10.0, 0.0, Some(10.0), Some(0.0))
            .with_node(10.0, 10.0, Some(10.0), Some(10.0))
            .with_node(0.0, 10.0, Some(0.0), Some(10.0))
            .with_cell(vec![0, 1, 2, 3, 4]);
        let gen = GeneratingGrid::from_spec(&spec).unwrap();
        let param = BoundaryParameterization::new(&gen, &MeshingConfig::default()).unwrap();
        let j = gen.nodes_to_edge(0, 1).unwrap();
        let single = param.bezier_curve(&gen, Some(j), 10, false).unwrap();
        assert_relative_eq!(single.total_length(), 5.0, epsilon = 1e-9);
        let spanned = param.bezier_curve(&gen, Some(j), 10, true).unwrap();
        assert_relative_eq!(spanned.total_length(), 10.0, epsilon = 1e-9);
        let closed = param.bezier_curve(&gen, None, 10, false).unwrap();
        assert_relative_eq!(closed.total_length(), 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_open_index_cycle_is_reported() {
        let gen = rectangle(10.0, 10.0, 10.0, 10.0);
        let mut ij = coalesce_ij(&gen);
        node_ij_to_edge(&gen, &mut ij);
        check_closure(&gen, &ij).unwrap();

        ij.edge_deltas[0].x += 1.0;
        let err = check_closure(&gen, &ij).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        match err {
            MeshError::OpenIndexCycle { cell, di, dj } => {
                assert_eq!(cell, 0);
                assert_relative_eq!(di.abs(), 1.0);
                assert_relative_eq!(dj, 0.0);
            }
            other => panic!("expected an open index cycle, got {}", other),
        }
    }

    #[test]
    fn test_pinched_boundary_node_is_rejected() {
        // two triangles touching at node 0 only
        let spec = GeneratingGridSpec::new()
            .with_node(0.0, 0.0, Some(0.0), Some(0.0))
            .with_node(10.0, -5.0, Some(2.0), Some(-1.0))
            .with_node(10.0, 5.0, Some(2.0), Some(1.0))
            .with_node(-10.0, 5.0, Some(-2.0), Some(1.0))
            .with_node(-10.0, -5.0, Some(-2.0), Some(-1.0))
            .with_cell(vec![0, 1, 2])
            .with_cell(vec![0, 3, 4]);
        let gen = GeneratingGrid::from_spec(&spec).unwrap();
        let mut ij = coalesce_ij(&gen);
        node_ij_to_edge(&gen, &mut ij);

        let err = add_bezier(&gen, &ij, &[0, 1, 2]).unwrap_err();
        assert!(matches!(err, MeshError::NodeDegree { node: 0, degree: 4 }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_diagonal_edge_cannot_span_to_fixed() {
        let spec = GeneratingGridSpec::new()
            .with_node(0.0, 0.0, Some(0.0), Some(0.0))
            .with_node(20.0, 0.0, Some(5.0), Some(0.0))
            .with_node(20.0, 8.0, Some(5.0), Some(2.0))
            .with_node(8.0, 20.0, Some(2.0), Some(5.0))
            .with_node(0.0, 20.0, Some(0.0), Some(5.0))
            .with_cell(vec![0, 1, 2, 3, 4]);
        let gen = GeneratingGrid::from_spec(&spec).unwrap();
        let param = BoundaryParameterization::new(&gen, &MeshingConfig::default()).unwrap();
        let j = gen.nodes_to_edge(2, 3).unwrap();

        assert!(param.bezier_curve(&gen, Some(j), 10, false).is_ok());
        let err = param.bezier_curve(&gen, Some(j), 10, true).unwrap_err();
        assert!(matches!(err, MeshError::NonAxisEdge { edge } if edge == j));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
