//! Intermediate meshes the harmonic fields are solved on
//!
//! The quad variant lays a rectilinear index-space patch over every
//! generating cell, trims it to the cell's index polygon and places nodes by
//! extrapolating the boundary's index-to-geographic correspondence. The
//! triangle variant samples the Bezier boundary and hands the enclosed hole
//! to a `HoleFiller`.

use nalgebra::{Point2, Vector2, SVector};
use std::collections::HashMap;

use crate::bezier;
use crate::config::{IntermediateKind, MeshingConfig};
use crate::error::{Advisory, MeshError, MeshResult};
use crate::geometry;
use crate::grid::{GeneratingGrid, UnstructuredGrid};
use crate::interpolate::LinearExtrapolator;
use crate::parameterization::{cell_index_deltas, BoundaryParameterization, IndexScale};
use crate::triangulate::HoleFiller;

/// How a node may move during relaxation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Coincides with a generating node; never moves
    Rigid,
    /// On a generating edge; slides along its curve
    Slidable,
    Interior,
}

/// Intermediate node payload
#[derive(Debug, Clone, PartialEq)]
pub struct IntNode {
    /// Index coordinate, when known
    pub ij: Option<Vector2<f64>>,
    pub role: NodeRole,
    /// Generating edge a boundary node lies on
    pub gen_edge: Option<usize>,
}

impl IntNode {
    pub fn interior(ij: Option<Vector2<f64>>) -> Self {
        Self {
            ij,
            role: NodeRole::Interior,
            gen_edge: None,
        }
    }
}

pub type IntermediateGrid = UnstructuredGrid<IntNode, ()>;

/// Intermediate mesh and the index scale its `ij` values are in
#[derive(Debug, Clone)]
pub struct IntermediateMesh {
    pub grid: IntermediateGrid,
    pub kind: IntermediateKind,
    pub scale: IndexScale,
}

impl IntermediateMesh {
    /// Nodes that lie on the generating boundary
    pub fn boundary_nodes(&self) -> Vec<usize> {
        self.grid
            .valid_nodes()
            .filter(|&n| self.grid.node(n).data.role != NodeRole::Interior)
            .collect()
    }
}

/// Round-off allowance on index-space boxes and curve parameters
const ROUND_OFF: f64 = 1e-9;

/// Key for fusing patch nodes with equal index coordinates
fn ij_key(ij: &Vector2<f64>) -> (i64, i64) {
    ((ij.x * 1000.0).round() as i64, (ij.y * 1000.0).round() as i64)
}

/// Builds intermediate meshes for one generating grid
pub struct IntermediateBuilder<'a> {
    gen: &'a GeneratingGrid,
    param: &'a BoundaryParameterization,
    config: &'a MeshingConfig,
}

impl<'a> IntermediateBuilder<'a> {
    pub fn new(gen: &'a GeneratingGrid, param: &'a BoundaryParameterization, config: &'a MeshingConfig) -> Self {
        Self { gen, param, config }
    }

    /// Generating edges of the outer boundary cycle, with their cycle direction
    fn boundary_edges(&self) -> MeshResult<Vec<(usize, usize, usize)>> {
        let cycle = &self.param.boundary;
        let m = cycle.len();
        (0..m)
            .map(|k| {
                let (a, b) = (cycle[k], cycle[(k + 1) % m]);
                self.gen
                    .nodes_to_edge(a, b)
                    .map(|j| (j, a, b))
                    .ok_or_else(|| MeshError::malformed_grid(format!("no edge {}-{}", a, b)))
            })
            .collect()
    }

    // ---- quad ----

    /// Quad intermediate in the nominal index scale
    pub fn build_quad(&self, advisories: &mut Vec<Advisory>) -> MeshResult<IntermediateMesh> {
        let mut grid = self.quad_patches(IndexScale::Nominal, advisories)?;
        self.tag_boundary_nodes(&mut grid)?;
        log::info!(
            "quad intermediate: {} nodes, {} cells",
            grid.count_valid_nodes(),
            grid.count_valid_cells()
        );
        Ok(IntermediateMesh {
            grid,
            kind: IntermediateKind::Quad,
            scale: IndexScale::Nominal,
        })
    }

    /// Unit-spaced index lattice over every generating cell, fused across cells
    ///
    /// Each patch is trimmed to the cell's index polygon. Node positions are
    /// extrapolated from the cell outline and are only a first guess.
    pub fn quad_patches(&self, scale: IndexScale, advisories: &mut Vec<Advisory>) -> MeshResult<IntermediateGrid> {
        let field = self.param.field(scale);
        let mut grid = IntermediateGrid::new();
        let mut by_ij: HashMap<(i64, i64), usize> = HashMap::new();

        for c in self.gen.valid_cells() {
            let nodes = self.gen.cell_to_nodes(c).to_vec();
            let deltas = cell_index_deltas(self.gen, field, c);
            let mut polygon = vec![Point2::from(field.value(nodes[0]))];
            for (_, d) in &deltas[..deltas.len().saturating_sub(1)] {
                let last = polygon[polygon.len() - 1];
                polygon.push(last + d);
            }

            let (mut lo, mut hi) = (polygon[0], polygon[0]);
            for p in &polygon {
                lo = Point2::new(lo.x.min(p.x), lo.y.min(p.y));
                hi = Point2::new(hi.x.max(p.x), hi.y.max(p.y));
            }
            let (lo, hi) = (
                Point2::new(lo.x.floor(), lo.y.floor()),
                Point2::new(hi.x.ceil(), hi.y.ceil()),
            );
            let nx = (hi.x - lo.x) as usize + 1;
            let ny = (hi.y - lo.y) as usize + 1;
            if nx < 2 || ny < 2 {
                return Err(MeshError::malformed_grid(format!(
                    "cell {} has no extent in {:?} index space",
                    c, scale
                )));
            }

            // scratch patch laid out in index space
            let mut patch: UnstructuredGrid<(), ()> = UnstructuredGrid::new();
            patch.add_rectilinear(lo, hi, nx, ny, || ())?;
            let outside: Vec<usize> = patch
                .valid_cells()
                .filter(|&pc| !geometry::point_in_polygon(&patch.cell_centroid(pc), &polygon))
                .collect();
            for pc in outside {
                patch.delete_cell(pc);
            }
            patch.delete_orphan_edges();
            patch.delete_orphan_nodes();

            let to_xy = self.cell_extrapolator(&nodes, scale)?;
            let mut extrapolated = 0;
            let mut local = vec![None; patch.n_nodes()];
            for pn in patch.valid_nodes() {
                let ij = patch.x(pn).coords;
                let n = match by_ij.get(&ij_key(&ij)) {
                    Some(&n) => n,
                    None => {
                        let (xy, outside) = to_xy.eval(&Point2::from(ij));
                        extrapolated += outside as usize;
                        let n = grid.add_node(Point2::new(xy[0], xy[1]), IntNode::interior(Some(ij)));
                        by_ij.insert(ij_key(&ij), n);
                        n
                    }
                };
                local[pn] = Some(n);
            }
            for pc in patch.valid_cells() {
                let quad = patch
                    .cell_to_nodes(pc)
                    .iter()
                    .map(|&pn| local[pn].ok_or_else(|| MeshError::malformed_grid("patch node lost")))
                    .collect::<MeshResult<Vec<_>>>()?;
                grid.add_cell(quad)?;
            }
            if extrapolated > 0 {
                let advisory = Advisory::Extrapolated {
                    stage: "quad patches",
                    count: extrapolated,
                };
                advisory.log();
                advisories.push(advisory);
            }
        }
        Ok(grid)
    }

    /// Index to geographic position along a cell's Bezier outline
    fn cell_extrapolator(&self, nodes: &[usize], scale: IndexScale) -> MeshResult<LinearExtrapolator<2>> {
        let field = self.param.field(scale);
        let samples = self.config.bezier_samples_per_edge;
        let mut ij_points = Vec::new();
        let mut xy_values = Vec::new();
        let k = nodes.len();
        for i in 0..k {
            let (a, b) = (nodes[i], nodes[(i + 1) % k]);
            let j = self
                .gen
                .nodes_to_edge(a, b)
                .ok_or_else(|| MeshError::malformed_grid(format!("no edge {}-{}", a, b)))?;
            let reversed = self.gen.edge(j).nodes[0] != a;
            let xy = bezier::sample_bezier(&self.param.bezier.controls[j], samples, reversed);
            let (ij_a, ij_b) = (field.value(a), field.value(b));
            for (s, p) in xy.iter().enumerate().take(samples) {
                let t = s as f64 / samples as f64;
                ij_points.push(Point2::from(ij_a + (ij_b - ij_a) * t));
                xy_values.push(SVector::<f64, 2>::new(p.x, p.y));
            }
        }
        LinearExtrapolator::new(ij_points, xy_values)
    }

    /// Assign generating edges and roles to boundary nodes of a quad intermediate
    fn tag_boundary_nodes(&self, grid: &mut IntermediateGrid) -> MeshResult<()> {
        let nominal = &self.param.nominal;
        let edges = self.boundary_edges()?;
        let mut boundary: Vec<usize> = grid
            .boundary_half_edges()
            .into_iter()
            .map(|(a, _)| a)
            .collect();
        boundary.sort_unstable();
        boundary.dedup();

        for n in boundary {
            let ij = grid
                .node(n)
                .data
                .ij
                .ok_or_else(|| MeshError::malformed_grid(format!("boundary node {} has no index", n)))?;
            let p = Point2::from(ij);
            // candidates: edges whose index-space bounding box holds the node
            let best = edges
                .iter()
                .filter(|(_, a, b)| {
                    let (pa, pb) = (nominal.value(*a), nominal.value(*b));
                    p.x >= pa.x.min(pb.x) - ROUND_OFF
                        && p.x <= pa.x.max(pb.x) + ROUND_OFF
                        && p.y >= pa.y.min(pb.y) - ROUND_OFF
                        && p.y <= pa.y.max(pb.y) + ROUND_OFF
                })
                .map(|&(j, a, b)| {
                    let (pa, pb) = (Point2::from(nominal.value(a)), Point2::from(nominal.value(b)));
                    (j, a, b, geometry::point_segment_distance(&p, &pa, &pb))
                })
                .min_by(|x, y| x.3.total_cmp(&y.3));
            let (j, a, b, offset) = best.ok_or(MeshError::NoCandidateEdge { node: n })?;

            let (va, vb) = (nominal.value(a), nominal.value(b));
            let axis_aligned = va.x == vb.x || va.y == vb.y;
            let allowable = if axis_aligned {
                self.config.axis_node_offset
            } else {
                self.config.max_ragged_node_offset
            };
            if offset > allowable {
                return Err(MeshError::BoundaryMatch {
                    node: n,
                    offset,
                    allowable,
                });
            }

            let rigid = self.gen.valid_nodes().any(|g| {
                let v = nominal.value(g);
                geometry::allclose(ij.x, v.x) && geometry::allclose(ij.y, v.y)
            });
            let data = &mut grid.node_mut(n).data;
            data.gen_edge = Some(j);
            data.role = if rigid { NodeRole::Rigid } else { NodeRole::Slidable };
        }
        Ok(())
    }

    /// Move boundary nodes of a quad intermediate onto their Bezier curves
    ///
    /// The curve parameter is the node's geographic distance from the edge's
    /// first node over the chord length, clipped to [0, 1].
    pub fn adjust_intermediate_bounds(&self, mesh: &mut IntermediateMesh) -> Vec<Advisory> {
        let mut clipped: HashMap<usize, usize> = HashMap::new();
        let nodes: Vec<usize> = mesh.grid.valid_nodes().collect();
        for n in nodes {
            let data = &mesh.grid.node(n).data;
            let j = match data.gen_edge {
                Some(j) if data.role != NodeRole::Interior => j,
                _ => continue,
            };
            let [a, b] = self.gen.edge(j).nodes;
            let (p0, pn) = (self.gen.x(a), self.gen.x(b));
            let span = (pn - p0).norm();
            if span == 0.0 {
                continue;
            }
            let t = (mesh.grid.x(n) - p0).norm() / span;
            if t > 1.0 + ROUND_OFF {
                *clipped.entry(j).or_insert(0) += 1;
            }
            let x = bezier::bezier_point(&self.param.bezier.controls[j], t.clamp(0.0, 1.0));
            mesh.grid.set_x(n, x);
        }

        let mut edges: Vec<(usize, usize)> = clipped.into_iter().collect();
        edges.sort_unstable();
        edges
            .into_iter()
            .map(|(edge, count)| {
                let advisory = Advisory::ClippedParameter { edge, count };
                advisory.log();
                advisory
            })
            .collect()
    }

    // ---- triangles ----

    /// Triangle intermediate in the nominal index scale
    ///
    /// The field solve reads its boundary gradient directions from these labels.
    pub fn build_tri(&self, filler: &dyn HoleFiller) -> MeshResult<IntermediateMesh> {
        let ij = &self.param.nominal;
        let mut grid = IntermediateGrid::new();
        let mut ring: Vec<usize> = Vec::new();

        for (j, a, b) in self.boundary_edges()? {
            let curve = self
                .param
                .bezier_curve(self.gen, Some(j), self.config.bezier_samples_per_edge, false)?;
            let reversed = self.gen.edge(j).nodes[0] != a;
            let dist = curve.total_length();
            let steps = self.config.min_steps.max((dist / self.config.nom_res) as usize);
            let (ij_a, ij_b) = (ij.value(a), ij.value(b));
            for s in 0..steps {
                let alpha = s as f64 / steps as f64;
                let f = if reversed { dist * (1.0 - alpha) } else { dist * alpha };
                let data = IntNode {
                    ij: Some(ij_a + (ij_b - ij_a) * alpha),
                    role: NodeRole::Rigid,
                    gen_edge: Some(j),
                };
                let n = grid.add_or_find_node(curve.eval(f), self.config.node_snap_tolerance, data);
                if ring.last() != Some(&n) {
                    ring.push(n);
                }
            }
        }
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        self.check_single_cycle(&grid, &ring)?;

        let points = grid.points(&ring);
        let fill = filler.fill(&points)?;
        let mut ids = ring.clone();
        for p in &fill.points[ring.len()..] {
            ids.push(grid.add_node(*p, IntNode::interior(None)));
        }
        for tri in &fill.triangles {
            grid.add_cell(tri.iter().map(|&k| ids[k]).collect())?;
        }

        let cycle = grid.boundary_cycle()?;
        if cycle.len() != ring.len() {
            return Err(MeshError::triangulation(format!(
                "filled mesh boundary has {} nodes, expected {}",
                cycle.len(),
                ring.len()
            )));
        }
        log::info!(
            "triangle intermediate: {} boundary nodes, {} nodes, {} cells",
            ring.len(),
            grid.count_valid_nodes(),
            grid.count_valid_cells()
        );
        Ok(IntermediateMesh {
            grid,
            kind: IntermediateKind::Tri,
            scale: IndexScale::Nominal,
        })
    }

    /// The sampled boundary must form exactly one closed counter-clockwise face
    fn check_single_cycle(&self, grid: &IntermediateGrid, ring: &[usize]) -> MeshResult<()> {
        if ring.len() > self.config.max_cycle_len {
            return Err(MeshError::triangulation(format!(
                "boundary has {} nodes, more than max_cycle_len {}",
                ring.len(),
                self.config.max_cycle_len
            )));
        }
        let mut outline: UnstructuredGrid<(), ()> = UnstructuredGrid::new();
        for p in grid.points(ring) {
            outline.add_node(p, ());
        }
        let m = ring.len();
        for k in 0..m {
            outline.add_edge(k, (k + 1) % m, ())?;
        }
        let cycles = outline.find_cycles(self.config.max_cycle_len);
        if cycles.len() != 1 {
            return Err(MeshError::triangulation(format!(
                "sampled boundary forms {} closed cycles, expected 1",
                cycles.len()
            )));
        }
        Ok(())
    }
}
