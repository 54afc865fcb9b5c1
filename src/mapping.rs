//! From solved fields back to geography
//!
//! Index values of fixed generating nodes are paired with the field values
//! found at the coinciding intermediate nodes, giving one monotonic 1-D map
//! per axis (i <-> psi, j <-> phi). Target nodes go index -> (psi, phi) ->
//! geographic position through a scattered-data interpolant of the
//! intermediate mesh.

use nalgebra::{Point2, SVector, Vector2};
use std::collections::HashMap;

use crate::error::{Advisory, MeshError, MeshResult};
use crate::fields::HarmonicFields;
use crate::geometry;
use crate::grid::{GeneratingGrid, UnstructuredGrid};
use crate::intermediate::IntermediateGrid;
use crate::interpolate::LinearExtrapolator;
use crate::parameterization::IndexField;

/// Final mesh node payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalNode {
    pub ij: Vector2<f64>,
}

pub type FinalGrid = UnstructuredGrid<FinalNode, ()>;

/// Index values and the field values paired with them
///
/// `index` is ascending. `field` is ascending for psi and descending for phi.
#[derive(Debug, Clone)]
pub struct AxisMap {
    pub index: Vec<f64>,
    pub field: Vec<f64>,
}

impl AxisMap {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Index values strictly increase and field values never reverse
    pub fn is_monotonic(&self) -> bool {
        let index_up = self.index.windows(2).all(|w| w[0] < w[1]);
        let up = self.field.windows(2).all(|w| w[0] <= w[1]);
        let down = self.field.windows(2).all(|w| w[0] >= w[1]);
        index_up && (up || down)
    }
}

/// Independent per-axis maps between index space and field space
#[derive(Debug, Clone)]
pub struct FieldCorrespondence {
    pub i_psi: AxisMap,
    pub j_phi: AxisMap,
}

impl FieldCorrespondence {
    /// Pair fixed generating-node values of `field` with the solved fields
    pub fn build(
        gen: &GeneratingGrid,
        field: &IndexField,
        grid: &IntermediateGrid,
        fields: &HarmonicFields,
    ) -> MeshResult<Self> {
        let locator = grid.node_locator();
        let mut maps = Vec::with_capacity(2);
        for axis in 0..2 {
            let values = if axis == 0 { &fields.psi } else { &fields.phi };
            let mut pairs: Vec<(f64, f64)> = Vec::new();
            for g in gen.valid_nodes().filter(|&g| field.is_fixed(g, axis)) {
                let n = locator
                    .nearest_node(&gen.x(g))
                    .ok_or_else(|| MeshError::malformed_grid("intermediate mesh has no nodes"))?;
                pairs.push((field.value(g)[axis], values[n]));
            }
            if pairs.is_empty() {
                return Err(MeshError::malformed_grid(format!(
                    "no fixed generating nodes on axis {}",
                    axis
                )));
            }
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            // mean field value per distinct index value
            let mut index = Vec::new();
            let mut sums: Vec<(f64, usize)> = Vec::new();
            for (k, f) in pairs {
                if index.last() == Some(&k) {
                    if let Some(last) = sums.last_mut() {
                        last.0 += f;
                        last.1 += 1;
                    }
                } else {
                    index.push(k);
                    sums.push((f, 1));
                }
            }
            let mut mapped: Vec<f64> = sums.iter().map(|(s, c)| s / *c as f64).collect();
            // force monotonic: psi increasing, phi decreasing
            mapped.sort_by(|a, b| a.total_cmp(b));
            if axis == 1 {
                mapped.reverse();
            }
            maps.push(AxisMap { index, field: mapped });
        }
        let j_phi = maps.pop().ok_or_else(|| MeshError::malformed_grid("missing j map"))?;
        let i_psi = maps.pop().ok_or_else(|| MeshError::malformed_grid("missing i map"))?;
        log::debug!("field correspondence: {} i values, {} j values", i_psi.len(), j_phi.len());
        Ok(Self { i_psi, j_phi })
    }

    /// (psi, phi) to index coordinates
    pub fn psiphi_to_ij(&self, pp: &Vector2<f64>) -> Vector2<f64> {
        let i = geometry::interp(pp.x, &self.i_psi.field, &self.i_psi.index);
        let phi_up: Vec<f64> = self.j_phi.field.iter().rev().copied().collect();
        let j_down: Vec<f64> = self.j_phi.index.iter().rev().copied().collect();
        let j = geometry::interp(pp.y, &phi_up, &j_down);
        Vector2::new(i, j)
    }

    /// Index coordinates to (psi, phi)
    pub fn ij_to_psiphi(&self, ij: &Vector2<f64>) -> Vector2<f64> {
        Vector2::new(
            geometry::interp(ij.x, &self.i_psi.index, &self.i_psi.field),
            geometry::interp(ij.y, &self.j_phi.index, &self.j_phi.field),
        )
    }

    pub fn is_monotonic(&self) -> bool {
        self.i_psi.is_monotonic() && self.j_phi.is_monotonic()
    }
}

/// Interpolant from (psi, phi) to geographic position over the intermediate mesh
pub fn psiphi_interpolator(grid: &IntermediateGrid, fields: &HarmonicFields) -> MeshResult<LinearExtrapolator<2>> {
    let nodes: Vec<usize> = grid.valid_nodes().collect();
    let domain = nodes
        .iter()
        .map(|&n| Point2::new(fields.psi[n], fields.phi[n]))
        .collect();
    let image = nodes
        .iter()
        .map(|&n| {
            let x = grid.x(n);
            SVector::<f64, 2>::new(x.x, x.y)
        })
        .collect();
    LinearExtrapolator::new(domain, image)
}

/// Move every node of `grid` to the position its index coordinate maps to
pub fn adjust_by_psi_phi(
    grid: &mut FinalGrid,
    correspondence: &FieldCorrespondence,
    interp_xy: &LinearExtrapolator<2>,
) -> Option<Advisory> {
    let nodes: Vec<usize> = grid.valid_nodes().collect();
    let targets: Vec<Point2<f64>> = nodes
        .iter()
        .map(|&n| Point2::from(correspondence.ij_to_psiphi(&grid.node(n).data.ij)))
        .collect();
    let (xy, extrapolated) = interp_xy.eval_many(&targets);
    for (&n, v) in nodes.iter().zip(&xy) {
        grid.set_x(n, Point2::new(v[0], v[1]));
    }
    if extrapolated > 0 {
        let advisory = Advisory::Extrapolated {
            stage: "psi/phi to geography",
            count: extrapolated,
        };
        advisory.log();
        Some(advisory)
    } else {
        None
    }
}

fn lattice_key(ij: &Vector2<f64>) -> (i64, i64) {
    (ij.x.round() as i64, ij.y.round() as i64)
}

/// Relabel a grid laid out on an integer index lattice with values of `src`
///
/// Fixed generating values are copied to the nearest node and carried along
/// the grid line on which that coordinate is constant. Remaining nodes are
/// interpolated over the lattice.
pub fn remap_ij(gen: &GeneratingGrid, src: &IndexField, grid: &FinalGrid) -> MeshResult<(Vec<Vector2<f64>>, Vec<Advisory>)> {
    let lattice: HashMap<(i64, i64), usize> = grid
        .valid_nodes()
        .map(|n| (lattice_key(&grid.node(n).data.ij), n))
        .collect();
    let locator = grid.node_locator();
    let mut out = vec![Vector2::repeat(f64::NAN); grid.n_nodes()];
    let mut advisories = Vec::new();

    for axis in 0..2 {
        for g in gen.valid_nodes().filter(|&g| src.is_fixed(g, axis)) {
            let val = src.value(g)[axis];
            let (n, offset) = locator
                .nearest(&gen.x(g))
                .ok_or_else(|| MeshError::malformed_grid("grid has no nodes to remap"))?;
            if !(geometry::allclose(grid.x(n).x, gen.x(g).x) && geometry::allclose(grid.x(n).y, gen.x(g).y)) {
                let advisory = Advisory::LooseNodeMatch {
                    gen_node: g,
                    node: n,
                    offset,
                };
                advisory.log();
                advisories.push(advisory);
            }
            out[n][axis] = val;

            let start = lattice_key(&grid.node(n).data.ij);
            for incr in [1i64, -1] {
                let mut key = start;
                loop {
                    if axis == 0 {
                        key.1 += incr;
                    } else {
                        key.0 += incr;
                    }
                    let Some(&m) = lattice.get(&key) else {
                        break;
                    };
                    let existing = out[m][axis];
                    if existing.is_finite() {
                        if !geometry::allclose(existing, val) {
                            return Err(MeshError::malformed_grid(format!(
                                "incompatible index along grid line at node {}: {} vs {}",
                                m, existing, val
                            )));
                        }
                    } else {
                        out[m][axis] = val;
                    }
                }
            }
        }

        let (known, unknown): (Vec<usize>, Vec<usize>) =
            grid.valid_nodes().partition(|&n| out[n][axis].is_finite());
        if unknown.is_empty() {
            continue;
        }
        let interp = LinearExtrapolator::<1>::new(
            known.iter().map(|&n| Point2::from(grid.node(n).data.ij)).collect(),
            known.iter().map(|&n| SVector::<f64, 1>::new(out[n][axis])).collect(),
        )?;
        for n in unknown {
            out[n][axis] = interp.eval(&Point2::from(grid.node(n).data.ij)).0[0];
        }
    }
    Ok((out, advisories))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::BoundaryConditions;
    use crate::grid::GeneratingGridSpec;
    use crate::intermediate::IntNode;
    use crate::linalg::SolverStats;
    use crate::parameterization::coalesce_ij;
    use approx::assert_relative_eq;

    fn square_gen() -> GeneratingGrid {
        let spec = GeneratingGridSpec::new()
            .with_node(0.0, 0.0, Some(0.0), Some(0.0))
            .with_node(10.0, 0.0, Some(10.0), Some(0.0))
            .with_node(10.0, 10.0, Some(10.0), Some(10.0))
            .with_node(0.0, 10.0, Some(0.0), Some(10.0))
            .with_cell(vec![0, 1, 2, 3]);
        GeneratingGrid::from_spec(&spec).unwrap()
    }

    /// 11x11 unit lattice with psi = x / 5 - 1 and phi = 1 - y / 5
    fn lattice_fields() -> (IntermediateGrid, HarmonicFields) {
        let mut g: UnstructuredGrid<(), ()> = UnstructuredGrid::new();
        g.add_rectilinear(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0), 11, 11, || ())
            .unwrap();
        let grid = g.map_nodes(|_, node| IntNode::interior(Some(node.x.coords)));
        let psi = (0..grid.n_nodes()).map(|n| grid.x(n).x / 5.0 - 1.0).collect();
        let phi = (0..grid.n_nodes()).map(|n| 1.0 - grid.x(n).y / 5.0).collect();
        let fields = HarmonicFields {
            psi,
            phi,
            psi_bcs: BoundaryConditions::default(),
            phi_bcs: BoundaryConditions::default(),
            dofs: 1,
            gradient_scale: 1.0,
            stats: SolverStats::new(),
        };
        (grid, fields)
    }

    #[test]
    fn test_correspondence_is_monotonic() {
        let gen = square_gen();
        let ij = coalesce_ij(&gen);
        let (grid, fields) = lattice_fields();
        let corr = FieldCorrespondence::build(&gen, &ij, &grid, &fields).unwrap();
        assert!(corr.is_monotonic());
        assert_eq!(corr.i_psi.index, vec![0.0, 10.0]);
        assert_eq!(corr.i_psi.field, vec![-1.0, 1.0]);
        assert_eq!(corr.j_phi.field, vec![1.0, -1.0]);
    }

    #[test]
    fn test_round_trip_through_fields() {
        let gen = square_gen();
        let ij = coalesce_ij(&gen);
        let (grid, fields) = lattice_fields();
        let corr = FieldCorrespondence::build(&gen, &ij, &grid, &fields).unwrap();
        let interp = psiphi_interpolator(&grid, &fields).unwrap();

        let original = Vector2::new(3.25, 7.5);
        let pp = corr.ij_to_psiphi(&original);
        let back = corr.psiphi_to_ij(&pp);
        assert_relative_eq!(back.x, original.x, epsilon = 1e-12);
        assert_relative_eq!(back.y, original.y, epsilon = 1e-12);

        let (xy, outside) = interp.eval(&Point2::from(pp));
        assert!(!outside);
        assert_relative_eq!(xy[0], 3.25, epsilon = 1e-9);
        assert_relative_eq!(xy[1], 7.5, epsilon = 1e-9);
    }

    #[test]
    fn test_adjust_places_nodes() {
        let gen = square_gen();
        let ij = coalesce_ij(&gen);
        let (grid, fields) = lattice_fields();
        let corr = FieldCorrespondence::build(&gen, &ij, &grid, &fields).unwrap();
        let interp = psiphi_interpolator(&grid, &fields).unwrap();

        let mut target: FinalGrid = UnstructuredGrid::new();
        let patch = target
            .add_rectilinear(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), 3, 3, || FinalNode {
                ij: Vector2::zeros(),
            })
            .unwrap();
        for (ix, column) in patch.nodes.iter().enumerate() {
            for (iy, &n) in column.iter().enumerate() {
                target.node_mut(n).data.ij = Vector2::new(ix as f64 * 5.0, iy as f64 * 5.0);
            }
        }
        assert!(adjust_by_psi_phi(&mut target, &corr, &interp).is_none());
        let centre = patch.nodes[1][1];
        assert_relative_eq!(target.x(centre).x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(target.x(centre).y, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_adjust_reports_extrapolation() {
        let gen = square_gen();
        let ij = coalesce_ij(&gen);
        let (grid, fields) = lattice_fields();
        let mut corr = FieldCorrespondence::build(&gen, &ij, &grid, &fields).unwrap();
        // i = 10 now maps to psi = 2, past the solved range
        corr.i_psi.field = vec![-2.0, 2.0];
        let interp = psiphi_interpolator(&grid, &fields).unwrap();

        let mut target: FinalGrid = UnstructuredGrid::new();
        let n = target.add_node(Point2::origin(), FinalNode {
            ij: Vector2::new(10.0, 5.0),
        });
        let advisory = adjust_by_psi_phi(&mut target, &corr, &interp);
        assert!(matches!(advisory, Some(Advisory::Extrapolated { count: 1, .. })));
        assert_relative_eq!(target.x(n).x, 15.0, epsilon = 1e-6);
        assert_relative_eq!(target.x(n).y, 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_remap_carries_values_along_lines() {
        // nominal lattice 0..4 over a square whose user ij spans 0..10
        let gen = square_gen();
        let ij = coalesce_ij(&gen);
        let mut grid: FinalGrid = UnstructuredGrid::new();
        let patch = grid
            .add_rectilinear(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0), 5, 5, || FinalNode {
                ij: Vector2::zeros(),
            })
            .unwrap();
        for (ix, column) in patch.nodes.iter().enumerate() {
            for (iy, &n) in column.iter().enumerate() {
                grid.node_mut(n).data.ij = Vector2::new(ix as f64, iy as f64);
            }
        }
        let (out, advisories) = remap_ij(&gen, &ij, &grid).unwrap();
        assert!(advisories.is_empty());
        // left column carries i = 0, top row carries j = 10
        for iy in 0..5 {
            assert_relative_eq!(out[patch.nodes[0][iy]].x, 0.0);
            assert_relative_eq!(out[patch.nodes[4][iy]].x, 10.0);
        }
        for ix in 0..5 {
            assert_relative_eq!(out[patch.nodes[ix][4]].y, 10.0);
        }
        assert_relative_eq!(out[patch.nodes[2][2]].x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(out[patch.nodes[1][3]].y, 7.5, epsilon = 1e-9);
    }
}
