/// Mesh Orthogonality Assessment
///
/// Measures how close a mesh is to the orthogonal ideal:
/// 1. Corner angles of quad cells compared against 90 degrees
/// 2. Alignment of each interior edge with the segment joining the
///    circumcenters of its two cells (the finite-volume orthogonality measure)
/// 3. Inverted (clockwise or zero-area) cells

use nalgebra::Point2;
use rayon::prelude::*;

use crate::geometry;
use crate::grid::UnstructuredGrid;

/// Mesh orthogonality statistics
#[derive(Debug, Clone)]
pub struct OrthogonalityReport {
    /// Largest |corner angle - 90| over quad cells, degrees
    pub max_angle_deviation: f64,
    /// Mean |corner angle - 90| over quad corners, degrees
    pub mean_angle_deviation: f64,
    /// Largest |cos| between an edge and its circumcenter segment (0 = orthogonal)
    pub max_edge_cosine: f64,
    pub mean_edge_cosine: f64,
    /// Cells with non-positive signed area
    pub num_inverted: usize,
    pub total_cells: usize,
}

impl OrthogonalityReport {
    /// No inverted cells and no corner off by more than `tolerance_deg`
    pub fn is_acceptable(&self, tolerance_deg: f64) -> bool {
        self.num_inverted == 0 && self.max_angle_deviation <= tolerance_deg
    }

    /// Human-readable quality report
    pub fn report(&self) -> String {
        format!(
            "Orthogonality: angle dev max={:.2}° mean={:.2}°, edge cos max={:.3e} mean={:.3e}, inverted={}/{}",
            self.max_angle_deviation,
            self.mean_angle_deviation,
            self.max_edge_cosine,
            self.mean_edge_cosine,
            self.num_inverted,
            self.total_cells
        )
    }
}

/// Absolute deviation from a right angle at every corner of a quad, degrees
///
/// Other polygons give an empty list.
pub fn corner_angle_deviations(points: &[Point2<f64>]) -> Vec<f64> {
    if points.len() != 4 {
        return Vec::new();
    }
    (0..4)
        .map(|k| {
            let prev = points[(k + 3) % 4] - points[k];
            let next = points[(k + 1) % 4] - points[k];
            let denom = prev.norm() * next.norm();
            if denom == 0.0 {
                return 90.0;
            }
            let angle = (prev.dot(&next) / denom).clamp(-1.0, 1.0).acos().to_degrees();
            (angle - 90.0).abs()
        })
        .collect()
}

struct CellStats {
    deviations: Vec<f64>,
    inverted: bool,
}

fn cell_stats<N: Clone, E: Clone + Default>(grid: &UnstructuredGrid<N, E>, c: usize) -> CellStats {
    let points = grid.cell_points(c);
    CellStats {
        inverted: geometry::signed_area(&points) <= 0.0,
        deviations: corner_angle_deviations(&points),
    }
}

fn edge_cosine<N: Clone, E: Clone + Default>(
    grid: &UnstructuredGrid<N, E>,
    centers: &[Option<Point2<f64>>],
    j: usize,
) -> Option<f64> {
    let [Some(c0), Some(c1)] = grid.edge_to_cells(j) else {
        return None;
    };
    let (p0, p1) = (centers[c0]?, centers[c1]?);
    let [a, b] = grid.edge(j).nodes;
    let edge = grid.x(b) - grid.x(a);
    let link = p1 - p0;
    let denom = edge.norm() * link.norm();
    if denom == 0.0 {
        return None;
    }
    Some((edge.dot(&link) / denom).abs())
}

/// Assess orthogonality of every valid cell and interior edge
///
/// Uses parallel computation for large meshes (>1000 cells)
pub fn assess_orthogonality<N, E>(grid: &UnstructuredGrid<N, E>) -> OrthogonalityReport
where
    N: Clone + Sync,
    E: Clone + Default + Sync,
{
    let cells: Vec<usize> = grid.valid_cells().collect();
    let edges: Vec<usize> = grid.valid_edges().collect();
    let parallel = cells.len() > 1000;

    let mut centers = vec![None; grid.n_cells()];
    let computed: Vec<(usize, Option<Point2<f64>>)> = if parallel {
        cells
            .par_iter()
            .map(|&c| (c, geometry::poly_circumcenter(&grid.cell_points(c))))
            .collect()
    } else {
        cells
            .iter()
            .map(|&c| (c, geometry::poly_circumcenter(&grid.cell_points(c))))
            .collect()
    };
    for (c, center) in computed {
        centers[c] = center;
    }

    let (stats, cosines): (Vec<CellStats>, Vec<f64>) = if parallel {
        (
            cells.par_iter().map(|&c| cell_stats(grid, c)).collect(),
            edges.par_iter().filter_map(|&j| edge_cosine(grid, &centers, j)).collect(),
        )
    } else {
        (
            cells.iter().map(|&c| cell_stats(grid, c)).collect(),
            edges.iter().filter_map(|&j| edge_cosine(grid, &centers, j)).collect(),
        )
    };

    let mut max_angle_deviation: f64 = 0.0;
    let mut sum_dev = 0.0;
    let mut n_corners = 0;
    let mut num_inverted = 0;
    for s in &stats {
        if s.inverted {
            num_inverted += 1;
        }
        for &d in &s.deviations {
            max_angle_deviation = max_angle_deviation.max(d);
            sum_dev += d;
            n_corners += 1;
        }
    }
    let max_edge_cosine = cosines.iter().copied().fold(0.0, f64::max);
    let mean_edge_cosine = if cosines.is_empty() {
        0.0
    } else {
        cosines.iter().sum::<f64>() / cosines.len() as f64
    };

    OrthogonalityReport {
        max_angle_deviation,
        mean_angle_deviation: if n_corners > 0 { sum_dev / n_corners as f64 } else { 0.0 },
        max_edge_cosine,
        mean_edge_cosine,
        num_inverted,
        total_cells: cells.len(),
    }
}
