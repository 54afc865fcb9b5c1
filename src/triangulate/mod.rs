//! Hole filling: triangulate the region enclosed by a closed boundary
//!
//! The boundary nodes are kept exactly as given. Interior nodes are seeded on
//! an equilateral lattice and thinned to a length scale that grows away from
//! the boundary, then the point set is triangulated and trimmed to the hole.

pub mod delaunay;

pub use delaunay::Delaunay;

use nalgebra::Point2;
use rstar::RTree;

use crate::error::{MeshError, MeshResult};
use crate::geometry;

/// Triangulated hole: boundary points first, in input order, then interior
#[derive(Debug, Clone)]
pub struct HoleFill {
    pub points: Vec<Point2<f64>>,
    pub triangles: Vec<[usize; 3]>,
}

/// Fills a closed counter-clockwise boundary with triangles
pub trait HoleFiller {
    fn fill(&self, boundary: &[Point2<f64>]) -> MeshResult<HoleFill>;
}

/// Length-scale driven Delaunay filler
#[derive(Debug, Clone)]
pub struct DelaunayHoleFiller {
    /// Growth of the length scale per unit distance from the boundary
    pub growth: f64,
}

impl DelaunayHoleFiller {
    pub fn new(growth: f64) -> Self {
        Self { growth }
    }

    /// Local length scale: boundary edge lengths, growing with distance
    fn scale_at(&self, p: &Point2<f64>, samples: &[(Point2<f64>, f64)]) -> f64 {
        samples
            .iter()
            .map(|(c, len)| len + (self.growth - 1.0) * (p - c).norm())
            .fold(f64::INFINITY, f64::min)
    }

    fn interior_points(&self, boundary: &[Point2<f64>]) -> Vec<Point2<f64>> {
        let m = boundary.len();
        let samples: Vec<(Point2<f64>, f64)> = (0..m)
            .map(|k| {
                let (a, b) = (boundary[k], boundary[(k + 1) % m]);
                (Point2::from((a.coords + b.coords) / 2.0), (b - a).norm())
            })
            .collect();
        let h = samples.iter().map(|s| s.1).fold(f64::INFINITY, f64::min);
        if !(h.is_finite() && h > 0.0) {
            return Vec::new();
        }

        let (mut lo, mut hi) = (boundary[0], boundary[0]);
        for p in boundary {
            lo = Point2::new(lo.x.min(p.x), lo.y.min(p.y));
            hi = Point2::new(hi.x.max(p.x), hi.y.max(p.y));
        }
        let dy = h * 3f64.sqrt() / 2.0;
        let rows = ((hi.y - lo.y) / dy).ceil() as usize + 1;
        let cols = ((hi.x - lo.x) / h).ceil() as usize + 1;

        let mut accepted: RTree<[f64; 2]> = RTree::new();
        let mut points = Vec::new();
        for r in 0..rows {
            let offset = if r % 2 == 1 { 0.5 * h } else { 0.0 };
            for c in 0..cols {
                let p = Point2::new(lo.x + offset + c as f64 * h, lo.y + r as f64 * dy);
                if !geometry::point_in_polygon(&p, boundary) {
                    continue;
                }
                let scale = self.scale_at(&p, &samples);
                if geometry::distance_to_polygon(&p, boundary) < 0.6 * scale {
                    continue;
                }
                let crowded = accepted
                    .nearest_neighbor(&[p.x, p.y])
                    .map_or(false, |q| ((q[0] - p.x).powi(2) + (q[1] - p.y).powi(2)).sqrt() < 0.85 * scale);
                if crowded {
                    continue;
                }
                accepted.insert([p.x, p.y]);
                points.push(p);
            }
        }
        points
    }
}

impl Default for DelaunayHoleFiller {
    fn default() -> Self {
        Self::new(1.15)
    }
}

impl HoleFiller for DelaunayHoleFiller {
    fn fill(&self, boundary: &[Point2<f64>]) -> MeshResult<HoleFill> {
        let m = boundary.len();
        if m < 3 {
            return Err(MeshError::triangulation(format!("hole boundary has {} nodes", m)));
        }
        if geometry::signed_area(boundary) <= 0.0 {
            return Err(MeshError::triangulation("hole boundary must be counter-clockwise"));
        }

        let mut points = boundary.to_vec();
        points.extend(self.interior_points(boundary));

        let mut dt = Delaunay::new(&points)?;
        for k in 0..m {
            dt.recover_edge(k, (k + 1) % m);
        }
        let triangles: Vec<[usize; 3]> = dt
            .triangles()
            .into_iter()
            .filter(|t| {
                let c = geometry::centroid(&[points[t[0]], points[t[1]], points[t[2]]]);
                geometry::point_in_polygon(&c, boundary)
            })
            .collect();

        for k in 0..m {
            if !dt.has_edge(k, (k + 1) % m) {
                return Err(MeshError::triangulation(format!(
                    "boundary edge {}-{} missing from triangulation",
                    k,
                    (k + 1) % m
                )));
            }
        }
        log::debug!(
            "filled hole: {} boundary, {} interior nodes, {} triangles",
            m,
            points.len() - m,
            triangles.len()
        );
        Ok(HoleFill { points, triangles })
    }
}
