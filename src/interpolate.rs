//! Piecewise-linear scattered-data interpolation
//!
//! Samples are triangulated and each query is evaluated with barycentric
//! weights of the triangle containing it. Queries outside the convex hull
//! use the plane of the closest triangle, so they extrapolate linearly
//! instead of failing.

use nalgebra::{Point2, SVector};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::error::{MeshError, MeshResult};
use crate::geometry;
use crate::grid::NodeLocator;
use crate::triangulate::Delaunay;

/// Candidates examined when searching the closest triangle
const NEAREST_CANDIDATES: usize = 8;
const INSIDE_EPS: f64 = 1e-10;

/// Bounding box of one triangle
#[derive(Debug, Clone)]
struct TriangleEnvelope {
    tri: usize,
    min: [f64; 2],
    max: [f64; 2],
}

impl RTreeObject for TriangleEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

impl PointDistance for TriangleEnvelope {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = (self.min[0] - point[0]).max(0.0).max(point[0] - self.max[0]);
        let dy = (self.min[1] - point[1]).max(0.0).max(point[1] - self.max[1]);
        dx * dx + dy * dy
    }
}

/// Linear interpolant from 2-D sample locations to `D` values per sample
#[derive(Debug, Clone)]
pub struct LinearExtrapolator<const D: usize> {
    points: Vec<Point2<f64>>,
    values: Vec<SVector<f64, D>>,
    triangles: Vec<[usize; 3]>,
    index: RTree<TriangleEnvelope>,
    samples: NodeLocator,
}

impl<const D: usize> LinearExtrapolator<D> {
    /// Build from matching slices of locations and values
    ///
    /// With fewer than three samples, or samples on a single line, queries
    /// return the value of the nearest sample.
    pub fn new(points: Vec<Point2<f64>>, values: Vec<SVector<f64, D>>) -> MeshResult<Self> {
        if points.len() != values.len() {
            return Err(MeshError::invalid_config(format!(
                "{} sample points but {} values",
                points.len(),
                values.len()
            )));
        }
        let triangles = match Delaunay::new(&points) {
            Ok(dt) => dt
                .triangles()
                .into_iter()
                .filter(|t| geometry::signed_area(&[points[t[0]], points[t[1]], points[t[2]]]) > 0.0)
                .collect(),
            Err(err) => {
                log::debug!("interpolator falls back to nearest sample: {}", err);
                Vec::new()
            }
        };
        let envelopes: Vec<TriangleEnvelope> = triangles
            .iter()
            .enumerate()
            .map(|(tri, t): (usize, &[usize; 3])| {
                let (a, b, c) = (points[t[0]], points[t[1]], points[t[2]]);
                TriangleEnvelope {
                    tri,
                    min: [a.x.min(b.x).min(c.x), a.y.min(b.y).min(c.y)],
                    max: [a.x.max(b.x).max(c.x), a.y.max(b.y).max(c.y)],
                }
            })
            .collect();
        let samples = NodeLocator::new(points.iter().copied().enumerate());
        Ok(Self {
            points,
            values,
            triangles,
            index: RTree::bulk_load(envelopes),
            samples,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.points.len()
    }

    pub fn n_triangles(&self) -> usize {
        self.triangles.len()
    }

    fn barycentric(&self, tri: usize, p: &Point2<f64>) -> Option<[f64; 3]> {
        let t = self.triangles[tri];
        let (a, b, c) = (self.points[t[0]], self.points[t[1]], self.points[t[2]]);
        let det = (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y);
        if det.abs() < f64::MIN_POSITIVE {
            return None;
        }
        let l1 = ((p.x - a.x) * (c.y - a.y) - (c.x - a.x) * (p.y - a.y)) / det;
        let l2 = ((b.x - a.x) * (p.y - a.y) - (p.x - a.x) * (b.y - a.y)) / det;
        Some([1.0 - l1 - l2, l1, l2])
    }

    fn combine(&self, tri: usize, w: [f64; 3]) -> SVector<f64, D> {
        let t = self.triangles[tri];
        self.values[t[0]] * w[0] + self.values[t[1]] * w[1] + self.values[t[2]] * w[2]
    }

    fn triangle_distance(&self, tri: usize, p: &Point2<f64>) -> f64 {
        let t = self.triangles[tri];
        let pts = [self.points[t[0]], self.points[t[1]], self.points[t[2]]];
        geometry::distance_to_polygon(p, &pts)
    }

    fn nearest_sample(&self, p: &Point2<f64>) -> SVector<f64, D> {
        self.samples
            .nearest_node(p)
            .map_or_else(|| SVector::repeat(f64::NAN), |n| self.values[n])
    }

    /// Value at `p` and whether it was extrapolated
    pub fn eval(&self, p: &Point2<f64>) -> (SVector<f64, D>, bool) {
        if self.triangles.is_empty() {
            return (self.nearest_sample(p), !self.points.is_empty());
        }
        for env in self.index.locate_all_at_point(&[p.x, p.y]) {
            if let Some(w) = self.barycentric(env.tri, p) {
                if w.iter().all(|&l| l >= -INSIDE_EPS) {
                    return (self.combine(env.tri, w), false);
                }
            }
        }
        let closest = self
            .index
            .nearest_neighbor_iter(&[p.x, p.y])
            .take(NEAREST_CANDIDATES)
            .map(|env| (env.tri, self.triangle_distance(env.tri, p)))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        match closest.and_then(|(tri, _)| self.barycentric(tri, p).map(|w| (tri, w))) {
            Some((tri, w)) => (self.combine(tri, w), true),
            None => (self.nearest_sample(p), true),
        }
    }

    /// Evaluate many points; also returns how many were extrapolated
    pub fn eval_many(&self, queries: &[Point2<f64>]) -> (Vec<SVector<f64, D>>, usize) {
        let mut extrapolated = 0;
        let values = queries
            .iter()
            .map(|p| {
                let (v, outside) = self.eval(p);
                extrapolated += outside as usize;
                v
            })
            .collect();
        (values, extrapolated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    fn plane_samples() -> LinearExtrapolator<2> {
        let mut pts = Vec::new();
        let mut vals = Vec::new();
        for i in 0..5 {
            for j in 0..4 {
                let p = Point2::new(i as f64, j as f64 * 1.5);
                pts.push(p);
                vals.push(Vector2::new(2.0 * p.x - p.y + 1.0, 0.5 * p.y));
            }
        }
        LinearExtrapolator::new(pts, vals).unwrap()
    }

    #[test]
    fn test_reproduces_linear_field_inside() {
        let f = plane_samples();
        let (v, outside) = f.eval(&Point2::new(1.3, 2.2));
        assert!(!outside);
        assert_relative_eq!(v[0], 2.0 * 1.3 - 2.2 + 1.0, epsilon = 1e-10);
        assert_relative_eq!(v[1], 1.1, epsilon = 1e-10);
    }

    #[test]
    fn test_extrapolates_linear_field_outside() {
        let f = plane_samples();
        let (v, outside) = f.eval(&Point2::new(-0.5, 2.0));
        assert!(outside);
        assert_relative_eq!(v[0], 2.0 * -0.5 - 2.0 + 1.0, epsilon = 1e-9);
        let (vals, count) = f.eval_many(&[Point2::new(2.0, 2.0), Point2::new(10.0, 10.0)]);
        assert_eq!(vals.len(), 2);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_collinear_falls_back_to_nearest() {
        let pts = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)];
        let vals = vec![SVector::<f64, 1>::new(0.0), SVector::<f64, 1>::new(10.0), SVector::<f64, 1>::new(20.0)];
        let f = LinearExtrapolator::new(pts, vals).unwrap();
        let (v, _) = f.eval(&Point2::new(1.9, 0.3));
        assert_relative_eq!(v[0], 20.0);
    }
}
