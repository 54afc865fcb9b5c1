//! Cubic Bezier boundary curves
//!
//! Each generating edge carries four control points. Boundary curves are
//! sampled into polylines for arc-length parameterized queries.

use nalgebra::{Point2, Vector2};

use crate::geometry;

/// Control points of a cubic Bezier segment
pub type ControlPoints = [Point2<f64>; 4];

/// Straight segment from `a` to `b` with controls at the thirds
pub fn straight_controls(a: Point2<f64>, b: Point2<f64>) -> ControlPoints {
    let d = b - a;
    [a, a + d / 3.0, a + d * (2.0 / 3.0), b]
}

/// Evaluate the Bernstein form at `t`
pub fn bezier_point(bez: &ControlPoints, t: f64) -> Point2<f64> {
    let s = 1.0 - t;
    let b0 = s * s * s;
    let b1 = 3.0 * s * s * t;
    let b2 = 3.0 * s * t * t;
    let b3 = t * t * t;
    Point2::from(bez[0].coords * b0 + bez[1].coords * b1 + bez[2].coords * b2 + bez[3].coords * b3)
}

/// `1 + samples` evenly spaced parameter samples, optionally from t=1 to t=0
pub fn sample_bezier(bez: &ControlPoints, samples: usize, reversed: bool) -> Vec<Point2<f64>> {
    let samples = samples.max(1);
    (0..=samples)
        .map(|k| {
            let t = k as f64 / samples as f64;
            let t = if reversed { 1.0 - t } else { t };
            bezier_point(bez, t)
        })
        .collect()
}

/// Polyline approximation of a boundary curve
#[derive(Debug, Clone)]
pub struct BoundaryCurve {
    points: Vec<Point2<f64>>,
    dists: Vec<f64>,
    closed: bool,
}

impl BoundaryCurve {
    pub fn new(mut points: Vec<Point2<f64>>, closed: bool) -> Self {
        if closed {
            if let Some(&first) = points.first() {
                points.push(first);
            }
        }
        let dists = geometry::dist_along(&points);
        Self {
            points,
            dists,
            closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn total_length(&self) -> f64 {
        self.dists.last().copied().unwrap_or(0.0)
    }

    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    fn segment_at(&self, f: f64) -> usize {
        let n = self.points.len();
        if n < 2 {
            return 0;
        }
        let k = self.dists.partition_point(|&d| d <= f);
        k.clamp(1, n - 1) - 1
    }

    /// Point at arc length `f`
    pub fn eval(&self, f: f64) -> Point2<f64> {
        if self.points.len() < 2 {
            return self.points.first().copied().unwrap_or_else(Point2::origin);
        }
        let f = if self.closed {
            f.rem_euclid(self.total_length().max(f64::MIN_POSITIVE))
        } else {
            f.clamp(0.0, self.total_length())
        };
        let k = self.segment_at(f);
        let seg = self.dists[k + 1] - self.dists[k];
        if seg <= 0.0 {
            return self.points[k];
        }
        let alpha = (f - self.dists[k]) / seg;
        self.points[k] + (self.points[k + 1] - self.points[k]) * alpha
    }

    /// Unit tangent at arc length `f`
    pub fn tangent(&self, f: f64) -> Vector2<f64> {
        if self.points.len() < 2 {
            return Vector2::zeros();
        }
        let k = self.segment_at(f.clamp(0.0, self.total_length()));
        geometry::to_unit(&(self.points[k + 1] - self.points[k]))
    }

    /// Arc length of the closest point on the curve to `p`
    pub fn point_to_f(&self, p: &Point2<f64>) -> f64 {
        let mut best = (f64::INFINITY, 0.0);
        for k in 0..self.points.len().saturating_sub(1) {
            let a = self.points[k];
            let ab = self.points[k + 1] - a;
            let len2 = ab.norm_squared();
            let t = if len2 > 0.0 {
                ((p - a).dot(&ab) / len2).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let d = (p - (a + ab * t)).norm();
            if d < best.0 {
                best = (d, self.dists[k] + t * (self.dists[k + 1] - self.dists[k]));
            }
        }
        best.1
    }

    /// Closest point on the curve to `p`
    pub fn project(&self, p: &Point2<f64>) -> Point2<f64> {
        self.eval(self.point_to_f(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_straight_bezier_is_linear() {
        let bez = straight_controls(Point2::new(0.0, 0.0), Point2::new(3.0, 3.0));
        let p = bezier_point(&bez, 0.25);
        assert_relative_eq!(p.x, 0.75, epsilon = 1e-12);
        assert_relative_eq!(p.y, 0.75, epsilon = 1e-12);
        let pts = sample_bezier(&bez, 3, true);
        assert_eq!(pts.len(), 4);
        assert_relative_eq!(pts[0].x, 3.0);
        assert_relative_eq!(pts[3].x, 0.0);
    }

    #[test]
    fn test_curve_queries() {
        let curve = BoundaryCurve::new(
            vec![Point2::new(0.0, 0.0), Point2::new(4.0, 0.0), Point2::new(4.0, 3.0)],
            false,
        );
        assert_relative_eq!(curve.total_length(), 7.0);
        let f = curve.point_to_f(&Point2::new(2.0, 1.0));
        assert_relative_eq!(f, 2.0);
        let t = curve.tangent(5.0);
        assert_relative_eq!(t.y, 1.0);
        let p = curve.project(&Point2::new(5.0, 1.5));
        assert_relative_eq!(p.x, 4.0);
        assert_relative_eq!(p.y, 1.5);
    }

    #[test]
    fn test_closed_curve_wraps() {
        let curve = BoundaryCurve::new(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(0.0, 1.0),
            ],
            true,
        );
        assert!(curve.is_closed());
        assert_relative_eq!(curve.total_length(), 4.0);
        let p = curve.eval(4.5);
        assert_relative_eq!(p.x, 0.5);
        assert_relative_eq!(p.y, 0.0);
    }
}
