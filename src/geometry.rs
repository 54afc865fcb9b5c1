//! Planar geometry helpers shared by the meshing stages

use nalgebra::{DMatrix, DVector, Point2, Vector2};
use std::f64::consts::PI;

/// Signed area of a simple polygon, positive for counter-clockwise order
pub fn signed_area(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    0.5 * sum
}

/// Mean of the vertices
pub fn centroid(points: &[Point2<f64>]) -> Point2<f64> {
    let n = points.len().max(1) as f64;
    let sum = points.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords);
    Point2::from(sum / n)
}

/// Rotate a vector counter-clockwise by `theta` radians
pub fn rot(theta: f64, v: &Vector2<f64>) -> Vector2<f64> {
    let (s, c) = theta.sin_cos();
    Vector2::new(c * v.x - s * v.y, s * v.x + c * v.y)
}

/// Unit vector in the direction of `v`; zero-length input is returned as is
pub fn to_unit(v: &Vector2<f64>) -> Vector2<f64> {
    let mag = v.norm();
    if mag > 0.0 {
        v / mag
    } else {
        *v
    }
}

/// Wrap an angle to [-pi, pi)
pub fn wrap_angle(theta: f64) -> f64 {
    (theta + PI).rem_euclid(2.0 * PI) - PI
}

/// Distance from `p` to the closed segment `a`-`b`
pub fn point_segment_distance(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Cumulative distance along a polyline, starting at zero
pub fn dist_along(points: &[Point2<f64>]) -> Vec<f64> {
    let mut dists = Vec::with_capacity(points.len());
    let mut total = 0.0;
    for (k, p) in points.iter().enumerate() {
        if k > 0 {
            total += (p - points[k - 1]).norm();
        }
        dists.push(total);
    }
    dists
}

/// Even-odd point in polygon test
pub fn point_in_polygon(p: &Point2<f64>, polygon: &[Point2<f64>]) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Shortest distance from a point to the edges of a closed polygon
pub fn distance_to_polygon(p: &Point2<f64>, polygon: &[Point2<f64>]) -> f64 {
    let n = polygon.len();
    (0..n)
        .map(|k| point_segment_distance(p, &polygon[k], &polygon[(k + 1) % n]))
        .fold(f64::INFINITY, f64::min)
}

/// Piecewise-linear interpolation with clamping at the ends
///
/// `xp` must be non-decreasing. Values outside the range take the end values.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len();
    if n == 0 {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    // first index with xp[k] > x
    let k = xp.partition_point(|&v| v <= x);
    let (x0, x1) = (xp[k - 1], xp[k]);
    let (f0, f1) = (fp[k - 1], fp[k]);
    if x1 == x0 {
        return f1;
    }
    f0 + (x - x0) * (f1 - f0) / (x1 - x0)
}

/// Tolerant float comparison with absolute 1e-8 and relative 1e-5 terms
pub fn allclose(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

/// Least-squares circumcenter of a polygon
///
/// Solves `2 c . p_k + (r^2 - |c|^2) = |p_k|^2` over all vertices. For a
/// triangle or any cyclic polygon this is the exact circumcenter.
pub fn poly_circumcenter(points: &[Point2<f64>]) -> Option<Point2<f64>> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    let mut a = DMatrix::zeros(n, 3);
    let mut b = DVector::zeros(n);
    for (k, p) in points.iter().enumerate() {
        a[(k, 0)] = 2.0 * p.x;
        a[(k, 1)] = 2.0 * p.y;
        a[(k, 2)] = 1.0;
        b[k] = p.coords.norm_squared();
    }
    let svd = a.svd(true, true);
    let sol = svd.solve(&b, 1e-12).ok()?;
    let center = Point2::new(sol[0], sol[1]);
    if center.x.is_finite() && center.y.is_finite() {
        Some(center)
    } else {
        None
    }
}
