//! Incremental Bowyer-Watson Delaunay triangulation with edge recovery
//!
//! Points are normalised to the unit box before insertion. A super triangle
//! bounds the working set and is stripped at the end. Constrained edges are
//! recovered afterwards by flipping the edges that cross them.

use nalgebra::Point2;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{MeshError, MeshResult};

const ORIENT_EPS: f64 = 1e-12;
const INCIRCLE_EPS: f64 = 1e-12;
const DUPLICATE_EPS: f64 = 1e-12;

fn orient(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Positive when `p` lies inside the circumcircle of counter-clockwise `a, b, c`
fn in_circle(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>, p: &Point2<f64>) -> f64 {
    let (adx, ady) = (a.x - p.x, a.y - p.y);
    let (bdx, bdy) = (b.x - p.x, b.y - p.y);
    let (cdx, cdy) = (c.x - p.x, c.y - p.y);
    let ad = adx * adx + ady * ady;
    let bd = bdx * bdx + bdy * bdy;
    let cd = cdx * cdx + cdy * cdy;
    adx * (bdy * cd - bd * cdy) - ady * (bdx * cd - bd * cdx) + ad * (bdx * cdy - bdy * cdx)
}

/// Proper crossing of segments `a-b` and `c-d`, shared endpoints excluded
fn segments_cross(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>, d: &Point2<f64>) -> bool {
    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);
    o1 * o2 < 0.0 && o3 * o4 < 0.0
}

#[derive(Debug, Clone)]
pub struct Delaunay {
    /// Normalised vertices; the last three are the super triangle
    points: Vec<Point2<f64>>,
    triangles: Vec<[usize; 3]>,
    alive: Vec<bool>,
    /// Directed edge to the triangle holding it
    edges: HashMap<(usize, usize), usize>,
    /// Input index to the first input index at the same location
    canonical: Vec<usize>,
    n_input: usize,
}

impl Delaunay {
    pub fn new(input: &[Point2<f64>]) -> MeshResult<Self> {
        let n_input = input.len();
        if n_input < 3 {
            return Err(MeshError::triangulation(format!("need at least 3 points, got {}", n_input)));
        }
        let (mut lo, mut hi) = (input[0], input[0]);
        for p in input {
            if !(p.x.is_finite() && p.y.is_finite()) {
                return Err(MeshError::triangulation("non-finite input point"));
            }
            lo = Point2::new(lo.x.min(p.x), lo.y.min(p.y));
            hi = Point2::new(hi.x.max(p.x), hi.y.max(p.y));
        }
        let scale = (hi.x - lo.x).max(hi.y - lo.y);
        if scale <= 0.0 {
            return Err(MeshError::triangulation("all points coincide"));
        }

        let mut points: Vec<Point2<f64>> = input
            .iter()
            .map(|p| Point2::new((p.x - lo.x) / scale, (p.y - lo.y) / scale))
            .collect();
        points.push(Point2::new(-100.0, -100.0));
        points.push(Point2::new(100.0, -100.0));
        points.push(Point2::new(0.0, 100.0));

        let mut dt = Self {
            points,
            triangles: Vec::new(),
            alive: Vec::new(),
            edges: HashMap::new(),
            canonical: (0..n_input).collect(),
            n_input,
        };
        dt.add_triangle([n_input, n_input + 1, n_input + 2]);

        for v in 0..n_input {
            dt.insert(v)?;
        }
        Ok(dt)
    }

    fn add_triangle(&mut self, tri: [usize; 3]) -> usize {
        let t = self.triangles.len();
        for k in 0..3 {
            self.edges.insert((tri[k], tri[(k + 1) % 3]), t);
        }
        self.triangles.push(tri);
        self.alive.push(true);
        t
    }

    fn remove_triangle(&mut self, t: usize) {
        let tri = self.triangles[t];
        for k in 0..3 {
            let key = (tri[k], tri[(k + 1) % 3]);
            if self.edges.get(&key) == Some(&t) {
                self.edges.remove(&key);
            }
        }
        self.alive[t] = false;
    }

    fn contains(&self, t: usize, p: &Point2<f64>) -> bool {
        let [a, b, c] = self.triangles[t];
        let (pa, pb, pc) = (&self.points[a], &self.points[b], &self.points[c]);
        orient(pa, pb, p) >= -ORIENT_EPS && orient(pb, pc, p) >= -ORIENT_EPS && orient(pc, pa, p) >= -ORIENT_EPS
    }

    fn circumcircle_contains(&self, t: usize, p: &Point2<f64>) -> bool {
        let [a, b, c] = self.triangles[t];
        in_circle(&self.points[a], &self.points[b], &self.points[c], p) > INCIRCLE_EPS
    }

    fn insert(&mut self, v: usize) -> MeshResult<()> {
        let p = self.points[v];
        let start = (0..self.triangles.len())
            .find(|&t| self.alive[t] && self.contains(t, &p))
            .ok_or_else(|| MeshError::triangulation(format!("point {} not inside the triangulation", v)))?;

        for &u in &self.triangles[start] {
            if u < self.n_input && (self.points[u] - p).norm() < DUPLICATE_EPS {
                self.canonical[v] = self.canonical[u];
                return Ok(());
            }
        }

        let mut cavity: HashSet<usize> = HashSet::new();
        cavity.insert(start);
        let mut queue = VecDeque::from([start]);
        while let Some(t) = queue.pop_front() {
            let tri = self.triangles[t];
            for k in 0..3 {
                if let Some(&nbr) = self.edges.get(&(tri[(k + 1) % 3], tri[k])) {
                    if !cavity.contains(&nbr) && self.circumcircle_contains(nbr, &p) {
                        cavity.insert(nbr);
                        queue.push_back(nbr);
                    }
                }
            }
        }

        // grow until every cavity edge sees p
        let boundary = loop {
            let mut boundary = Vec::new();
            let mut grow = None;
            for &t in &cavity {
                let tri = self.triangles[t];
                for k in 0..3 {
                    let (a, b) = (tri[k], tri[(k + 1) % 3]);
                    let twin = self.edges.get(&(b, a)).copied();
                    if twin.map_or(false, |o| cavity.contains(&o)) {
                        continue;
                    }
                    if orient(&self.points[a], &self.points[b], &p) <= ORIENT_EPS {
                        match twin {
                            Some(o) => grow = Some(o),
                            None => {
                                return Err(MeshError::triangulation(format!(
                                    "cavity for point {} reaches the hull",
                                    v
                                )))
                            }
                        }
                    }
                    boundary.push((a, b));
                }
            }
            match grow {
                Some(o) => {
                    cavity.insert(o);
                }
                None => break boundary,
            }
        };

        for &t in &cavity {
            self.remove_triangle(t);
        }
        for (a, b) in boundary {
            self.add_triangle([a, b, v]);
        }
        Ok(())
    }

    fn canonical_index(&self, input: usize) -> usize {
        self.canonical[input]
    }

    /// Whether input points `a` and `b` are joined by an edge
    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        let (a, b) = (self.canonical_index(a), self.canonical_index(b));
        self.edges.contains_key(&(a, b)) || self.edges.contains_key(&(b, a))
    }

    fn crossing_edges(&self, a: usize, b: usize) -> VecDeque<(usize, usize)> {
        let (pa, pb) = (self.points[a], self.points[b]);
        let mut crossing: Vec<(usize, usize)> = self
            .edges
            .keys()
            .filter(|&&(u, v)| u < v && u != a && u != b && v != a && v != b)
            .filter(|&&(u, v)| segments_cross(&pa, &pb, &self.points[u], &self.points[v]))
            .copied()
            .collect();
        // interior edges appear in both directions; hull edges only once
        crossing.extend(
            self.edges
                .keys()
                .filter(|&&(u, v)| u > v && !self.edges.contains_key(&(v, u)))
                .filter(|&&(u, v)| u != a && u != b && v != a && v != b)
                .filter(|&&(u, v)| segments_cross(&pa, &pb, &self.points[u], &self.points[v]))
                .copied(),
        );
        crossing.sort_unstable();
        crossing.into()
    }

    /// Force an edge between input points `a` and `b` by flipping crossing edges
    pub fn recover_edge(&mut self, a: usize, b: usize) -> bool {
        let (a, b) = (self.canonical_index(a), self.canonical_index(b));
        if a == b {
            return false;
        }
        let (pa, pb) = (self.points[a], self.points[b]);
        let mut queue = self.crossing_edges(a, b);
        let mut budget = 50 * (queue.len() + 1) * (queue.len() + 1);
        while let Some((u, v)) = queue.pop_front() {
            if self.edges.contains_key(&(a, b)) || self.edges.contains_key(&(b, a)) {
                return true;
            }
            if budget == 0 {
                return false;
            }
            budget -= 1;
            let (t1, t2) = match (self.edges.get(&(u, v)), self.edges.get(&(v, u))) {
                (Some(&t1), Some(&t2)) => (t1, t2),
                _ => continue,
            };
            let w1 = self.triangles[t1].iter().copied().find(|&x| x != u && x != v);
            let w2 = self.triangles[t2].iter().copied().find(|&x| x != u && x != v);
            let (w1, w2) = match (w1, w2) {
                (Some(w1), Some(w2)) => (w1, w2),
                _ => continue,
            };
            let convex = segments_cross(&self.points[w1], &self.points[w2], &self.points[u], &self.points[v]);
            if !convex {
                queue.push_back((u, v));
                continue;
            }
            self.remove_triangle(t1);
            self.remove_triangle(t2);
            self.add_triangle([w1, u, w2]);
            self.add_triangle([w2, v, w1]);
            let new_crosses = w1 != a && w1 != b && w2 != a && w2 != b
                && segments_cross(&pa, &pb, &self.points[w1], &self.points[w2]);
            if new_crosses {
                queue.push_back((w1, w2));
            }
        }
        self.edges.contains_key(&(a, b)) || self.edges.contains_key(&(b, a))
    }

    /// Counter-clockwise triangles over input indices, super triangle removed
    pub fn triangles(&self) -> Vec<[usize; 3]> {
        (0..self.triangles.len())
            .filter(|&t| self.alive[t] && self.triangles[t].iter().all(|&v| v < self.n_input))
            .map(|t| self.triangles[t])
            .collect()
    }
}
