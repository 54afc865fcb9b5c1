//! Nearest-node queries backed by an R-tree

use nalgebra::Point2;
use rstar::primitives::GeomWithData;
use rstar::RTree;

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Snapshot of node positions for repeated nearest-node lookups
#[derive(Debug, Clone)]
pub struct NodeLocator {
    tree: RTree<IndexedPoint>,
}

impl NodeLocator {
    pub fn new(points: impl IntoIterator<Item = (usize, Point2<f64>)>) -> Self {
        let entries: Vec<IndexedPoint> = points
            .into_iter()
            .map(|(n, p)| GeomWithData::new([p.x, p.y], n))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Nearest node and its distance
    pub fn nearest(&self, p: &Point2<f64>) -> Option<(usize, f64)> {
        self.tree.nearest_neighbor(&[p.x, p.y]).map(|entry| {
            let q = entry.geom();
            let d = ((q[0] - p.x).powi(2) + (q[1] - p.y).powi(2)).sqrt();
            (entry.data, d)
        })
    }

    pub fn nearest_node(&self, p: &Point2<f64>) -> Option<usize> {
        self.nearest(p).map(|(n, _)| n)
    }
}
