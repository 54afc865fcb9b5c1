//! Generating grid: the coarse, user-authored decomposition of the domain
//!
//! Nodes carry optional index coordinates. Cells define the regions that
//! are meshed; edges are created from the cell outlines.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::UnstructuredGrid;
use crate::error::{MeshError, MeshResult};

/// Generating node payload: user-supplied index coordinates, if any
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenNode {
    pub i: Option<f64>,
    pub j: Option<f64>,
}

impl GenNode {
    pub fn new(i: Option<f64>, j: Option<f64>) -> Self {
        Self { i, j }
    }

    /// Index value along axis 0 (i) or 1 (j)
    pub fn coord(&self, axis: usize) -> Option<f64> {
        if axis == 0 {
            self.i
        } else {
            self.j
        }
    }
}

pub type GeneratingGrid = UnstructuredGrid<GenNode, ()>;

/// One node of a generating grid description
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeSpec {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub i: Option<f64>,
    #[serde(default)]
    pub j: Option<f64>,
}

/// Serializable description of a generating grid
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GeneratingGridSpec {
    /// Cells as lists of node ids
    #[serde(default)]
    pub cells: Vec<Vec<usize>>,
    pub nodes: Vec<NodeSpec>,
}

impl GeneratingGridSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> MeshResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> MeshResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn with_node(mut self, x: f64, y: f64, i: Option<f64>, j: Option<f64>) -> Self {
        self.nodes.push(NodeSpec { x, y, i, j });
        self
    }

    pub fn with_cell(mut self, nodes: Vec<usize>) -> Self {
        self.cells.push(nodes);
        self
    }
}

impl UnstructuredGrid<GenNode, ()> {
    /// Build and validate a generating grid
    pub fn from_spec(spec: &GeneratingGridSpec) -> MeshResult<Self> {
        let mut gen = Self::new();
        for (n, node) in spec.nodes.iter().enumerate() {
            let finite = node.x.is_finite()
                && node.y.is_finite()
                && node.i.map_or(true, f64::is_finite)
                && node.j.map_or(true, f64::is_finite);
            if !finite {
                return Err(MeshError::malformed_grid(format!("node {} has non-finite values", n)));
            }
            gen.add_node(Point2::new(node.x, node.y), GenNode::new(node.i, node.j));
        }
        if spec.cells.is_empty() {
            return Err(MeshError::malformed_grid("generating grid has no cells"));
        }
        for (c, cell) in spec.cells.iter().enumerate() {
            if let Some(&bad) = cell.iter().find(|&&n| n >= spec.nodes.len()) {
                return Err(MeshError::malformed_grid(format!(
                    "cell {} references missing node {}",
                    c, bad
                )));
            }
            gen.add_cell(cell.clone())?;
        }
        gen.delete_orphan_nodes();
        gen.renumber()?;
        log::debug!(
            "generating grid: {} nodes, {} edges, {} cells",
            gen.count_valid_nodes(),
            gen.n_edges(),
            gen.count_valid_cells()
        );
        Ok(gen)
    }

    /// Single-cell copy of this grid, renumbered
    pub fn extract_cell(&self, cell: usize) -> MeshResult<Self> {
        if cell >= self.n_cells() || self.is_cell_deleted(cell) {
            return Err(MeshError::malformed_grid(format!("no cell {}", cell)));
        }
        let mut local = self.clone();
        let others: Vec<usize> = local.valid_cells().filter(|&c| c != cell).collect();
        for c in others {
            local.delete_cell(c);
        }
        local.delete_orphan_edges();
        local.delete_orphan_nodes();
        local.renumber()?;
        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cells() -> GeneratingGridSpec {
        GeneratingGridSpec::new()
            .with_node(0.0, 0.0, Some(0.0), Some(0.0))
            .with_node(10.0, 0.0, Some(10.0), Some(0.0))
            .with_node(20.0, 0.0, Some(20.0), Some(0.0))
            .with_node(20.0, 10.0, Some(20.0), Some(10.0))
            .with_node(10.0, 10.0, None, None)
            .with_node(0.0, 10.0, Some(0.0), Some(10.0))
            .with_cell(vec![0, 1, 4, 5])
            .with_cell(vec![1, 2, 3, 4])
    }

    #[test]
    fn test_from_spec() {
        let gen = GeneratingGrid::from_spec(&two_cells()).unwrap();
        assert_eq!(gen.count_valid_nodes(), 6);
        assert_eq!(gen.count_valid_cells(), 2);
        assert_eq!(gen.n_edges(), 7);
        assert_eq!(gen.node(4).data.i, None);
        assert_eq!(gen.boundary_cycle().unwrap().len(), 6);
    }

    #[test]
    fn test_extract_cell() {
        let gen = GeneratingGrid::from_spec(&two_cells()).unwrap();
        let local = gen.extract_cell(1).unwrap();
        assert_eq!(local.count_valid_nodes(), 4);
        assert_eq!(local.count_valid_cells(), 1);
        assert_eq!(local.n_edges(), 4);
        assert!(gen.extract_cell(5).is_err());
    }

    #[test]
    fn test_toml_round() {
        let text = r#"
            cells = [[0, 1, 2]]

            [[nodes]]
            x = 0.0
            y = 0.0
            i = 0.0
            j = 0.0

            [[nodes]]
            x = 1.0
            y = 0.0

            [[nodes]]
            x = 0.0
            y = 1.0
            j = 3.0
        "#;
        let spec = GeneratingGridSpec::from_toml_str(text).unwrap();
        assert_eq!(spec.nodes.len(), 3);
        assert_eq!(spec.nodes[2].j, Some(3.0));
        let gen = GeneratingGrid::from_spec(&spec).unwrap();
        assert_eq!(gen.count_valid_cells(), 1);
    }

    #[test]
    fn test_bad_reference() {
        let spec = GeneratingGridSpec::new()
            .with_node(0.0, 0.0, None, None)
            .with_cell(vec![0, 1, 2]);
        let err = GeneratingGrid::from_spec(&spec).unwrap_err();
        assert!(err.is_configuration());
    }
}
