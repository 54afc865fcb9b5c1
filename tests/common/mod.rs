#![allow(dead_code)]

use orthomesh::{GeneratingGrid, GeneratingGridSpec};

/// Axis-aligned rectangle with i = x / 4 and j = y / 4 at the corners
pub fn rectangle(width: f64, height: f64) -> GeneratingGrid {
    let spec = GeneratingGridSpec::new()
        .with_node(0.0, 0.0, Some(0.0), Some(0.0))
        .with_node(width, 0.0, Some(width / 4.0), Some(0.0))
        .with_node(width, height, Some(width / 4.0), Some(height / 4.0))
        .with_node(0.0, height, Some(0.0), Some(height / 4.0))
        .with_cell(vec![0, 1, 2, 3]);
    GeneratingGrid::from_spec(&spec).unwrap()
}

/// L-shaped domain made of a 40 x 20 cell and a 20 x 20 cell on top
pub fn l_shape() -> GeneratingGrid {
    let spec = GeneratingGridSpec::new()
        .with_node(0.0, 0.0, Some(0.0), Some(0.0))
        .with_node(40.0, 0.0, Some(10.0), Some(0.0))
        .with_node(40.0, 20.0, Some(10.0), Some(5.0))
        .with_node(20.0, 20.0, Some(5.0), Some(5.0))
        .with_node(0.0, 20.0, Some(0.0), Some(5.0))
        .with_node(20.0, 40.0, Some(5.0), Some(10.0))
        .with_node(0.0, 40.0, Some(0.0), Some(10.0))
        .with_cell(vec![0, 1, 2, 3, 4])
        .with_cell(vec![4, 3, 5, 6]);
    GeneratingGrid::from_spec(&spec).unwrap()
}

/// Right triangle with ij equal to position
pub fn right_triangle() -> GeneratingGrid {
    let spec = GeneratingGridSpec::new()
        .with_node(0.0, 0.0, Some(0.0), Some(0.0))
        .with_node(12.0, 0.0, Some(12.0), Some(0.0))
        .with_node(0.0, 12.0, Some(0.0), Some(12.0))
        .with_cell(vec![0, 1, 2]);
    GeneratingGrid::from_spec(&spec).unwrap()
}

/// 20 x 20 square with its top-right corner cut by a diagonal edge (nodes 2-3)
///
/// The user `j` values are multiplied by `j_scale`; geography is unchanged.
pub fn cut_corner(j_scale: f64) -> GeneratingGrid {
    let spec = GeneratingGridSpec::new()
        .with_node(0.0, 0.0, Some(0.0), Some(0.0))
        .with_node(20.0, 0.0, Some(5.0), Some(0.0))
        .with_node(20.0, 8.0, Some(5.0), Some(2.0 * j_scale))
        .with_node(8.0, 20.0, Some(2.0), Some(5.0 * j_scale))
        .with_node(0.0, 20.0, Some(0.0), Some(5.0 * j_scale))
        .with_cell(vec![0, 1, 2, 3, 4]);
    GeneratingGrid::from_spec(&spec).unwrap()
}
