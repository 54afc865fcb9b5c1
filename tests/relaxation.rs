mod common;

use approx::assert_relative_eq;
use nalgebra::Point2;
use orthomesh::{
    assess_orthogonality, Advisory, BoundaryParameterization, DelaunayHoleFiller, IntermediateBuilder, LocalSmoothParams,
    MeshingConfig, Tweaker, UnstructuredGrid,
};

#[test]
fn test_nudge_is_noop_on_triangle_mesh() {
    let gen = common::right_triangle();
    let config = MeshingConfig::default().with_nom_res(3.0);
    let param = BoundaryParameterization::new(&gen, &config).unwrap();
    let builder = IntermediateBuilder::new(&gen, &param, &config);
    let mut mesh = builder.build_tri(&DelaunayHoleFiller::default()).unwrap();

    let before: Vec<Point2<f64>> = (0..mesh.grid.n_nodes()).map(|n| mesh.grid.x(n)).collect();
    let nodes: Vec<usize> = mesh.grid.valid_nodes().collect();
    let mut tweaker = Tweaker::new(&mut mesh.grid);
    for n in nodes {
        assert!(!tweaker.nudge_node_orthogonal(n));
    }
    for (n, p) in before.iter().enumerate() {
        assert_eq!(mesh.grid.x(n), *p);
    }
}

#[test]
fn test_nudge_is_idempotent_on_orthogonal_patch() {
    // stretched but orthogonal: every node sits on its cells' circumcircles
    let mut g: UnstructuredGrid<(), ()> = UnstructuredGrid::new();
    g.add_rectilinear(Point2::new(0.0, 0.0), Point2::new(12.0, 3.0), 7, 4, || ())
        .unwrap();
    let nodes: Vec<usize> = g.valid_nodes().collect();
    let before: Vec<Point2<f64>> = nodes.iter().map(|&n| g.x(n)).collect();

    let mut tweaker = Tweaker::new(&mut g);
    for _ in 0..2 {
        for &n in &nodes {
            tweaker.nudge_node_orthogonal(n);
        }
    }
    for (&n, p) in nodes.iter().zip(&before) {
        assert!((g.x(n) - p).norm() < 1e-9);
    }
}

#[test]
fn test_nudge_cell_improves_skewed_cell() {
    let mut g: UnstructuredGrid<(), ()> = UnstructuredGrid::new();
    let patch = g
        .add_rectilinear(Point2::new(0.0, 0.0), Point2::new(4.0, 4.0), 5, 5, || ())
        .unwrap();
    let victim = patch.nodes[2][2];
    g.set_x(victim, Point2::new(2.25, 1.8));
    let skewed = assess_orthogonality(&g).max_angle_deviation;

    let mut tweaker = Tweaker::new(&mut g);
    for _ in 0..10 {
        tweaker.nudge_node_orthogonal(victim);
    }
    let relaxed = assess_orthogonality(&g).max_angle_deviation;
    assert!(relaxed < skewed, "{} !< {}", relaxed, skewed);
}

#[test]
fn test_nudge_cell_keeps_square_cell() {
    let mut g: UnstructuredGrid<(), ()> = UnstructuredGrid::new();
    g.add_rectilinear(Point2::new(0.0, 0.0), Point2::new(3.0, 3.0), 4, 4, || ())
        .unwrap();
    let before: Vec<Point2<f64>> = (0..g.n_nodes()).map(|n| g.x(n)).collect();
    let cells: Vec<usize> = g.valid_cells().collect();
    let mut tweaker = Tweaker::new(&mut g);
    for c in cells {
        tweaker.nudge_cell_orthogonal(c);
    }
    for (n, p) in before.iter().enumerate() {
        assert_relative_eq!(g.x(n).x, p.x, epsilon = 1e-12);
        assert_relative_eq!(g.x(n).y, p.y, epsilon = 1e-12);
    }
}

#[test]
fn test_local_smooth_recovers_lattice() {
    let mut g: UnstructuredGrid<(), ()> = UnstructuredGrid::new();
    let patch = g
        .add_rectilinear(Point2::new(0.0, 0.0), Point2::new(8.0, 8.0), 9, 9, || ())
        .unwrap();
    let mut nodes = Vec::new();
    let mut ij = Vec::new();
    for ix in 1..8 {
        for iy in 1..8 {
            nodes.push(patch.nodes[ix][iy]);
            ij.push((ix as i64, iy as i64));
        }
    }
    // jitter the deep interior
    for (k, &n) in nodes.iter().enumerate() {
        let (ix, iy) = ij[k];
        if (3..=5).contains(&ix) && (3..=5).contains(&iy) {
            let x = g.x(n);
            let s = if k % 2 == 0 { 0.15 } else { -0.1 };
            g.set_x(n, Point2::new(x.x + s, x.y - s));
        }
    }

    let params = LocalSmoothParams {
        iterations: 40,
        ..LocalSmoothParams::default()
    };
    let report = Tweaker::new(&mut g).local_smooth(&nodes, &ij, &params);
    assert!(report.advisories.is_empty());
    assert!(report.moved > 0);
    for (k, &n) in nodes.iter().enumerate() {
        let (ix, iy) = ij[k];
        assert_relative_eq!(g.x(n).x, ix as f64, epsilon = 1e-4);
        assert_relative_eq!(g.x(n).y, iy as f64, epsilon = 1e-4);
    }
}

#[test]
fn test_local_smooth_respects_free_nodes() {
    let mut g: UnstructuredGrid<(), ()> = UnstructuredGrid::new();
    let patch = g
        .add_rectilinear(Point2::new(0.0, 0.0), Point2::new(6.0, 6.0), 7, 7, || ())
        .unwrap();
    let victim = patch.nodes[3][3];
    g.set_x(victim, Point2::new(3.4, 3.0));

    let mut nodes = Vec::new();
    let mut ij = Vec::new();
    for ix in 0..7 {
        for iy in 0..7 {
            nodes.push(patch.nodes[ix][iy]);
            ij.push((ix as i64, iy as i64));
        }
    }
    let params = LocalSmoothParams {
        free_nodes: Some([patch.nodes[2][2]].into_iter().collect()),
        ..LocalSmoothParams::default()
    };
    Tweaker::new(&mut g).local_smooth(&nodes, &ij, &params);
    assert_eq!(g.x(victim), Point2::new(3.4, 3.0));
}

#[test]
fn test_local_smooth_skips_isolated_addresses() {
    // addresses ten apart leave every unit stencil with only its centre
    let mut g: UnstructuredGrid<(), ()> = UnstructuredGrid::new();
    let patch = g
        .add_rectilinear(Point2::new(0.0, 0.0), Point2::new(6.0, 6.0), 7, 7, || ())
        .unwrap();
    let mut nodes = Vec::new();
    let mut ij = Vec::new();
    for ix in 0..7 {
        for iy in 0..7 {
            nodes.push(patch.nodes[ix][iy]);
            ij.push((10 * ix as i64, 10 * iy as i64));
        }
    }
    let before: Vec<Point2<f64>> = nodes.iter().map(|&n| g.x(n)).collect();

    let report = Tweaker::new(&mut g).local_smooth(&nodes, &ij, &LocalSmoothParams::default());
    assert_eq!(report.moved, 0);
    assert!(!report.advisories.is_empty());
    assert!(report
        .advisories
        .iter()
        .all(|a| matches!(a, Advisory::SkippedNode { .. })));
    for (&n, p) in nodes.iter().zip(&before) {
        assert_eq!(g.x(n), *p);
    }
}
