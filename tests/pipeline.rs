mod common;

use approx::assert_relative_eq;
use orthomesh::{
    assess_orthogonality, calc_psi_phi, BoundaryParameterization, DelaunayHoleFiller, ErrorKind, FinalKind,
    GeneratingGrid, HarmonicFields, IndexScale, IntermediateBuilder, IntermediateKind, IntermediateMesh, MeshError,
    MeshingConfig, QuadGen, QuadsGen,
};

fn config(intermediate: IntermediateKind, final_kind: FinalKind) -> MeshingConfig {
    MeshingConfig::default()
        .with_nom_res(4.0)
        .with_intermediate(intermediate)
        .with_final_kind(final_kind)
}

#[test]
fn test_square_tri_anisotropic_is_uniform() {
    let gen = common::rectangle(20.0, 20.0);
    let out = QuadGen::new(gen, config(IntermediateKind::Tri, FinalKind::Anisotropic))
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(out.grid.count_valid_nodes(), 36);
    assert_eq!(out.grid.count_valid_cells(), 25);
    for n in out.grid.valid_nodes() {
        let ij = out.grid.node(n).data.ij;
        let x = out.grid.x(n);
        assert_relative_eq!(x.x, 4.0 * ij.x, epsilon = 1e-3);
        assert_relative_eq!(x.y, 4.0 * ij.y, epsilon = 1e-3);
    }
    let quality = assess_orthogonality(&out.grid);
    assert_eq!(quality.num_inverted, 0);
    assert!(quality.max_angle_deviation < 0.1, "{}", quality.report());
}

#[test]
fn test_square_psi_follows_i() {
    let gen = common::rectangle(20.0, 20.0);
    let out = QuadGen::new(gen, config(IntermediateKind::Tri, FinalKind::Anisotropic))
        .unwrap()
        .execute()
        .unwrap();
    let g = &out.intermediate.grid;
    // psi is linear in x (so in i), phi is linear in y
    for n in g.valid_nodes() {
        let x = g.x(n);
        assert_relative_eq!(out.fields.psi[n], -1.0 + x.x / 10.0, epsilon = 1e-5);
    }
    let phi0 = out.fields.phi[g.valid_nodes().next().unwrap()];
    let y0 = g.x(g.valid_nodes().next().unwrap()).y;
    for n in g.valid_nodes() {
        assert_relative_eq!(out.fields.phi[n] - phi0, -(g.x(n).y - y0) / 10.0, epsilon = 1e-5);
    }
    assert!(out.correspondence.is_monotonic());
}

#[test]
fn test_square_isotropic_relabels_user_index() {
    // user ij spans 0..2, nominal IJ spans 0..5
    let spec = orthomesh::GeneratingGridSpec::new()
        .with_node(0.0, 0.0, Some(0.0), Some(0.0))
        .with_node(20.0, 0.0, Some(2.0), Some(0.0))
        .with_node(20.0, 20.0, Some(2.0), Some(2.0))
        .with_node(0.0, 20.0, Some(0.0), Some(2.0))
        .with_cell(vec![0, 1, 2, 3]);
    let gen = orthomesh::GeneratingGrid::from_spec(&spec).unwrap();
    let out = QuadGen::new(gen, config(IntermediateKind::Tri, FinalKind::Isotropic))
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(out.grid.count_valid_cells(), 25);
    for n in out.grid.valid_nodes() {
        let ij = out.grid.node(n).data.ij;
        let x = out.grid.x(n);
        assert_relative_eq!(ij.x, x.x / 10.0, epsilon = 1e-3);
        assert_relative_eq!(ij.y, x.y / 10.0, epsilon = 1e-3);
    }
}

#[test]
fn test_triangle_output_carries_index() {
    let gen = common::rectangle(20.0, 20.0);
    let out = QuadGen::new(gen, config(IntermediateKind::Tri, FinalKind::Triangle))
        .unwrap()
        .execute()
        .unwrap();
    assert_eq!(out.grid.count_valid_cells(), out.intermediate.grid.count_valid_cells());
    for n in out.grid.valid_nodes() {
        let ij = out.grid.node(n).data.ij;
        let x = out.grid.x(n);
        assert_relative_eq!(ij.x, x.x / 4.0, epsilon = 1e-3);
        assert_relative_eq!(ij.y, x.y / 4.0, epsilon = 1e-3);
    }
}

#[test]
fn test_l_shape_tri_intermediate_single_cycle() {
    let gen = common::l_shape();
    let config = config(IntermediateKind::Tri, FinalKind::Anisotropic);
    let param = BoundaryParameterization::new(&gen, &config).unwrap();
    let builder = IntermediateBuilder::new(&gen, &param, &config);
    let mesh = builder.build_tri(&DelaunayHoleFiller::new(config.hole_fill_growth)).unwrap();

    let cycle = mesh.grid.boundary_cycle().unwrap();
    assert_eq!(cycle.len(), mesh.boundary_nodes().len());

    let fields = calc_psi_phi(&mesh, &config).unwrap();
    assert!(fields.dofs >= 0);
    assert_eq!(fields.dofs, 3);
}

fn tri_fields(
    gen: &GeneratingGrid,
    param: &BoundaryParameterization,
    config: &MeshingConfig,
) -> (IntermediateMesh, HarmonicFields) {
    let filler = DelaunayHoleFiller::new(config.hole_fill_growth);
    let mesh = IntermediateBuilder::new(gen, param, config).build_tri(&filler).unwrap();
    assert_eq!(mesh.scale, IndexScale::Nominal);
    let fields = calc_psi_phi(&mesh, config).unwrap();
    (mesh, fields)
}

#[test]
fn test_tri_fields_ignore_user_index_stretch() {
    let config = config(IntermediateKind::Tri, FinalKind::Anisotropic);
    let base = common::cut_corner(1.0);
    let stretched = common::cut_corner(4.0);
    let base_param = BoundaryParameterization::new(&base, &config).unwrap();
    let mut stretched_param = BoundaryParameterization::new(&stretched, &config).unwrap();
    // same boundary curves, so only the user labels differ
    stretched_param.bezier = base_param.bezier.clone();
    for n in base.valid_nodes() {
        assert_eq!(base_param.nominal.value(n), stretched_param.nominal.value(n));
    }

    let (mesh_a, fields_a) = tri_fields(&base, &base_param, &config);
    let (mesh_b, fields_b) = tri_fields(&stretched, &stretched_param, &config);
    assert_eq!(mesh_a.grid.n_nodes(), mesh_b.grid.n_nodes());
    assert!(!fields_a.psi_bcs.gradient.is_empty());
    for n in mesh_a.grid.valid_nodes() {
        assert_relative_eq!(fields_a.psi[n], fields_b.psi[n], epsilon = 1e-9);
        assert_relative_eq!(fields_a.phi[n], fields_b.phi[n], epsilon = 1e-9);
    }
}

#[test]
fn test_l_shape_whole_and_per_cell_agree() {
    let gen = common::l_shape();
    let whole = QuadGen::new(gen.clone(), config(IntermediateKind::Tri, FinalKind::Anisotropic))
        .unwrap()
        .execute()
        .unwrap();
    assert_eq!(whole.grid.count_valid_cells(), 75);
    assert_eq!(whole.grid.count_valid_nodes(), 96);

    let merged = QuadsGen::new(gen, config(IntermediateKind::Tri, FinalKind::Anisotropic))
        .unwrap()
        .execute()
        .unwrap();
    assert_eq!(merged.runs.len(), 2);
    assert_eq!(merged.grid.count_valid_cells(), 75);
    assert_eq!(merged.grid.count_valid_nodes(), 96);

    for grid in [&whole.grid, &merged.grid] {
        for n in grid.valid_nodes() {
            let ij = grid.node(n).data.ij;
            let x = grid.x(n);
            assert_relative_eq!(x.x, 4.0 * ij.x, epsilon = 1e-3);
            assert_relative_eq!(x.y, 4.0 * ij.y, epsilon = 1e-3);
        }
    }
}

#[test]
fn test_quad_intermediate_rectangle() {
    let gen = common::rectangle(32.0, 16.0);
    let out = QuadGen::new(gen, config(IntermediateKind::Quad, FinalKind::Isotropic))
        .unwrap()
        .execute()
        .unwrap();
    assert!(out.smoother_stats.is_some());
    assert_eq!(out.grid.count_valid_cells(), 32);
    let quality = assess_orthogonality(&out.grid);
    assert!(quality.is_acceptable(0.1), "{}", quality.report());
}

#[test]
fn test_insufficient_dofs_is_configuration_error() {
    // one constant-i run and one constant-j run only
    let gen = common::right_triangle();
    let result = QuadGen::new(gen, config(IntermediateKind::Tri, FinalKind::Anisotropic))
        .unwrap()
        .execute();
    match result {
        Err(err @ MeshError::InsufficientDof { .. }) => assert_eq!(err.kind(), ErrorKind::Configuration),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("ill-posed solve returned a mesh"),
    }
}

#[test]
fn test_config_from_toml() {
    let config = MeshingConfig::from_toml_str(
        r#"
        nom_res = 5.0
        intermediate = "quad"
        final_kind = "anisotropic"
        "#,
    )
    .unwrap();
    let gen = common::rectangle(20.0, 20.0);
    let out = QuadGen::new(gen, config).unwrap().execute().unwrap();
    assert_eq!(out.grid.count_valid_cells(), 25);
}
