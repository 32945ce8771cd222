use anyhow::Result;
use opgraph::ops::{opset2, opset7};
use opgraph::registry::OPSET7;
use opgraph::{attrs, Dimension, ElementType, GraphBuilder, GraphError, Shape, TensorSpec};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FLOAT_TYPES: [ElementType; 4] = [
    ElementType::F32,
    ElementType::F16,
    ElementType::Bf16,
    ElementType::F64,
];

#[test]
fn gelu_tanh_keeps_input_spec() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = builder.parameter(ElementType::F32, [2usize, 3], None)?;
    let y = opset7::gelu(&builder, &x, "tanh", None)?;
    assert_eq!(
        y.spec(),
        &TensorSpec::new(ElementType::F32, Shape::from_static(&[2, 3]))
    );
    assert_eq!(y.node().op(), "Gelu");
    assert_eq!(y.node().opset(), OPSET7);
    assert_eq!(
        y.node().attribute("approximation_mode").and_then(|v| v.as_str()),
        Some("tanh")
    );
    assert!(y.node().inputs()[0].same_as(&x));
    Ok(())
}

#[test]
fn gelu_erf_keeps_dynamic_dimensions() -> Result<()> {
    let builder = GraphBuilder::new();
    let shape = Shape::new([Dimension::Dynamic, Dimension::Static(8)]);
    let x = builder.parameter(ElementType::F16, shape.clone(), None)?;
    let y = opset7::gelu(&builder, &x, "erf", Some("act"))?;
    assert_eq!(y.element_type(), ElementType::F16);
    assert_eq!(y.shape(), &shape);
    assert_eq!(y.node().name().as_deref(), Some("act"));
    assert!(builder.graph().find_by_name("act").is_some());
    Ok(())
}

#[test]
fn gelu_rejects_unknown_mode_without_touching_the_graph() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = builder.parameter(ElementType::F32, [4usize], None)?;
    let before = builder.graph().node_count();
    let err = opset7::gelu(&builder, &x, "fast", None).expect_err("fast is not a mode");
    match err {
        GraphError::InvalidAttributeValue { op, name, .. } => {
            assert_eq!(op, "Gelu");
            assert_eq!(name, "approximation_mode");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(builder.graph().node_count(), before);
    Ok(())
}

#[test]
fn gelu_mode_matching_is_case_sensitive() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = builder.parameter(ElementType::F32, [4usize], None)?;
    for mode in ["TANH", "Erf", " erf"] {
        let err = opset7::gelu(&builder, &x, mode, None).expect_err("exact match only");
        assert!(matches!(err, GraphError::InvalidAttributeValue { .. }), "{mode}");
    }
    Ok(())
}

#[test]
fn gelu_requires_mode_in_opset7() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = builder.parameter(ElementType::F32, [4usize], None)?;
    let err = builder
        .create_op_in(OPSET7, "Gelu", vec![x.into()], attrs! {}, None)
        .expect_err("mode is required");
    assert!(matches!(err, GraphError::MissingAttribute { .. }));
    Ok(())
}

#[test]
fn gelu_without_inputs_is_an_arity_error() -> Result<()> {
    let builder = GraphBuilder::new();
    builder.parameter(ElementType::F32, [4usize], None)?;
    let before = builder.graph().node_count();
    let err = builder
        .create_op_in(
            OPSET7,
            "Gelu",
            Vec::new(),
            attrs! { "approximation_mode" => "tanh" },
            None,
        )
        .expect_err("gelu takes one input");
    assert!(matches!(err, GraphError::ArityMismatch { found: 0, .. }));
    assert_eq!(builder.graph().node_count(), before);
    Ok(())
}

#[test]
fn gelu_rejects_integer_input() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = builder.parameter(ElementType::I64, [4usize], None)?;
    let before = builder.graph().node_count();
    let err = opset7::gelu(&builder, &x, "erf", None).expect_err("integers are not allowed");
    assert!(matches!(err, GraphError::InvalidInputType { .. }));
    assert_eq!(builder.graph().node_count(), before);
    Ok(())
}

#[test]
fn opset2_gelu_has_no_mode() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = builder.parameter(ElementType::F32, [5usize], None)?;
    let y = opset2::gelu(&builder, &x, None)?;
    assert!(y.node().attributes().is_empty());
    assert_eq!(y.spec(), x.spec());
    Ok(())
}

#[test]
fn gelu_accepts_literal_data() -> Result<()> {
    let builder = GraphBuilder::new();
    let y = opset7::gelu(&builder, vec![0.5f32, -1.0, 2.0], "erf", None)?;
    assert_eq!(y.element_type(), ElementType::F32);
    assert_eq!(y.shape(), &Shape::from_static(&[3]));
    assert!(y.node().inputs()[0].node().is_constant());
    assert_eq!(builder.graph().node_count(), 2);
    Ok(())
}

fn random_shape(rng: &mut StdRng) -> Shape {
    if rng.gen_bool(0.1) {
        return Shape::dynamic();
    }
    let rank = rng.gen_range(0..5);
    Shape::new((0..rank).map(|_| {
        if rng.gen_bool(0.25) {
            Dimension::Dynamic
        } else {
            Dimension::Static(rng.gen_range(0..9))
        }
    }))
}

#[test]
fn gelu_propagates_every_valid_spec() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let builder = GraphBuilder::new();
    for _ in 0..200 {
        let element_type = FLOAT_TYPES[rng.gen_range(0..FLOAT_TYPES.len())];
        let shape = random_shape(&mut rng);
        let mode = if rng.gen_bool(0.5) { "erf" } else { "tanh" };
        let x = builder.parameter(element_type, shape.clone(), None)?;
        let y = opset7::gelu(&builder, &x, mode, None)?;
        assert_eq!(y.spec(), &TensorSpec::new(element_type, shape));
    }
    Ok(())
}

#[test]
fn invalid_modes_never_add_nodes() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(11);
    let builder = GraphBuilder::new();
    let x = builder.parameter(ElementType::F32, [2usize], None)?;
    let before = builder.graph().node_count();
    for _ in 0..100 {
        let len = rng.gen_range(0..6);
        let mode: String = (0..len)
            .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
            .collect();
        if mode == "erf" || mode == "tanh" {
            continue;
        }
        let err = opset7::gelu(&builder, &x, &mode, None).expect_err("random mode");
        assert!(matches!(err, GraphError::InvalidAttributeValue { .. }), "{mode}");
    }
    assert_eq!(builder.graph().node_count(), before);
    Ok(())
}
