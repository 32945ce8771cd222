use anyhow::Result;
use opgraph::ops::opset1;
use opgraph::{
    Dimension, ElementType, GraphBuilder, GraphError, NodeInput, Shape, TensorLiteral, Value,
};

fn param(builder: &GraphBuilder, element_type: ElementType, dims: &[usize]) -> Result<Value> {
    Ok(builder.parameter(element_type, Shape::from_static(dims), None)?)
}

fn assert_shape_error<T: std::fmt::Debug>(result: opgraph::Result<T>) {
    match result {
        Err(GraphError::ShapeInference { .. }) => {}
        other => panic!("expected a shape inference error, got {other:?}"),
    }
}

#[test]
fn parameter_shapes_keep_dynamic_parts() -> Result<()> {
    let builder = GraphBuilder::new();
    let ranked = builder.parameter(
        ElementType::I32,
        Shape::new([Dimension::Dynamic, Dimension::Static(4)]),
        None,
    )?;
    assert_eq!(ranked.shape().to_string(), "[?,4]");
    let unranked = builder.parameter(ElementType::I32, Shape::dynamic(), None)?;
    assert!(unranked.shape().is_rank_dynamic());
    Ok(())
}

#[test]
fn binary_ops_broadcast_or_require_equal_shapes() -> Result<()> {
    let builder = GraphBuilder::new();
    let a = param(&builder, ElementType::F32, &[4, 1, 3])?;
    let b = param(&builder, ElementType::F32, &[5, 1])?;
    let sum = opset1::add(&builder, &a, &b, None)?;
    assert_eq!(sum.shape(), &Shape::from_static(&[4, 5, 3]));

    assert_shape_error(opset1::binary(&builder, "Multiply", &a, &b, "none", None));

    let c = param(&builder, ElementType::F32, &[4, 1, 3])?;
    let product = opset1::binary(&builder, "Multiply", &a, &c, "none", None)?;
    assert_eq!(product.shape(), a.shape());
    Ok(())
}

#[test]
fn binary_ops_require_matching_element_types() -> Result<()> {
    let builder = GraphBuilder::new();
    let a = param(&builder, ElementType::F32, &[2])?;
    let b = param(&builder, ElementType::F64, &[2])?;
    assert_shape_error(opset1::subtract(&builder, &a, &b, None));
    let err = opset1::binary(&builder, "Maximum", &a, &a, "pairwise", None)
        .expect_err("unknown broadcast mode");
    assert!(matches!(err, GraphError::InvalidAttributeValue { .. }));
    Ok(())
}

#[test]
fn convert_changes_only_the_element_type() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = param(&builder, ElementType::F32, &[3, 2])?;
    let y = opset1::convert(&builder, &x, ElementType::I8, None)?;
    assert_eq!(y.element_type(), ElementType::I8);
    assert_eq!(y.shape(), x.shape());
    Ok(())
}

#[test]
fn clamp_checks_bounds_and_elu_takes_int_alpha() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = param(&builder, ElementType::F32, &[3])?;
    let err = opset1::clamp(&builder, &x, 2.0, 1.0, None).expect_err("min above max");
    assert!(matches!(err, GraphError::InvalidAttributeValue { .. }));
    assert_eq!(opset1::clamp(&builder, &x, -1.0, 1.0, None)?.spec(), x.spec());

    let node = builder.create_op_in(
        "opset1",
        "Elu",
        vec![(&x).into()],
        opgraph::attrs! { "alpha" => 1 },
        None,
    )?;
    assert_eq!(node.attribute("alpha").and_then(|v| v.as_float()), Some(1.0));
    Ok(())
}

#[test]
fn concat_sums_the_axis_dimension() -> Result<()> {
    let builder = GraphBuilder::new();
    let a = param(&builder, ElementType::F32, &[2, 3])?;
    let b = builder.parameter(
        ElementType::F32,
        Shape::new([Dimension::Dynamic, Dimension::Static(5)]),
        None,
    )?;
    let joined = opset1::concat(&builder, vec![(&a).into(), (&b).into()], -1, None)?;
    assert_eq!(joined.shape(), &Shape::from_static(&[2, 8]));

    let c = param(&builder, ElementType::F32, &[4, 3])?;
    assert_shape_error(opset1::concat(
        &builder,
        vec![(&a).into(), (&c).into()],
        1,
        None,
    ));
    assert_shape_error(opset1::concat(&builder, vec![(&a).into()], 2, None));
    Ok(())
}

#[test]
fn reshape_resolves_minus_one_and_special_zero() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = param(&builder, ElementType::F32, &[2, 3, 4])?;

    let y = opset1::reshape(&builder, &x, vec![6i64, -1], false, None)?;
    assert_eq!(y.shape(), &Shape::from_static(&[6, 4]));

    let z = opset1::reshape(&builder, &x, vec![0i64, -1], true, None)?;
    assert_eq!(z.shape(), &Shape::from_static(&[2, 12]));

    assert_shape_error(opset1::reshape(&builder, &x, vec![-1i64, -1], false, None));
    assert_shape_error(opset1::reshape(&builder, &x, vec![5i64, -1], false, None));
    assert_shape_error(opset1::reshape(&builder, &x, vec![2i64, 2], false, None));
    Ok(())
}

#[test]
fn reshape_with_runtime_shape_keeps_rank() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = param(&builder, ElementType::F32, &[2, 3])?;
    let target = param(&builder, ElementType::I64, &[3])?;
    let y = opset1::reshape(&builder, &x, &target, false, None)?;
    assert_eq!(y.shape(), &Shape::dynamic_of_rank(3));
    Ok(())
}

#[test]
fn transpose_permutes_or_reverses() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = param(&builder, ElementType::F32, &[2, 3, 4])?;
    let y = opset1::transpose(&builder, &x, vec![2i64, 0, 1], None)?;
    assert_eq!(y.shape(), &Shape::from_static(&[4, 2, 3]));

    let empty = NodeInput::from(TensorLiteral::from_vec([0usize], Vec::<i64>::new())?);
    let reversed = opset1::transpose(&builder, &x, empty, None)?;
    assert_eq!(reversed.shape(), &Shape::from_static(&[4, 3, 2]));

    assert_shape_error(opset1::transpose(&builder, &x, vec![0i64, 0, 1], None));
    assert_shape_error(opset1::transpose(&builder, &x, vec![0i64, 1], None));
    Ok(())
}

#[test]
fn matmul_follows_numpy_semantics() -> Result<()> {
    let builder = GraphBuilder::new();
    let a = param(&builder, ElementType::F32, &[5, 2, 3])?;
    let b = param(&builder, ElementType::F32, &[3, 4])?;
    let c = opset1::matmul(&builder, &a, &b, false, false, None)?;
    assert_eq!(c.shape(), &Shape::from_static(&[5, 2, 4]));

    let bt = param(&builder, ElementType::F32, &[4, 3])?;
    let d = opset1::matmul(&builder, &a, &bt, false, true, None)?;
    assert_eq!(d.shape(), &Shape::from_static(&[5, 2, 4]));

    let v = param(&builder, ElementType::F32, &[3])?;
    let e = opset1::matmul(&builder, &a, &v, false, false, None)?;
    assert_eq!(e.shape(), &Shape::from_static(&[5, 2]));

    let w = param(&builder, ElementType::F32, &[3])?;
    let dot = opset1::matmul(&builder, &v, &w, false, false, None)?;
    assert_eq!(dot.shape(), &Shape::scalar());

    assert_shape_error(opset1::matmul(&builder, &a, &a, false, false, None));
    Ok(())
}

#[test]
fn softmax_checks_axis_range() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = param(&builder, ElementType::F32, &[2, 5])?;
    assert_eq!(opset1::softmax(&builder, &x, 1, None)?.spec(), x.spec());
    assert_shape_error(opset1::softmax(&builder, &x, 2, None));
    assert_shape_error(opset1::softmax(&builder, &x, -1, None));
    Ok(())
}

#[test]
fn split_divides_the_axis() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = param(&builder, ElementType::F16, &[6, 4])?;
    let parts = opset1::split(&builder, &x, -2i64, 3, Some("parts"))?;
    assert_eq!(parts.len(), 3);
    for (index, part) in parts.iter().enumerate() {
        assert_eq!(part.index(), index);
        assert_eq!(part.shape(), &Shape::from_static(&[2, 4]));
        assert_eq!(part.element_type(), ElementType::F16);
    }
    assert_shape_error(opset1::split(&builder, &x, 1i64, 3, None));
    let err = opset1::split(&builder, &x, 0i64, 0, None).expect_err("zero splits");
    assert!(matches!(err, GraphError::InvalidAttributeValue { .. }));
    Ok(())
}

#[test]
fn concat_rejects_overflowing_axis_sum() -> Result<()> {
    let builder = GraphBuilder::new();
    let huge = i64::MAX as usize;
    let inputs = (0..3)
        .map(|_| param(&builder, ElementType::F32, &[huge]).map(NodeInput::from))
        .collect::<Result<Vec<_>>>()?;
    let before = builder.graph().node_count();
    assert_shape_error(opset1::concat(&builder, inputs, 0, None));
    assert_eq!(builder.graph().node_count(), before);
    Ok(())
}

#[test]
fn split_bounds_the_number_of_outputs() -> Result<()> {
    let builder = GraphBuilder::new();
    let unknown = builder.parameter(ElementType::F32, Shape::dynamic(), None)?;
    let empty = param(&builder, ElementType::F32, &[0, 4])?;
    let before = builder.graph().node_count();

    assert_shape_error(opset1::split(&builder, &unknown, 0i64, 1usize << 60, None));
    assert_shape_error(opset1::split(&builder, &empty, 0i64, 1usize << 32, None));
    assert_eq!(builder.graph().node_count(), before);

    let parts = opset1::split(&builder, &unknown, 0i64, 4, None)?;
    assert_eq!(parts.len(), 4);
    assert!(parts.iter().all(|part| part.shape().is_rank_dynamic()));
    Ok(())
}

#[test]
fn split_count_must_fit_an_int_attribute() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = param(&builder, ElementType::F32, &[4])?;
    let err = opset1::split(&builder, &x, 0i64, usize::MAX, None).expect_err("too many splits");
    assert!(matches!(
        err,
        GraphError::InvalidAttributeValue { ref name, .. } if name == "num_splits"
    ));

    let parts = opset1::split(&builder, &x, 0i64, 2, None)?;
    let node = parts[0].node();
    assert_eq!(node.attribute("num_splits").and_then(|v| v.as_int()), Some(2));
    Ok(())
}
