use std::sync::Arc;

use anyhow::Result;
use opgraph::attr::{AttrKind, AttrSpec, AttrValue};
use opgraph::registry::{defs, InferContext, OPSET1, OPSET2, OPSET7};
use opgraph::{
    attrs, builtin_registry, Attributes, BuilderConfig, ElementType, GraphBuilder, GraphError,
    NodeInput, OpRegistry, OpSchema, Shape, TensorSpec, TypeSet,
};

fn custom_registry() -> Result<Arc<OpRegistry>> {
    let mut registry = OpRegistry::with_builtins();
    registry.register(
        "custom",
        "Scale",
        OpSchema::new("Scale", defs::same_as_input)
            .input("data", TypeSet::Only(&[ElementType::F32, ElementType::F64]))
            .attr(AttrSpec::required("factor", AttrKind::Float))
            .attr(AttrSpec::with_default("mode", "linear").choices(&["linear", "log"]))
            .attr(AttrSpec::optional("tags", AttrKind::Strings)),
    )?;
    registry.register("custom", "Constant", defs::leaf::constant())?;
    registry.register("custom", "Parameter", defs::leaf::parameter())?;
    Ok(Arc::new(registry))
}

fn builder_for(registry: Arc<OpRegistry>) -> GraphBuilder {
    GraphBuilder::with_registry(registry, BuilderConfig::default().with_default_opset("custom"))
}

#[test]
fn builtin_opsets_are_listed() {
    let registry = builtin_registry();
    assert_eq!(registry.opsets(), vec![OPSET1, OPSET2, OPSET7]);
    assert!(registry.contains(OPSET1, "MatMul"));
    assert!(!registry.contains(OPSET1, "Gelu"));
    assert!(registry.contains(OPSET2, "Gelu"));
    assert!(registry.contains(OPSET7, "Relu"));
    assert!(registry.operators("opset99").is_empty());
}

#[test]
fn later_opsets_keep_their_own_gelu() {
    let registry = builtin_registry();
    let v2 = registry.schema(OPSET2, "Gelu").expect("opset2 gelu");
    let v7 = registry.schema(OPSET7, "Gelu").expect("opset7 gelu");
    assert!(v2.attrs().is_empty());
    assert!(v7.attr_spec("approximation_mode").is_some_and(|spec| spec.required));
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut registry = OpRegistry::new();
    registry
        .register("ext", "Gelu", defs::activation::gelu_v2())
        .expect("first registration");
    let err = registry
        .register("ext", "Gelu", defs::activation::gelu_v7())
        .expect_err("second registration must fail");
    assert!(matches!(
        err,
        GraphError::DuplicateOperator { ref opset, ref op } if opset == "ext" && op == "Gelu"
    ));
    assert!(registry.schema("ext", "Gelu").is_some_and(|s| s.attrs().is_empty()));
}

#[test]
fn unknown_opset_and_operator_are_reported() {
    let registry = builtin_registry();
    let err = registry
        .create("opset99", "Relu", Vec::new(), Attributes::new())
        .expect_err("no such opset");
    assert!(matches!(err, GraphError::UnknownOperator { .. }));
    let err = registry
        .create(OPSET1, "Frobnicate", Vec::new(), Attributes::new())
        .expect_err("no such operator");
    assert!(matches!(err, GraphError::UnknownOperator { ref op, .. } if op == "Frobnicate"));
}

#[test]
fn arity_is_checked_before_types() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = builder.parameter(ElementType::I32, [2usize], None)?;
    let err = builder
        .create_op_in(OPSET1, "Relu", vec![(&x).into(), (&x).into()], attrs! {}, None)
        .expect_err("relu takes one input");
    assert!(matches!(err, GraphError::ArityMismatch { found: 2, .. }));

    let err = builder
        .create_op_in(OPSET1, "Concat", Vec::new(), attrs! { "axis" => 0 }, None)
        .expect_err("concat needs at least one input");
    assert!(matches!(err, GraphError::ArityMismatch { found: 0, .. }));
    Ok(())
}

#[test]
fn input_types_are_checked_against_the_allowed_set() -> Result<()> {
    let builder = GraphBuilder::new();
    let ints = builder.parameter(ElementType::I32, [2usize], None)?;
    let err = builder
        .create_op_in(OPSET1, "Sigmoid", vec![ints.into()], attrs! {}, None)
        .expect_err("sigmoid needs floats");
    match err {
        GraphError::InvalidInputType {
            op, index, found, ..
        } => {
            assert_eq!(op, "Sigmoid");
            assert_eq!(index, 0);
            assert_eq!(found, ElementType::I32);
        }
        other => panic!("unexpected error: {other}"),
    }

    let flags = builder.parameter(ElementType::Boolean, [2usize], None)?;
    let err = builder
        .create_op_in(OPSET1, "Negative", vec![flags.into()], attrs! {}, None)
        .expect_err("boolean is not a signed number");
    assert!(matches!(err, GraphError::InvalidInputType { .. }));
    Ok(())
}

#[test]
fn dynamic_element_type_passes_every_type_set() -> Result<()> {
    let builder = GraphBuilder::new();
    let unknown = builder.parameter(ElementType::Dynamic, Shape::dynamic(), None)?;
    let node = builder.create_op_in(OPSET1, "Sqrt", vec![unknown.into()], attrs! {}, None)?;
    assert_eq!(node.output_specs()[0].element_type, ElementType::Dynamic);
    Ok(())
}

#[test]
fn attributes_are_validated_in_declared_order() -> Result<()> {
    let builder = builder_for(custom_registry()?);
    let x = builder.parameter(ElementType::F32, [3usize], None)?;

    let err = builder
        .create_op("Scale", vec![(&x).into()], attrs! { "factor" => 2.0, "bias" => 1.0 }, None)
        .expect_err("bias is not declared");
    assert!(matches!(err, GraphError::UnknownAttribute { ref name, .. } if name == "bias"));

    let err = builder
        .create_op("Scale", vec![(&x).into()], attrs! {}, None)
        .expect_err("factor is required");
    assert!(matches!(err, GraphError::MissingAttribute { ref name, .. } if name == "factor"));

    let err = builder
        .create_op("Scale", vec![(&x).into()], attrs! { "factor" => "big" }, None)
        .expect_err("factor must be numeric");
    match err {
        GraphError::InvalidAttributeType {
            expected, found, ..
        } => {
            assert_eq!(expected, "float");
            assert_eq!(found, "string");
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = builder
        .create_op(
            "Scale",
            vec![(&x).into()],
            attrs! { "factor" => 2.0, "mode" => "cubic" },
            None,
        )
        .expect_err("mode is enumerated");
    assert!(matches!(err, GraphError::InvalidAttributeValue { ref name, .. } if name == "mode"));
    Ok(())
}

#[test]
fn int_widens_to_float_and_defaults_are_filled() -> Result<()> {
    let builder = builder_for(custom_registry()?);
    let x = builder.parameter(ElementType::F64, [3usize], None)?;
    let node = builder.create_op("Scale", vec![x.into()], attrs! { "factor" => 3 }, None)?;
    assert_eq!(node.attribute("factor"), Some(&AttrValue::Float(3.0)));
    assert_eq!(node.attribute("mode"), Some(&AttrValue::String("linear".into())));
    assert!(node.attribute("tags").is_none());
    Ok(())
}

#[test]
fn float_does_not_narrow_to_int() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = builder.parameter(ElementType::F32, [2usize, 2], None)?;
    let err = builder
        .create_op_in(OPSET1, "Softmax", vec![x.into()], attrs! { "axis" => 1.0 }, None)
        .expect_err("axis is an int attribute");
    assert!(matches!(err, GraphError::InvalidAttributeType { .. }));
    Ok(())
}

#[test]
fn only_type_set_restricts_inputs() -> Result<()> {
    let builder = builder_for(custom_registry()?);
    let half = builder.parameter(ElementType::F16, [3usize], None)?;
    let err = builder
        .create_op("Scale", vec![half.into()], attrs! { "factor" => 1.0 }, None)
        .expect_err("f16 is not in the allowed set");
    match err {
        GraphError::InvalidInputType { allowed, .. } => assert_eq!(allowed, "{f32, f64}"),
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn create_returns_an_uncommitted_draft() -> Result<()> {
    let builder = GraphBuilder::new();
    let x = builder.parameter(ElementType::F32, [4usize], None)?;
    let before = builder.graph().node_count();
    let draft = builtin_registry().create(OPSET1, "Relu", vec![(&x).into()], Attributes::new())?;
    assert_eq!(draft.op(), "Relu");
    assert_eq!(draft.opset(), OPSET1);
    assert_eq!(draft.output_specs(), &[x.spec().clone()]);
    assert_eq!(builder.graph().node_count(), before);
    Ok(())
}

fn infer_pair(ctx: &InferContext<'_>) -> opgraph::Result<Vec<TensorSpec>> {
    let spec = ctx.input(0)?.clone();
    Ok(vec![spec.clone(), spec])
}

#[test]
fn custom_schemas_may_produce_several_outputs() -> Result<()> {
    let mut registry = OpRegistry::with_builtins();
    registry.register(
        OPSET7,
        "Duplicate",
        OpSchema::new("Duplicate", infer_pair).input("data", TypeSet::Any),
    )?;
    let builder = GraphBuilder::with_registry(Arc::new(registry), BuilderConfig::default());
    let inputs = vec![NodeInput::from(vec![1i32, 2])];
    let node = builder.create_op("Duplicate", inputs, attrs! {}, None)?;
    assert_eq!(node.output_count(), 2);
    assert_eq!(node.outputs()[1].shape(), &Shape::from_static(&[2]));
    Ok(())
}
