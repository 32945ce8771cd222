use anyhow::Result;
use opgraph::ops::{opset1, opset7};
use opgraph::registry::OPSET1;
use opgraph::{
    builtin_registry, BuilderConfig, ElementType, GraphBuilder, GraphError, GraphSnapshot,
};

fn sample() -> Result<GraphBuilder> {
    let builder = GraphBuilder::new();
    let x = builder.parameter(ElementType::F32, [2usize, 3], Some("x"))?;
    let w = opset1::constant(
        &builder,
        opgraph::TensorLiteral::from_vec([3usize, 4], vec![0.5f32; 12])?,
        None,
        Some("w"),
    )?;
    let h = opset1::matmul(&builder, &x, &w, false, false, Some("h"))?;
    let y = opset7::gelu(&builder, &h, "tanh", Some("y"))?;
    let parts = opset1::split(&builder, &y, 1i64, 2, None)?;
    builder.set_result(&y)?;
    builder.set_result(&parts[1])?;
    Ok(builder)
}

#[test]
fn snapshot_survives_json() -> Result<()> {
    let builder = sample()?;
    let snapshot = GraphSnapshot::capture(builder.graph());
    assert_eq!(snapshot.nodes.len(), builder.graph().node_count());
    assert_eq!(snapshot.results.len(), 2);

    let text = snapshot.to_json_pretty()?;
    assert!(text.contains("\"approximation_mode\""));
    let decoded = GraphSnapshot::from_json(&text)?;
    assert_eq!(decoded, snapshot);
    assert_eq!(GraphSnapshot::from_json(&snapshot.to_json()?)?, snapshot);
    Ok(())
}

#[test]
fn rebuild_reproduces_specs_names_and_results() -> Result<()> {
    let original = sample()?;
    let snapshot = GraphSnapshot::capture(original.graph());
    let rebuilt = snapshot.rebuild(builtin_registry(), BuilderConfig::default())?;

    assert_eq!(rebuilt.graph().node_count(), original.graph().node_count());
    for (left, right) in original.graph().nodes().iter().zip(rebuilt.graph().nodes()) {
        assert_eq!(left.id(), right.id());
        assert_eq!(left.op(), right.op());
        assert_eq!(left.opset(), right.opset());
        assert_eq!(left.name(), right.name());
        assert_eq!(left.output_specs(), right.output_specs());
        assert_eq!(left.attributes(), right.attributes());
    }
    assert_eq!(GraphSnapshot::capture(rebuilt.graph()), snapshot);
    let gelu = rebuilt.graph().find_by_name("y").expect("gelu survives");
    assert_eq!(
        gelu.attribute("approximation_mode").and_then(|v| v.as_str()),
        Some("tanh")
    );
    Ok(())
}

#[test]
fn rebuild_rejects_dangling_references() -> Result<()> {
    let builder = sample()?;
    let mut snapshot = GraphSnapshot::capture(builder.graph());
    snapshot.nodes.remove(0);
    let err = snapshot
        .rebuild(builtin_registry(), BuilderConfig::default())
        .expect_err("x was removed");
    assert!(matches!(err, GraphError::UnsupportedInputType { .. }));
    Ok(())
}

#[test]
fn rebuild_rejects_tampered_outputs() -> Result<()> {
    let builder = sample()?;
    let mut snapshot = GraphSnapshot::capture(builder.graph());
    let gelu = snapshot
        .nodes
        .iter_mut()
        .find(|node| node.op == "Gelu")
        .expect("gelu node");
    gelu.outputs[0].element_type = ElementType::F64;
    let err = snapshot
        .rebuild(builtin_registry(), BuilderConfig::default())
        .expect_err("recorded spec disagrees");
    assert!(matches!(err, GraphError::ShapeInference { .. }));
    Ok(())
}

#[test]
fn display_lists_every_node() -> Result<()> {
    let builder = sample()?;
    let text = builder.graph().to_string();
    let id = builder.graph().id().0;
    assert!(text.starts_with(&format!("graph #{id} (6 nodes)")));
    assert!(text.contains(&format!("{OPSET1}.MatMul(%0:0, %1:0)")));
    assert!(text.contains(
        "opset7.Gelu(%2:0) {approximation_mode=\"tanh\"} -> tensor<f32 x [2,4]>  // y"
    ));
    assert!(text.contains("-> tensor<f32 x [2,2]>, tensor<f32 x [2,2]>"));
    assert!(text.trim_end().ends_with("return %3:0, %5:1"));
    Ok(())
}
