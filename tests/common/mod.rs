#![allow(dead_code)]

use blockflow::graph::InputUpdate;
use blockflow::{BlockId, BlockMetadataProvider, Graph, Point, SnapPointId, SnapPointKind};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn graph() -> Graph {
    init_tracing();
    Graph::new(BlockMetadataProvider::new())
}

pub fn primary_notch(graph: &Graph, block: &BlockId) -> SnapPointId {
    graph.block(block).unwrap().primary_notch.clone().unwrap()
}

pub fn primary_divot(graph: &Graph, block: &BlockId) -> SnapPointId {
    graph.block(block).unwrap().primary_divot.clone().unwrap()
}

/// Secondary notch owned by the segment named `segment_name`.
pub fn scope_notch(graph: &Graph, block: &BlockId, segment_name: &str) -> SnapPointId {
    let block = graph.block(block).unwrap();
    let segment_id = format!("{}.{}", block.name, segment_name);
    block
        .snap_points
        .iter()
        .find(|id| {
            let snap = graph.snap_point(id).unwrap();
            snap.kind == SnapPointKind::SecondaryNotch && snap.segment_id == segment_id
        })
        .cloned()
        .unwrap()
}

/// Move `block` so its divot sits exactly on `notch`, then connect them.
pub fn snap(graph: &mut Graph, notch: &SnapPointId, block: &BlockId) {
    let divot = primary_divot(graph, block);
    let target = graph.snap_point_position(notch).unwrap();
    let divot_local = graph.snap_point(&divot).unwrap().position;
    graph.move_block(block, target - divot_local).unwrap();

    let outcome = graph.connect(notch, &divot).unwrap();
    assert!(outcome.is_connected(), "expected connection, got {:?}", outcome);
}

/// Insert a `name` block and snap it below `above`.
pub fn append(graph: &mut Graph, above: &BlockId, name: &str) -> BlockId {
    let block = graph.insert_block(name, Point::new(500.0, 500.0)).unwrap();
    let notch = primary_notch(graph, above);
    snap(graph, &notch, &block);
    block
}

/// Insert a `name` block and snap it into the scope of `parent`'s segment `segment_name`.
pub fn nest(graph: &mut Graph, parent: &BlockId, segment_name: &str, name: &str) -> BlockId {
    let block = graph.insert_block(name, Point::new(500.0, 500.0)).unwrap();
    let notch = scope_notch(graph, parent, segment_name);
    snap(graph, &notch, &block);
    block
}

/// Bind the input `internal_name` of segment `segment_name` to variable store key `key`.
pub fn bind(
    graph: &mut Graph,
    block: &BlockId,
    segment_name: &str,
    internal_name: &str,
    key: &str,
) {
    let name = graph.block(block).unwrap().name.clone();
    let segment_id = format!("{}.{}", name, segment_name);
    let input_id = format!("{}.{}", segment_id, internal_name);
    graph
        .update_input(
            block,
            &segment_id,
            &input_id,
            InputUpdate {
                display_text: Some(key.to_string()),
                key: Some(key.to_string()),
                occupied: Some(true),
                constant: None,
            },
        )
        .unwrap();
}

/// Bind the three inputs of a condition segment.
pub fn bind_condition(
    graph: &mut Graph,
    block: &BlockId,
    segment_name: &str,
    a: &str,
    operator: &str,
    b: &str,
) {
    bind(graph, block, segment_name, "varA", a);
    bind(graph, block, segment_name, "eval", operator);
    bind(graph, block, segment_name, "varB", b);
}
