mod common;

use blockflow::graph::{
    DragOutcome, Layout, LayoutResult, RejectReason, SegmentState, SnapPointSlot,
};
use blockflow::metadata::BlockDefinition;
use blockflow::{
    BlockMetadataProvider, ConnectOutcome, DisconnectOutcome, Graph, GraphError, Point,
    SnapPointKind,
};
use common::*;
use std::collections::BTreeMap;

fn assert_near(a: Point, b: Point) {
    assert!(
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9,
        "{:?} != {:?}",
        a,
        b
    );
}

// ============================================================================
// Snap Point Derivation
// ============================================================================

#[test]
fn test_snap_points_follow_segment_flags() {
    let mut graph = graph();
    let start = graph.insert_block("startAgent", Point::new(0.0, 0.0)).unwrap();
    let if_block = graph.insert_block("if", Point::new(200.0, 0.0)).unwrap();
    let if_else = graph.insert_block("ifElse", Point::new(400.0, 0.0)).unwrap();

    let start = graph.block(&start).unwrap();
    assert!(start.primary_notch.is_some());
    assert!(start.primary_divot.is_none());
    assert!(!start.is_dynamic());

    let kinds: Vec<_> = graph
        .block(&if_block)
        .unwrap()
        .snap_points
        .iter()
        .map(|id| graph.snap_point(id).unwrap().kind)
        .collect();
    assert_eq!(
        kinds,
        [
            SnapPointKind::PrimaryDivot,
            SnapPointKind::SecondaryNotch,
            SnapPointKind::PrimaryNotch
        ]
    );
    assert!(graph.block(&if_block).unwrap().is_dynamic());

    let secondary = graph
        .block(&if_else)
        .unwrap()
        .snap_points
        .iter()
        .filter(|id| graph.snap_point(id).unwrap().kind == SnapPointKind::SecondaryNotch)
        .count();
    assert_eq!(secondary, 2);
}

#[test]
fn test_unknown_block_name_is_an_error() {
    let mut graph = graph();
    let err = graph.insert_block("teleport", Point::default()).unwrap_err();
    assert!(matches!(err, GraphError::UnknownDefinition(name) if name == "teleport"));
}

// ============================================================================
// Connect / Disconnect
// ============================================================================

#[test]
fn test_connect_links_both_sides_and_updates_deepest_child() {
    let mut graph = graph();
    let a = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let b = append(&mut graph, &a, "broadcast");

    let notch = primary_notch(&graph, &a);
    let divot = primary_divot(&graph, &b);
    assert_eq!(graph.snap_point(&notch).unwrap().next.as_ref(), Some(&divot));
    assert_eq!(graph.snap_point(&divot).unwrap().previous.as_ref(), Some(&notch));
    assert_eq!(graph.block(&a).unwrap().deepest_child, b);
    assert!(!graph.block(&b).unwrap().is_root());

    let c = append(&mut graph, &b, "logVariable");
    assert_eq!(graph.block(&a).unwrap().deepest_child, c);
    assert_eq!(graph.block(&b).unwrap().deepest_child, c);
}

#[test]
fn test_connect_outside_radius_is_rejected() {
    let mut graph = graph();
    let a = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let b = graph.insert_block("broadcast", Point::new(0.0, 300.0)).unwrap();
    let notch = primary_notch(&graph, &a);
    let divot = primary_divot(&graph, &b);

    let outcome = graph.connect(&notch, &divot).unwrap();
    assert!(matches!(
        outcome,
        ConnectOutcome::Rejected(RejectReason::OutOfRange { .. })
    ));
    assert!(graph.snap_point(&notch).unwrap().next.is_none());
    assert!(graph.snap_point(&divot).unwrap().previous.is_none());
}

#[test]
fn test_snap_radius_is_checked_per_axis() {
    let mut graph = graph();
    let a = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let notch = primary_notch(&graph, &a);
    let target = graph.snap_point_position(&notch).unwrap();

    // Diagonal distance is past the radius, but each axis is inside it
    let b = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let divot = primary_divot(&graph, &b);
    let divot_local = graph.snap_point(&divot).unwrap().position;
    graph
        .move_block(&b, target + Point::new(39.5, 39.5) - divot_local)
        .unwrap();
    assert!(graph.connect(&notch, &divot).unwrap().is_connected());

    let c = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let below = primary_notch(&graph, &b);
    let c_divot = primary_divot(&graph, &c);
    let below_position = graph.snap_point_position(&below).unwrap();
    graph
        .move_block(&c, below_position + Point::new(40.5, 0.0) - divot_local)
        .unwrap();
    assert!(matches!(
        graph.connect(&below, &c_divot).unwrap(),
        ConnectOutcome::Rejected(RejectReason::OutOfRange { .. })
    ));
}

#[test]
fn test_connect_checks_kinds_and_occupancy() {
    let mut graph = graph();
    let a = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let b = append(&mut graph, &a, "broadcast");
    let c = graph.insert_block("broadcast", Point::new(600.0, 0.0)).unwrap();

    let a_notch = primary_notch(&graph, &a);
    let b_notch = primary_notch(&graph, &b);
    let c_divot = primary_divot(&graph, &c);

    assert_eq!(
        graph.connect(&c_divot, &a_notch).unwrap(),
        ConnectOutcome::Rejected(RejectReason::NotANotch)
    );
    assert_eq!(
        graph.connect(&a_notch, &b_notch).unwrap(),
        ConnectOutcome::Rejected(RejectReason::NotADivot)
    );
    assert_eq!(
        graph.connect(&a_notch, &c_divot).unwrap(),
        ConnectOutcome::Rejected(RejectReason::AlreadyLinked)
    );
}

#[test]
fn test_disconnect_beyond_radius_detaches() {
    let mut graph = graph();
    let a = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let b = append(&mut graph, &a, "broadcast");
    let notch = primary_notch(&graph, &a);
    let divot = primary_divot(&graph, &b);

    graph.move_block(&b, Point::new(300.0, 400.0)).unwrap();
    let outcome = graph.disconnect(&divot).unwrap();
    assert!(matches!(outcome, DisconnectOutcome::Detached { .. }));

    assert!(graph.snap_point(&notch).unwrap().next.is_none());
    assert!(graph.snap_point(&divot).unwrap().previous.is_none());
    assert!(graph.block(&b).unwrap().is_root());
    assert_eq!(graph.block(&a).unwrap().deepest_child, a);
    assert_near(graph.global_position(&b).unwrap(), Point::new(300.0, 400.0));
}

#[test]
fn test_disconnect_within_radius_realigns() {
    let mut graph = graph();
    let a = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let b = append(&mut graph, &a, "broadcast");
    let notch = primary_notch(&graph, &a);
    let divot = primary_divot(&graph, &b);

    let snapped = graph.global_position(&b).unwrap();
    graph
        .move_block(&b, snapped + Point::new(10.0, -5.0))
        .unwrap();

    match graph.disconnect(&divot).unwrap() {
        DisconnectOutcome::Realigned { correction } => {
            assert_near(correction, Point::new(-10.0, 5.0));
        }
        other => panic!("expected realignment, got {:?}", other),
    }
    assert_eq!(graph.snap_point(&notch).unwrap().next.as_ref(), Some(&divot));
    assert_near(
        graph.snap_point_position(&divot).unwrap(),
        graph.snap_point_position(&notch).unwrap(),
    );
}

#[test]
fn test_disconnect_unlinked_divot() {
    let mut graph = graph();
    let a = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let divot = primary_divot(&graph, &a);
    assert_eq!(graph.disconnect(&divot).unwrap(), DisconnectOutcome::NotLinked);
}

#[test]
fn test_attached_blocks_follow_their_parent() {
    let mut graph = graph();
    let a = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let b = append(&mut graph, &a, "broadcast");
    let before = graph.global_position(&b).unwrap();

    graph.move_block(&a, Point::new(100.0, 50.0)).unwrap();
    assert_near(graph.global_position(&b).unwrap(), before + Point::new(100.0, 50.0));
}

// ============================================================================
// Deepest Child / Height Cascade
// ============================================================================

#[test]
fn test_deepest_child_of_long_chain() {
    let mut graph = graph();
    let first = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let mut last = first.clone();
    for _ in 1..50 {
        last = append(&mut graph, &last, "broadcast");
    }

    assert_eq!(graph.primary_chain(&first).unwrap().len(), 50);
    assert_eq!(graph.calculate_deepest_child(&first).unwrap(), last);
    assert_eq!(graph.block(&first).unwrap().deepest_child, last);
}

#[test]
fn test_chain_beyond_hop_bound_is_rejected_untouched() {
    let mut graph = graph();
    let first = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let mut last = first.clone();
    for _ in 1..100 {
        last = append(&mut graph, &last, "broadcast");
    }
    assert_eq!(graph.calculate_deepest_child(&first).unwrap(), last);

    let extra = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let notch = primary_notch(&graph, &last);
    let divot = primary_divot(&graph, &extra);
    let target = graph.snap_point_position(&notch).unwrap();
    let divot_local = graph.snap_point(&divot).unwrap().position;
    graph.move_block(&extra, target - divot_local).unwrap();

    let outcome = graph.connect(&notch, &divot).unwrap();
    assert_eq!(
        outcome,
        ConnectOutcome::Rejected(RejectReason::TooDeep {
            depth: 101,
            limit: 100
        })
    );

    assert!(graph.snap_point(&notch).unwrap().next.is_none());
    assert!(graph.snap_point(&divot).unwrap().previous.is_none());
    assert!(graph.block(&extra).unwrap().is_root());
    assert_eq!(graph.block(&first).unwrap().deepest_child, last);
    assert_eq!(graph.calculate_deepest_child(&first).unwrap(), last);
    assert_eq!(graph.primary_chain(&first).unwrap().len(), 100);
}

#[test]
fn test_nesting_beyond_hop_bound_is_rejected() {
    let mut graph = graph();
    let outer = graph.insert_block("while", Point::new(0.0, 0.0)).unwrap();
    let mut last = outer.clone();
    for _ in 1..99 {
        last = append(&mut graph, &last, "broadcast");
    }

    // A nested body adds one level below its parent, whatever its own chain length
    let scoped = graph.insert_block("if", Point::new(0.0, 0.0)).unwrap();
    nest(&mut graph, &scoped, "if", "broadcast");
    let notch = primary_notch(&graph, &last);
    let divot = primary_divot(&graph, &scoped);
    let target = graph.snap_point_position(&notch).unwrap();
    let divot_local = graph.snap_point(&divot).unwrap().position;
    graph.move_block(&scoped, target - divot_local).unwrap();

    assert_eq!(
        graph.connect(&notch, &divot).unwrap(),
        ConnectOutcome::Rejected(RejectReason::TooDeep {
            depth: 101,
            limit: 100
        })
    );
    assert!(graph.block(&scoped).unwrap().is_root());
}

#[test]
fn test_nested_scope_grows_enclosing_blocks() {
    let mut graph = graph();
    let outer = graph.insert_block("while", Point::new(0.0, 0.0)).unwrap();
    let outer_height = graph.block(&outer).unwrap().height;

    let inner = nest(&mut graph, &outer, "while", "if");
    let inner_height = graph.block(&inner).unwrap().height;
    assert_eq!(graph.block(&outer).unwrap().extra_height("while.while"), inner_height);
    assert_eq!(graph.block(&outer).unwrap().height, outer_height + inner_height);

    let leaf = nest(&mut graph, &inner, "if", "broadcast");
    let leaf_height = graph.block(&leaf).unwrap().height;
    assert_eq!(graph.block(&inner).unwrap().extra_height("if.if"), leaf_height);

    // The cascade reached the outer loop as well
    let grown = graph.block(&inner).unwrap().height;
    assert_eq!(grown, inner_height + leaf_height);
    assert_eq!(graph.block(&outer).unwrap().extra_height("while.while"), grown);
}

/// Ten units per segment plus nested scope heights. Divots sit at the top, notches at the
/// bottom of their segment's row.
struct RowLayout;

impl Layout for RowLayout {
    fn layout(
        &self,
        definition: &BlockDefinition,
        segments: &BTreeMap<String, SegmentState>,
        slots: &[SnapPointSlot],
    ) -> LayoutResult {
        let extra: f64 = segments.values().map(|state| state.extra_height).sum();
        let positions = slots
            .iter()
            .map(|slot| match slot.kind {
                SnapPointKind::PrimaryDivot => Point::new(5.0, 0.0),
                _ => Point::new(5.0, 10.0 * (slot.segment_index + 1) as f64),
            })
            .collect();
        LayoutResult {
            height: 10.0 * definition.segments.len() as f64 + extra,
            positions,
        }
    }
}

#[test]
fn test_custom_layout_drives_heights_and_snap_points() {
    init_tracing();
    let mut graph = Graph::new(BlockMetadataProvider::new()).with_layout(RowLayout);

    let parent = graph.insert_block("if", Point::new(100.0, 100.0)).unwrap();
    assert_eq!(graph.block(&parent).unwrap().height, 20.0);
    let scope = scope_notch(&graph, &parent, "if");
    assert_near(graph.snap_point_position(&scope).unwrap(), Point::new(105.0, 110.0));
    let below = primary_notch(&graph, &parent);
    assert_near(graph.snap_point_position(&below).unwrap(), Point::new(105.0, 120.0));

    let child = nest(&mut graph, &parent, "if", "broadcast");
    assert_eq!(graph.block(&child).unwrap().height, 10.0);
    assert_eq!(graph.block(&parent).unwrap().extra_height("if.if"), 10.0);
    assert_eq!(graph.block(&parent).unwrap().height, 30.0);
    assert_near(graph.global_position(&child).unwrap(), Point::new(100.0, 110.0));
}

#[test]
fn test_emptied_scope_shrinks_back() {
    let mut graph = graph();
    let parent = graph.insert_block("if", Point::new(0.0, 0.0)).unwrap();
    let empty_height = graph.block(&parent).unwrap().height;

    let child = nest(&mut graph, &parent, "if", "broadcast");
    assert!(graph.block(&parent).unwrap().height > empty_height);

    graph.move_block(&child, Point::new(600.0, 600.0)).unwrap();
    let divot = primary_divot(&graph, &child);
    graph.disconnect(&divot).unwrap();

    assert_eq!(graph.block(&parent).unwrap().extra_height("if.if"), 0.0);
    assert_eq!(graph.block(&parent).unwrap().height, empty_height);
}

#[test]
fn test_body_below_scope_moves_down_when_scope_grows() {
    let mut graph = graph();
    let parent = graph.insert_block("if", Point::new(0.0, 0.0)).unwrap();
    let after = append(&mut graph, &parent, "broadcast");
    let before = graph.global_position(&after).unwrap();

    let child = nest(&mut graph, &parent, "if", "broadcast");
    let child_height = graph.block(&child).unwrap().height;
    assert_near(
        graph.global_position(&after).unwrap(),
        before + Point::new(0.0, child_height),
    );
}

// ============================================================================
// Proximity Search / Drag
// ============================================================================

#[test]
fn test_nearest_connection_appends_below_tail() {
    let mut graph = graph();
    let a = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let b = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();

    let notch_position = graph.snap_point_position(&primary_notch(&graph, &a)).unwrap();
    let divot_local = graph.snap_point(&primary_divot(&graph, &b)).unwrap().position;
    graph
        .move_block(&b, notch_position - divot_local + Point::new(6.0, 8.0))
        .unwrap();

    let candidate = graph.find_nearest_connection(&b).unwrap().unwrap();
    assert_eq!(candidate.notch, primary_notch(&graph, &a));
    assert_eq!(candidate.divot, primary_divot(&graph, &b));
    assert!((candidate.distance - 10.0).abs() < 1e-9);
}

#[test]
fn test_nearest_connection_inserts_above_root() {
    let mut graph = graph();
    let root = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let dragged = graph.insert_block("logVariable", Point::new(0.0, 0.0)).unwrap();

    let divot_position = graph.snap_point_position(&primary_divot(&graph, &root)).unwrap();
    let notch_local = graph.snap_point(&primary_notch(&graph, &dragged)).unwrap().position;
    graph
        .move_block(&dragged, divot_position - notch_local + Point::new(0.0, -3.0))
        .unwrap();

    let candidate = graph.find_nearest_connection(&dragged).unwrap().unwrap();
    assert_eq!(candidate.notch, primary_notch(&graph, &dragged));
    assert_eq!(candidate.divot, primary_divot(&graph, &root));
}

#[test]
fn test_nearest_connection_none_when_far() {
    let mut graph = graph();
    graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let far = graph.insert_block("broadcast", Point::new(1000.0, 1000.0)).unwrap();
    assert!(graph.find_nearest_connection(&far).unwrap().is_none());
}

#[test]
fn test_drag_token_serializes_gestures() {
    let mut graph = graph();
    let a = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let b = graph.insert_block("broadcast", Point::new(800.0, 0.0)).unwrap();

    let notch_position = graph.snap_point_position(&primary_notch(&graph, &a)).unwrap();
    let divot_local = graph.snap_point(&primary_divot(&graph, &b)).unwrap().position;

    let candidate = graph
        .drag_move(&b, notch_position - divot_local + Point::new(3.0, 4.0))
        .unwrap();
    assert!(candidate.is_some());
    assert_eq!(graph.active_block(), Some(&b));
    assert!(graph.drag_indicator().unwrap().is_some());

    // Another block cannot start a gesture while b holds the token
    assert!(graph.drag_move(&a, Point::new(50.0, 50.0)).unwrap().is_none());
    assert_near(graph.global_position(&a).unwrap(), Point::new(0.0, 0.0));
    assert_eq!(graph.drag_end(&a).unwrap(), DragOutcome::Ignored);

    match graph.drag_end(&b).unwrap() {
        DragOutcome::Finished { disconnect, connect } => {
            assert!(disconnect.is_none());
            assert!(connect.unwrap().is_connected());
        }
        other => panic!("expected finished drag, got {:?}", other),
    }
    assert!(graph.active_block().is_none());
    assert_eq!(graph.block(&a).unwrap().deepest_child, b);
}

#[test]
fn test_drag_out_of_chain_detaches() {
    let mut graph = graph();
    let a = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let b = append(&mut graph, &a, "broadcast");

    graph.drag_move(&b, Point::new(700.0, 700.0)).unwrap();
    match graph.drag_end(&b).unwrap() {
        DragOutcome::Finished { disconnect, connect } => {
            assert!(matches!(disconnect, Some(DisconnectOutcome::Detached { .. })));
            assert!(connect.is_none());
        }
        other => panic!("expected finished drag, got {:?}", other),
    }
    assert!(graph.block(&b).unwrap().is_root());
}

// ============================================================================
// Lifecycle / Inputs
// ============================================================================

#[test]
fn test_remove_block_detaches_neighbours() {
    let mut graph = graph();
    let a = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    let b = append(&mut graph, &a, "broadcast");
    let c = append(&mut graph, &b, "broadcast");
    let b_notch = primary_notch(&graph, &b);

    graph.remove_block(&b).unwrap();

    assert_eq!(graph.len(), 2);
    assert!(graph.block(&b).is_err());
    assert!(!graph.is_notch(&b_notch));
    assert!(graph.snap_point(&primary_notch(&graph, &a)).unwrap().next.is_none());
    assert!(graph.snap_point(&primary_divot(&graph, &c)).unwrap().previous.is_none());
    assert!(graph.block(&c).unwrap().is_root());
    assert_eq!(graph.block(&a).unwrap().deepest_child, a);
}

#[test]
fn test_input_editing() {
    let mut graph = graph();
    let block = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
    bind(&mut graph, &block, "broadcast", "channel", "news");

    let input = graph
        .find_input(&block, "broadcast.broadcast", "broadcast.broadcast.channel")
        .unwrap();
    assert_eq!(input.key.as_deref(), Some("news"));
    assert!(input.occupied);
    assert_eq!(input.label(), "news");

    graph
        .reset_input(&block, "broadcast.broadcast", "broadcast.broadcast.channel")
        .unwrap();
    let input = graph
        .find_input(&block, "broadcast.broadcast", "broadcast.broadcast.channel")
        .unwrap();
    assert!(input.key.is_none());
    assert_eq!(input.label(), "Message");

    let err = graph
        .find_input(&block, "broadcast.broadcast", "missing")
        .unwrap_err();
    assert!(matches!(err, GraphError::InputNotFound { .. }));
}
