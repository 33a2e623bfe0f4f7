//! Deep equality over cyclic and shared graphs

use proptest::prelude::*;
use snaptest_matching::{graph_equals, graph_matches_live, live_equals};
use snaptest_test_utils::{chain_ending_in_self_loop, fixture_types, node, ring, NODE};
use snaptest_values::{
    LiveValue, SerializedField, SerializedObject, SerializedValue, TypeRef, ValueGraph, ValueId,
};

#[test]
fn self_loop_terminates() {
    let types = fixture_types();
    let a = chain_ending_in_self_loop(&[1]);
    let b = chain_ending_in_self_loop(&[1]);
    assert!(live_equals(&types, &a.into(), &b.into()));
}

#[test]
fn difference_at_depth_three_is_found() {
    let types = fixture_types();
    let a = chain_ending_in_self_loop(&[1, 2, 3]);
    let b = chain_ending_in_self_loop(&[1, 2, 4]);
    let c = chain_ending_in_self_loop(&[1, 2, 3]);
    assert!(!live_equals(&types, &a.clone().into(), &b.into()));
    assert!(live_equals(&types, &a.into(), &c.into()));
}

#[test]
fn rings_with_different_unfoldings_differ() {
    let types = fixture_types();
    assert!(!live_equals(&types, &ring(&[1, 2]).into(), &ring(&[1, 2, 1]).into()));
    assert!(live_equals(&types, &ring(&[1, 2]).into(), &ring(&[1, 2, 1, 2]).into()));
}

#[test]
fn shared_and_copied_instances_compare_equal() {
    let types = fixture_types();
    let shared = node(9);
    let left = ring(&[0]);
    left.set_field("next", shared.clone().into());
    shared.set_field("next", shared.clone().into());
    let right = chain_ending_in_self_loop(&[0, 9]);
    assert!(live_equals(&types, &left.into(), &right.into()));
}

/// IR for a node whose `next` refers back to itself
fn self_loop_graph(value: i32) -> (ValueGraph, ValueId) {
    let mut graph = ValueGraph::standalone();
    let node_type = TypeRef::class(NODE);
    let id = graph.insert(SerializedValue::Object(SerializedObject::new(
        node_type.clone(),
        node_type.clone(),
    )));
    let literal = graph.literal(TypeRef::primitive(snaptest_values::Primitive::Int), value.into());
    if let Some(SerializedValue::Object(object)) = graph.get_mut(id) {
        object.fields.push(SerializedField {
            owner: NODE.to_string(),
            name: "value".to_string(),
            ty: TypeRef::primitive(snaptest_values::Primitive::Int),
            value: literal,
        });
        object.fields.push(SerializedField {
            owner: NODE.to_string(),
            name: "next".to_string(),
            ty: node_type,
            value: id,
        });
    }
    (graph, id)
}

#[test]
fn graph_views_share_the_engine() {
    let types = fixture_types();
    let (first, a) = self_loop_graph(5);
    let (second, b) = self_loop_graph(5);
    let (third, c) = self_loop_graph(6);
    assert!(graph_equals(&first, a, &second, b));
    assert!(!graph_equals(&first, a, &third, c));

    let live: LiveValue = chain_ending_in_self_loop(&[5]).into();
    assert!(graph_matches_live(&first, a, &types, &live));
    assert!(!graph_matches_live(&third, c, &types, &live));
}

/// Shortest chain with the same unfolding: trailing repeats of the
/// self-looping last node collapse into it
fn unfolded(values: &[i32]) -> Vec<i32> {
    let mut values = values.to_vec();
    while values.len() > 1 && values[values.len() - 2] == values[values.len() - 1] {
        values.pop();
    }
    values
}

proptest! {
    #[test]
    fn chain_equality_matches_value_equality(
        left in prop::collection::vec(-3i32..3, 1..6),
        right in prop::collection::vec(-3i32..3, 1..6),
    ) {
        let types = fixture_types();
        let equal = live_equals(
            &types,
            &chain_ending_in_self_loop(&left).into(),
            &chain_ending_in_self_loop(&right).into(),
        );
        prop_assert_eq!(equal, unfolded(&left) == unfolded(&right));
    }
}
