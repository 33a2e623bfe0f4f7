//! Reconstruction backend against hand-built IR, checked by running the
//! generated statements

use pretty_assertions::assert_eq;
use snaptest_codegen::{
    CodegenError, Computation, Dialect, Evaluator, SetupAdaptors, SetupGenerator, StandardDialect,
    UnitScope,
};
use snaptest_matching::graph_matches_live;
use snaptest_test_utils::{
    array_list_of, fixture_types, int, ir, ring, BEAN, COLOR, NODE, SUB_BEAN,
};
use snaptest_values::{well_known, TypeRef, TypeRegistry, ValueGraph, ValueId};

fn rebuild(
    graph: &ValueGraph,
    types: &TypeRegistry,
    adaptors: &SetupAdaptors,
    id: ValueId,
) -> Result<(Computation, Vec<String>), CodegenError> {
    let mut scope = UnitScope::new();
    let built = SetupGenerator::new(graph, types, adaptors, &mut scope).build(id)?;
    let lines = built
        .statements
        .iter()
        .map(|stmt| StandardDialect.stmt(stmt, &mut scope.types))
        .collect();
    Ok((built, lines))
}

fn bean(graph: &mut ValueGraph, i: i32) -> ValueId {
    let id = ir::object(graph, TypeRef::class(BEAN));
    let value = ir::int(graph, i);
    let null = graph.null(TypeRef::object());
    ir::field(graph, id, "i", int(), value);
    ir::field(graph, id, "o", TypeRef::object(), null);
    id
}

#[test]
fn self_referencing_object_is_patched_after_allocation() {
    let types = fixture_types();
    let adaptors = SetupAdaptors::standard().unwrap();
    let mut graph = ValueGraph::standalone();
    let node = ir::object(&mut graph, TypeRef::class(NODE));
    let one = ir::int(&mut graph, 1);
    ir::field(&mut graph, node, "value", int(), one);
    ir::field(&mut graph, node, "next", TypeRef::class(NODE), node);

    let (built, lines) = rebuild(&graph, &types, &adaptors, node).unwrap();
    assert_eq!(
        lines,
        vec![
            "let node1: Node = Node::new();",
            "node1.value = 1;",
            "node1.next = node1;",
        ]
    );

    let mut eval = Evaluator::new(&types);
    eval.run(&built.statements).unwrap();
    let rebuilt = eval.local("node1").unwrap();
    assert!(graph_matches_live(&graph, node, &types, rebuilt));
    assert!(snaptest_matching::live_equals(&types, rebuilt, &ring(&[1]).into()));
}

#[test]
fn shared_object_is_built_once() {
    let types = fixture_types();
    let adaptors = SetupAdaptors::standard().unwrap();
    let mut graph = ValueGraph::standalone();
    let shared = bean(&mut graph, 7);
    let list = ir::list(&mut graph, array_list_of(TypeRef::class(BEAN)), vec![shared, shared]);

    let (built, lines) = rebuild(&graph, &types, &adaptors, list).unwrap();
    assert_eq!(lines.iter().filter(|line| line.contains("Bean::new()")).count(), 1);
    assert!(lines.contains(&"bean1.i = 7;".to_string()));
    assert_eq!(lines.iter().filter(|line| *line == "array_list1.add(bean1);").count(), 2);

    let mut eval = Evaluator::new(&types);
    eval.run(&built.statements).unwrap();
    let rebuilt = eval.local(built.value.as_local().unwrap()).unwrap();
    assert!(graph_matches_live(&graph, list, &types, rebuilt));
}

#[test]
fn unmodifiable_wrapper_wraps_a_plain_payload() {
    let types = fixture_types();
    let adaptors = SetupAdaptors::standard().unwrap();
    let mut graph = ValueGraph::standalone();
    let a = ir::string(&mut graph, "a");
    let wrapper = ir::list(
        &mut graph,
        TypeRef::generic("collections::UnmodifiableList", vec![TypeRef::string()]),
        vec![a],
    );

    let (built, lines) = rebuild(&graph, &types, &adaptors, wrapper).unwrap();
    assert_eq!(
        lines,
        vec![
            "let array_list1: ArrayList<String> = ArrayList::new();",
            "array_list1.add(\"a\");",
            "let list1: List<String> = unmodifiable_list(array_list1);",
        ]
    );
    assert_eq!(built.ty, TypeRef::generic("List", vec![TypeRef::string()]));

    let mut eval = Evaluator::new(&types);
    eval.run(&built.statements).unwrap();
    assert!(graph_matches_live(&graph, wrapper, &types, eval.local("list1").unwrap()));
}

#[test]
fn wrapper_reached_from_its_own_elements_is_not_constructible() {
    let types = fixture_types();
    let adaptors = SetupAdaptors::standard().unwrap();
    let mut graph = ValueGraph::standalone();
    let wrapper_type = TypeRef::generic("collections::UnmodifiableList", vec![TypeRef::object()]);
    let holder = ir::object(&mut graph, TypeRef::class(BEAN));
    let wrapper = ir::list(&mut graph, wrapper_type.clone(), vec![holder]);
    let one = ir::int(&mut graph, 1);
    ir::field(&mut graph, holder, "i", int(), one);
    ir::field(&mut graph, holder, "o", TypeRef::object(), wrapper);

    let err = rebuild(&graph, &types, &adaptors, wrapper).unwrap_err();
    assert!(matches!(err, CodegenError::Unconstructible { ref ty } if *ty == wrapper_type));
    assert!(err.is_coverage_gap());

    let err = rebuild(&graph, &types, &adaptors, holder).unwrap_err();
    assert!(matches!(err, CodegenError::Unconstructible { .. }));
}

#[test]
fn synchronized_set_builds_its_payload_with_the_set_adaptor() {
    let types = fixture_types();
    let adaptors = SetupAdaptors::standard().unwrap();
    let mut graph = ValueGraph::standalone();
    let b = ir::string(&mut graph, "b");
    let a = ir::string(&mut graph, "a");
    let wrapper = ir::set(
        &mut graph,
        TypeRef::generic("collections::SynchronizedSet", vec![TypeRef::string()]),
        vec![b, a],
    );

    let (built, lines) = rebuild(&graph, &types, &adaptors, wrapper).unwrap();
    assert_eq!(
        lines,
        vec![
            "let linked_hash_set1: LinkedHashSet<String> = LinkedHashSet::new();",
            "linked_hash_set1.add(\"b\");",
            "linked_hash_set1.add(\"a\");",
            "let set1: Set<String> = synchronized_set(linked_hash_set1);",
        ]
    );

    let mut eval = Evaluator::new(&types);
    eval.run(&built.statements).unwrap();
    assert!(graph_matches_live(&graph, wrapper, &types, eval.local("set1").unwrap()));
}

#[test]
fn unknown_wrapper_kinds_are_rejected() {
    let types = fixture_types();
    let adaptors = SetupAdaptors::standard().unwrap();
    let mut graph = ValueGraph::standalone();
    let a = ir::string(&mut graph, "a");
    let sorted = ir::list(
        &mut graph,
        TypeRef::generic("collections::SortedList", vec![TypeRef::string()]),
        vec![a],
    );
    let err = rebuild(&graph, &types, &adaptors, sorted).unwrap_err();
    assert!(matches!(err, CodegenError::UnknownWrapper { .. }));
    assert!(err.is_coverage_gap());
}

#[test]
fn singleton_with_two_elements_is_not_constructible() {
    let types = fixture_types();
    let adaptors = SetupAdaptors::standard().unwrap();
    let mut graph = ValueGraph::standalone();
    let a = ir::string(&mut graph, "a");
    let b = ir::string(&mut graph, "b");
    let singleton = ir::list(
        &mut graph,
        TypeRef::generic("collections::SingletonList", vec![TypeRef::string()]),
        vec![a, b],
    );
    let err = rebuild(&graph, &types, &adaptors, singleton).unwrap_err();
    assert!(matches!(err, CodegenError::UnknownWrapper { .. }));
}

#[test]
fn objects_need_an_adaptor_without_fallback() {
    let types = fixture_types();
    let adaptors = SetupAdaptors::standard().unwrap().with_reflective_fallback(false);
    let mut graph = ValueGraph::standalone();
    let id = bean(&mut graph, 1);
    let err = rebuild(&graph, &types, &adaptors, id).unwrap_err();
    assert!(matches!(err, CodegenError::ConfigurationGap { .. }));
    assert!(err.is_coverage_gap());
}

#[test]
fn arrays_of_literals_are_inline() {
    let types = fixture_types();
    let adaptors = SetupAdaptors::standard().unwrap();
    let mut graph = ValueGraph::standalone();
    let items: Vec<ValueId> = [3, 1, 2].iter().map(|v| ir::int(&mut graph, *v)).collect();
    let array = ir::array(&mut graph, int(), items);

    let (built, lines) = rebuild(&graph, &types, &adaptors, array).unwrap();
    assert_eq!(lines, vec!["let int_array1: Vec<int> = vec![3, 1, 2];"]);

    let mut eval = Evaluator::new(&types);
    eval.run(&built.statements).unwrap();
    assert!(graph_matches_live(&graph, array, &types, eval.local("int_array1").unwrap()));
}

#[test]
fn array_holding_itself_uses_element_stores() {
    let types = fixture_types();
    let adaptors = SetupAdaptors::standard().unwrap();
    let mut graph = ValueGraph::standalone();
    let array = ir::array(&mut graph, TypeRef::object(), Vec::new());
    let one = ir::string(&mut graph, "one");
    if let Some(snaptest_values::SerializedValue::Array(node)) = graph.get_mut(array) {
        node.elements = vec![one, array];
    }

    let (_, lines) = rebuild(&graph, &types, &adaptors, array).unwrap();
    assert_eq!(
        lines,
        vec![
            "let object_array1: Vec<Object> = vec![null, null];",
            "object_array1[0] = \"one\";",
            "object_array1[1] = object_array1;",
        ]
    );
}

#[test]
fn unordered_set_is_filled_in_capture_order() {
    let types = fixture_types();
    let adaptors = SetupAdaptors::standard().unwrap();
    let mut graph = ValueGraph::standalone();
    let b = ir::string(&mut graph, "b");
    let a = ir::string(&mut graph, "a");
    let set = ir::set(
        &mut graph,
        TypeRef::generic(well_known::HASH_SET, vec![TypeRef::string()]),
        vec![b, a],
    );

    let (built, lines) = rebuild(&graph, &types, &adaptors, set).unwrap();
    assert_eq!(
        lines,
        vec![
            "let hash_set1: HashSet<String> = HashSet::new();",
            "hash_set1.add(\"b\");",
            "hash_set1.add(\"a\");",
        ]
    );

    let mut eval = Evaluator::new(&types);
    eval.run(&built.statements).unwrap();
    assert!(graph_matches_live(&graph, set, &types, eval.local("hash_set1").unwrap()));
}

#[test]
fn map_entries_are_put_in_order() {
    let types = fixture_types();
    let adaptors = SetupAdaptors::standard().unwrap();
    let mut graph = ValueGraph::standalone();
    let map_type = TypeRef::generic(
        well_known::LINKED_HASH_MAP,
        vec![TypeRef::string(), TypeRef::class("Integer")],
    );
    let entries = [("x", 1), ("y", 2)]
        .iter()
        .map(|(k, v)| (ir::string(&mut graph, k), ir::int(&mut graph, *v)))
        .collect();
    let map = ir::map(&mut graph, map_type, entries);

    let (built, lines) = rebuild(&graph, &types, &adaptors, map).unwrap();
    assert_eq!(
        lines[1..].to_vec(),
        vec!["linked_hash_map1.put(\"x\", 1);", "linked_hash_map1.put(\"y\", 2);"]
    );

    let mut eval = Evaluator::new(&types);
    eval.run(&built.statements).unwrap();
    let rebuilt = eval.local(built.value.as_local().unwrap()).unwrap();
    assert!(graph_matches_live(&graph, map, &types, rebuilt));
}

#[test]
fn enum_constant_needs_no_statements() {
    let types = fixture_types();
    let adaptors = SetupAdaptors::standard().unwrap();
    let mut graph = ValueGraph::standalone();
    let green = ir::enumeration(&mut graph, COLOR, "GREEN");

    let (built, lines) = rebuild(&graph, &types, &adaptors, green).unwrap();
    assert!(lines.is_empty());
    let mut scope = UnitScope::new();
    assert_eq!(StandardDialect.expr(&built.value, &mut scope.types), "Color::GREEN");

    let mut eval = Evaluator::new(&types);
    let rebuilt = eval.eval(&built.value).unwrap().into_live().unwrap();
    assert!(graph_matches_live(&graph, green, &types, &rebuilt));
}

#[test]
fn nested_maps_inside_a_list_round_trip() {
    let types = fixture_types();
    let adaptors = SetupAdaptors::standard().unwrap();
    let mut graph = ValueGraph::standalone();
    let map_type = TypeRef::generic(
        well_known::LINKED_HASH_MAP,
        vec![TypeRef::string(), TypeRef::class("Integer")],
    );
    let mut maps = Vec::new();
    for (key, value) in [("a", 1), ("b", 2)] {
        let key = ir::string(&mut graph, key);
        let value = ir::int(&mut graph, value);
        maps.push(ir::map(&mut graph, map_type.clone(), vec![(key, value)]));
    }
    let list = ir::list(&mut graph, array_list_of(map_type), maps);

    let (built, lines) = rebuild(&graph, &types, &adaptors, list).unwrap();
    assert_eq!(lines.iter().filter(|line| line.contains("LinkedHashMap::new()")).count(), 2);

    let mut eval = Evaluator::new(&types);
    eval.run(&built.statements).unwrap();
    let rebuilt = eval.local(built.value.as_local().unwrap()).unwrap();
    assert!(graph_matches_live(&graph, list, &types, rebuilt));
}

#[test]
fn values_are_cast_only_when_not_assignable() {
    let types = fixture_types();
    let adaptors = SetupAdaptors::standard().unwrap();
    let mut graph = ValueGraph::standalone();
    let plain = bean(&mut graph, 1);
    let sub = ir::object(&mut graph, TypeRef::class(SUB_BEAN));
    let number = ir::int(&mut graph, 3);

    let mut scope = UnitScope::new();
    let (narrowed, widened, boxed) = {
        let mut generator = SetupGenerator::new(&graph, &types, &adaptors, &mut scope);
        (
            generator.value_as(plain, &TypeRef::class(SUB_BEAN)).unwrap(),
            generator.value_as(sub, &TypeRef::class(BEAN)).unwrap(),
            generator.value_as(number, &TypeRef::object()).unwrap(),
        )
    };
    assert_eq!(StandardDialect.expr(&narrowed, &mut scope.types), "(bean1 as SubBean)");
    assert_eq!(StandardDialect.expr(&widened, &mut scope.types), "sub_bean1");
    assert_eq!(StandardDialect.expr(&boxed, &mut scope.types), "3");
}
