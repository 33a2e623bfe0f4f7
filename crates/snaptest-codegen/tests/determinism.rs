//! Generated units are a pure function of the snapshot, and running them
//! reproduces the captured behavior

use proptest::prelude::*;
use snaptest_codegen::{Evaluator, TestGenerator};
use snaptest_test_utils::{array_list_of, fixture_types, ir};
use snaptest_values::{Outcome, Phase, Signature, Snapshot, TypeRef, ValueGraph};
use std::sync::Arc;

fn add_snapshot(items: &[String], added: &str) -> Snapshot {
    let ty = array_list_of(TypeRef::string());
    let signature = Signature::new(ty.clone(), "add").with_params(vec![TypeRef::object()]);
    let mut snapshot = Snapshot::new(signature, ValueGraph::standalone());
    let graph = snapshot.graph_mut();
    let before: Vec<_> = items.iter().map(|item| ir::string(graph, item)).collect();
    let arg = ir::string(graph, added);
    let mut after = before.clone();
    after.push(arg);
    let before = ir::list(graph, ty.clone(), before);
    let after = ir::list(graph, ty, after);
    snapshot.phase_mut(Phase::Setup).this = Some(before);
    snapshot.phase_mut(Phase::Setup).args = vec![arg];
    snapshot.phase_mut(Phase::Expect).this = Some(after);
    snapshot.phase_mut(Phase::Expect).args = vec![arg];
    snapshot.set_outcome(Outcome::Returned(None));
    snapshot
}

proptest! {
    #[test]
    fn same_snapshot_same_code(items in prop::collection::vec("[a-z]{0,4}", 0..6), added in "[a-z]{1,3}") {
        let types = Arc::new(fixture_types());
        let snapshot = add_snapshot(&items, &added);
        let first = TestGenerator::standard(Arc::clone(&types)).unwrap();
        let second = TestGenerator::standard(Arc::clone(&types)).unwrap();
        let a = first.generate(&snapshot).unwrap();
        let b = second.generate(&snapshot).unwrap();
        prop_assert_eq!(a.render(first.dialect()), b.render(second.dialect()));
    }

    #[test]
    fn generated_unit_passes(items in prop::collection::vec("[a-z]{0,4}", 0..6), added in "[a-z]{1,3}") {
        let types = Arc::new(fixture_types());
        let generator = TestGenerator::standard(Arc::clone(&types)).unwrap();
        let unit = generator.generate(&add_snapshot(&items, &added)).unwrap();
        let mut eval = Evaluator::new(&types);
        prop_assert!(eval.run_unit(&unit).is_ok());
    }
}

#[test]
fn names_continue_across_units_of_one_method() {
    let types = Arc::new(fixture_types());
    let generator = TestGenerator::standard(types).unwrap();
    let first = generator.generate(&add_snapshot(&[], "x")).unwrap();
    let second = generator.generate(&add_snapshot(&["a".to_string()], "y")).unwrap();
    assert_eq!(first.name, "test_add1");
    assert_eq!(second.name, "test_add2");
}
