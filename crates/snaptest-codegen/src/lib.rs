//! snaptest codegen
//!
//! Turns captured snapshots into test code.
//!
//! # Core Concepts
//!
//! - [`SetupGenerator`]: reconstruction backend, IR to "arrange" statements
//! - [`MatcherGenerator`]: verification backend, IR to matcher assertions
//! - [`AdaptorRegistry`]: override-ordered adaptors with a reflective fallback
//! - [`TestGenerator`]: arrange/act/assert composition, also a snapshot sink
//! - [`Dialect`]: renders the code model; [`StandardDialect`] is built in
//! - [`Evaluator`]: interprets the code model against live values
//!
//! # Example
//!
//! ```rust
//! use snaptest_codegen::{Dialect, SetupAdaptors, SetupGenerator, StandardDialect, UnitScope};
//! use snaptest_values::{SerializedList, SerializedValue, TypeRef, TypeRegistry, ValueGraph};
//!
//! let types = TypeRegistry::with_builtins();
//! let mut graph = ValueGraph::standalone();
//! let list_type = TypeRef::generic("ArrayList", vec![TypeRef::string()]);
//! let mut list = SerializedList::new(list_type.clone(), list_type);
//! list.elements.push(graph.literal(TypeRef::string(), "x".into()));
//! let id = graph.insert(SerializedValue::List(list));
//!
//! let adaptors = SetupAdaptors::standard().unwrap();
//! let mut scope = UnitScope::new();
//! let built = SetupGenerator::new(&graph, &types, &adaptors, &mut scope).build(id).unwrap();
//! let lines: Vec<String> = built
//!     .statements
//!     .iter()
//!     .map(|stmt| StandardDialect.stmt(stmt, &mut scope.types))
//!     .collect();
//! assert_eq!(lines, vec![
//!     "let array_list1: ArrayList<String> = ArrayList::new();",
//!     "array_list1.add(\"x\");",
//! ]);
//! ```

pub mod code;
pub mod error;
pub mod eval;
pub mod generator;
pub mod matchers;
pub mod registry;
pub mod scope;
pub mod setup;

pub use code::{Dialect, Expr, StandardDialect, Stmt};
pub use error::{CodegenError, EvalError};
pub use eval::{Evaluator, HostMethod, HostResult, Interactions, RecordedCall, Value};
pub use generator::{TestGenerator, TestUnit, ERROR_LOCAL, RESULT_LOCAL};
pub use matchers::{
    default_matcher_adaptors, MatcherAdaptor, MatcherAdaptors, MatcherGenerator,
};
pub use registry::AdaptorRegistry;
pub use scope::{prefix_for, LocalNames, TypeManager, UnitScope};
pub use setup::{default_setup_adaptors, Computation, SetupAdaptor, SetupAdaptors, SetupGenerator};

/// Version of the codegen crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use snaptest_test_utils::{fixture_types, BEAN};
    use snaptest_values::{
        Literal, Outcome, Phase, Primitive, SerializedField, SerializedList, SerializedObject,
        SerializedValue, Signature, Snapshot, TypeRef, ValueGraph, ValueId,
    };
    use std::sync::Arc;

    fn string_list(graph: &mut ValueGraph, items: &[&str]) -> ValueId {
        let ty = TypeRef::generic("ArrayList", vec![TypeRef::string()]);
        let mut list = SerializedList::new(ty.clone(), ty);
        for item in items {
            list.elements.push(graph.literal(TypeRef::string(), Literal::from(*item)));
        }
        graph.insert(SerializedValue::List(list))
    }

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn add_to_empty_list() {
        let types = Arc::new(fixture_types());
        let list_type = TypeRef::generic("ArrayList", vec![TypeRef::string()]);
        let signature = Signature::new(list_type, "add").with_params(vec![TypeRef::object()]);
        let mut snapshot = Snapshot::new(signature, ValueGraph::standalone());
        let before = string_list(snapshot.graph_mut(), &[]);
        let arg = snapshot.graph_mut().literal(TypeRef::string(), Literal::from("x"));
        let after = string_list(snapshot.graph_mut(), &["x"]);
        snapshot.phase_mut(Phase::Setup).this = Some(before);
        snapshot.phase_mut(Phase::Setup).args = vec![arg];
        snapshot.phase_mut(Phase::Expect).this = Some(after);
        snapshot.phase_mut(Phase::Expect).args = vec![arg];
        snapshot.set_outcome(Outcome::Returned(None));

        let generator = TestGenerator::standard(Arc::clone(&types)).unwrap();
        let unit = generator.generate(&snapshot).unwrap();
        assert_eq!(unit.name, "test_add1");
        assert_eq!(
            unit.lines(generator.dialect()),
            vec![
                "// captured ArrayList<String>::add(Object) -> void",
                "let array_list1: ArrayList<String> = ArrayList::new();",
                "array_list1.add(\"x\");",
                "assert_that(array_list1, contains_in_order(vec![equal_to(\"x\")]));",
            ]
        );

        let mut eval = Evaluator::new(&types);
        eval.run_unit(&unit).unwrap();
    }

    #[test]
    fn unchanged_receiver_is_not_asserted() {
        let types = Arc::new(fixture_types());
        let mut snapshot = Snapshot::new(
            Signature::new(TypeRef::class(BEAN), "touch"),
            ValueGraph::standalone(),
        );
        let bean = |graph: &mut ValueGraph| {
            let i = graph.literal(TypeRef::primitive(Primitive::Int), Literal::Int(4));
            let mut object = SerializedObject::new(TypeRef::class(BEAN), TypeRef::class(BEAN));
            object.fields.push(SerializedField {
                owner: BEAN.to_string(),
                name: "i".into(),
                ty: TypeRef::primitive(Primitive::Int),
                value: i,
            });
            graph.insert(SerializedValue::Object(object))
        };
        let before = bean(snapshot.graph_mut());
        let after = bean(snapshot.graph_mut());
        snapshot.phase_mut(Phase::Setup).this = Some(before);
        snapshot.phase_mut(Phase::Expect).this = Some(after);
        snapshot.set_outcome(Outcome::Returned(None));

        let generator = TestGenerator::standard(types).unwrap();
        let unit = generator.generate(&snapshot).unwrap();
        assert!(unit.assert.is_empty());
        assert_eq!(unit.act.len(), 1);
    }
}
