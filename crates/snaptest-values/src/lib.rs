//! snaptest value model
//!
//! Data shared by every stage of snapshot capture and test synthesis.
//!
//! # Core Concepts
//!
//! - [`TypeRef`] / [`TypeRegistry`]: types, class table, assignability
//! - [`LiveValue`] / [`ObjRef`]: values observed at an instrumented call
//! - [`ValueGraph`] / [`SerializedValue`]: the captured IR, addressed by [`ValueId`]
//! - [`Interner`]: session-wide literal and null cache
//! - [`Snapshot`]: paired Setup/Expect state of one call
//! - [`OverrideChain`]: override-ordered dispatch used by every adaptor registry
//!
//! # Example
//!
//! ```rust
//! use snaptest_values::{Literal, TypeRef, ValueGraph};
//!
//! let mut graph = ValueGraph::standalone();
//! let a = graph.literal(TypeRef::string(), Literal::from("x"));
//! let b = graph.literal(TypeRef::string(), Literal::from("x"));
//! assert_eq!(a, b);
//! ```

pub mod dispatch;
pub mod error;
pub mod graph;
pub mod intern;
pub mod literal;
pub mod live;
pub mod printer;
pub mod slots;
pub mod snapshot;
pub mod types;
pub mod visit;

pub use dispatch::{OverrideChain, Overridable};
pub use error::{GraphError, RegistryError, TypeParseError};
pub use graph::{
    SerializedArray, SerializedEnum, SerializedField, SerializedList, SerializedMap,
    SerializedObject, SerializedSet, SerializedValue, ValueGraph, ValueId, ValueKind,
};
pub use intern::{Interner, SerializedLiteral, SerializedNull};
pub use literal::Literal;
pub use live::{EnumConstant, LiveValue, ObjRef, ObjectBody, ObjectId};
pub use printer::ValuePrinter;
pub use slots::{graph_slots, live_slots, Shape, Slot, Slots};
pub use snapshot::{
    CallRecord, GlobalRef, Outcome, Phase, PhaseState, SerializedGlobal, Signature, SinkError,
    Snapshot, SnapshotId, SnapshotSink,
};
pub use types::{well_known, ClassDef, ClassKind, FieldDef, Primitive, TypeRef, TypeRegistry, Visibility};
pub use visit::ValueVisitor;

/// Version of the value model crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn graphs_share_one_interner() {
        let interner = Arc::new(Interner::new());
        let mut first = ValueGraph::new(Arc::clone(&interner));
        let mut second = ValueGraph::new(Arc::clone(&interner));
        let a = first.literal(TypeRef::string(), Literal::from("shared"));
        let b = second.literal(TypeRef::string(), Literal::from("shared"));

        match (first.get(a), second.get(b)) {
            (Some(SerializedValue::Literal(x)), Some(SerializedValue::Literal(y))) => {
                assert!(Arc::ptr_eq(x, y));
            }
            other => panic!("expected literals, got {other:?}"),
        }
        assert_eq!(interner.len(), 1);
    }
}
