//! Structural views
//!
//! The equality engine never touches live objects or IR nodes directly; it
//! asks a [`Structure`] for a node's identity and for its inspected form.
//! [`LiveStructure`] views live values through a [`TypeRegistry`],
//! [`GraphStructure`] views nodes of one [`ValueGraph`].

use snaptest_values::{
    graph_slots, live_slots, Literal, LiveValue, ObjRef, ObjectId, SerializedValue, Slots,
    TypeRef, TypeRegistry, ValueGraph, ValueId,
};
use std::hash::Hash;

/// Inspected form of one node
#[derive(Debug, Clone)]
pub enum Inspected<N> {
    /// Null reference
    Null,
    /// Primitive, boxed or string value
    Scalar(Literal),
    /// Enum constant
    Enum {
        /// Enum class
        ty: String,
        /// Constant name
        name: String,
    },
    /// Composite with its ordered parts
    Composite {
        /// Concrete type
        runtime: TypeRef,
        /// Parts
        slots: Slots<N>,
    },
    /// Contents could not be read
    Unreadable,
}

/// Value-like node summary used for immediate and order-insensitive comparison
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Atom {
    Null,
    Scalar(Literal),
    Enum(String, String),
}

impl<N> Inspected<N> {
    pub(crate) fn atom(&self) -> Option<Atom> {
        match self {
            Self::Null => Some(Atom::Null),
            Self::Scalar(literal) => Some(Atom::Scalar(literal.clone())),
            Self::Enum { ty, name } => Some(Atom::Enum(ty.clone(), name.clone())),
            Self::Composite { .. } | Self::Unreadable => None,
        }
    }
}

/// Read-only view over a graph of values
pub trait Structure {
    /// Node handle
    type Node: Clone;
    /// Identity key of reference nodes
    type Key: Copy + Eq + Hash;

    /// Identity of a reference node, `None` for value-like nodes
    fn identity(&self, node: &Self::Node) -> Option<Self::Key>;

    /// Inspect one node
    fn inspect(&self, node: &Self::Node) -> Inspected<Self::Node>;
}

/// View over live values
#[derive(Debug, Clone, Copy)]
pub struct LiveStructure<'t> {
    types: &'t TypeRegistry,
}

impl<'t> LiveStructure<'t> {
    /// Create a view resolving fields through `types`
    #[inline]
    #[must_use]
    pub fn new(types: &'t TypeRegistry) -> Self {
        Self { types }
    }
}

impl Structure for LiveStructure<'_> {
    type Node = LiveValue;
    type Key = ObjectId;

    fn identity(&self, node: &LiveValue) -> Option<ObjectId> {
        node.as_object().map(ObjRef::id)
    }

    fn inspect(&self, node: &LiveValue) -> Inspected<LiveValue> {
        match node {
            LiveValue::Null => Inspected::Null,
            LiveValue::Enum(constant) => Inspected::Enum {
                ty: constant.ty.clone(),
                name: constant.name.clone(),
            },
            LiveValue::Object(obj) => match live_slots(obj, self.types) {
                Some(slots) => Inspected::Composite {
                    runtime: obj.class().clone(),
                    slots,
                },
                None => Inspected::Unreadable,
            },
            scalar => scalar
                .as_literal()
                .map_or(Inspected::Unreadable, Inspected::Scalar),
        }
    }
}

/// View over the nodes of one IR graph
#[derive(Debug, Clone, Copy)]
pub struct GraphStructure<'g> {
    graph: &'g ValueGraph,
}

impl<'g> GraphStructure<'g> {
    /// Create a view over `graph`
    #[inline]
    #[must_use]
    pub fn new(graph: &'g ValueGraph) -> Self {
        Self { graph }
    }
}

impl Structure for GraphStructure<'_> {
    type Node = ValueId;
    type Key = ValueId;

    fn identity(&self, node: &ValueId) -> Option<ValueId> {
        self.graph
            .get(*node)
            .filter(|value| value.is_reference())
            .map(|_| *node)
    }

    fn inspect(&self, node: &ValueId) -> Inspected<ValueId> {
        let Some(value) = self.graph.get(*node) else {
            return Inspected::Unreadable;
        };
        match value {
            SerializedValue::Literal(literal) => Inspected::Scalar(literal.value().clone()),
            SerializedValue::Null(_) => Inspected::Null,
            SerializedValue::Enum(constant) => Inspected::Enum {
                ty: constant.runtime.raw_name().unwrap_or_default().to_string(),
                name: constant.name.clone(),
            },
            composite => graph_slots(self.graph, *node).map_or(Inspected::Unreadable, |slots| {
                Inspected::Composite {
                    runtime: composite.runtime_type().clone(),
                    slots,
                }
            }),
        }
    }
}
