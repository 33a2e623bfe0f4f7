//! Value IR
//!
//! A snapshot's captured values live in one arena, [`ValueGraph`]. Every node
//! is addressed by a [`ValueId`], which doubles as the node's per-snapshot
//! identity key: two references to the same source instance resolve to the
//! same id, and a cycle is simply a back reference.

use crate::error::GraphError;
use crate::intern::{Interner, SerializedLiteral, SerializedNull};
use crate::literal::Literal;
use crate::types::TypeRef;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Per-snapshot identity key of an IR node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ValueId(u32);

impl ValueId {
    /// Position in the arena
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Variant tag of a [`SerializedValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValueKind {
    /// Primitive, boxed or string
    Literal,
    /// Typed null
    Null,
    /// Enum constant
    Enum,
    /// Array
    Array,
    /// Ordered collection
    List,
    /// Set
    Set,
    /// Keyed collection
    Map,
    /// Plain field map
    Object,
}

/// Enum constant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerializedEnum {
    /// Call-site type
    pub declared: TypeRef,
    /// Enum class
    pub runtime: TypeRef,
    /// Constant name
    pub name: String,
}

/// Array of element nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerializedArray {
    /// Call-site type
    pub declared: TypeRef,
    /// Concrete array type
    pub runtime: TypeRef,
    /// Elements in index order
    pub elements: Vec<ValueId>,
}

impl SerializedArray {
    /// Empty array shell
    #[must_use]
    pub fn new(declared: TypeRef, runtime: TypeRef) -> Self {
        Self {
            declared,
            runtime,
            elements: Vec::new(),
        }
    }

    /// Component type of the concrete array
    #[must_use]
    pub fn component_type(&self) -> TypeRef {
        self.runtime
            .component()
            .or_else(|| self.declared.component())
            .cloned()
            .unwrap_or_else(TypeRef::object)
    }
}

/// Ordered collection of element nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerializedList {
    /// Call-site type
    pub declared: TypeRef,
    /// Concrete collection class
    pub runtime: TypeRef,
    /// Elements in captured order
    pub elements: Vec<ValueId>,
}

impl SerializedList {
    /// Empty list shell
    #[must_use]
    pub fn new(declared: TypeRef, runtime: TypeRef) -> Self {
        Self {
            declared,
            runtime,
            elements: Vec::new(),
        }
    }

    /// Element type, from the runtime or the declared type arguments
    #[must_use]
    pub fn component_type(&self) -> TypeRef {
        element_type(&self.declared, &self.runtime, 0)
    }
}

/// Set of element nodes in captured order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerializedSet {
    /// Call-site type
    pub declared: TypeRef,
    /// Concrete collection class
    pub runtime: TypeRef,
    /// Elements in captured order
    pub elements: Vec<ValueId>,
}

impl SerializedSet {
    /// Empty set shell
    #[must_use]
    pub fn new(declared: TypeRef, runtime: TypeRef) -> Self {
        Self {
            declared,
            runtime,
            elements: Vec::new(),
        }
    }

    /// Element type, from the runtime or the declared type arguments
    #[must_use]
    pub fn component_type(&self) -> TypeRef {
        element_type(&self.declared, &self.runtime, 0)
    }
}

/// Keyed collection in captured (insertion) order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerializedMap {
    /// Call-site type
    pub declared: TypeRef,
    /// Concrete collection class
    pub runtime: TypeRef,
    /// Key/value pairs
    pub entries: Vec<(ValueId, ValueId)>,
}

impl SerializedMap {
    /// Empty map shell
    #[must_use]
    pub fn new(declared: TypeRef, runtime: TypeRef) -> Self {
        Self {
            declared,
            runtime,
            entries: Vec::new(),
        }
    }

    /// Key type
    #[must_use]
    pub fn key_type(&self) -> TypeRef {
        element_type(&self.declared, &self.runtime, 0)
    }

    /// Value type
    #[must_use]
    pub fn value_type(&self) -> TypeRef {
        element_type(&self.declared, &self.runtime, 1)
    }
}

/// One captured field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerializedField {
    /// Declaring class
    pub owner: String,
    /// Field name
    pub name: String,
    /// Declared field type
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Field value
    pub value: ValueId,
}

/// Plain object as a field map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerializedObject {
    /// Call-site type
    pub declared: TypeRef,
    /// Concrete class
    pub runtime: TypeRef,
    /// Fields in captured order
    pub fields: Vec<SerializedField>,
}

impl SerializedObject {
    /// Object shell without fields
    #[must_use]
    pub fn new(declared: TypeRef, runtime: TypeRef) -> Self {
        Self {
            declared,
            runtime,
            fields: Vec::new(),
        }
    }

    /// Field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&SerializedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

fn element_type(declared: &TypeRef, runtime: &TypeRef, index: usize) -> TypeRef {
    runtime
        .type_args()
        .get(index)
        .or_else(|| declared.type_args().get(index))
        .cloned()
        .unwrap_or_else(TypeRef::object)
}

/// Captured value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "variant", rename_all = "lowercase")]
pub enum SerializedValue {
    /// Interned literal
    Literal(Arc<SerializedLiteral>),
    /// Interned typed null
    Null(Arc<SerializedNull>),
    /// Enum constant
    Enum(SerializedEnum),
    /// Array
    Array(SerializedArray),
    /// Ordered collection
    List(SerializedList),
    /// Set
    Set(SerializedSet),
    /// Keyed collection
    Map(SerializedMap),
    /// Plain field map
    Object(SerializedObject),
}

impl SerializedValue {
    /// Variant tag
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Literal(_) => ValueKind::Literal,
            Self::Null(_) => ValueKind::Null,
            Self::Enum(_) => ValueKind::Enum,
            Self::Array(_) => ValueKind::Array,
            Self::List(_) => ValueKind::List,
            Self::Set(_) => ValueKind::Set,
            Self::Map(_) => ValueKind::Map,
            Self::Object(_) => ValueKind::Object,
        }
    }

    /// Static type at the capture site
    #[must_use]
    pub fn declared_type(&self) -> &TypeRef {
        match self {
            Self::Literal(v) => v.ty(),
            Self::Null(v) => v.ty(),
            Self::Enum(v) => &v.declared,
            Self::Array(v) => &v.declared,
            Self::List(v) => &v.declared,
            Self::Set(v) => &v.declared,
            Self::Map(v) => &v.declared,
            Self::Object(v) => &v.declared,
        }
    }

    /// Concrete type of the captured value
    #[must_use]
    pub fn runtime_type(&self) -> &TypeRef {
        match self {
            Self::Literal(v) => v.ty(),
            Self::Null(v) => v.ty(),
            Self::Enum(v) => &v.runtime,
            Self::Array(v) => &v.runtime,
            Self::List(v) => &v.runtime,
            Self::Set(v) => &v.runtime,
            Self::Map(v) => &v.runtime,
            Self::Object(v) => &v.runtime,
        }
    }

    /// Check for variants that carry identity and may be shared
    #[must_use]
    pub fn is_reference(&self) -> bool {
        !matches!(self, Self::Literal(_) | Self::Null(_) | Self::Enum(_))
    }

    /// Direct children in captured order; map entries are key then value
    #[must_use]
    pub fn children(&self) -> Vec<ValueId> {
        match self {
            Self::Literal(_) | Self::Null(_) | Self::Enum(_) => Vec::new(),
            Self::Array(v) => v.elements.clone(),
            Self::List(v) => v.elements.clone(),
            Self::Set(v) => v.elements.clone(),
            Self::Map(v) => v.entries.iter().flat_map(|(k, v)| [*k, *v]).collect(),
            Self::Object(v) => v.fields.iter().map(|f| f.value).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ScalarKey {
    Literal(TypeRef, Literal),
    Null(TypeRef),
}

/// Arena of captured values owned by one snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ValueGraph {
    nodes: Vec<SerializedValue>,
    #[serde(skip)]
    interner: Arc<Interner>,
    #[serde(skip)]
    scalars: HashMap<ScalarKey, ValueId>,
}

impl ValueGraph {
    /// Create an empty graph drawing literals from `interner`
    #[must_use]
    pub fn new(interner: Arc<Interner>) -> Self {
        Self {
            nodes: Vec::new(),
            interner,
            scalars: HashMap::new(),
        }
    }

    /// Create an empty graph with a private interner
    #[must_use]
    pub fn standalone() -> Self {
        Self::new(Arc::new(Interner::new()))
    }

    /// Interner backing the graph
    #[inline]
    #[must_use]
    pub fn interner(&self) -> &Arc<Interner> {
        &self.interner
    }

    /// Node for the literal `(ty, value)`, shared by every use in the graph
    pub fn literal(&mut self, ty: TypeRef, value: Literal) -> ValueId {
        let key = ScalarKey::Literal(ty.clone(), value.clone());
        if let Some(id) = self.scalars.get(&key) {
            return *id;
        }
        let literal = self.interner.literal(ty, value);
        let id = self.push(SerializedValue::Literal(literal));
        self.scalars.insert(key, id);
        id
    }

    /// Node for a null of type `ty`, shared by every use in the graph
    pub fn null(&mut self, ty: TypeRef) -> ValueId {
        let key = ScalarKey::Null(ty.clone());
        if let Some(id) = self.scalars.get(&key) {
            return *id;
        }
        let null = self.interner.null(ty);
        let id = self.push(SerializedValue::Null(null));
        self.scalars.insert(key, id);
        id
    }

    /// Add a node; literal and null nodes are deduplicated
    pub fn insert(&mut self, value: SerializedValue) -> ValueId {
        match value {
            SerializedValue::Literal(literal) => {
                self.literal(literal.ty().clone(), literal.value().clone())
            }
            SerializedValue::Null(null) => self.null(null.ty().clone()),
            other => self.push(other),
        }
    }

    fn push(&mut self, value: SerializedValue) -> ValueId {
        let id = ValueId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(value);
        id
    }

    /// Node by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: ValueId) -> Option<&SerializedValue> {
        self.nodes.get(id.index())
    }

    /// Node by id, failing for unknown ids
    ///
    /// # Errors
    /// Returns [`GraphError::MissingValue`] for an id from another graph.
    pub fn node(&self, id: ValueId) -> Result<&SerializedValue, GraphError> {
        self.get(id).ok_or(GraphError::MissingValue(id))
    }

    /// Mutable node by id
    #[inline]
    pub fn get_mut(&mut self, id: ValueId) -> Option<&mut SerializedValue> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check for an empty graph
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node with its id
    pub fn iter(&self) -> impl Iterator<Item = (ValueId, &SerializedValue)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, v)| (ValueId(u32::try_from(i).unwrap_or(u32::MAX)), v))
    }

    /// Direct children of a node
    #[must_use]
    pub fn children(&self, id: ValueId) -> Vec<ValueId> {
        self.get(id).map(SerializedValue::children).unwrap_or_default()
    }

    /// Nodes reachable from `root` in breadth-first order, each once
    #[must_use]
    pub fn reachable(&self, root: ValueId) -> Vec<ValueId> {
        let mut order = Vec::new();
        let mut seen = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for child in self.children(id) {
                if seen.insert(child) {
                    queue.push_back(child);
                }
            }
        }
        order
    }

    /// Incoming edge counts of every node reachable from `root`
    ///
    /// The root counts one incoming edge for the reference that names it.
    #[must_use]
    pub fn reference_counts(&self, root: ValueId) -> HashMap<ValueId, usize> {
        let mut counts = HashMap::from([(root, 1)]);
        for id in self.reachable(root) {
            for child in self.children(id) {
                *counts.entry(child).or_insert(0) += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_and_nulls_share_ids() {
        let mut graph = ValueGraph::standalone();
        let a = graph.literal(TypeRef::string(), Literal::from("x"));
        let interned = graph.interner().literal(TypeRef::string(), Literal::from("x"));
        let b = graph.insert(SerializedValue::Literal(interned));
        let n1 = graph.null(TypeRef::string());
        let n2 = graph.null(TypeRef::string());
        assert_eq!(a, b);
        assert_eq!(n1, n2);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn composites_get_fresh_ids() {
        let mut graph = ValueGraph::standalone();
        let list = TypeRef::generic("ArrayList", vec![TypeRef::string()]);
        let a = graph.insert(SerializedValue::List(SerializedList::new(list.clone(), list.clone())));
        let b = graph.insert(SerializedValue::List(SerializedList::new(list.clone(), list)));
        assert_ne!(a, b);
    }

    #[test]
    fn reachable_and_counts_survive_cycles() {
        let mut graph = ValueGraph::standalone();
        let node = TypeRef::class("Node");
        let root = graph.insert(SerializedValue::Object(SerializedObject::new(node.clone(), node.clone())));
        let value = graph.literal(TypeRef::primitive(crate::Primitive::Int), Literal::Int(1));
        if let Some(SerializedValue::Object(obj)) = graph.get_mut(root) {
            obj.fields.push(SerializedField {
                owner: "Node".into(),
                name: "value".into(),
                ty: TypeRef::primitive(crate::Primitive::Int),
                value,
            });
            obj.fields.push(SerializedField {
                owner: "Node".into(),
                name: "next".into(),
                ty: node,
                value: root,
            });
        }

        assert_eq!(graph.reachable(root), vec![root, value]);
        let counts = graph.reference_counts(root);
        assert_eq!(counts[&root], 2);
        assert_eq!(counts[&value], 1);
    }

    #[test]
    fn component_types_prefer_runtime_arguments() {
        let list = SerializedList::new(
            TypeRef::generic("List", vec![TypeRef::object()]),
            TypeRef::generic("ArrayList", vec![TypeRef::string()]),
        );
        assert_eq!(list.component_type(), TypeRef::string());

        let map = SerializedMap::new(
            TypeRef::generic("Map", vec![TypeRef::string(), TypeRef::class("Integer")]),
            TypeRef::class("HashMap"),
        );
        assert_eq!(map.value_type(), TypeRef::class("Integer"));
    }
}
