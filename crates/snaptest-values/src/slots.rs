//! Field descriptors
//!
//! One ordered view over the parts of a composite value, whatever its shape:
//! declared fields of a plain object, positions of an array or ordered
//! collection, elements of a set, keys and values of a keyed collection.
//! Serializers, the equality engine and the reflective code generators all
//! walk composites through [`Slots`].

use crate::graph::{
    SerializedArray, SerializedEnum, SerializedList, SerializedMap, SerializedObject,
    SerializedSet, ValueGraph, ValueId,
};
use crate::intern::{SerializedLiteral, SerializedNull};
use crate::live::{LiveValue, ObjRef, ObjectBody};
use crate::types::TypeRegistry;
use crate::visit::ValueVisitor;
use crate::types::TypeRef;
use std::fmt;

/// Structural shape of a composite value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Named fields
    Object,
    /// Fixed-length indexed elements
    Array,
    /// Ordered elements
    List,
    /// Unique elements
    Set,
    /// Key/value entries
    Map,
}

/// Address of one part of a composite value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Declared or observed field
    Field {
        /// Declaring class
        owner: String,
        /// Field name
        name: String,
        /// Declared field type
        ty: TypeRef,
    },
    /// Element at a position
    Element(usize),
    /// Key of the n-th entry
    Key(usize),
    /// Value of the n-th entry
    Value(usize),
}

impl Slot {
    /// Field name, if the slot is a field
    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Self::Field { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field { name, .. } => f.write_str(name),
            Self::Element(i) => write!(f, "[{i}]"),
            Self::Key(i) => write!(f, "key[{i}]"),
            Self::Value(i) => write!(f, "value[{i}]"),
        }
    }
}

/// Ordered parts of one composite value
#[derive(Debug, Clone)]
pub struct Slots<N> {
    /// Shape of the composite
    pub shape: Shape,
    /// Parts in captured order; map entries interleave key and value
    pub entries: Vec<(Slot, N)>,
}

impl<N> Slots<N> {
    fn new(shape: Shape) -> Self {
        Self {
            shape,
            entries: Vec::new(),
        }
    }

    /// Number of elements, entries or fields
    #[must_use]
    pub fn len(&self) -> usize {
        match self.shape {
            Shape::Map => self.entries.len() / 2,
            _ => self.entries.len(),
        }
    }

    /// Check for a composite without parts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parts of a live object
///
/// Plain objects list the instance fields declared across the runtime
/// class's ancestry (missing ones read as the type's default), followed by
/// any undeclared fields present in the body. Returns `None` if the object is
/// locked for writing.
#[must_use]
pub fn live_slots(obj: &ObjRef, types: &TypeRegistry) -> Option<Slots<LiveValue>> {
    let body = obj.try_read()?.clone();
    let slots = match body {
        ObjectBody::Fields(mut fields) => {
            let class = obj.class().raw_name().unwrap_or_default().to_string();
            let mut slots = Slots::new(Shape::Object);
            for (owner, field) in types.all_fields(&class) {
                let value = fields
                    .shift_remove(&field.name)
                    .unwrap_or_else(|| LiveValue::default_for(&field.ty));
                slots.entries.push((
                    Slot::Field {
                        owner: owner.to_string(),
                        name: field.name.clone(),
                        ty: field.ty.clone(),
                    },
                    value,
                ));
            }
            for (name, value) in fields {
                slots.entries.push((
                    Slot::Field {
                        owner: class.clone(),
                        name,
                        ty: TypeRef::object(),
                    },
                    value,
                ));
            }
            slots
        }
        ObjectBody::Array(items) => indexed(Shape::Array, items),
        ObjectBody::List(items) => indexed(Shape::List, items),
        ObjectBody::Set(items) => indexed(Shape::Set, items),
        ObjectBody::Map(entries) => {
            let mut slots = Slots::new(Shape::Map);
            for (i, (key, value)) in entries.into_iter().enumerate() {
                slots.entries.push((Slot::Key(i), key));
                slots.entries.push((Slot::Value(i), value));
            }
            slots
        }
    };
    Some(slots)
}

fn indexed<N>(shape: Shape, items: Vec<N>) -> Slots<N> {
    Slots {
        shape,
        entries: items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (Slot::Element(i), item))
            .collect(),
    }
}

/// Parts of an IR node; `None` for literals, nulls and enum constants
#[must_use]
pub fn graph_slots(graph: &ValueGraph, id: ValueId) -> Option<Slots<ValueId>> {
    graph.accept(id, &mut SlotCollector).ok().flatten()
}

struct SlotCollector;

impl ValueVisitor for SlotCollector {
    type Output = Option<Slots<ValueId>>;

    fn visit_literal(&mut self, _id: ValueId, _value: &SerializedLiteral) -> Self::Output {
        None
    }

    fn visit_null(&mut self, _id: ValueId, _value: &SerializedNull) -> Self::Output {
        None
    }

    fn visit_enum(&mut self, _id: ValueId, _value: &SerializedEnum) -> Self::Output {
        None
    }

    fn visit_array(&mut self, _id: ValueId, value: &SerializedArray) -> Self::Output {
        Some(indexed(Shape::Array, value.elements.clone()))
    }

    fn visit_list(&mut self, _id: ValueId, value: &SerializedList) -> Self::Output {
        Some(indexed(Shape::List, value.elements.clone()))
    }

    fn visit_set(&mut self, _id: ValueId, value: &SerializedSet) -> Self::Output {
        Some(indexed(Shape::Set, value.elements.clone()))
    }

    fn visit_map(&mut self, _id: ValueId, value: &SerializedMap) -> Self::Output {
        let mut slots = Slots::new(Shape::Map);
        for (i, (key, val)) in value.entries.iter().enumerate() {
            slots.entries.push((Slot::Key(i), *key));
            slots.entries.push((Slot::Value(i), *val));
        }
        Some(slots)
    }

    fn visit_object(&mut self, _id: ValueId, value: &SerializedObject) -> Self::Output {
        let mut slots = Slots::new(Shape::Object);
        for field in &value.fields {
            slots.entries.push((
                Slot::Field {
                    owner: field.owner.clone(),
                    name: field.name.clone(),
                    ty: field.ty.clone(),
                },
                field.value,
            ));
        }
        Some(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClassDef;
    use crate::Primitive;

    #[test]
    fn live_object_slots_follow_ancestry_then_extras() {
        let mut types = TypeRegistry::with_builtins();
        types.register(ClassDef::class("Base").with_field("id", TypeRef::primitive(Primitive::Int)));
        types.register(ClassDef::class("Bean").extends("Base").with_field("name", TypeRef::string()));

        let bean = ObjRef::with_fields(
            TypeRef::class("Bean"),
            [("extra", LiveValue::Bool(true)), ("name", LiveValue::str("n"))],
        );
        let slots = live_slots(&bean, &types).unwrap();
        let names: Vec<_> = slots
            .entries
            .iter()
            .map(|(slot, value)| (slot.to_string(), value.to_string()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("id".to_string(), "0".to_string()),
                ("name".to_string(), "\"n\"".to_string()),
                ("extra".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn live_map_slots_interleave() {
        let types = TypeRegistry::with_builtins();
        let map = ObjRef::map(
            TypeRef::class("LinkedHashMap"),
            vec![("a".into(), 1.into()), ("b".into(), 2.into())],
        );
        let slots = live_slots(&map, &types).unwrap();
        assert_eq!(slots.shape, Shape::Map);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots.entries[1].0, Slot::Value(0));
    }

    #[test]
    fn locked_object_has_no_slots() {
        let types = TypeRegistry::with_builtins();
        let obj = ObjRef::object(TypeRef::class("Bean"));
        let _guard = obj.write();
        assert!(live_slots(&obj, &types).is_none());
    }

    #[test]
    fn literal_nodes_have_no_slots() {
        let mut graph = ValueGraph::standalone();
        let id = graph.literal(TypeRef::string(), crate::Literal::from("x"));
        assert!(graph_slots(&graph, id).is_none());
    }
}
