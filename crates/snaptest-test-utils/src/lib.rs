//! Testing utilities for snaptest workspace
//!
//! Shared test fixtures: a class table with demo types, builders for live
//! values, and snapshot sinks that record or reject what they receive.

#![allow(missing_docs)]

use parking_lot::Mutex;
use snaptest_values::{
    well_known, ClassDef, LiveValue, ObjRef, Primitive, SinkError, Snapshot, SnapshotSink,
    TypeRef, TypeRegistry,
};
use std::sync::Arc;

pub const BEAN: &str = "demo::Bean";
pub const SUB_BEAN: &str = "demo::SubBean";
pub const NODE: &str = "demo::Node";
pub const COLOR: &str = "demo::Color";
pub const COUNTER: &str = "demo::Counter";
pub const HOLDER: &str = "demo::Holder";

pub fn int() -> TypeRef {
    TypeRef::primitive(Primitive::Int)
}

pub fn list_of(element: TypeRef) -> TypeRef {
    TypeRef::generic(well_known::LIST, vec![element])
}

pub fn array_list_of(element: TypeRef) -> TypeRef {
    TypeRef::generic(well_known::ARRAY_LIST, vec![element])
}

pub fn set_of(element: TypeRef) -> TypeRef {
    TypeRef::generic(well_known::SET, vec![element])
}

pub fn map_of(key: TypeRef, value: TypeRef) -> TypeRef {
    TypeRef::generic(well_known::MAP, vec![key, value])
}

/// Built-in classes plus the demo types used across the test suites
pub fn fixture_types() -> TypeRegistry {
    let mut types = TypeRegistry::with_builtins();
    types.register(
        ClassDef::class(BEAN)
            .with_field("i", int())
            .with_field("o", TypeRef::object()),
    );
    types.register(
        ClassDef::class(SUB_BEAN)
            .extends(BEAN)
            .with_field("name", TypeRef::string()),
    );
    types.register(
        ClassDef::class(NODE)
            .with_field("value", int())
            .with_field("next", TypeRef::class(NODE)),
    );
    types.register(ClassDef::enumeration(COLOR, ["RED", "GREEN", "BLUE"]));
    types.register(
        ClassDef::class(COUNTER)
            .with_static_field("COUNT", int())
            .with_field("total", TypeRef::primitive(Primitive::Long)),
    );
    types.register(
        ClassDef::class(HOLDER)
            .with_field("items", list_of(TypeRef::string()))
            .with_field("tags", set_of(TypeRef::string()))
            .with_field("lookup", map_of(TypeRef::string(), TypeRef::class("Integer")))
            .with_field("color", TypeRef::class(COLOR)),
    );
    types
}

pub fn shared_types() -> Arc<TypeRegistry> {
    Arc::new(fixture_types())
}

pub fn bean(i: i32, o: LiveValue) -> ObjRef {
    ObjRef::with_fields(
        TypeRef::class(BEAN),
        [("i", LiveValue::Int(i)), ("o", o)],
    )
}

pub fn sub_bean(i: i32, name: &str) -> ObjRef {
    ObjRef::with_fields(
        TypeRef::class(SUB_BEAN),
        [
            ("i", LiveValue::Int(i)),
            ("o", LiveValue::Null),
            ("name", LiveValue::str(name)),
        ],
    )
}

pub fn node(value: i32) -> ObjRef {
    ObjRef::with_fields(
        TypeRef::class(NODE),
        [("value", LiveValue::Int(value)), ("next", LiveValue::Null)],
    )
}

/// Nodes linked in order, the last one pointing back to the first
pub fn ring(values: &[i32]) -> ObjRef {
    let nodes: Vec<ObjRef> = values.iter().map(|v| node(*v)).collect();
    for (i, current) in nodes.iter().enumerate() {
        let next = &nodes[(i + 1) % nodes.len()];
        current.set_field("next", LiveValue::Object(next.clone()));
    }
    nodes[0].clone()
}

/// Nodes linked in order, the last one pointing to itself
pub fn chain_ending_in_self_loop(values: &[i32]) -> ObjRef {
    let nodes: Vec<ObjRef> = values.iter().map(|v| node(*v)).collect();
    for pair in nodes.windows(2) {
        pair[0].set_field("next", LiveValue::Object(pair[1].clone()));
    }
    let last = &nodes[nodes.len() - 1];
    last.set_field("next", LiveValue::Object(last.clone()));
    nodes[0].clone()
}

pub fn string_list(items: &[&str]) -> ObjRef {
    ObjRef::list(
        array_list_of(TypeRef::string()),
        items.iter().map(|s| LiveValue::str(s)).collect(),
    )
}

pub fn string_set(items: &[&str]) -> ObjRef {
    ObjRef::set(
        TypeRef::generic(well_known::LINKED_HASH_SET, vec![TypeRef::string()]),
        items.iter().map(|s| LiveValue::str(s)).collect(),
    )
}

pub fn string_int_map(entries: &[(&str, i32)]) -> ObjRef {
    ObjRef::map(
        TypeRef::generic(
            well_known::LINKED_HASH_MAP,
            vec![TypeRef::string(), TypeRef::class("Integer")],
        ),
        entries
            .iter()
            .map(|(k, v)| (LiveValue::str(k), LiveValue::Int(*v)))
            .collect(),
    )
}

pub fn int_array(items: &[i32]) -> ObjRef {
    ObjRef::array(int(), items.iter().map(|v| LiveValue::Int(*v)).collect())
}

pub fn color(name: &str) -> LiveValue {
    LiveValue::enum_constant(COLOR, name)
}

/// Holder populated with one of every collection kind
pub fn holder() -> ObjRef {
    ObjRef::with_fields(
        TypeRef::class(HOLDER),
        [
            ("items", LiveValue::Object(string_list(&["a", "b"]))),
            ("tags", LiveValue::Object(string_set(&["x"]))),
            ("lookup", LiveValue::Object(string_int_map(&[("one", 1), ("two", 2)]))),
            ("color", color("GREEN")),
        ],
    )
}

/// Sink keeping every snapshot it receives
#[derive(Debug, Default)]
pub struct RecordingSink {
    snapshots: Mutex<Vec<Snapshot>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn take(&self) -> Vec<Snapshot> {
        std::mem::take(&mut *self.snapshots.lock())
    }
}

impl SnapshotSink for RecordingSink {
    fn accept(&self, snapshot: Snapshot) -> Result<(), SinkError> {
        self.snapshots.lock().push(snapshot);
        Ok(())
    }
}

/// Sink rejecting every snapshot
#[derive(Debug, Default)]
pub struct FailingSink;

impl SnapshotSink for FailingSink {
    fn accept(&self, _snapshot: Snapshot) -> Result<(), SinkError> {
        Err(SinkError::new("sink rejected snapshot"))
    }
}

/// Hand-built IR nodes for backend tests
pub mod ir {
    use snaptest_values::{
        Literal, SerializedArray, SerializedEnum, SerializedField, SerializedList, SerializedMap,
        SerializedObject, SerializedSet, SerializedValue, TypeRef, ValueGraph, ValueId,
    };

    pub fn int(graph: &mut ValueGraph, value: i32) -> ValueId {
        graph.literal(super::int(), Literal::Int(value))
    }

    pub fn string(graph: &mut ValueGraph, value: &str) -> ValueId {
        graph.literal(TypeRef::string(), Literal::from(value))
    }

    pub fn list(graph: &mut ValueGraph, ty: TypeRef, elements: Vec<ValueId>) -> ValueId {
        let mut list = SerializedList::new(ty.clone(), ty);
        list.elements = elements;
        graph.insert(SerializedValue::List(list))
    }

    pub fn set(graph: &mut ValueGraph, ty: TypeRef, elements: Vec<ValueId>) -> ValueId {
        let mut set = SerializedSet::new(ty.clone(), ty);
        set.elements = elements;
        graph.insert(SerializedValue::Set(set))
    }

    pub fn map(graph: &mut ValueGraph, ty: TypeRef, entries: Vec<(ValueId, ValueId)>) -> ValueId {
        let mut map = SerializedMap::new(ty.clone(), ty);
        map.entries = entries;
        graph.insert(SerializedValue::Map(map))
    }

    pub fn array(graph: &mut ValueGraph, component: TypeRef, elements: Vec<ValueId>) -> ValueId {
        let ty = TypeRef::array(component);
        let mut array = SerializedArray::new(ty.clone(), ty);
        array.elements = elements;
        graph.insert(SerializedValue::Array(array))
    }

    pub fn enumeration(graph: &mut ValueGraph, class: &str, name: &str) -> ValueId {
        let ty = TypeRef::class(class);
        graph.insert(SerializedValue::Enum(SerializedEnum {
            declared: ty.clone(),
            runtime: ty,
            name: name.to_string(),
        }))
    }

    /// Object of class `ty` without fields; add them with [`field`]
    pub fn object(graph: &mut ValueGraph, ty: TypeRef) -> ValueId {
        graph.insert(SerializedValue::Object(SerializedObject::new(ty.clone(), ty)))
    }

    /// Append field `name` to object `id`; `value` may be `id` itself
    pub fn field(graph: &mut ValueGraph, id: ValueId, name: &str, ty: TypeRef, value: ValueId) {
        if let Some(SerializedValue::Object(object)) = graph.get_mut(id) {
            let owner = object.runtime.raw_name().unwrap_or_default().to_string();
            object.fields.push(SerializedField {
                owner,
                name: name.to_string(),
                ty,
                value,
            });
        }
    }
}
