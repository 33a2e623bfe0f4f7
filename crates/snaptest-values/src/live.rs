//! Live object model
//!
//! The values an instrumented call hands to the capture pipeline. Objects are
//! shared handles ([`ObjRef`]) whose identity is the handle's allocation, so
//! graphs may share instances and form cycles. Each object body sits behind a
//! read/write lock: the instrumented code mutates it, capture workers read it.

use crate::literal::Literal;
use crate::slots::Shape;
use crate::types::TypeRef;
use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a live object, stable while the object is alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Named enum constant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumConstant {
    /// Enum class name
    pub ty: String,
    /// Constant name
    pub name: String,
}

/// Value observed at an instrumented call
#[derive(Debug, Clone)]
pub enum LiveValue {
    /// Absent reference
    Null,
    /// Boolean
    Bool(bool),
    /// Character
    Char(char),
    /// 8-bit integer
    Byte(i8),
    /// 16-bit integer
    Short(i16),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Text
    Str(Arc<str>),
    /// Enum constant
    Enum(EnumConstant),
    /// Shared object
    Object(ObjRef),
}

impl LiveValue {
    /// String value
    #[inline]
    #[must_use]
    pub fn str(value: impl AsRef<str>) -> Self {
        Self::Str(Arc::from(value.as_ref()))
    }

    /// Enum constant value
    #[inline]
    #[must_use]
    pub fn enum_constant(ty: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Enum(EnumConstant {
            ty: ty.into(),
            name: name.into(),
        })
    }

    /// Default value of a declared type: zero for primitives, null otherwise
    #[must_use]
    pub fn default_for(ty: &TypeRef) -> Self {
        match ty {
            TypeRef::Primitive(kind) => Self::from_literal(&Literal::zero(*kind)),
            _ => Self::Null,
        }
    }

    /// Live value of a literal
    #[must_use]
    pub fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Bool(v) => Self::Bool(*v),
            Literal::Char(v) => Self::Char(*v),
            Literal::Byte(v) => Self::Byte(*v),
            Literal::Short(v) => Self::Short(*v),
            Literal::Int(v) => Self::Int(*v),
            Literal::Long(v) => Self::Long(*v),
            Literal::Float(v) => Self::Float(*v),
            Literal::Double(v) => Self::Double(*v),
            Literal::Str(v) => Self::str(v),
        }
    }

    /// Literal of a scalar or string value
    #[must_use]
    pub fn as_literal(&self) -> Option<Literal> {
        Some(match self {
            Self::Bool(v) => Literal::Bool(*v),
            Self::Char(v) => Literal::Char(*v),
            Self::Byte(v) => Literal::Byte(*v),
            Self::Short(v) => Literal::Short(*v),
            Self::Int(v) => Literal::Int(*v),
            Self::Long(v) => Literal::Long(*v),
            Self::Float(v) => Literal::Float(*v),
            Self::Double(v) => Literal::Double(*v),
            Self::Str(v) => Literal::Str(v.to_string()),
            Self::Null | Self::Enum(_) | Self::Object(_) => return None,
        })
    }

    /// Check for [`LiveValue::Null`]
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Object handle, if any
    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjRef> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Concrete type of the value, `None` for null
    #[must_use]
    pub fn runtime_type(&self) -> Option<TypeRef> {
        match self {
            Self::Null => None,
            Self::Enum(constant) => Some(TypeRef::class(constant.ty.clone())),
            Self::Object(obj) => Some(obj.class().clone()),
            scalar => scalar.as_literal().map(|literal| literal.natural_type()),
        }
    }

    /// Identity for objects, value equality for everything else
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Null, Self::Null) => true,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            _ => match (self.as_literal(), other.as_literal()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for LiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Enum(constant) => write!(f, "{}::{}", constant.ty, constant.name),
            Self::Object(obj) => write!(f, "{}@{}", obj.class(), obj.id()),
            scalar => match scalar.as_literal() {
                Some(literal) => write!(f, "{literal}"),
                None => f.write_str("?"),
            },
        }
    }
}

impl From<bool> for LiveValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<char> for LiveValue {
    fn from(value: char) -> Self {
        Self::Char(value)
    }
}

impl From<i32> for LiveValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for LiveValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for LiveValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for LiveValue {
    fn from(value: &str) -> Self {
        Self::str(value)
    }
}

impl From<String> for LiveValue {
    fn from(value: String) -> Self {
        Self::str(value)
    }
}

impl From<ObjRef> for LiveValue {
    fn from(value: ObjRef) -> Self {
        Self::Object(value)
    }
}

/// Contents of a live object
#[derive(Debug, Clone)]
pub enum ObjectBody {
    /// Named fields
    Fields(IndexMap<String, LiveValue>),
    /// Fixed-length array
    Array(Vec<LiveValue>),
    /// Ordered collection
    List(Vec<LiveValue>),
    /// Unique elements in insertion order
    Set(Vec<LiveValue>),
    /// Keyed entries in insertion order
    Map(Vec<(LiveValue, LiveValue)>),
}

impl ObjectBody {
    /// Structural shape of the body
    #[must_use]
    pub fn shape(&self) -> Shape {
        match self {
            Self::Fields(_) => Shape::Object,
            Self::Array(_) => Shape::Array,
            Self::List(_) => Shape::List,
            Self::Set(_) => Shape::Set,
            Self::Map(_) => Shape::Map,
        }
    }

    /// Number of elements, entries or fields
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Fields(fields) => fields.len(),
            Self::Array(items) | Self::List(items) | Self::Set(items) => items.len(),
            Self::Map(entries) => entries.len(),
        }
    }

    /// Check for an empty body
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct LiveObject {
    class: TypeRef,
    body: RwLock<ObjectBody>,
}

/// Shared handle to a live object
#[derive(Clone)]
pub struct ObjRef(Arc<LiveObject>);

impl ObjRef {
    /// Create an object with the given body
    #[must_use]
    pub fn new(class: TypeRef, body: ObjectBody) -> Self {
        Self(Arc::new(LiveObject {
            class,
            body: RwLock::new(body),
        }))
    }

    /// Object with no fields set
    #[must_use]
    pub fn object(class: TypeRef) -> Self {
        Self::new(class, ObjectBody::Fields(IndexMap::new()))
    }

    /// Object with the given fields
    #[must_use]
    pub fn with_fields<I, S>(class: TypeRef, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, LiveValue)>,
        S: Into<String>,
    {
        let fields = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::new(class, ObjectBody::Fields(fields))
    }

    /// Ordered collection
    #[must_use]
    pub fn list(class: TypeRef, items: Vec<LiveValue>) -> Self {
        Self::new(class, ObjectBody::List(items))
    }

    /// Set, dropping repeated elements
    #[must_use]
    pub fn set(class: TypeRef, items: Vec<LiveValue>) -> Self {
        let obj = Self::new(class, ObjectBody::Set(Vec::new()));
        for item in items {
            obj.push(item);
        }
        obj
    }

    /// Keyed collection, later keys replacing earlier ones
    #[must_use]
    pub fn map(class: TypeRef, entries: Vec<(LiveValue, LiveValue)>) -> Self {
        let obj = Self::new(class, ObjectBody::Map(Vec::new()));
        for (key, value) in entries {
            obj.put(key, value);
        }
        obj
    }

    /// Array of `component`
    #[must_use]
    pub fn array(component: TypeRef, items: Vec<LiveValue>) -> Self {
        Self::new(TypeRef::array(component), ObjectBody::Array(items))
    }

    /// Identity of the object
    #[inline]
    #[must_use]
    pub fn id(&self) -> ObjectId {
        ObjectId(Arc::as_ptr(&self.0).cast::<()>() as usize)
    }

    /// Runtime class
    #[inline]
    #[must_use]
    pub fn class(&self) -> &TypeRef {
        &self.0.class
    }

    /// Check if both handles refer to the same object
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Lock the body for reading
    pub fn read(&self) -> RwLockReadGuard<'_, ObjectBody> {
        self.0.body.read()
    }

    /// Lock the body for reading without blocking
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, ObjectBody>> {
        self.0.body.try_read()
    }

    /// Lock the body for writing
    pub fn write(&self) -> RwLockWriteGuard<'_, ObjectBody> {
        self.0.body.write()
    }

    /// Copy of the body taken under the read lock
    #[must_use]
    pub fn body(&self) -> ObjectBody {
        self.read().clone()
    }

    /// Structural shape of the body
    #[must_use]
    pub fn shape(&self) -> Shape {
        self.read().shape()
    }

    /// Value of a named field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<LiveValue> {
        match &*self.read() {
            ObjectBody::Fields(fields) => fields.get(name).cloned(),
            _ => None,
        }
    }

    /// Assign a named field; returns `false` if the body has no fields
    pub fn set_field(&self, name: impl Into<String>, value: LiveValue) -> bool {
        match &mut *self.write() {
            ObjectBody::Fields(fields) => {
                fields.insert(name.into(), value);
                true
            }
            _ => false,
        }
    }

    /// Append to a list or array, or insert into a set
    ///
    /// Returns `false` if the body is not a collection or the set already
    /// holds the element.
    pub fn push(&self, value: LiveValue) -> bool {
        match &mut *self.write() {
            ObjectBody::List(items) | ObjectBody::Array(items) => {
                items.push(value);
                true
            }
            ObjectBody::Set(items) => {
                if items.iter().any(|item| item.same(&value)) {
                    false
                } else {
                    items.push(value);
                    true
                }
            }
            ObjectBody::Fields(_) | ObjectBody::Map(_) => false,
        }
    }

    /// Replace an array element; returns `false` when out of bounds
    pub fn set_element(&self, index: usize, value: LiveValue) -> bool {
        match &mut *self.write() {
            ObjectBody::Array(items) | ObjectBody::List(items) => match items.get_mut(index) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Insert or replace a map entry, returning the previous value
    pub fn put(&self, key: LiveValue, value: LiveValue) -> Option<LiveValue> {
        match &mut *self.write() {
            ObjectBody::Map(entries) => {
                if let Some(entry) = entries.iter_mut().find(|(k, _)| k.same(&key)) {
                    Some(std::mem::replace(&mut entry.1, value))
                } else {
                    entries.push((key, value));
                    None
                }
            }
            _ => None,
        }
    }

    /// Number of elements, entries or fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check for an empty body
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PartialEq for ObjRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjRef {}

impl Hash for ObjRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjRef({}@{})", self.class(), self.id())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;

    #[test]
    fn identity_is_per_handle() {
        let a = ObjRef::object(TypeRef::class("Bean"));
        let b = ObjRef::object(TypeRef::class("Bean"));
        assert_eq!(a.id(), a.clone().id());
        assert_ne!(a.id(), b.id());
        assert!(LiveValue::from(a.clone()).same(&LiveValue::from(a)));
        assert!(!LiveValue::from(b.clone()).same(&LiveValue::Object(ObjRef::object(TypeRef::class("Bean")))));
    }

    #[test]
    fn set_drops_duplicates_and_map_replaces() {
        let set = ObjRef::set(
            TypeRef::class("LinkedHashSet"),
            vec!["a".into(), "b".into(), "a".into()],
        );
        assert_eq!(set.len(), 2);

        let map = ObjRef::map(
            TypeRef::class("LinkedHashMap"),
            vec![("k".into(), 1.into()), ("k".into(), 2.into())],
        );
        assert_eq!(map.len(), 1);
        assert!(matches!(&*map.read(), ObjectBody::Map(entries) if matches!(entries[0].1, LiveValue::Int(2))));
    }

    #[test]
    fn fields_and_cycles() {
        let node = ObjRef::object(TypeRef::class("Node"));
        node.set_field("next", LiveValue::Object(node.clone()));
        let next = node.field("next").and_then(|v| v.as_object().cloned());
        assert_eq!(next, Some(node.clone()));
        assert!(format!("{node:?}").starts_with("ObjRef(Node@"));
    }

    #[test]
    fn try_read_fails_while_written() {
        let obj = ObjRef::object(TypeRef::class("Bean"));
        let guard = obj.write();
        assert!(obj.try_read().is_none());
        drop(guard);
        assert!(obj.try_read().is_some());
    }

    #[test]
    fn runtime_types() {
        assert_eq!(LiveValue::Int(1).runtime_type(), Some(TypeRef::class("Integer")));
        assert_eq!(LiveValue::Null.runtime_type(), None);
        assert_eq!(LiveValue::default_for(&TypeRef::primitive(Primitive::Long)).to_string(), "0");
    }
}
