//! Built-in serializers for arrays and collections

use super::{Serializer, SerializerFacade};
use crate::error::CaptureError;
use snaptest_values::{
    ObjRef, ObjectBody, Overridable, SerializedArray, SerializedList, SerializedMap, SerializedSet,
    SerializedValue, Shape, TypeRef, TypeRegistry, ValueId,
};

fn unexpected(obj: &ObjRef, expected: &str) -> CaptureError {
    CaptureError::population_failure(format!("{} is not {expected}", obj.class()))
}

/// Arrays, elements typed by the component type
#[derive(Debug, Clone, Copy, Default)]
pub struct ArraySerializer;

impl Overridable for ArraySerializer {
    fn name(&self) -> &str {
        "array"
    }
}

impl Serializer for ArraySerializer {
    fn accepts(&self, obj: &ObjRef, _types: &TypeRegistry) -> bool {
        obj.shape() == Shape::Array
    }

    fn serialize(
        &self,
        obj: &ObjRef,
        declared: &TypeRef,
        facade: &mut SerializerFacade<'_>,
    ) -> Result<ValueId, CaptureError> {
        let ObjectBody::Array(items) = obj.body() else {
            return Err(unexpected(obj, "an array"));
        };
        let runtime = obj.class().clone();
        let component = runtime.component().cloned().unwrap_or_else(TypeRef::object);
        let id = facade.reserve(
            obj,
            SerializedValue::Array(SerializedArray::new(declared.clone(), runtime)),
        );
        let elements = items
            .iter()
            .map(|item| facade.value(item, &component))
            .collect::<Result<Vec<_>, _>>()?;
        facade.update(id, |node| {
            if let SerializedValue::Array(array) = node {
                array.elements = elements;
            }
        })?;
        Ok(id)
    }
}

/// Ordered collections, elements in iteration order
#[derive(Debug, Clone, Copy, Default)]
pub struct ListSerializer;

impl Overridable for ListSerializer {
    fn name(&self) -> &str {
        "list"
    }
}

impl Serializer for ListSerializer {
    fn accepts(&self, obj: &ObjRef, _types: &TypeRegistry) -> bool {
        obj.shape() == Shape::List
    }

    fn serialize(
        &self,
        obj: &ObjRef,
        declared: &TypeRef,
        facade: &mut SerializerFacade<'_>,
    ) -> Result<ValueId, CaptureError> {
        let ObjectBody::List(items) = obj.body() else {
            return Err(unexpected(obj, "a list"));
        };
        let runtime = obj.class().clone();
        let element = runtime.type_arg(0);
        let id = facade.reserve(
            obj,
            SerializedValue::List(SerializedList::new(declared.clone(), runtime)),
        );
        let elements = items
            .iter()
            .map(|item| facade.value(item, &element))
            .collect::<Result<Vec<_>, _>>()?;
        facade.update(id, |node| {
            if let SerializedValue::List(list) = node {
                list.elements = elements;
            }
        })?;
        Ok(id)
    }
}

/// Sets, elements in capture order
#[derive(Debug, Clone, Copy, Default)]
pub struct SetSerializer;

impl Overridable for SetSerializer {
    fn name(&self) -> &str {
        "set"
    }
}

impl Serializer for SetSerializer {
    fn accepts(&self, obj: &ObjRef, _types: &TypeRegistry) -> bool {
        obj.shape() == Shape::Set
    }

    fn serialize(
        &self,
        obj: &ObjRef,
        declared: &TypeRef,
        facade: &mut SerializerFacade<'_>,
    ) -> Result<ValueId, CaptureError> {
        let ObjectBody::Set(items) = obj.body() else {
            return Err(unexpected(obj, "a set"));
        };
        let runtime = obj.class().clone();
        let element = runtime.type_arg(0);
        let id = facade.reserve(
            obj,
            SerializedValue::Set(SerializedSet::new(declared.clone(), runtime)),
        );
        let elements = items
            .iter()
            .map(|item| facade.value(item, &element))
            .collect::<Result<Vec<_>, _>>()?;
        facade.update(id, |node| {
            if let SerializedValue::Set(set) = node {
                set.elements = elements;
            }
        })?;
        Ok(id)
    }
}

/// Keyed collections, entries in capture order
#[derive(Debug, Clone, Copy, Default)]
pub struct MapSerializer;

impl Overridable for MapSerializer {
    fn name(&self) -> &str {
        "map"
    }
}

impl Serializer for MapSerializer {
    fn accepts(&self, obj: &ObjRef, _types: &TypeRegistry) -> bool {
        obj.shape() == Shape::Map
    }

    fn serialize(
        &self,
        obj: &ObjRef,
        declared: &TypeRef,
        facade: &mut SerializerFacade<'_>,
    ) -> Result<ValueId, CaptureError> {
        let ObjectBody::Map(pairs) = obj.body() else {
            return Err(unexpected(obj, "a map"));
        };
        let runtime = obj.class().clone();
        let (key_type, value_type) = (runtime.type_arg(0), runtime.type_arg(1));
        let id = facade.reserve(
            obj,
            SerializedValue::Map(SerializedMap::new(declared.clone(), runtime)),
        );
        let mut entries = Vec::with_capacity(pairs.len());
        for (key, value) in &pairs {
            entries.push((facade.value(key, &key_type)?, facade.value(value, &value_type)?));
        }
        facade.update(id, |node| {
            if let SerializedValue::Map(map) = node {
                map.entries = entries;
            }
        })?;
        Ok(id)
    }
}
