//! Reflective fallback: any object as its field map

use super::{Serializer, SerializerFacade};
use crate::error::CaptureError;
use snaptest_values::{
    live_slots, ObjRef, Overridable, SerializedField, SerializedObject, SerializedValue, Slot,
    TypeRef, TypeRegistry, ValueId,
};

/// Declared fields across the class ancestry, base class first, then any
/// undeclared fields present on the object
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericSerializer;

impl Overridable for GenericSerializer {
    fn name(&self) -> &str {
        "generic"
    }
}

impl Serializer for GenericSerializer {
    fn accepts(&self, _obj: &ObjRef, _types: &TypeRegistry) -> bool {
        true
    }

    fn serialize(
        &self,
        obj: &ObjRef,
        declared: &TypeRef,
        facade: &mut SerializerFacade<'_>,
    ) -> Result<ValueId, CaptureError> {
        let slots = live_slots(obj, facade.types()).ok_or_else(|| {
            CaptureError::population_failure(format!("{} is locked for writing", obj.class()))
        })?;
        let id = facade.reserve(
            obj,
            SerializedValue::Object(SerializedObject::new(declared.clone(), obj.class().clone())),
        );

        let mut fields = Vec::with_capacity(slots.len());
        for (slot, value) in &slots.entries {
            let Slot::Field { owner, name, ty } = slot else {
                return Err(CaptureError::population_failure(format!(
                    "{} has no field map",
                    obj.class()
                )));
            };
            fields.push(SerializedField {
                owner: owner.clone(),
                name: name.clone(),
                ty: ty.clone(),
                value: facade.value(value, ty)?,
            });
        }
        facade.update(id, |node| {
            if let SerializedValue::Object(object) = node {
                object.fields = fields;
            }
        })?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::serializers;
    use snaptest_test_utils::{fixture_types, sub_bean, BEAN, SUB_BEAN};
    use snaptest_values::{LiveValue, ValueGraph};

    #[test]
    fn fields_follow_the_ancestry() {
        let types = fixture_types();
        let serializers = serializers(Vec::new()).unwrap();
        let mut graph = ValueGraph::standalone();
        let obj = sub_bean(2, "n");
        obj.set_field("extra", LiveValue::Bool(true));
        let id = SerializerFacade::new(&mut graph, &types, &serializers)
            .value(&obj.into(), &TypeRef::class(BEAN))
            .unwrap();

        let Some(SerializedValue::Object(object)) = graph.get(id) else {
            panic!("expected an object node");
        };
        assert_eq!(object.declared, TypeRef::class(BEAN));
        assert_eq!(object.runtime, TypeRef::class(SUB_BEAN));
        let names: Vec<(&str, &str)> = object
            .fields
            .iter()
            .map(|f| (f.owner.as_str(), f.name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![(BEAN, "i"), (BEAN, "o"), (SUB_BEAN, "name"), (SUB_BEAN, "extra")]
        );
    }
}
