//! Live values to IR
//!
//! The [`SerializerFacade`] writes live values into a snapshot's
//! [`ValueGraph`]:
//! - Scalars become interned literal nodes, nulls interned null nodes
//! - Enum constants become enum nodes
//! - Objects go through the first accepting [`Serializer`], or the
//!   reflective [`GenericSerializer`] when none does
//!
//! Objects are identified by [`ObjectId`]; an object met twice in one phase
//! maps to one node, so shared and cyclic structures stay graphs.

mod collections;
mod generic;

pub use collections::{ArraySerializer, ListSerializer, MapSerializer, SetSerializer};
pub use generic::GenericSerializer;

use crate::error::CaptureError;
use snaptest_codegen::AdaptorRegistry;
use snaptest_values::{
    LiveValue, ObjRef, ObjectId, Overridable, RegistryError, SerializedEnum, SerializedValue,
    TypeRef, TypeRegistry, ValueGraph, ValueId,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Strategy turning one family of live objects into IR
pub trait Serializer: Overridable + Send + Sync + fmt::Debug {
    /// Check if this serializer handles `obj`
    fn accepts(&self, obj: &ObjRef, types: &TypeRegistry) -> bool;

    /// Write `obj` into the facade's graph
    ///
    /// Implementations reserve their node with [`SerializerFacade::reserve`]
    /// before serializing parts, so parts can refer back to it.
    ///
    /// # Errors
    /// Returns [`CaptureError`] if `obj` or one of its parts cannot be
    /// serialized.
    fn serialize(
        &self,
        obj: &ObjRef,
        declared: &TypeRef,
        facade: &mut SerializerFacade<'_>,
    ) -> Result<ValueId, CaptureError>;
}

/// Serializers in override order
pub type Serializers = AdaptorRegistry<dyn Serializer>;

/// Built-in serializers
#[must_use]
pub fn default_serializers() -> Vec<Arc<dyn Serializer>> {
    vec![
        Arc::new(ArraySerializer),
        Arc::new(ListSerializer),
        Arc::new(SetSerializer),
        Arc::new(MapSerializer),
    ]
}

/// Defaults preceded by `additional`
///
/// # Errors
/// Returns [`RegistryError`] if the combined serializers do not form a valid
/// override chain.
pub fn serializers(additional: Vec<Arc<dyn Serializer>>) -> Result<Serializers, RegistryError> {
    AdaptorRegistry::build(additional, default_serializers())
}

/// Writes live values into one snapshot graph
pub struct SerializerFacade<'a> {
    graph: &'a mut ValueGraph,
    types: &'a TypeRegistry,
    serializers: &'a Serializers,
    identities: HashMap<ObjectId, ValueId>,
}

impl fmt::Debug for SerializerFacade<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializerFacade")
            .field("nodes", &self.graph.len())
            .field("identities", &self.identities.len())
            .finish_non_exhaustive()
    }
}

impl<'a> SerializerFacade<'a> {
    /// Facade writing into `graph`
    #[must_use]
    pub fn new(graph: &'a mut ValueGraph, types: &'a TypeRegistry, serializers: &'a Serializers) -> Self {
        Self {
            graph,
            types,
            serializers,
            identities: HashMap::new(),
        }
    }

    /// Class table
    #[inline]
    #[must_use]
    pub fn types(&self) -> &'a TypeRegistry {
        self.types
    }

    /// Forget object identities; the next phase gets fresh nodes
    pub fn reset_identities(&mut self) {
        self.identities.clear();
    }

    /// Node for `value` seen where `declared` is expected
    ///
    /// # Errors
    /// Returns [`CaptureError::ConfigurationGap`] if no serializer accepts
    /// an object and the reflective fallback is disabled.
    pub fn value(&mut self, value: &LiveValue, declared: &TypeRef) -> Result<ValueId, CaptureError> {
        match value {
            LiveValue::Null => Ok(self.graph.null(null_type(declared))),
            LiveValue::Enum(constant) => Ok(self.graph.insert(SerializedValue::Enum(SerializedEnum {
                declared: declared.clone(),
                runtime: TypeRef::class(constant.ty.clone()),
                name: constant.name.clone(),
            }))),
            LiveValue::Object(obj) => self.object(obj, declared),
            scalar => {
                let literal = scalar
                    .as_literal()
                    .ok_or_else(|| CaptureError::population_failure("value has no literal form"))?;
                let ty = match (declared, literal.primitive()) {
                    (TypeRef::Primitive(kind), Some(actual)) if *kind == actual => declared.clone(),
                    _ => literal.natural_type(),
                };
                Ok(self.graph.literal(ty, literal))
            }
        }
    }

    /// Node for `obj`, reusing the one recorded for its identity
    ///
    /// # Errors
    /// See [`Self::value`].
    pub fn object(&mut self, obj: &ObjRef, declared: &TypeRef) -> Result<ValueId, CaptureError> {
        if let Some(id) = self.identities.get(&obj.id()) {
            return Ok(*id);
        }
        let types = self.types;
        if let Some(serializer) = self.serializers.select(|s| s.accepts(obj, types)) {
            tracing::trace!(object = %obj.id(), serializer = serializer.name(), "serializing object");
            return serializer.serialize(obj, declared, self);
        }
        if self.serializers.reflective_fallback() {
            return GenericSerializer.serialize(obj, declared, self);
        }
        Err(CaptureError::ConfigurationGap {
            ty: obj.class().clone(),
        })
    }

    /// Add the shell node for `obj` and record its identity
    pub fn reserve(&mut self, obj: &ObjRef, node: SerializedValue) -> ValueId {
        let id = self.graph.insert(node);
        self.identities.insert(obj.id(), id);
        id
    }

    /// Modify node `id` once its parts are serialized
    ///
    /// # Errors
    /// Returns [`CaptureError::PopulationFailure`] for unknown ids.
    pub fn update(&mut self, id: ValueId, fill: impl FnOnce(&mut SerializedValue)) -> Result<(), CaptureError> {
        let node = self
            .graph
            .get_mut(id)
            .ok_or_else(|| CaptureError::population_failure(format!("no value with id {id}")))?;
        fill(node);
        Ok(())
    }
}

fn null_type(declared: &TypeRef) -> TypeRef {
    match declared {
        TypeRef::Void => TypeRef::object(),
        TypeRef::Primitive(kind) => TypeRef::boxed(*kind),
        other => other.clone(),
    }
}
