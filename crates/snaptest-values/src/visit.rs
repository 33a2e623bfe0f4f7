//! Double dispatch over IR variants

use crate::error::GraphError;
use crate::graph::{
    SerializedArray, SerializedEnum, SerializedList, SerializedMap, SerializedObject,
    SerializedSet, SerializedValue, ValueGraph, ValueId,
};
use crate::intern::{SerializedLiteral, SerializedNull};

/// Operation implemented once per IR variant
pub trait ValueVisitor {
    /// Result of visiting one node
    type Output;

    /// Visit a literal
    fn visit_literal(&mut self, id: ValueId, value: &SerializedLiteral) -> Self::Output;
    /// Visit a typed null
    fn visit_null(&mut self, id: ValueId, value: &SerializedNull) -> Self::Output;
    /// Visit an enum constant
    fn visit_enum(&mut self, id: ValueId, value: &SerializedEnum) -> Self::Output;
    /// Visit an array
    fn visit_array(&mut self, id: ValueId, value: &SerializedArray) -> Self::Output;
    /// Visit an ordered collection
    fn visit_list(&mut self, id: ValueId, value: &SerializedList) -> Self::Output;
    /// Visit a set
    fn visit_set(&mut self, id: ValueId, value: &SerializedSet) -> Self::Output;
    /// Visit a keyed collection
    fn visit_map(&mut self, id: ValueId, value: &SerializedMap) -> Self::Output;
    /// Visit a plain object
    fn visit_object(&mut self, id: ValueId, value: &SerializedObject) -> Self::Output;
}

impl SerializedValue {
    /// Dispatch to the visitor method for this variant
    pub fn accept<V: ValueVisitor + ?Sized>(&self, id: ValueId, visitor: &mut V) -> V::Output {
        match self {
            Self::Literal(v) => visitor.visit_literal(id, v),
            Self::Null(v) => visitor.visit_null(id, v),
            Self::Enum(v) => visitor.visit_enum(id, v),
            Self::Array(v) => visitor.visit_array(id, v),
            Self::List(v) => visitor.visit_list(id, v),
            Self::Set(v) => visitor.visit_set(id, v),
            Self::Map(v) => visitor.visit_map(id, v),
            Self::Object(v) => visitor.visit_object(id, v),
        }
    }
}

impl ValueGraph {
    /// Dispatch the node `id` to `visitor`
    ///
    /// # Errors
    /// Returns [`GraphError::MissingValue`] if the id is unknown.
    pub fn accept<V: ValueVisitor + ?Sized>(
        &self,
        id: ValueId,
        visitor: &mut V,
    ) -> Result<V::Output, GraphError> {
        Ok(self.node(id)?.accept(id, visitor))
    }
}
