//! Interned literal and null values
//!
//! One [`Interner`] lives for a whole capture session and is shared by every
//! snapshot graph built during it. Equal `(type, value)` literals and equal
//! null types resolve to the same `Arc`.

use crate::literal::Literal;
use crate::types::TypeRef;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

/// Literal value with its type
#[derive(Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SerializedLiteral {
    #[serde(rename = "type")]
    ty: TypeRef,
    value: Literal,
}

impl SerializedLiteral {
    /// Type of the literal
    #[inline]
    #[must_use]
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// The literal value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &Literal {
        &self.value
    }
}

/// Typed null
#[derive(Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SerializedNull {
    #[serde(rename = "type")]
    ty: TypeRef,
}

impl SerializedNull {
    /// Declared type of the null reference
    #[inline]
    #[must_use]
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }
}

/// Session-wide cache of literal and null values
#[derive(Debug, Default)]
pub struct Interner {
    literals: DashMap<(TypeRef, Literal), Arc<SerializedLiteral>>,
    nulls: DashMap<TypeRef, Arc<SerializedNull>>,
}

impl Interner {
    /// Create an empty interner
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interned literal for `(ty, value)`
    pub fn literal(&self, ty: TypeRef, value: Literal) -> Arc<SerializedLiteral> {
        self.literals
            .entry((ty.clone(), value.clone()))
            .or_insert_with(|| Arc::new(SerializedLiteral { ty, value }))
            .clone()
    }

    /// Interned null of type `ty`
    pub fn null(&self, ty: TypeRef) -> Arc<SerializedNull> {
        self.nulls
            .entry(ty.clone())
            .or_insert_with(|| Arc::new(SerializedNull { ty }))
            .clone()
    }

    /// Number of interned values
    #[must_use]
    pub fn len(&self) -> usize {
        self.literals.len() + self.nulls.len()
    }

    /// Check if nothing is interned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every interned value
    pub fn clear(&self) {
        self.literals.clear();
        self.nulls.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_interning_returns_same_instance() {
        let interner = Interner::new();
        let a = interner.literal(TypeRef::string(), Literal::from("x"));
        let b = interner.literal(TypeRef::string(), Literal::from("x"));
        let c = interner.literal(TypeRef::object(), Literal::from("x"));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn null_interning_and_clear() {
        let interner = Interner::new();
        let a = interner.null(TypeRef::string());
        let b = interner.null(TypeRef::string());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 1);
        interner.clear();
        assert!(interner.is_empty());
    }
}
