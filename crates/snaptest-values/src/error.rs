//! Error types for the value model

use crate::graph::{ValueId, ValueKind};

/// Errors raised while building an override-ordered registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Two entries share a name
    #[error("adaptor '{0}' is registered more than once")]
    DuplicateName(String),

    /// An entry names a parent that is not registered
    #[error("adaptor '{name}' declares unknown parent '{parent}'")]
    UnknownParent {
        /// Entry declaring the parent
        name: String,
        /// Missing parent name
        parent: String,
    },

    /// Following parent links from this entry never terminates
    #[error("adaptor '{0}' is part of a parent cycle")]
    ParentCycle(String),
}

/// Errors raised while reading a [`ValueGraph`](crate::ValueGraph)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Identity key not present in the graph
    #[error("no value with id {0}")]
    MissingValue(ValueId),

    /// Node has a different variant than the caller required
    #[error("value {id} is {actual:?}, expected {expected}")]
    UnexpectedKind {
        /// Offending node
        id: ValueId,
        /// Required variant
        expected: &'static str,
        /// Actual variant
        actual: ValueKind,
    },
}

impl GraphError {
    /// Create an unexpected-kind error
    #[inline]
    #[must_use]
    pub fn unexpected(id: ValueId, expected: &'static str, actual: ValueKind) -> Self {
        Self::UnexpectedKind {
            id,
            expected,
            actual,
        }
    }
}

/// A type name that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse type '{input}': {reason}")]
pub struct TypeParseError {
    /// Text handed to the parser
    pub input: String,
    /// What went wrong
    pub reason: String,
}
