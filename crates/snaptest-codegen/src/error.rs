//! Error types for code generation
//!
//! Covers:
//! - values no adaptor can render
//! - wrapper collections of an unknown kind
//! - malformed graphs and adaptor registration defects
//! - failures while evaluating generated code

use snaptest_matching::AssertionError;
use snaptest_values::{printer, GraphError, LiveValue, RegistryError, TypeRef, ValueGraph, ValueId};

/// Code generation error
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// No adaptor claims the value and the reflective fallback is disabled
    #[error("no adaptor for {value}")]
    ConfigurationGap {
        /// Rendering of the value
        value: String,
    },

    /// Hidden wrapper collection with no known construction
    #[error("unknown wrapper collection {value}")]
    UnknownWrapper {
        /// Rendering of the value
        value: String,
    },

    /// Value that generated code cannot build, such as an unnameable class
    /// or a wrapper reachable from its own elements
    #[error("cannot construct an instance of {ty}")]
    Unconstructible {
        /// Runtime type
        ty: TypeRef,
    },

    /// Snapshot was invalidated during capture
    #[error("snapshot is invalid")]
    InvalidSnapshot,

    /// Malformed value graph
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Adaptor registration defect
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl CodegenError {
    /// Coverage gap for the node `id`
    #[must_use]
    pub fn configuration_gap(graph: &ValueGraph, id: ValueId) -> Self {
        Self::ConfigurationGap {
            value: printer::print(graph, id),
        }
    }

    /// Unknown wrapper for the node `id`
    #[must_use]
    pub fn unknown_wrapper(graph: &ValueGraph, id: ValueId) -> Self {
        Self::UnknownWrapper {
            value: printer::print(graph, id),
        }
    }

    /// Check if the error stems from adaptor coverage rather than bad input
    #[must_use]
    pub fn is_coverage_gap(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationGap { .. } | Self::UnknownWrapper { .. } | Self::Unconstructible { .. }
        )
    }
}

/// Failure while evaluating generated statements
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Reference to a local that was never bound
    #[error("unbound local `{0}`")]
    UnboundLocal(String),

    /// Method or function the evaluator does not know
    #[error("unknown method `{0}`")]
    UnknownMethod(String),

    /// Operand of the wrong kind
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected operand kind
        expected: &'static str,
        /// Description of the actual operand
        found: String,
    },

    /// Index outside an array
    #[error("index {index} out of bounds for length {len}")]
    OutOfBounds {
        /// Requested index
        index: usize,
        /// Array length
        len: usize,
    },

    /// Code under test raised an error value
    #[error("call threw {0}")]
    Thrown(LiveValue),

    /// `expect_throws` body completed normally
    #[error("expected the call to throw")]
    NothingThrown,

    /// Generated assertion failed
    #[error("assertion failed: {0}")]
    Assertion(#[from] AssertionError),
}

impl EvalError {
    /// Operand mismatch helper
    #[must_use]
    pub fn mismatch(expected: &'static str, found: impl std::fmt::Debug) -> Self {
        Self::TypeMismatch {
            expected,
            found: format!("{found:?}"),
        }
    }
}
