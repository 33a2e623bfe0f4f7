//! Snapshots of instrumented calls
//!
//! A [`Snapshot`] pairs the state before a call (Setup) with the state after
//! it (Expect). All captured values live in the snapshot's own
//! [`ValueGraph`]; phases refer to them by [`ValueId`].

use crate::graph::{ValueGraph, ValueId};
use crate::types::TypeRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Unique, time-sortable snapshot identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotId(Ulid);

impl SnapshotId {
    /// Generate a new identifier
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declaring signature of the captured call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    /// Class declaring the method
    pub declaring: TypeRef,
    /// Method name
    pub method: String,
    /// Declared parameter types
    pub param_types: Vec<TypeRef>,
    /// Declared result type, [`TypeRef::Void`] for no result
    pub result_type: TypeRef,
}

impl Signature {
    /// Signature of a parameterless void method
    #[must_use]
    pub fn new(declaring: TypeRef, method: impl Into<String>) -> Self {
        Self {
            declaring,
            method: method.into(),
            param_types: Vec::new(),
            result_type: TypeRef::Void,
        }
    }

    /// Set the parameter types
    #[must_use]
    pub fn with_params(mut self, param_types: Vec<TypeRef>) -> Self {
        self.param_types = param_types;
        self
    }

    /// Set the result type
    #[must_use]
    pub fn returning(mut self, result_type: TypeRef) -> Self {
        self.result_type = result_type;
        self
    }

    /// Check if the method returns nothing
    #[inline]
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.result_type.is_void()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .param_types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "{}::{}({}) -> {}",
            self.declaring, self.method, params, self.result_type
        )
    }
}

/// Class-level field observed at both capture points
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalRef {
    /// Declaring class
    pub owner: String,
    /// Field name
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

impl GlobalRef {
    /// Create a global field reference
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            ty,
        }
    }
}

impl fmt::Display for GlobalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.name)
    }
}

/// Captured value of a [`GlobalRef`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerializedGlobal {
    /// Which global
    pub global: GlobalRef,
    /// Its captured value
    pub value: ValueId,
}

/// Nested call made during the captured call
///
/// Input records carry the value the collaborator returned; output records
/// are interactions to verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRecord {
    /// Collaborator class
    pub owner: TypeRef,
    /// Member name
    pub member: String,
    /// Declared parameter types
    pub param_types: Vec<TypeRef>,
    /// Argument values
    pub args: Vec<ValueId>,
    /// Returned value, for input records
    pub result: Option<ValueId>,
}

/// Which capture point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    /// Before the call
    Setup,
    /// After the call
    Expect,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Setup => "setup",
            Self::Expect => "expect",
        })
    }
}

/// State captured at one point
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseState {
    /// Receiver, absent for static calls
    pub this: Option<ValueId>,
    /// Arguments in parameter order
    pub args: Vec<ValueId>,
    /// Configured globals in configuration order
    pub globals: Vec<SerializedGlobal>,
}

/// How the captured call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Outcome {
    /// Expect phase not captured yet
    #[default]
    Pending,
    /// Normal return; `None` for void methods
    Returned(Option<ValueId>),
    /// Thrown error value
    Threw(ValueId),
}

/// Paired Setup/Expect state of one captured call
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    id: SnapshotId,
    signature: Signature,
    graph: ValueGraph,
    setup: PhaseState,
    expect: PhaseState,
    outcome: Outcome,
    inputs: Vec<CallRecord>,
    outputs: Vec<CallRecord>,
    valid: bool,
}

impl Snapshot {
    /// Create an empty, valid snapshot
    #[must_use]
    pub fn new(signature: Signature, graph: ValueGraph) -> Self {
        Self {
            id: SnapshotId::new(),
            signature,
            graph,
            setup: PhaseState::default(),
            expect: PhaseState::default(),
            outcome: Outcome::Pending,
            inputs: Vec::new(),
            outputs: Vec::new(),
            valid: true,
        }
    }

    /// Snapshot identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> SnapshotId {
        self.id
    }

    /// Captured signature
    #[inline]
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Captured values
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &ValueGraph {
        &self.graph
    }

    /// Captured values, mutable while populating
    #[inline]
    pub fn graph_mut(&mut self) -> &mut ValueGraph {
        &mut self.graph
    }

    /// State before the call
    #[inline]
    #[must_use]
    pub fn setup(&self) -> &PhaseState {
        &self.setup
    }

    /// State after the call
    #[inline]
    #[must_use]
    pub fn expect(&self) -> &PhaseState {
        &self.expect
    }

    /// State of one phase
    #[must_use]
    pub fn phase(&self, phase: Phase) -> &PhaseState {
        match phase {
            Phase::Setup => &self.setup,
            Phase::Expect => &self.expect,
        }
    }

    /// Mutable state of one phase
    pub fn phase_mut(&mut self, phase: Phase) -> &mut PhaseState {
        match phase {
            Phase::Setup => &mut self.setup,
            Phase::Expect => &mut self.expect,
        }
    }

    /// How the call ended
    #[inline]
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Record how the call ended
    pub fn set_outcome(&mut self, outcome: Outcome) {
        self.outcome = outcome;
    }

    /// Returned value, if the call returned one
    #[must_use]
    pub fn result(&self) -> Option<ValueId> {
        match self.outcome {
            Outcome::Returned(result) => result,
            _ => None,
        }
    }

    /// Thrown value, if the call threw
    #[must_use]
    pub fn exception(&self) -> Option<ValueId> {
        match self.outcome {
            Outcome::Threw(error) => Some(error),
            _ => None,
        }
    }

    /// Values read from collaborators
    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &[CallRecord] {
        &self.inputs
    }

    /// Calls made to collaborators
    #[inline]
    #[must_use]
    pub fn outputs(&self) -> &[CallRecord] {
        &self.outputs
    }

    /// Record a value read from a collaborator
    pub fn add_input(&mut self, record: CallRecord) {
        self.inputs.push(record);
    }

    /// Record a call made to a collaborator
    pub fn add_output(&mut self, record: CallRecord) {
        self.outputs.push(record);
    }

    /// Check the validity flag
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Clear the validity flag
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// JSON rendering for diagnostics
    ///
    /// # Errors
    /// Propagates serializer failures.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Failure reported by a snapshot consumer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SinkError(pub String);

impl SinkError {
    /// Create a sink error
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Consumer of finished snapshots
///
/// Receives each valid snapshot exactly once.
pub trait SnapshotSink: Send + Sync {
    /// Take ownership of a finished snapshot
    ///
    /// # Errors
    /// Returns [`SinkError`] if the snapshot could not be consumed.
    fn accept(&self, snapshot: Snapshot) -> Result<(), SinkError>;
}

impl<F> SnapshotSink for F
where
    F: Fn(Snapshot) -> Result<(), SinkError> + Send + Sync,
{
    fn accept(&self, snapshot: Snapshot) -> Result<(), SinkError> {
        self(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Literal;

    #[test]
    fn outcome_accessors() {
        let mut snapshot = Snapshot::new(
            Signature::new(TypeRef::class("Calc"), "div"),
            ValueGraph::standalone(),
        );
        assert_eq!(snapshot.outcome(), Outcome::Pending);

        let value = snapshot
            .graph_mut()
            .literal(TypeRef::string(), Literal::from("boom"));
        snapshot.set_outcome(Outcome::Threw(value));
        assert_eq!(snapshot.exception(), Some(value));
        assert_eq!(snapshot.result(), None);
    }

    #[test]
    fn validity_and_json() {
        let mut snapshot = Snapshot::new(
            Signature::new(TypeRef::class("Calc"), "reset"),
            ValueGraph::standalone(),
        );
        assert!(snapshot.is_valid());
        snapshot.invalidate();
        assert!(!snapshot.is_valid());

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"method\": \"reset\""));
        assert!(json.contains("\"declaring\": \"Calc\""));
    }

    #[test]
    fn signature_display() {
        let signature = Signature::new(TypeRef::class("List"), "add")
            .with_params(vec![TypeRef::object()])
            .returning(TypeRef::primitive(crate::Primitive::Bool));
        assert_eq!(signature.to_string(), "List::add(Object) -> bool");
        assert!(!signature.is_void());
    }
}
