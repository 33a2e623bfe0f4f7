//! Phase population: live state at one capture point into a snapshot
//!
//! These functions run on a subject's worker. Each phase serializes with a
//! fresh identity map, so an object seen in Setup and again in Expect
//! yields two nodes.

use crate::error::CaptureError;
use crate::serialize::{SerializerFacade, Serializers};
use snaptest_values::{
    CallRecord, GlobalRef, LiveValue, Outcome, Phase, PhaseState, SerializedGlobal, Signature,
    Snapshot, TypeRef, TypeRegistry,
};

/// Live values observed at one capture point
#[derive(Debug, Clone, Default)]
pub struct LiveState {
    /// Receiver, absent for static calls
    pub receiver: Option<LiveValue>,
    /// Arguments in parameter order
    pub args: Vec<LiveValue>,
    /// One value per configured global, in configuration order
    pub globals: Vec<LiveValue>,
}

impl LiveState {
    /// State of a call on `receiver`
    #[must_use]
    pub fn new(receiver: Option<LiveValue>, args: Vec<LiveValue>) -> Self {
        Self {
            receiver,
            args,
            globals: Vec::new(),
        }
    }

    /// With global values
    #[must_use]
    pub fn with_globals(mut self, globals: Vec<LiveValue>) -> Self {
        self.globals = globals;
        self
    }
}

/// How the instrumented call ended
#[derive(Debug, Clone)]
pub enum LiveOutcome {
    /// Normal return; `None` for void methods
    Returned(Option<LiveValue>),
    /// Thrown error value
    Threw(LiveValue),
}

/// Nested call to a collaborator, observed during the captured call
#[derive(Debug, Clone)]
pub struct LiveCall {
    /// Collaborator class
    pub owner: TypeRef,
    /// Member name
    pub member: String,
    /// Declared parameter types
    pub param_types: Vec<TypeRef>,
    /// Argument values
    pub args: Vec<LiveValue>,
    /// Value the collaborator returned
    pub result: Option<LiveValue>,
}

impl LiveCall {
    /// Call of `owner::member`
    #[must_use]
    pub fn new(owner: TypeRef, member: impl Into<String>) -> Self {
        Self {
            owner,
            member: member.into(),
            param_types: Vec::new(),
            args: Vec::new(),
            result: None,
        }
    }

    /// With arguments and their declared types
    #[must_use]
    pub fn with_args(mut self, param_types: Vec<TypeRef>, args: Vec<LiveValue>) -> Self {
        self.param_types = param_types;
        self.args = args;
        self
    }

    /// With the returned value
    #[must_use]
    pub fn returning(mut self, result: LiveValue) -> Self {
        self.result = Some(result);
        self
    }
}

fn declared_param(params: &[TypeRef], index: usize) -> TypeRef {
    params.get(index).cloned().unwrap_or_else(TypeRef::object)
}

fn phase_state(
    facade: &mut SerializerFacade<'_>,
    phase: Phase,
    signature: &Signature,
    live: &LiveState,
    globals: &[GlobalRef],
) -> Result<PhaseState, CaptureError> {
    if live.globals.len() != globals.len() {
        return Err(CaptureError::population_failure(format!(
            "{phase} supplied {} values for {} configured globals",
            live.globals.len(),
            globals.len()
        )));
    }
    let this = live
        .receiver
        .as_ref()
        .map(|receiver| facade.value(receiver, &signature.declaring))
        .transpose()?;
    let args = live
        .args
        .iter()
        .enumerate()
        .map(|(i, arg)| facade.value(arg, &declared_param(&signature.param_types, i)))
        .collect::<Result<Vec<_>, _>>()?;
    let globals = globals
        .iter()
        .zip(&live.globals)
        .map(|(global, value)| {
            Ok(SerializedGlobal {
                global: global.clone(),
                value: facade.value(value, &global.ty)?,
            })
        })
        .collect::<Result<Vec<_>, CaptureError>>()?;
    Ok(PhaseState { this, args, globals })
}

fn call_record(facade: &mut SerializerFacade<'_>, call: &LiveCall) -> Result<CallRecord, CaptureError> {
    let args = call
        .args
        .iter()
        .enumerate()
        .map(|(i, arg)| facade.value(arg, &declared_param(&call.param_types, i)))
        .collect::<Result<Vec<_>, _>>()?;
    let result = call
        .result
        .as_ref()
        .map(|result| facade.value(result, &TypeRef::object()))
        .transpose()?;
    Ok(CallRecord {
        owner: call.owner.clone(),
        member: call.member.clone(),
        param_types: call.param_types.clone(),
        args,
        result,
    })
}

/// Record the state before the call
///
/// # Errors
/// Returns [`CaptureError`] if a value cannot be serialized or the global
/// values do not match the configured globals.
pub fn populate_setup(
    snapshot: &mut Snapshot,
    live: &LiveState,
    globals: &[GlobalRef],
    types: &TypeRegistry,
    serializers: &Serializers,
) -> Result<(), CaptureError> {
    let signature = snapshot.signature().clone();
    let mut facade = SerializerFacade::new(snapshot.graph_mut(), types, serializers);
    let state = phase_state(&mut facade, Phase::Setup, &signature, live, globals)?;
    *snapshot.phase_mut(Phase::Setup) = state;
    Ok(())
}

/// Record the state after the call, its outcome and the nested calls
///
/// Outputs are serialized with the post-call state; inputs get their own
/// identity scope.
///
/// # Errors
/// See [`populate_setup`].
#[allow(clippy::too_many_arguments)]
pub fn populate_expect(
    snapshot: &mut Snapshot,
    live: &LiveState,
    outcome: &LiveOutcome,
    inputs: &[LiveCall],
    outputs: &[LiveCall],
    globals: &[GlobalRef],
    types: &TypeRegistry,
    serializers: &Serializers,
) -> Result<(), CaptureError> {
    let signature = snapshot.signature().clone();
    let mut facade = SerializerFacade::new(snapshot.graph_mut(), types, serializers);
    let state = phase_state(&mut facade, Phase::Expect, &signature, live, globals)?;
    let outcome = match outcome {
        LiveOutcome::Returned(Some(value)) if !signature.is_void() => {
            Outcome::Returned(Some(facade.value(value, &signature.result_type)?))
        }
        LiveOutcome::Returned(_) => Outcome::Returned(None),
        LiveOutcome::Threw(error) => Outcome::Threw(facade.value(error, &TypeRef::object())?),
    };
    let outputs = outputs
        .iter()
        .map(|call| call_record(&mut facade, call))
        .collect::<Result<Vec<_>, _>>()?;
    facade.reset_identities();
    let inputs = inputs
        .iter()
        .map(|call| call_record(&mut facade, call))
        .collect::<Result<Vec<_>, _>>()?;
    drop(facade);

    *snapshot.phase_mut(Phase::Expect) = state;
    snapshot.set_outcome(outcome);
    for record in inputs {
        snapshot.add_input(record);
    }
    for record in outputs {
        snapshot.add_output(record);
    }
    Ok(())
}
