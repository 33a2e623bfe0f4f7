//! Capture sessions
//!
//! A [`CaptureSession`] drives each captured call through
//! NEW → POPULATING(setup) → POPULATING(expect) → EMITTED | INVALID:
//! - [`CaptureSession::begin`] records the pre-call state on the subject's
//!   worker and waits for it within the budget
//! - nested calls are attributed to the capture on top of the caller's
//!   stack
//! - [`CaptureSession::finish`] records the post-call state and hands a
//!   valid snapshot to the sink exactly once
//!
//! Failures never reach the instrumented call; they invalidate the
//! snapshot and are reported to whoever calls `finish`.

use crate::config::{AdaptorCatalog, CaptureConfig};
use crate::error::{CaptureError, ConfigError};
use crate::populate::{populate_expect, populate_setup, LiveCall, LiveOutcome, LiveState};
use crate::sequencer::{Sequencer, Subject};
use crate::serialize::Serializers;
use dashmap::DashMap;
use parking_lot::Mutex;
use snaptest_codegen::{MatcherAdaptors, SetupAdaptors, TestGenerator};
use snaptest_values::{
    Interner, LiveValue, Signature, Snapshot, SnapshotId, SnapshotSink, TypeRegistry, ValueGraph,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Execution context of instrumented calls, chosen by the instrumentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallerId(u64);

impl CallerId {
    /// Caller with the given raw id
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<u64> for CallerId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "caller-{}", self.0)
    }
}

/// Shared state of one capture
///
/// Only the subject's worker locks `snapshot` while a population job may be
/// running; the foreground touches it again only after a job has answered.
#[derive(Debug)]
struct CaptureState {
    id: SnapshotId,
    caller: CallerId,
    subject: Subject,
    valid: AtomicBool,
    snapshot: Mutex<Option<Snapshot>>,
    failure: Mutex<Option<CaptureError>>,
    inputs: Mutex<Vec<LiveCall>>,
    outputs: Mutex<Vec<LiveCall>>,
}

impl CaptureState {
    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn invalidate(&self, err: CaptureError) {
        if self.valid.swap(false, Ordering::AcqRel) {
            tracing::warn!(
                snapshot = %self.id,
                subject = %self.subject,
                timeout = err.is_timeout(),
                reason = %err,
                "snapshot invalidated"
            );
            *self.failure.lock() = Some(err);
        }
    }

    fn take_failure(&self) -> CaptureError {
        self.failure.lock().take().unwrap_or(CaptureError::Cancelled)
    }
}

/// Handle to an in-flight capture, returned by [`CaptureSession::begin`]
#[derive(Debug)]
pub struct Capture {
    state: Arc<CaptureState>,
}

impl Capture {
    /// Snapshot identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> SnapshotId {
        self.state.id
    }

    /// Context that started the capture
    #[inline]
    #[must_use]
    pub fn caller(&self) -> CallerId {
        self.state.caller
    }

    /// What the capture is about
    #[inline]
    #[must_use]
    pub fn subject(&self) -> &Subject {
        &self.state.subject
    }

    /// Check if the snapshot can still be emitted
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state.is_valid()
    }
}

/// Capture pipeline of one instrumented program
pub struct CaptureSession {
    config: CaptureConfig,
    types: Arc<TypeRegistry>,
    serializers: Arc<Serializers>,
    setup: Arc<SetupAdaptors>,
    matchers: Arc<MatcherAdaptors>,
    interner: Arc<Interner>,
    sequencer: Sequencer,
    sink: Arc<dyn SnapshotSink>,
    active: DashMap<SnapshotId, Arc<CaptureState>>,
    callers: DashMap<CallerId, Vec<SnapshotId>>,
    unfinished: DashMap<Subject, usize>,
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("config", &self.config)
            .field("serializers", &self.serializers)
            .field("workers", &self.sequencer.worker_count())
            .field("active", &self.active.len())
            .finish_non_exhaustive()
    }
}

impl CaptureSession {
    /// Session with the built-in adaptors only
    ///
    /// # Errors
    /// Returns [`ConfigError`] if `config` is invalid or names adaptors.
    pub fn new(
        config: CaptureConfig,
        types: Arc<TypeRegistry>,
        sink: Arc<dyn SnapshotSink>,
    ) -> Result<Self, ConfigError> {
        Self::with_catalog(config, &AdaptorCatalog::new(), types, sink)
    }

    /// Session whose configured adaptor names resolve through `catalog`
    ///
    /// # Errors
    /// Returns [`ConfigError`] if `config` is invalid or names adaptors
    /// missing from `catalog`.
    pub fn with_catalog(
        config: CaptureConfig,
        catalog: &AdaptorCatalog,
        types: Arc<TypeRegistry>,
        sink: Arc<dyn SnapshotSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let registries = catalog.resolve(&config)?;
        Ok(Self {
            config,
            types,
            serializers: Arc::new(registries.serializers),
            setup: Arc::new(registries.setup),
            matchers: Arc::new(registries.matchers),
            interner: Arc::new(Interner::new()),
            sequencer: Sequencer::new(),
            sink,
            active: DashMap::new(),
            callers: DashMap::new(),
            unfinished: DashMap::new(),
        })
    }

    /// Session configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Class table
    #[inline]
    #[must_use]
    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    /// Literal interner shared by every snapshot of the session
    #[inline]
    #[must_use]
    pub fn interner(&self) -> &Arc<Interner> {
        &self.interner
    }

    /// Test generator using the session's configured adaptors
    #[must_use]
    pub fn test_generator(&self) -> TestGenerator {
        TestGenerator::new(
            Arc::clone(&self.types),
            Arc::clone(&self.setup),
            Arc::clone(&self.matchers),
        )
    }

    /// Start capturing a call and record its pre-call state
    ///
    /// The new capture becomes the active one of `caller` until it
    /// finishes. A failed or late population invalidates the returned
    /// capture.
    pub async fn begin(&self, caller: CallerId, signature: Signature, live: LiveState) -> Capture {
        let receiver = live.receiver.as_ref().and_then(LiveValue::as_object).map(|obj| obj.id());
        let subject = Subject::of(receiver, &signature.declaring);
        let snapshot = Snapshot::new(signature, ValueGraph::new(Arc::clone(&self.interner)));
        let state = Arc::new(CaptureState {
            id: snapshot.id(),
            caller,
            subject,
            valid: AtomicBool::new(true),
            snapshot: Mutex::new(Some(snapshot)),
            failure: Mutex::new(None),
            inputs: Mutex::new(Vec::new()),
            outputs: Mutex::new(Vec::new()),
        });
        self.active.insert(state.id, Arc::clone(&state));
        self.callers.entry(caller).or_default().push(state.id);
        *self.unfinished.entry(state.subject.clone()).or_default() += 1;
        tracing::debug!(snapshot = %state.id, subject = %state.subject, %caller, "populating setup");

        let job = {
            let state = Arc::clone(&state);
            let types = Arc::clone(&self.types);
            let serializers = Arc::clone(&self.serializers);
            let globals = self.config.globals.clone();
            move || {
                run_if_valid(&state, |snapshot| {
                    populate_setup(snapshot, &live, &globals, &types, &serializers)
                })
            }
        };
        self.populate(&state, job).await;
        Capture { state }
    }

    /// Attribute a value the callee read from a collaborator to the
    /// caller's active capture
    ///
    /// Returns `false` if `caller` has no active capture.
    pub fn record_input(&self, caller: CallerId, call: LiveCall) -> bool {
        self.with_active(caller, |state| state.inputs.lock().push(call))
    }

    /// Attribute a call the callee made to a collaborator to the caller's
    /// active capture
    ///
    /// Returns `false` if `caller` has no active capture.
    pub fn record_output(&self, caller: CallerId, call: LiveCall) -> bool {
        self.with_active(caller, |state| state.outputs.lock().push(call))
    }

    /// Capture on top of the caller's stack
    #[must_use]
    pub fn active(&self, caller: CallerId) -> Option<SnapshotId> {
        self.callers.get(&caller).and_then(|stack| stack.last().copied())
    }

    /// Number of captures begun but not finished
    #[inline]
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.active.len()
    }

    /// Record the post-call state and emit the snapshot
    ///
    /// The capture stops being active for its caller; the one it
    /// interrupted, if any, becomes active again. The subject's worker is
    /// released once no other capture of that subject is unfinished.
    ///
    /// # Errors
    /// Returns the [`CaptureError`] that invalidated the snapshot; nothing
    /// is emitted then. A sink failure is logged, not returned.
    pub async fn finish(
        &self,
        capture: Capture,
        outcome: LiveOutcome,
        live: LiveState,
    ) -> Result<SnapshotId, CaptureError> {
        let state = capture.state;
        self.deactivate(&state);
        let finished = self.emit(&state, outcome, live).await;
        self.settle(&state.subject);
        finished
    }

    async fn emit(
        &self,
        state: &Arc<CaptureState>,
        outcome: LiveOutcome,
        live: LiveState,
    ) -> Result<SnapshotId, CaptureError> {
        if !state.is_valid() {
            return Err(state.take_failure());
        }

        tracing::debug!(snapshot = %state.id, subject = %state.subject, "populating expect");
        let inputs = std::mem::take(&mut *state.inputs.lock());
        let outputs = std::mem::take(&mut *state.outputs.lock());
        let job = {
            let state = Arc::clone(state);
            let types = Arc::clone(&self.types);
            let serializers = Arc::clone(&self.serializers);
            let globals = self.config.globals.clone();
            move || {
                run_if_valid(&state, |snapshot| {
                    populate_expect(
                        snapshot,
                        &live,
                        &outcome,
                        &inputs,
                        &outputs,
                        &globals,
                        &types,
                        &serializers,
                    )
                })
            }
        };
        self.populate(state, job).await;
        if !state.is_valid() {
            return Err(state.take_failure());
        }

        let snapshot = state
            .snapshot
            .lock()
            .take()
            .filter(Snapshot::is_valid)
            .ok_or(CaptureError::Cancelled)?;
        let id = snapshot.id();
        match self.sink.accept(snapshot) {
            Ok(()) => tracing::info!(snapshot = %id, subject = %state.subject, "snapshot emitted"),
            Err(err) => {
                let err = CaptureError::from(err);
                tracing::warn!(snapshot = %id, error = %err, "snapshot consumer failed");
            }
        }
        Ok(id)
    }

    /// Release the worker of `subject`
    pub fn release(&self, subject: &Subject) -> bool {
        self.sequencer.release(subject)
    }

    /// Number of subjects holding a population worker
    #[inline]
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.sequencer.worker_count()
    }

    /// Release every worker and empty the interner
    pub fn close(&self) {
        self.sequencer.release_all();
        self.unfinished.clear();
        self.interner.clear();
        tracing::debug!(abandoned = self.active.len(), "capture session closed");
    }

    async fn populate<F>(&self, state: &Arc<CaptureState>, job: F)
    where
        F: FnOnce() -> Result<(), CaptureError> + Send + 'static,
    {
        let result = self
            .sequencer
            .run(&state.subject, self.config.timeout(), job)
            .await
            .and_then(|populated| populated);
        if let Err(err) = result {
            state.invalidate(err);
        }
    }

    /// Count a capture of `subject` as finished, releasing its worker when
    /// it was the last one
    fn settle(&self, subject: &Subject) {
        let idle = match self.unfinished.get_mut(subject) {
            Some(mut count) => {
                *count = count.saturating_sub(1);
                *count == 0
            }
            None => false,
        };
        if idle && self.unfinished.remove_if(subject, |_, count| *count == 0).is_some() {
            self.sequencer.release(subject);
        }
    }

    fn with_active(&self, caller: CallerId, record: impl FnOnce(&CaptureState)) -> bool {
        let Some(id) = self.active(caller) else {
            return false;
        };
        match self.active.get(&id) {
            Some(state) if state.is_valid() => {
                record(&**state);
                true
            }
            _ => false,
        }
    }

    fn deactivate(&self, state: &CaptureState) {
        self.active.remove(&state.id);
        let mut emptied = false;
        if let Some(mut stack) = self.callers.get_mut(&state.caller) {
            match stack.iter().rposition(|id| *id == state.id) {
                Some(index) if index + 1 == stack.len() => {
                    stack.pop();
                }
                Some(index) => {
                    tracing::warn!(snapshot = %state.id, caller = %state.caller, "capture finished out of order");
                    stack.remove(index);
                }
                None => {}
            }
            emptied = stack.is_empty();
        }
        if emptied {
            self.callers.remove_if(&state.caller, |_, stack| stack.is_empty());
        }
    }
}

/// Run `populate` on the capture's snapshot unless it was invalidated
/// while queued
fn run_if_valid(
    state: &CaptureState,
    populate: impl FnOnce(&mut Snapshot) -> Result<(), CaptureError>,
) -> Result<(), CaptureError> {
    if !state.is_valid() {
        tracing::debug!(snapshot = %state.id, "skipping population of invalid snapshot");
        return Ok(());
    }
    let mut guard = state.snapshot.lock();
    let snapshot = guard.as_mut().ok_or(CaptureError::Cancelled)?;
    let result = populate(snapshot);
    if result.is_err() || !state.is_valid() {
        snapshot.invalidate();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use snaptest_test_utils::{fixture_types, string_list, RecordingSink};
    use snaptest_values::TypeRef;

    fn session(sink: Arc<RecordingSink>) -> CaptureSession {
        CaptureSession::new(CaptureConfig::default(), Arc::new(fixture_types()), sink).unwrap()
    }

    fn signature(method: &str) -> Signature {
        Signature::new(TypeRef::class("demo::Service"), method)
    }

    #[tokio::test]
    async fn nested_captures_restore_the_outer_one() {
        let sink = RecordingSink::new();
        let session = session(Arc::clone(&sink));
        let caller = CallerId::new(1);

        let outer = session.begin(caller, signature("outer"), LiveState::default()).await;
        assert_eq!(session.active(caller), Some(outer.id()));
        let inner = session.begin(caller, signature("inner"), LiveState::default()).await;
        assert_eq!(session.active(caller), Some(inner.id()));
        assert!(session.record_output(caller, LiveCall::new(TypeRef::class("demo::Log"), "inner")));

        let inner_id = session
            .finish(inner, LiveOutcome::Returned(None), LiveState::default())
            .await
            .unwrap();
        assert_eq!(session.active(caller), Some(outer.id()));
        assert!(session.record_output(caller, LiveCall::new(TypeRef::class("demo::Log"), "outer")));
        let outer_id = session
            .finish(outer, LiveOutcome::Returned(None), LiveState::default())
            .await
            .unwrap();
        assert_eq!(session.active(caller), None);
        assert_eq!(session.in_flight(), 0);

        let snapshots = sink.take();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].id(), inner_id);
        assert_eq!(snapshots[0].outputs()[0].member, "inner");
        assert_eq!(snapshots[1].id(), outer_id);
        assert_eq!(snapshots[1].outputs()[0].member, "outer");
    }

    #[tokio::test]
    async fn callers_are_independent() {
        let session = session(RecordingSink::new());
        let first = session
            .begin(CallerId::new(1), signature("a"), LiveState::default())
            .await;
        assert_eq!(session.active(CallerId::new(2)), None);
        assert!(!session.record_input(CallerId::new(2), LiveCall::new(TypeRef::class("demo::Store"), "get")));
        assert_eq!(session.active(CallerId::new(1)), Some(first.id()));
    }

    #[tokio::test]
    async fn workers_are_per_subject() {
        let session = session(RecordingSink::new());
        let list = string_list(&[]);
        let live = LiveState::new(Some(list.clone().into()), Vec::new());
        let capture = session
            .begin(CallerId::new(1), signature("size"), live.clone())
            .await;
        assert_eq!(capture.subject(), &Subject::Instance(list.id()));
        assert_eq!(session.worker_count(), 1);
        session
            .finish(capture, LiveOutcome::Returned(None), live)
            .await
            .unwrap();
        assert_eq!(session.worker_count(), 0);
        assert!(!session.release(&Subject::Instance(list.id())));
        session.close();
    }

    #[tokio::test]
    async fn finished_subjects_do_not_keep_workers() {
        let sink = RecordingSink::new();
        let session = session(Arc::clone(&sink));
        let mut lists = Vec::new();
        for i in 0..50 {
            let list = string_list(&["a"]);
            let live = LiveState::new(Some(list.clone().into()), Vec::new());
            let capture = session
                .begin(CallerId::new(i), signature("size"), live.clone())
                .await;
            session
                .finish(capture, LiveOutcome::Returned(None), live)
                .await
                .unwrap();
            lists.push(list);
        }
        assert_eq!(sink.len(), 50);
        assert_eq!(session.worker_count(), 0);
    }

    #[tokio::test]
    async fn worker_outlives_inner_capture_of_the_same_subject() {
        let session = session(RecordingSink::new());
        let list = string_list(&[]);
        let subject = Subject::Instance(list.id());
        let live = LiveState::new(Some(list.clone().into()), Vec::new());
        let caller = CallerId::new(1);

        let outer = session.begin(caller, signature("outer"), live.clone()).await;
        let inner = session.begin(caller, signature("inner"), live.clone()).await;
        session
            .finish(inner, LiveOutcome::Returned(None), live.clone())
            .await
            .unwrap();
        assert_eq!(session.worker_count(), 1);
        assert!(session.sequencer.has_worker(&subject));

        session
            .finish(outer, LiveOutcome::Returned(None), live)
            .await
            .unwrap();
        assert_eq!(session.worker_count(), 0);
    }

    #[tokio::test]
    async fn invalid_captures_still_release_their_worker() {
        let session = session(RecordingSink::new());
        let capture = session
            .begin(CallerId::new(1), signature("reset"), LiveState::default())
            .await;
        capture.state.invalidate(CaptureError::Cancelled);
        let err = session
            .finish(capture, LiveOutcome::Returned(None), LiveState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::Cancelled));
        assert_eq!(session.worker_count(), 0);
    }
}
