//! snaptest capture
//!
//! Records the state around instrumented calls and emits snapshots.
//!
//! # Core Concepts
//!
//! - [`CaptureSession`]: begin/finish pairs per call, nested calls per caller
//! - [`Sequencer`]: one population worker per subject, jobs in order
//! - [`Serializer`]: live value to IR, with a reflective fallback
//! - [`CaptureConfig`]: TOML configuration; [`AdaptorCatalog`] resolves the
//!   adaptor names it lists
//!
//! # Example
//!
//! ```rust
//! use snaptest_capture::{CallerId, CaptureConfig, CaptureSession, LiveOutcome, LiveState};
//! use snaptest_values::{LiveValue, ObjRef, Signature, TypeRef, TypeRegistry};
//! use std::sync::Arc;
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(async {
//!     let types = Arc::new(TypeRegistry::with_builtins());
//!     let generator = Arc::new(snaptest_codegen::TestGenerator::standard(Arc::clone(&types)).unwrap());
//!     let session = CaptureSession::new(CaptureConfig::default(), types, generator.clone()).unwrap();
//!
//!     let list_type = TypeRef::generic("ArrayList", vec![TypeRef::string()]);
//!     let list = ObjRef::list(list_type.clone(), Vec::new());
//!     let signature = Signature::new(list_type, "add").with_params(vec![TypeRef::object()]);
//!     let live = LiveState::new(Some(list.clone().into()), vec![LiveValue::str("x")]);
//!
//!     let capture = session.begin(CallerId::new(1), signature, live.clone()).await;
//!     list.push(LiveValue::str("x"));
//!     session.finish(capture, LiveOutcome::Returned(None), live).await.unwrap();
//!
//!     assert_eq!(generator.unit_names(), vec!["test_add1"]);
//! });
//! ```

pub mod config;
pub mod error;
pub mod populate;
pub mod sequencer;
pub mod serialize;
pub mod session;

pub use config::{AdaptorCatalog, CaptureConfig, Registries};
pub use error::{CaptureError, ConfigError};
pub use populate::{populate_expect, populate_setup, LiveCall, LiveOutcome, LiveState};
pub use sequencer::{Sequencer, Subject};
pub use serialize::{
    default_serializers, serializers, ArraySerializer, GenericSerializer, ListSerializer,
    MapSerializer, Serializer, SerializerFacade, Serializers, SetSerializer,
};
pub use session::{Capture, CallerId, CaptureSession};

/// Version of the capture crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use snaptest_test_utils::{bean, fixture_types, FailingSink, RecordingSink, BEAN};
    use snaptest_values::{LiveValue, Signature, TypeRef};
    use std::sync::Arc;

    #[tokio::test]
    async fn void_call_emits_once() {
        let sink = RecordingSink::new();
        let session =
            CaptureSession::new(CaptureConfig::default(), Arc::new(fixture_types()), sink.clone()).unwrap();
        let target = bean(1, LiveValue::Null);
        let live = LiveState::new(Some(target.clone().into()), vec![LiveValue::Int(5)]);
        let signature = Signature::new(TypeRef::class(BEAN), "set_i").with_params(vec![snaptest_test_utils::int()]);

        let capture = session.begin(CallerId::new(7), signature, live.clone()).await;
        assert!(capture.is_valid());
        target.set_field("i", LiveValue::Int(5));
        let id = session
            .finish(capture, LiveOutcome::Returned(None), live)
            .await
            .unwrap();

        let emitted = sink.take();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].id(), id);
        assert_ne!(emitted[0].setup().this, emitted[0].expect().this);
    }

    #[tokio::test]
    async fn rejected_snapshots_still_finish() {
        let session = CaptureSession::new(
            CaptureConfig::default(),
            Arc::new(fixture_types()),
            Arc::new(FailingSink),
        )
        .unwrap();
        let signature = Signature::new(TypeRef::class(BEAN), "reset");
        let capture = session
            .begin(CallerId::new(1), signature, LiveState::default())
            .await;
        let id = capture.id();
        let finished = session
            .finish(capture, LiveOutcome::Returned(None), LiveState::default())
            .await;
        assert_eq!(finished.unwrap(), id);
    }

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
