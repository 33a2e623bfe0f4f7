//! Capture sessions end to end: live calls in, snapshots and generated
//! tests out

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use snaptest_capture::{
    AdaptorCatalog, CallerId, CaptureConfig, CaptureError, CaptureSession, LiveCall, LiveOutcome,
    LiveState, Serializer, SerializerFacade,
};
use snaptest_codegen::Evaluator;
use snaptest_matching::graph_matches_live;
use snaptest_test_utils::{
    array_list_of, bean, fixture_types, int, string_list, RecordingSink, BEAN, COUNTER,
};
use snaptest_values::{
    GlobalRef, LiveValue, ObjRef, Overridable, Signature, TypeRef, TypeRegistry, ValueId,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

const SLOW: &str = "demo::Slow";

#[derive(Debug)]
struct SlowSerializer;

impl Overridable for SlowSerializer {
    fn name(&self) -> &str {
        "slow"
    }
}

impl Serializer for SlowSerializer {
    fn accepts(&self, obj: &ObjRef, _types: &TypeRegistry) -> bool {
        obj.class().raw_name() == Some(SLOW)
    }

    fn serialize(
        &self,
        _obj: &ObjRef,
        declared: &TypeRef,
        facade: &mut SerializerFacade<'_>,
    ) -> Result<ValueId, CaptureError> {
        std::thread::sleep(Duration::from_millis(300));
        facade.value(&LiveValue::Null, declared)
    }
}

fn add_signature() -> Signature {
    Signature::new(array_list_of(TypeRef::string()), "add").with_params(vec![TypeRef::object()])
}

fn session_with(config: CaptureConfig, sink: Arc<RecordingSink>) -> CaptureSession {
    CaptureSession::new(config, Arc::new(fixture_types()), sink).unwrap()
}

#[tokio::test]
async fn add_call_becomes_a_passing_test() {
    let sink = RecordingSink::new();
    let session = session_with(CaptureConfig::default(), sink.clone());
    let list = string_list(&["a"]);
    let live = LiveState::new(Some(list.clone().into()), vec![LiveValue::str("x")]);

    let capture = session.begin(CallerId::new(1), add_signature(), live.clone()).await;
    list.push(LiveValue::str("x"));
    session
        .finish(capture, LiveOutcome::Returned(None), live)
        .await
        .unwrap();

    let snapshots = sink.take();
    assert_eq!(snapshots.len(), 1);
    let snapshot = &snapshots[0];
    let after = snapshot.expect().this.unwrap();
    assert!(graph_matches_live(snapshot.graph(), after, session.types(), &list.into()));

    let generator = session.test_generator();
    let unit = generator.generate(snapshot).unwrap();
    assert_eq!(unit.name, "test_add1");
    let rendered = unit.render(generator.dialect());
    assert!(rendered.contains("array_list1.add(\"a\");"));
    assert!(rendered.contains("array_list1.add(\"x\")"));
    let mut eval = Evaluator::new(session.types());
    eval.run_unit(&unit).unwrap();
}

#[tokio::test]
async fn late_population_invalidates_without_emitting() {
    let sink = RecordingSink::new();
    let config = CaptureConfig::new().with_timeout_ms(20).with_serializer("slow");
    let catalog = AdaptorCatalog::new().with_serializer(Arc::new(SlowSerializer));
    let session =
        CaptureSession::with_catalog(config, &catalog, Arc::new(fixture_types()), sink.clone()).unwrap();
    let slow = ObjRef::object(TypeRef::class(SLOW));
    let live = LiveState::new(Some(slow.into()), Vec::new());

    let capture = session
        .begin(CallerId::new(1), Signature::new(TypeRef::class(SLOW), "run"), live.clone())
        .await;
    assert!(!capture.is_valid());
    assert!(!session.record_output(CallerId::new(1), LiveCall::new(TypeRef::class(BEAN), "touch")));

    let err = session
        .finish(capture, LiveOutcome::Returned(None), live)
        .await
        .unwrap_err();
    assert!(matches!(err, CaptureError::PopulationTimeout { ms: 20 }));
    assert!(sink.is_empty());
    assert_eq!(session.in_flight(), 0);
}

#[tokio::test]
async fn missing_globals_invalidate_the_capture() {
    let sink = RecordingSink::new();
    let config = CaptureConfig::new().with_global(GlobalRef::new(COUNTER, "COUNT", int()));
    let session = session_with(config, sink.clone());
    let signature = Signature::new(TypeRef::class(COUNTER), "tick");

    let capture = session
        .begin(CallerId::new(1), signature, LiveState::default())
        .await;
    assert!(!capture.is_valid());
    let err = session
        .finish(capture, LiveOutcome::Returned(None), LiveState::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CaptureError::PopulationFailure(_)));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn globals_are_captured_in_both_phases() {
    let sink = RecordingSink::new();
    let config = CaptureConfig::new().with_global(GlobalRef::new(COUNTER, "COUNT", int()));
    let session = session_with(config, sink.clone());
    let signature = Signature::new(TypeRef::class(COUNTER), "tick");

    let before = LiveState::default().with_globals(vec![LiveValue::Int(1)]);
    let capture = session.begin(CallerId::new(1), signature, before).await;
    let after = LiveState::default().with_globals(vec![LiveValue::Int(2)]);
    session
        .finish(capture, LiveOutcome::Returned(None), after)
        .await
        .unwrap();

    let snapshot = &sink.take()[0];
    let setup = snapshot.setup().globals[0].value;
    let expect = snapshot.expect().globals[0].value;
    assert_ne!(setup, expect);
}

#[tokio::test]
async fn concurrent_subjects_each_emit() {
    let sink = RecordingSink::new();
    let session = session_with(CaptureConfig::default(), sink.clone());
    let first = bean(1, LiveValue::Null);
    let second = bean(2, LiveValue::Null);
    let signature = Signature::new(TypeRef::class(BEAN), "bump");

    let run = |target: ObjRef, caller: u64| {
        let session = &session;
        let signature = signature.clone();
        async move {
            let live = LiveState::new(Some(target.clone().into()), Vec::new());
            let capture = session.begin(CallerId::new(caller), signature, live.clone()).await;
            target.set_field("i", LiveValue::Int(10));
            session.finish(capture, LiveOutcome::Returned(None), live).await
        }
    };
    let (a, b) = tokio::join!(run(first, 1), run(second, 2));
    assert_ne!(a.unwrap(), b.unwrap());
    assert_eq!(sink.len(), 2);
}

#[tokio::test]
async fn nested_calls_are_recorded_on_the_active_capture() {
    let sink = RecordingSink::new();
    let session = session_with(CaptureConfig::default(), sink.clone());
    let caller = CallerId::new(3);
    let target = bean(1, LiveValue::Null);
    let live = LiveState::new(Some(target.into()), Vec::new());
    let signature = Signature::new(TypeRef::class(BEAN), "load").returning(int());

    let capture = session.begin(caller, signature, live.clone()).await;
    let read = LiveCall::new(TypeRef::class("demo::Store"), "read")
        .with_args(vec![TypeRef::string()], vec![LiveValue::str("k")])
        .returning(LiveValue::Int(4));
    assert!(session.record_input(caller, read));
    session
        .finish(capture, LiveOutcome::Returned(Some(LiveValue::Int(4))), live)
        .await
        .unwrap();

    let snapshot = &sink.take()[0];
    assert_eq!(snapshot.inputs().len(), 1);
    assert_eq!(snapshot.inputs()[0].member, "read");
    assert!(snapshot.result().is_some());
}

#[tokio::test]
async fn configuration_file_drives_the_session() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        timeout_ms = 500
        reflective_fallback = false
        "#
    )
    .unwrap();
    let config = CaptureConfig::from_file(file.path()).unwrap();
    assert_eq!(config.timeout(), Duration::from_millis(500));

    let sink = RecordingSink::new();
    let session = session_with(config, sink.clone());
    let target = bean(1, LiveValue::Null);
    let live = LiveState::new(Some(target.into()), Vec::new());
    let capture = session
        .begin(CallerId::new(1), Signature::new(TypeRef::class(BEAN), "peek"), live.clone())
        .await;
    let err = session
        .finish(capture, LiveOutcome::Returned(None), live)
        .await
        .unwrap_err();
    assert!(matches!(err, CaptureError::ConfigurationGap { ref ty } if *ty == TypeRef::class(BEAN)));
    assert!(sink.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn captured_state_round_trips(items in prop::collection::vec("[a-z]{0,4}", 0..6), added in "[a-z]{1,3}") {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let sink = RecordingSink::new();
        let session = session_with(CaptureConfig::default(), sink.clone());
        let refs: Vec<&str> = items.iter().map(String::as_str).collect();
        let list = string_list(&refs);
        let live = LiveState::new(Some(list.clone().into()), vec![LiveValue::str(&added)]);

        runtime.block_on(async {
            let capture = session.begin(CallerId::new(1), add_signature(), live.clone()).await;
            list.push(LiveValue::str(&added));
            session.finish(capture, LiveOutcome::Returned(None), live).await
        }).unwrap();

        let snapshot = &sink.take()[0];
        let unit = session.test_generator().generate(snapshot).unwrap();
        let mut eval = Evaluator::new(session.types());
        prop_assert!(eval.run_unit(&unit).is_ok());
        let after = snapshot.expect().this.unwrap();
        prop_assert!(graph_matches_live(snapshot.graph(), after, session.types(), &list.into()));
    }
}
