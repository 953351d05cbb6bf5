use std::sync::{Arc, Mutex};
use std::time::Duration;

use rlclient::config::{names, values, Configuration};
use rlclient::error::{model_update_error, ErrorCode, RlResult};
use rlclient::factory::FactoryRegistry;
use rlclient::logger::sender::{MockSender, MockSenderState};
use rlclient::model::predictor::{ModelData, ModelTransport, Predictor, PredictorFactory};
use rlclient::{event_flags, EpisodeState, LiveModel, OutcomeValue};

const CAPTURE_SENDER: &str = "CAPTURE_SENDER";
const TEST_TRANSPORT: &str = "TEST_TRANSPORT";
const TEST_MODEL: &str = "TEST_MODEL";

fn base_config() -> Configuration {
    let mut cfg = Configuration::new();
    cfg.set(names::APP_ID, "integration-test-app");
    cfg.set(names::MODEL_BACKGROUND_REFRESH, "false");
    cfg.set(names::INTERACTION_SENDER_IMPLEMENTATION, values::MOCK_SENDER);
    cfg.set(names::OBSERVATION_SENDER_IMPLEMENTATION, values::MOCK_SENDER);
    cfg.set(names::INTERACTION_SEND_BATCH_INTERVAL_MS, "10");
    cfg.set(names::OBSERVATION_SEND_BATCH_INTERVAL_MS, "10");
    cfg
}

/// Registry whose CAPTURE_SENDER shares one in-memory state, so tests can
/// inspect what was shipped after the client is dropped.
fn capture_registry(state: Arc<Mutex<MockSenderState>>) -> FactoryRegistry {
    let mut registry = FactoryRegistry::default();
    registry.register_sender(
        CAPTURE_SENDER,
        Box::new(move |_cfg, _section| Ok(Box::new(MockSender::with_state(Arc::clone(&state))))),
    );
    registry
}

/// Strips the 8-byte preamble off each captured frame and parses the JSON
/// line behind it.
fn decode_captured(state: &Arc<Mutex<MockSenderState>>) -> Vec<serde_json::Value> {
    state
        .lock()
        .expect("capture lock")
        .sent
        .iter()
        .map(|frame| {
            assert!(frame.len() > 8, "frame shorter than its preamble");
            serde_json::from_slice(&frame[8..]).expect("frame payload is not JSON")
        })
        .collect()
}

struct FixedPredictor {
    pdf: Vec<f32>,
    model_id: String,
    seen_contexts: Arc<Mutex<Vec<String>>>,
}

impl Predictor for FixedPredictor {
    fn choose_rank(&mut self, _seed: u64, context: &str) -> RlResult<(Vec<usize>, Vec<f32>, String)> {
        self.seen_contexts.lock().expect("context log lock").push(context.to_string());
        Ok(((0..self.pdf.len()).collect(), self.pdf.clone(), self.model_id.clone()))
    }

    fn choose_continuous_action(&mut self, context: &str) -> RlResult<(f32, f32, String)> {
        self.seen_contexts.lock().expect("context log lock").push(context.to_string());
        Ok((185.5, 0.3, self.model_id.clone()))
    }

    fn request_multi_slot(
        &mut self,
        _event_id: &str,
        slot_ids: &[String],
        context: &str,
    ) -> RlResult<(Vec<Vec<usize>>, Vec<Vec<f32>>, String)> {
        self.seen_contexts.lock().expect("context log lock").push(context.to_string());
        let ids: Vec<usize> = (0..self.pdf.len()).collect();
        Ok((
            vec![ids; slot_ids.len()],
            vec![self.pdf.clone(); slot_ids.len()],
            self.model_id.clone(),
        ))
    }
}

struct FixedPredictorFactory {
    pdf: Vec<f32>,
    model_id: String,
    seen_contexts: Arc<Mutex<Vec<String>>>,
}

impl PredictorFactory for FixedPredictorFactory {
    fn create(&self, _model: &[u8]) -> RlResult<Box<dyn Predictor>> {
        Ok(Box::new(FixedPredictor {
            pdf: self.pdf.clone(),
            model_id: self.model_id.clone(),
            seen_contexts: Arc::clone(&self.seen_contexts),
        }))
    }
}

struct OneShotTransport;

impl ModelTransport for OneShotTransport {
    fn get_data(&self) -> RlResult<ModelData> {
        Ok(ModelData::new(b"model-bytes".to_vec(), 1))
    }
}

/// Registry wired so the model is ready right after init: the transport
/// hands out data on the first pull and the factory accepts it.
fn model_ready_registry(
    pdf: Vec<f32>,
    model_id: &str,
    seen_contexts: Arc<Mutex<Vec<String>>>,
) -> FactoryRegistry {
    let mut registry = FactoryRegistry::default();
    registry.register_transport(TEST_TRANSPORT, Box::new(|_cfg| Ok(Arc::new(OneShotTransport))));
    registry.register_predictor_factory(
        TEST_MODEL,
        Arc::new(FixedPredictorFactory {
            pdf,
            model_id: model_id.to_string(),
            seen_contexts,
        }),
    );
    registry
}

fn model_ready_config() -> Configuration {
    let mut cfg = base_config();
    cfg.set(names::MODEL_SRC, TEST_TRANSPORT);
    cfg.set(names::MODEL_IMPLEMENTATION, TEST_MODEL);
    cfg
}

const CB_CONTEXT: &str = r#"{"shared":{"user":"u1"},"_multi":[{"a":1},{"a":2}]}"#;
const CB_CONTEXT_3: &str = r#"{"shared":{"user":"u1"},"_multi":[{"a":1},{"a":2},{"a":3}]}"#;
const CCB_CONTEXT: &str = r#"{"shared":{"user":"u1"},"_multi":[{"a":1},{"a":2},{"a":3}],"_slots":[{"_id":"slot-a"},{"_id":"slot-b"}]}"#;

#[test]
fn test_explore_only_rank_is_uniform_at_full_epsilon() {
    let mut cfg = base_config();
    cfg.set(names::INITIAL_EPSILON, "1.0");
    let mut model = LiveModel::with_registry(cfg, FactoryRegistry::default());
    model.init().expect("init");
    assert!(!model.model_ready());

    let resp = model
        .choose_rank("event-a", CB_CONTEXT, event_flags::DEFAULT)
        .expect("choose_rank");
    assert_eq!(resp.event_id(), "event-a");
    assert_eq!(resp.model_id(), "N/A");
    assert_eq!(resp.len(), 2);
    for entry in resp.iter() {
        assert!((entry.probability - 0.5).abs() < 1e-6);
    }
    assert_eq!(resp.iter().next().unwrap().action_id, resp.chosen_action_id());
}

#[test]
fn test_same_event_id_gives_same_choice() {
    let choose = || {
        let mut model = LiveModel::with_registry(base_config(), FactoryRegistry::default());
        model.init().expect("init");
        model
            .choose_rank("stable-event", CB_CONTEXT_3, event_flags::DEFAULT)
            .expect("choose_rank")
            .chosen_action_id()
    };
    assert_eq!(choose(), choose());
}

#[test]
fn test_dedup_requires_protocol_v2() {
    let mut cfg = base_config();
    cfg.set(names::INTERACTION_USE_DEDUP, "true");
    let mut model = LiveModel::with_registry(cfg, FactoryRegistry::default());
    let err = model.init().expect_err("dedup under v1 must fail at init");
    assert_eq!(err.code(), ErrorCode::ContentEncodingError);

    let mut cfg = base_config();
    cfg.set(names::INTERACTION_USE_DEDUP, "true");
    cfg.set(names::PROTOCOL_VERSION, "2");
    let mut model = LiveModel::with_registry(cfg, FactoryRegistry::default());
    model.init().expect("dedup under v2 is fine");
}

#[test]
fn test_logging_only_returns_and_logs_ascending_order() {
    let state = Arc::new(Mutex::new(MockSenderState::default()));
    let mut cfg = base_config();
    cfg.set(names::LEARNING_MODE, values::LEARNING_MODE_LOGGINGONLY);
    cfg.set(names::INTERACTION_SENDER_IMPLEMENTATION, CAPTURE_SENDER);
    let mut model = LiveModel::with_registry(cfg, capture_registry(Arc::clone(&state)));
    model.init().expect("init");

    let resp = model
        .choose_rank("log-only-event", CB_CONTEXT_3, event_flags::DEFAULT)
        .expect("choose_rank");
    let returned: Vec<usize> = resp.iter().map(|e| e.action_id).collect();
    assert_eq!(returned, vec![0, 1, 2]);
    assert_eq!(resp.chosen_action_id(), 0);

    drop(model);
    let records = decode_captured(&state);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["learning_mode"], "LoggingOnly");
    let logged: Vec<u64> = record["action_ids"]
        .as_array()
        .expect("action_ids array")
        .iter()
        .map(|v| v.as_u64().unwrap())
        .collect();
    assert_eq!(logged, vec![0, 1, 2]);
}

#[test]
fn test_apprentice_logs_the_ranking_but_returns_baseline_order() {
    let state = Arc::new(Mutex::new(MockSenderState::default()));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut cfg = model_ready_config();
    cfg.set(names::LEARNING_MODE, values::LEARNING_MODE_APPRENTICE);
    cfg.set(names::INTERACTION_SENDER_IMPLEMENTATION, CAPTURE_SENDER);
    let mut registry = capture_registry(Arc::clone(&state));
    registry.register_transport(TEST_TRANSPORT, Box::new(|_cfg| Ok(Arc::new(OneShotTransport))));
    registry.register_predictor_factory(
        TEST_MODEL,
        Arc::new(FixedPredictorFactory {
            // all mass on the last action, so the sampled ranking is
            // [2, 1, 0] no matter what the seed draws
            pdf: vec![0.0, 0.0, 1.0],
            model_id: "model-appr".to_string(),
            seen_contexts: seen,
        }),
    );
    let mut model = LiveModel::with_registry(cfg, registry);
    model.init().expect("init");
    assert!(model.model_ready());

    let resp = model
        .choose_rank("appr-event", CB_CONTEXT_3, event_flags::DEFAULT)
        .expect("choose_rank");
    // the caller sees the baseline order, not the ranking
    let returned: Vec<usize> = resp.iter().map(|e| e.action_id).collect();
    assert_eq!(returned, vec![0, 1, 2]);
    assert_eq!(resp.chosen_action_id(), 0);

    drop(model);
    let records = decode_captured(&state);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["learning_mode"], "Apprentice");
    // the record keeps the ranking the model actually produced
    let logged: Vec<u64> = record["action_ids"]
        .as_array()
        .expect("action_ids array")
        .iter()
        .map(|v| v.as_u64().unwrap())
        .collect();
    assert_eq!(logged, vec![2, 1, 0]);
    assert_eq!(record["probabilities"][0], 1.0);
}

struct FailingTransport;

impl ModelTransport for FailingTransport {
    fn get_data(&self) -> RlResult<ModelData> {
        Err(model_update_error("transport is down"))
    }
}

#[test]
fn test_background_failure_surfaces_on_the_next_call() {
    let state = Arc::new(Mutex::new(MockSenderState::default()));
    let mut cfg = base_config();
    cfg.set(names::MODEL_BACKGROUND_REFRESH, "true");
    cfg.set(names::MODEL_SRC, "FAILING_TRANSPORT");
    cfg.set(names::INTERACTION_SENDER_IMPLEMENTATION, CAPTURE_SENDER);
    let mut registry = capture_registry(Arc::clone(&state));
    registry.register_transport(
        "FAILING_TRANSPORT",
        Box::new(|_cfg| Ok(Arc::new(FailingTransport))),
    );

    let (notify_tx, notify_rx) = crossbeam_channel::bounded::<()>(1);
    let mut model = LiveModel::with_error_callback(
        cfg,
        registry,
        Arc::new(move |_err| {
            let _ = notify_tx.try_send(());
        }),
    );
    model.init().expect("init");
    notify_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("background refresh failure was never reported");

    let err = model
        .choose_rank("watchdog-event", CB_CONTEXT, event_flags::DEFAULT)
        .expect_err("background failure must surface");
    assert_eq!(err.code(), ErrorCode::UnhandledBackgroundErrorOccurred);

    // surfacing is one-shot, and both decision records were still shipped
    model
        .choose_rank("watchdog-event-2", CB_CONTEXT, event_flags::DEFAULT)
        .expect("flag was cleared by the previous call");

    drop(model);
    let records = decode_captured(&state);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["event_id"], "watchdog-event");
    assert_eq!(records[1]["event_id"], "watchdog-event-2");
}

#[test]
fn test_apprentice_without_actions_needs_baseline() {
    let mut cfg = base_config();
    cfg.set(names::LEARNING_MODE, values::LEARNING_MODE_APPRENTICE);
    let mut model = LiveModel::with_registry(cfg, FactoryRegistry::default());
    model.init().expect("init");

    let err = model
        .choose_rank("event-b", r#"{"shared":{"user":"u1"}}"#, event_flags::DEFAULT)
        .expect_err("no actions and no baseline");
    assert_eq!(err.code(), ErrorCode::BaselineActionsNotDefined);
}

#[test]
fn test_manual_refresh_conflicts_with_background_refresh() {
    let mut cfg = base_config();
    cfg.set(names::MODEL_BACKGROUND_REFRESH, "true");
    let mut model = LiveModel::with_registry(cfg, FactoryRegistry::default());
    model.init().expect("init");

    let err = model.refresh_model().expect_err("manual refresh while background refresh runs");
    assert_eq!(err.code(), ErrorCode::ModelUpdateError);
}

#[test]
fn test_manual_refresh_loads_the_model() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut model = LiveModel::with_registry(
        model_ready_config(),
        model_ready_registry(vec![0.1, 0.9], "model-v1", Arc::clone(&seen)),
    );
    model.init().expect("init");
    assert!(model.model_ready(), "startup pull already loaded the model");

    let resp = model
        .choose_rank("event-c", CB_CONTEXT, event_flags::DEFAULT)
        .expect("choose_rank");
    assert_eq!(resp.model_id(), "model-v1");
    assert_eq!(resp.len(), 2);
    let total: f32 = resp.iter().map(|e| e.probability).sum();
    assert!((total - 1.0).abs() < 1e-5);
    assert_eq!(resp.iter().next().unwrap().action_id, resp.chosen_action_id());
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn test_multi_slot_requires_protocol_v2() {
    let mut model = LiveModel::with_registry(base_config(), FactoryRegistry::default());
    model.init().expect("init");
    let err = model
        .request_multi_slot_decision("event-d", CCB_CONTEXT, event_flags::DEFAULT)
        .expect_err("multi-slot under v1");
    assert_eq!(err.code(), ErrorCode::ProtocolNotSupported);
}

#[test]
fn test_legacy_decision_rejected_under_protocol_v2() {
    let mut cfg = base_config();
    cfg.set(names::PROTOCOL_VERSION, "2");
    let mut model = LiveModel::with_registry(cfg, FactoryRegistry::default());
    model.init().expect("init");
    let err = model
        .request_decision(CCB_CONTEXT, event_flags::DEFAULT)
        .expect_err("legacy call under v2");
    assert_eq!(err.code(), ErrorCode::ProtocolNotSupported);
}

#[test]
fn test_multi_slot_explore_only_choices() {
    let mut cfg = base_config();
    cfg.set(names::PROTOCOL_VERSION, "2");
    cfg.set(names::INITIAL_EPSILON, "1.0");
    let mut model = LiveModel::with_registry(cfg, FactoryRegistry::default());
    model.init().expect("init");

    let resp = model
        .request_multi_slot_decision("event-e", CCB_CONTEXT, event_flags::DEFAULT)
        .expect("multi-slot decision");
    assert_eq!(resp.event_id(), "event-e");
    assert_eq!(resp.model_id(), "N/A");
    assert_eq!(resp.len(), 2);
    let slots: Vec<_> = resp.iter().collect();
    assert_eq!(slots[0].slot_id, "slot-a");
    assert_eq!(slots[1].slot_id, "slot-b");
    for slot in slots {
        assert!(slot.action_id < 3);
        assert!((slot.probability - 1.0 / 3.0).abs() < 1e-6);
    }
}

#[test]
fn test_multi_slot_detailed_keeps_full_distribution() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut cfg = model_ready_config();
    cfg.set(names::PROTOCOL_VERSION, "2");
    let mut model = LiveModel::with_registry(
        cfg,
        model_ready_registry(vec![0.2, 0.3, 0.5], "model-v2", Arc::clone(&seen)),
    );
    model.init().expect("init");

    let resp = model
        .request_multi_slot_decision_detailed("event-f", CCB_CONTEXT, event_flags::DEFAULT)
        .expect("detailed multi-slot decision");
    assert_eq!(resp.model_id(), "model-v2");
    assert_eq!(resp.len(), 2);
    for ranking in resp.iter() {
        assert_eq!(ranking.entries.len(), 3);
        let total: f32 = ranking.entries.iter().map(|e| e.probability).sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert_eq!(ranking.entries[0].action_id, ranking.chosen_action_id);
    }
}

#[test]
fn test_continuous_action_needs_a_model() {
    let mut model = LiveModel::with_registry(base_config(), FactoryRegistry::default());
    model.init().expect("init");
    let err = model
        .request_continuous_action("event-g", r#"{"temp":32.6}"#, event_flags::DEFAULT)
        .expect_err("continuous action without a model");
    assert_eq!(err.code(), ErrorCode::ModelRankError);
}

#[test]
fn test_continuous_action_with_model() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut model = LiveModel::with_registry(
        model_ready_config(),
        model_ready_registry(vec![1.0], "model-ca", Arc::clone(&seen)),
    );
    model.init().expect("init");

    let resp = model
        .request_continuous_action("event-h", r#"{"temp":32.6}"#, event_flags::DEFAULT)
        .expect("continuous action");
    assert_eq!(resp.event_id(), "event-h");
    assert_eq!(resp.model_id(), "model-ca");
    assert!((resp.chosen_action() - 185.5).abs() < 1e-6);
    assert!((resp.pdf_value() - 0.3).abs() < 1e-6);
}

#[test]
fn test_episodic_depth_reaches_the_predictor() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut model = LiveModel::with_registry(
        model_ready_config(),
        model_ready_registry(vec![0.5, 0.5], "model-ep", Arc::clone(&seen)),
    );
    model.init().expect("init");

    let mut episode = EpisodeState::new("episode-1").expect("episode");
    model
        .request_episodic_decision("step-1", None, CB_CONTEXT, &mut episode)
        .expect("first step");
    model
        .request_episodic_decision("step-2", Some("step-1"), CB_CONTEXT, &mut episode)
        .expect("second step");

    let contexts = seen.lock().unwrap();
    assert_eq!(contexts.len(), 2);
    assert!(contexts[0].contains(r#""episode":{"depth":"1"}"#), "got: {}", contexts[0]);
    assert!(contexts[1].contains(r#""episode":{"depth":"2"}"#), "got: {}", contexts[1]);
    assert_eq!(episode.len(), 2);
}

#[test]
fn test_episodic_decisions_carry_the_episode_id() {
    let state = Arc::new(Mutex::new(MockSenderState::default()));
    let mut cfg = base_config();
    cfg.set(names::INTERACTION_SENDER_IMPLEMENTATION, CAPTURE_SENDER);
    let mut model = LiveModel::with_registry(cfg, capture_registry(Arc::clone(&state)));
    model.init().expect("init");

    let mut episode = EpisodeState::new("episode-2").expect("episode");
    model
        .request_episodic_decision("step-1", None, CB_CONTEXT, &mut episode)
        .expect("first step");
    model
        .request_episodic_decision("step-2", Some("step-1"), CB_CONTEXT, &mut episode)
        .expect("second step");

    drop(model);
    let records = decode_captured(&state);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["kind"], "multistep");
    assert_eq!(records[0]["episode_id"], "episode-2");
    assert!(records[0].get("previous_event_id").is_none());
    assert_eq!(records[1]["previous_event_id"], "step-1");
}

#[test]
fn test_outcomes_are_shipped_to_the_observation_channel() {
    let state = Arc::new(Mutex::new(MockSenderState::default()));
    let mut cfg = base_config();
    cfg.set(names::OBSERVATION_SENDER_IMPLEMENTATION, CAPTURE_SENDER);
    let mut model = LiveModel::with_registry(cfg, capture_registry(Arc::clone(&state)));
    model.init().expect("init");

    model.report_outcome("event-i", OutcomeValue::Numeric(1.5)).expect("numeric outcome");
    model
        .report_outcome("event-i", OutcomeValue::Json(r#"{"click":true}"#.to_string()))
        .expect("json outcome");
    model.report_action_taken("event-i").expect("activation");

    drop(model);
    let records = decode_captured(&state);
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["event_id"], "event-i");
    assert_eq!(records[0]["outcome"], 1.5);
    assert_eq!(records[1]["outcome"], r#"{"click":true}"#);
    assert_eq!(records[2]["action_taken"], true);
}

#[test]
fn test_slot_outcomes_require_protocol_v2() {
    let mut model = LiveModel::with_registry(base_config(), FactoryRegistry::default());
    model.init().expect("init");
    let err = model
        .report_outcome_per_slot("event-j", "slot-a", OutcomeValue::Numeric(1.0))
        .expect_err("slot outcome under v1");
    assert_eq!(err.code(), ErrorCode::ProtocolNotSupported);
}

#[test]
fn test_calls_before_init_are_rejected() {
    let model = LiveModel::with_registry(base_config(), FactoryRegistry::default());
    let err = model
        .choose_rank("event-k", CB_CONTEXT, event_flags::DEFAULT)
        .expect_err("call before init");
    assert_eq!(err.code(), ErrorCode::NotInitialized);
    let err = model.report_outcome("event-k", OutcomeValue::Numeric(1.0)).expect_err("outcome before init");
    assert_eq!(err.code(), ErrorCode::NotInitialized);
}

#[test]
fn test_empty_arguments_are_rejected() {
    let mut model = LiveModel::with_registry(base_config(), FactoryRegistry::default());
    model.init().expect("init");
    let err = model.choose_rank("", CB_CONTEXT, event_flags::DEFAULT).expect_err("empty id");
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
    let err = model.choose_rank("event-l", "", event_flags::DEFAULT).expect_err("empty context");
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
    let err = model.report_outcome("event-l", OutcomeValue::Json(String::new())).expect_err("empty outcome");
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
}
