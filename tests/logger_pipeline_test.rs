use std::sync::{Arc, Mutex};

use chrono::Utc;
use rlclient::config::{names, Configuration};
use rlclient::logger::encoding::{decompress_payload, QueueSection};
use rlclient::logger::event::{DecisionEvent, OutcomeEvent, OutcomeValue};
use rlclient::logger::pipeline::EventLogger;
use rlclient::logger::preamble::{message_type, Preamble};
use rlclient::logger::sender::{MockSender, MockSenderState};
use rlclient::model::watchdog::{ErrorHandler, Watchdog};

fn handler() -> ErrorHandler {
    ErrorHandler::new(Arc::new(Watchdog::new()), None)
}

fn fast_config() -> Configuration {
    let mut cfg = Configuration::new();
    cfg.set(names::INTERACTION_SEND_BATCH_INTERVAL_MS, "10");
    cfg.set(names::OBSERVATION_SEND_BATCH_INTERVAL_MS, "10");
    cfg
}

fn capture() -> (Box<MockSender>, Arc<Mutex<MockSenderState>>) {
    let (sender, state) = MockSender::new();
    (Box::new(sender), state)
}

fn sample_decision(context: &str) -> DecisionEvent {
    DecisionEvent {
        event_id: "evt-1".to_string(),
        kind: "cb".to_string(),
        context: context.to_string(),
        model_id: "m-1".to_string(),
        learning_mode: "Online".to_string(),
        deferred: false,
        episode_id: None,
        previous_event_id: None,
        action_ids: vec![1, 0],
        probabilities: vec![0.8, 0.2],
        slots: None,
        action_value: None,
        pdf_value: None,
        ts: Utc::now(),
    }
}

#[test]
fn test_outcome_frames_carry_a_valid_preamble() {
    let (sender, state) = capture();
    let mut logger = EventLogger::build(&fast_config(), QueueSection::Observation, 1, sender, handler())
        .expect("build logger");
    logger
        .log_outcome(OutcomeEvent {
            event_id: "evt-2".to_string(),
            secondary_id: None,
            outcome: Some(OutcomeValue::Numeric(1.0)),
            action_taken: false,
            ts: Utc::now(),
        })
        .expect("log outcome");
    logger.shutdown();

    let sent = state.lock().unwrap().sent.clone();
    assert_eq!(sent.len(), 1);
    let frame = &sent[0];
    let preamble = Preamble::read_from_bytes(frame).expect("preamble");
    assert_eq!(preamble.version, 0);
    assert_eq!(preamble.msg_type, message_type::JSON_OUTCOME_EVENT_COLLECTION);
    assert_eq!(preamble.msg_size as usize, frame.len() - Preamble::SIZE);
    let record: serde_json::Value = serde_json::from_slice(&frame[Preamble::SIZE..]).expect("json");
    assert_eq!(record["event_id"], "evt-2");
}

#[test]
fn test_retries_do_not_reorder_the_stream() {
    let (sender, state) = capture();
    state.lock().unwrap().failures_remaining = 2;
    let mut logger = EventLogger::build(&fast_config(), QueueSection::Interaction, 1, sender, handler())
        .expect("build logger");

    for event_id in ["first", "second", "third"] {
        let mut event = sample_decision(r#"{"_multi":[{"a":1}]}"#);
        event.event_id = event_id.to_string();
        logger.log_decision(event).expect("log decision");
    }
    logger.shutdown();

    let guard = state.lock().unwrap();
    assert!(guard.attempts >= 5, "two failures plus three deliveries");
    let ids: Vec<String> = guard
        .sent
        .iter()
        .map(|frame| {
            let record: serde_json::Value =
                serde_json::from_slice(&frame[Preamble::SIZE..]).expect("json");
            record["event_id"].as_str().expect("event_id").to_string()
        })
        .collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
}

#[test]
fn test_compressed_frames_decompress_to_the_record() {
    let (sender, state) = capture();
    let mut cfg = fast_config();
    cfg.set(names::INTERACTION_USE_COMPRESSION, "true");
    let mut logger = EventLogger::build(&cfg, QueueSection::Interaction, 2, sender, handler())
        .expect("build logger");
    logger
        .log_decision(sample_decision(r#"{"_multi":[{"a":1},{"a":2}]}"#))
        .expect("log decision");
    logger.shutdown();

    let sent = state.lock().unwrap().sent.clone();
    assert_eq!(sent.len(), 1);
    let payload = decompress_payload(&sent[0][Preamble::SIZE..]).expect("gunzip");
    let record: serde_json::Value = serde_json::from_slice(&payload).expect("json");
    assert_eq!(record["event_id"], "evt-1");
    assert_eq!(record["model_id"], "m-1");
}

#[test]
fn test_dedup_passes_actionless_contexts_through() {
    let (sender, state) = capture();
    let mut cfg = fast_config();
    cfg.set(names::INTERACTION_USE_DEDUP, "true");
    let mut logger = EventLogger::build(&cfg, QueueSection::Interaction, 2, sender, handler())
        .expect("build logger");

    // Continuous-action contexts have no _multi list; dedup must not get
    // in the way of shipping the record.
    let mut event = sample_decision(r#"{"temp":32.6}"#);
    event.kind = "ca".to_string();
    event.action_ids = Vec::new();
    event.probabilities = Vec::new();
    event.action_value = Some(185.5);
    event.pdf_value = Some(0.3);
    logger.log_decision(event).expect("log ca decision");
    logger.shutdown();

    let sent = state.lock().unwrap().sent.clone();
    assert_eq!(sent.len(), 1);
    let record: serde_json::Value = serde_json::from_slice(&sent[0][Preamble::SIZE..]).expect("json");
    assert_eq!(record["context"], r#"{"temp":32.6}"#);
    assert_eq!(record["action_value"], 185.5);
}

#[test]
fn test_dedup_replaces_repeated_actions_with_references() {
    let (sender, state) = capture();
    let mut cfg = fast_config();
    cfg.set(names::INTERACTION_USE_DEDUP, "true");
    let mut logger = EventLogger::build(&cfg, QueueSection::Interaction, 2, sender, handler())
        .expect("build logger");

    let context = r#"{"shared":{"u":1},"_multi":[{"a":1},{"a":2}]}"#;
    logger.log_decision(sample_decision(context)).expect("first decision");
    logger.log_decision(sample_decision(context)).expect("second decision");
    logger.shutdown();

    let sent = state.lock().unwrap().sent.clone();
    assert_eq!(sent.len(), 2);
    let first: serde_json::Value = serde_json::from_slice(&sent[0][Preamble::SIZE..]).expect("json");
    let second: serde_json::Value = serde_json::from_slice(&sent[1][Preamble::SIZE..]).expect("json");
    let first_ctx = first["context"].as_str().expect("context string");
    let second_ctx = second["context"].as_str().expect("context string");
    // First sighting of an action carries its definition; repeats are
    // reference-only.
    assert!(first_ctx.contains("__aid") && first_ctx.contains("__adef"), "got: {first_ctx}");
    assert!(second_ctx.contains("__aid") && !second_ctx.contains("__adef"), "got: {second_ctx}");
}
