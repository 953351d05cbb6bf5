// src/logger/event.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request flag bits accepted by every decision operation.
pub mod event_flags {
    pub const DEFAULT: u32 = 0;
    /// The caller will activate this event later (`report_action_taken`);
    /// the joiner holds it out of training until then.
    pub const DEFERRED_ACTION: u32 = 1;
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SlotRecord {
    pub slot_id: String,
    pub action_id: usize,
    pub probability: f32,
}

/// One decision record as shipped for offline training. Serialized as a
/// JSON line; the framing/encoding layers treat it as opaque bytes.
#[derive(Serialize, Deserialize, Debug)]
pub struct DecisionEvent {
    pub event_id: String,
    pub kind: String,
    pub context: String,
    pub model_id: String,
    pub learning_mode: String,
    pub deferred: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_event_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub action_ids: Vec<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub probabilities: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<Vec<SlotRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_value: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_value: Option<f32>,
    pub ts: DateTime<Utc>,
}

/// Outcome payload: callers report either a raw number or a JSON blob.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum OutcomeValue {
    Numeric(f32),
    Json(String),
}

#[derive(Serialize, Deserialize, Debug)]
pub struct OutcomeEvent {
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OutcomeValue>,
    /// True for `report_action_taken` activations of deferred events.
    #[serde(default)]
    pub action_taken: bool,
    pub ts: DateTime<Utc>,
}

impl DecisionEvent {
    pub fn to_json_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

impl OutcomeEvent {
    pub fn to_json_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_stay_off_the_wire() {
        let evt = DecisionEvent {
            event_id: "e1".into(),
            kind: "cb".into(),
            context: "{}".into(),
            model_id: "m1".into(),
            learning_mode: "Online".into(),
            deferred: false,
            episode_id: None,
            previous_event_id: None,
            action_ids: vec![1, 0],
            probabilities: vec![0.8, 0.2],
            slots: None,
            action_value: None,
            pdf_value: None,
            ts: Utc::now(),
        };
        let line = String::from_utf8(evt.to_json_line().unwrap()).unwrap();
        assert!(line.ends_with('\n'));
        assert!(!line.contains("episode_id"));
        assert!(!line.contains("slots"));
        assert!(line.contains("\"action_ids\":[1,0]"));
    }

    #[test]
    fn outcome_value_shapes() {
        let numeric = OutcomeEvent {
            event_id: "e".into(),
            secondary_id: None,
            outcome: Some(OutcomeValue::Numeric(1.5)),
            action_taken: false,
            ts: Utc::now(),
        };
        let line = String::from_utf8(numeric.to_json_line().unwrap()).unwrap();
        assert!(line.contains("\"outcome\":1.5"));
    }
}
