// src/config.rs
use std::collections::HashMap;

use crate::error::{invalid_argument, RlResult};

/// Recognized configuration keys. Callers can set anything, but these are
/// the names the library itself reads.
pub mod names {
    pub const APP_ID: &str = "appid";
    pub const PROTOCOL_VERSION: &str = "protocol.version";
    pub const MODEL_SRC: &str = "model.source";
    pub const MODEL_IMPLEMENTATION: &str = "model.implementation";
    pub const MODEL_BACKGROUND_REFRESH: &str = "model.backgroundrefresh";
    pub const MODEL_REFRESH_INTERVAL_MS: &str = "model.refresh.interval.ms";
    pub const INITIAL_EPSILON: &str = "InitialExplorationEpsilon";
    pub const LEARNING_MODE: &str = "LearningMode";
    pub const TRACE_LOG_IMPLEMENTATION: &str = "trace.logger.implementation";
    pub const QUEUE_MODE: &str = "queue.mode";

    pub const INTERACTION_SENDER_IMPLEMENTATION: &str = "interaction.sender.implementation";
    pub const INTERACTION_USE_COMPRESSION: &str = "interaction.use_compression";
    pub const INTERACTION_USE_DEDUP: &str = "interaction.use_dedup";
    pub const INTERACTION_FILE_NAME: &str = "interaction.file.name";
    pub const INTERACTION_SEND_HIGH_WATER_MARK: &str = "interaction.send.highwatermark";
    pub const INTERACTION_SEND_BATCH_INTERVAL_MS: &str = "interaction.send.batchintervalms";
    pub const INTERACTION_SEND_QUEUE_MAX_CAPACITY_KB: &str = "interaction.send.queue.maxcapacity.kb";

    pub const OBSERVATION_SENDER_IMPLEMENTATION: &str = "observation.sender.implementation";
    pub const OBSERVATION_USE_COMPRESSION: &str = "observation.use_compression";
    pub const OBSERVATION_USE_DEDUP: &str = "observation.use_dedup";
    pub const OBSERVATION_FILE_NAME: &str = "observation.file.name";
    pub const OBSERVATION_SEND_HIGH_WATER_MARK: &str = "observation.send.highwatermark";
    pub const OBSERVATION_SEND_BATCH_INTERVAL_MS: &str = "observation.send.batchintervalms";
    pub const OBSERVATION_SEND_QUEUE_MAX_CAPACITY_KB: &str = "observation.send.queue.maxcapacity.kb";

    pub const SEND_MAX_RETRIES: &str = "send.max.retries";
}

/// Recognized configuration values.
pub mod values {
    pub const NULL_TRACE_LOGGER: &str = "NULL_TRACE_LOGGER";
    pub const CONSOLE_TRACE_LOGGER: &str = "CONSOLE_TRACE_LOGGER";

    pub const NO_MODEL_DATA: &str = "NO_MODEL_DATA";
    pub const NO_MODEL: &str = "NO_MODEL";

    pub const DEFAULT_INTERACTION_FILE_NAME: &str = "interaction.events.bin";
    pub const DEFAULT_OBSERVATION_FILE_NAME: &str = "observation.events.bin";

    pub const FILE_SENDER: &str = "FILE_SENDER";
    pub const MOCK_SENDER: &str = "MOCK_SENDER";

    pub const LEARNING_MODE_ONLINE: &str = "Online";
    pub const LEARNING_MODE_APPRENTICE: &str = "Apprentice";
    pub const LEARNING_MODE_LOGGINGONLY: &str = "LoggingOnly";

    pub const QUEUE_MODE_DROP: &str = "DROP";
    pub const QUEUE_MODE_BLOCK: &str = "BLOCK";

    pub const DEFAULT_PROTOCOL_VERSION: i64 = 1;
    pub const DEFAULT_MODEL_BACKGROUND_REFRESH: bool = true;
    pub const DEFAULT_MODEL_REFRESH_INTERVAL_MS: i64 = 60_000;
    pub const DEFAULT_INITIAL_EPSILON: f32 = 0.2;
    pub const DEFAULT_SEND_MAX_RETRIES: i64 = 3;
    pub const DEFAULT_BATCH_INTERVAL_MS: i64 = 1_000;
    pub const DEFAULT_HIGH_WATER_MARK: usize = 4 * 1024 * 1024;
    pub const DEFAULT_QUEUE_MAX_CAPACITY_KB: i64 = 16 * 1024;
}

/// Flat string key/value configuration with typed getters. Unknown keys are
/// kept verbatim so collaborator factories can read their own settings.
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    props: HashMap<String, String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a flat JSON object of string/number/bool values, the shape
    /// the client-config endpoint hands out.
    pub fn from_json(json: &str) -> RlResult<Self> {
        let doc: serde_json::Value = serde_json::from_str(json)?;
        let obj = doc
            .as_object()
            .ok_or_else(|| invalid_argument("configuration JSON must be an object"))?;
        let mut cfg = Self::new();
        for (k, v) in obj {
            let s = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            cfg.set(k, &s);
        }
        Ok(cfg)
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.props.insert(name.to_string(), value.to_string());
    }

    pub fn get<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.props.get(name).map(String::as_str).unwrap_or(default)
    }

    pub fn get_int(&self, name: &str, default: i64) -> i64 {
        self.props
            .get(name)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn get_float(&self, name: &str, default: f32) -> f32 {
        self.props
            .get(name)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.props.get(name).map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "true" || v == "1" => true,
            Some(v) if v == "false" || v == "0" => false,
            _ => default,
        }
    }
}

/// Learning-mode policy for how ranked order relates to what is logged and
/// what is returned (see the orchestrator for the reset placement rules).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LearningMode {
    Online,
    Apprentice,
    LoggingOnly,
}

impl LearningMode {
    pub fn from_config(cfg: &Configuration) -> Self {
        match cfg.get(names::LEARNING_MODE, values::LEARNING_MODE_ONLINE) {
            v if v.eq_ignore_ascii_case(values::LEARNING_MODE_APPRENTICE) => {
                LearningMode::Apprentice
            }
            v if v.eq_ignore_ascii_case(values::LEARNING_MODE_LOGGINGONLY) => {
                LearningMode::LoggingOnly
            }
            _ => LearningMode::Online,
        }
    }
}
