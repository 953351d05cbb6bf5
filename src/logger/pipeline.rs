// src/logger/pipeline.rs
use std::sync::{Arc, Mutex};

use crate::config::{names, values, Configuration};
use crate::error::{ErrorCode, RlError, RlResult};
use crate::logger::batcher::{BatcherConfig, EventBatcher};
use crate::logger::dedup::DedupDict;
use crate::logger::encoding::{
    compress_payload, resolve_content_encoding, ContentEncoding, QueueSection,
};
use crate::logger::event::{DecisionEvent, OutcomeEvent};
use crate::logger::preamble::{frame_message, message_type};
use crate::logger::queue::{EventQueue, QueueMode};
use crate::logger::sender::EventSender;
use crate::model::watchdog::ErrorHandler;

/// One logging pipeline: serialize, optionally dedup and compress, frame
/// with the preamble, queue, and let the background batcher transmit.
/// Interaction and observation queues are two independent instances.
pub struct EventLogger {
    queue: Arc<EventQueue>,
    batcher: EventBatcher,
    encoding: ContentEncoding,
    dedup: Option<Mutex<DedupDict>>,
    msg_type: u16,
    high_water_mark: usize,
    errors: ErrorHandler,
}

impl EventLogger {
    pub fn build(
        cfg: &Configuration,
        section: QueueSection,
        protocol_version: i64,
        mut sender: Box<dyn EventSender>,
        errors: ErrorHandler,
    ) -> RlResult<Self> {
        let encoding = resolve_content_encoding(cfg, section, protocol_version)?;
        sender.init()?;

        let capacity_key = match section {
            QueueSection::Interaction => names::INTERACTION_SEND_QUEUE_MAX_CAPACITY_KB,
            QueueSection::Observation => names::OBSERVATION_SEND_QUEUE_MAX_CAPACITY_KB,
        };
        let capacity_bytes =
            cfg.get_int(capacity_key, values::DEFAULT_QUEUE_MAX_CAPACITY_KB).max(1) as usize * 1024;
        let queue = Arc::new(EventQueue::new(capacity_bytes, QueueMode::from_config(cfg)));

        let batcher_config = BatcherConfig::from_config(cfg, section);
        let batcher =
            EventBatcher::start(Arc::clone(&queue), sender, batcher_config, errors.clone());

        let msg_type = match section {
            QueueSection::Interaction => message_type::JSON_RANKING_EVENT_COLLECTION,
            QueueSection::Observation => message_type::JSON_OUTCOME_EVENT_COLLECTION,
        };

        Ok(Self {
            queue,
            batcher,
            encoding,
            dedup: encoding.dedup.then(|| Mutex::new(DedupDict::new())),
            msg_type,
            high_water_mark: batcher_config.high_water_mark,
            errors,
        })
    }

    pub fn log_decision(&self, mut event: DecisionEvent) -> RlResult<()> {
        if let Some(dict) = &self.dedup {
            let (edited, _ids) = dict
                .lock()
                .expect("dedup lock")
                .transform_payload(&event.context)?;
            event.context = edited;
        }
        let payload = event.to_json_line()?;
        self.enqueue(payload)
    }

    pub fn log_outcome(&self, event: OutcomeEvent) -> RlResult<()> {
        let payload = event.to_json_line()?;
        self.enqueue(payload)
    }

    fn enqueue(&self, payload: Vec<u8>) -> RlResult<()> {
        let payload = if self.encoding.compress {
            compress_payload(&payload)?
        } else {
            payload
        };
        let framed = frame_message(self.msg_type, &payload)?;
        let dropped = self.queue.push(framed);
        if dropped > 0 {
            self.errors.report(RlError::new(
                ErrorCode::BackgroundQueueOverflow,
                format!("queue over capacity, dropped {dropped} oldest record(s)"),
            ));
        }
        if self.queue.size_bytes() >= self.high_water_mark {
            self.batcher.notify_high_water();
        }
        Ok(())
    }

    /// Stop the drain thread after a final flush. Also runs on drop.
    pub fn shutdown(&mut self) {
        self.batcher.stop();
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
