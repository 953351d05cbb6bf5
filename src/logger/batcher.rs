// src/logger/batcher.rs
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Sender};

use crate::config::{names, values, Configuration};
use crate::error::{ErrorCode, RlError};
use crate::logger::encoding::QueueSection;
use crate::logger::queue::EventQueue;
use crate::logger::sender::EventSender;
use crate::model::watchdog::ErrorHandler;

#[derive(Clone, Copy, Debug)]
pub struct BatcherConfig {
    pub batch_interval: Duration,
    pub high_water_mark: usize,
    pub max_retries: usize,
}

impl BatcherConfig {
    pub fn from_config(cfg: &Configuration, section: QueueSection) -> Self {
        let (interval_key, hwm_key) = match section {
            QueueSection::Interaction => (
                names::INTERACTION_SEND_BATCH_INTERVAL_MS,
                names::INTERACTION_SEND_HIGH_WATER_MARK,
            ),
            QueueSection::Observation => (
                names::OBSERVATION_SEND_BATCH_INTERVAL_MS,
                names::OBSERVATION_SEND_HIGH_WATER_MARK,
            ),
        };
        Self {
            batch_interval: Duration::from_millis(
                cfg.get_int(interval_key, values::DEFAULT_BATCH_INTERVAL_MS).max(1) as u64,
            ),
            high_water_mark: cfg.get_int(hwm_key, values::DEFAULT_HIGH_WATER_MARK as i64).max(1)
                as usize,
            max_retries: cfg
                .get_int(names::SEND_MAX_RETRIES, values::DEFAULT_SEND_MAX_RETRIES)
                .max(0) as usize,
        }
    }
}

/// Background drain for one logging queue. Wakes on a timer, on a
/// high-water-mark nudge, or on shutdown; each drain hands records to the
/// sender in enqueue order, retrying a failed record in place so a retry
/// can never reorder the stream.
pub struct EventBatcher {
    wake_tx: Sender<()>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl EventBatcher {
    pub fn start(
        queue: Arc<EventQueue>,
        mut sender: Box<dyn EventSender>,
        config: BatcherConfig,
        errors: ErrorHandler,
    ) -> Self {
        let (wake_tx, wake_rx) = bounded::<()>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("event batcher".to_string())
            .spawn(move || loop {
                select! {
                    recv(stop_rx) -> _ => {
                        // final flush before exiting
                        drain(&queue, sender.as_mut(), &config, &errors);
                        break;
                    }
                    recv(wake_rx) -> _ => drain(&queue, sender.as_mut(), &config, &errors),
                    default(config.batch_interval) => drain(&queue, sender.as_mut(), &config, &errors),
                }
            })
            .expect("spawn batcher thread");
        Self { wake_tx, stop_tx: Some(stop_tx), handle: Some(handle) }
    }

    /// Nudge the drain thread without waiting for the timer. Lossy by
    /// design: one pending nudge is enough.
    pub fn notify_high_water(&self) {
        let _ = self.wake_tx.try_send(());
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EventBatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn drain(
    queue: &EventQueue,
    sender: &mut dyn EventSender,
    config: &BatcherConfig,
    errors: &ErrorHandler,
) {
    while let Some(record) = queue.pop() {
        let mut attempts = 0usize;
        loop {
            match sender.send(&record) {
                Ok(()) => break,
                Err(e) => {
                    attempts += 1;
                    if attempts > config.max_retries {
                        errors.report(RlError::new(
                            ErrorCode::SenderError,
                            format!("record dropped after {attempts} attempts: {e}"),
                        ));
                        break;
                    }
                }
            }
        }
    }
}
