// src/background.rs
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

use crate::error::RlResult;
use crate::model::watchdog::ErrorHandler;

/// Runs a task on its own thread at a fixed interval until stopped. Task
/// failures go to the error handler; the worker keeps ticking so a
/// transient failure does not kill the loop.
pub struct PeriodicWorker {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicWorker {
    /// Start the worker. The first iteration runs on the worker thread
    /// straight away, then once per interval.
    pub fn start<F>(
        name: &str,
        interval: Duration,
        errors: ErrorHandler,
        mut task: F,
    ) -> Self
    where
        F: FnMut() -> RlResult<()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let thread_name = name.to_string();
        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || loop {
                if let Err(e) = task() {
                    errors.report(e);
                }
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    // stop requested or the handle was dropped
                    _ => break,
                }
            })
            .expect("spawn periodic worker");
        Self { stop_tx: Some(stop_tx), handle: Some(handle) }
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

impl Drop for PeriodicWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
