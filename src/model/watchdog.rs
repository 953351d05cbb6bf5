// src/model/watchdog.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::RlError;

/// Shared cell through which background threads surface failures to the
/// foreground. The flag is sticky: once set, the next caller-visible call
/// fails with `unhandled_background_error_occurred` and the flag clears.
#[derive(Default)]
pub struct Watchdog {
    unhandled_error: AtomicBool,
    last_error: Mutex<Option<RlError>>,
}

impl Watchdog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unhandled_background_error(&self, err: RlError) {
        *self.last_error.lock().expect("watchdog lock") = Some(err);
        self.unhandled_error.store(true, Ordering::Release);
    }

    /// True if a background error is pending; clears the flag so the error
    /// is reported exactly once.
    pub fn take_background_error_report(&self) -> bool {
        self.unhandled_error.swap(false, Ordering::AcqRel)
    }

    pub fn has_background_error_been_reported(&self) -> bool {
        self.unhandled_error.load(Ordering::Acquire)
    }

    pub fn last_error(&self) -> Option<RlError> {
        self.last_error.lock().expect("watchdog lock").clone()
    }
}

/// Caller-registered error callback. Invoked on background threads, so the
/// caller's record-keeping must be thread-safe on their side.
pub type ErrorCallback = Arc<dyn Fn(&RlError) + Send + Sync>;

/// Fans a background error out to the watchdog and, if registered, the
/// caller's callback. Never invoked on the hot path.
#[derive(Clone)]
pub struct ErrorHandler {
    watchdog: Arc<Watchdog>,
    callback: Option<ErrorCallback>,
}

impl ErrorHandler {
    pub fn new(watchdog: Arc<Watchdog>, callback: Option<ErrorCallback>) -> Self {
        Self { watchdog, callback }
    }

    pub fn report(&self, err: RlError) {
        // Flag first: a callback that reacts to the notification must
        // already see the watchdog tripped.
        if let Some(cb) = &self.callback {
            self.watchdog.set_unhandled_background_error(err.clone());
            cb(&err);
        } else {
            self.watchdog.set_unhandled_background_error(err);
        }
    }

    pub fn watchdog(&self) -> &Arc<Watchdog> {
        &self.watchdog
    }
}
