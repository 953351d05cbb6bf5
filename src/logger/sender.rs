// src/logger/sender.rs
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::{ErrorCode, RlError, RlResult};

/// Opaque sender collaborator: takes one framed buffer, delivers it or
/// fails. Retry is the pipeline's job, not the sender's.
pub trait EventSender: Send {
    fn init(&mut self) -> RlResult<()>;
    fn send(&mut self, framed: &[u8]) -> RlResult<()>;
}

/// Appends framed records to a local file. Offline/testing transport.
pub struct FileSender {
    path: PathBuf,
    file: Option<File>,
}

impl FileSender {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), file: None }
    }
}

impl EventSender for FileSender {
    fn init(&mut self) -> RlResult<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.file = Some(file);
        Ok(())
    }

    fn send(&mut self, framed: &[u8]) -> RlResult<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| RlError::new(ErrorCode::NotInitialized, "file sender not initialized"))?;
        file.write_all(framed)?;
        file.flush()?;
        Ok(())
    }
}

/// Collects sent buffers in memory, with an optional scripted failure
/// budget so retry behavior can be exercised.
#[derive(Default)]
pub struct MockSenderState {
    pub sent: Vec<Vec<u8>>,
    pub failures_remaining: usize,
    pub attempts: usize,
}

pub struct MockSender {
    state: Arc<Mutex<MockSenderState>>,
}

impl MockSender {
    pub fn new() -> (Self, Arc<Mutex<MockSenderState>>) {
        let state = Arc::new(Mutex::new(MockSenderState::default()));
        (Self { state: Arc::clone(&state) }, state)
    }

    pub fn with_state(state: Arc<Mutex<MockSenderState>>) -> Self {
        Self { state }
    }
}

impl EventSender for MockSender {
    fn init(&mut self) -> RlResult<()> {
        Ok(())
    }

    fn send(&mut self, framed: &[u8]) -> RlResult<()> {
        let mut state = self.state.lock().expect("mock sender lock");
        state.attempts += 1;
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(RlError::new(ErrorCode::SenderError, "scripted send failure"));
        }
        state.sent.push(framed.to_vec());
        Ok(())
    }
}
