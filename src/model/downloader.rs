// src/model/downloader.rs
use std::sync::Arc;

use crate::error::RlResult;
use crate::model::predictor::{ModelData, ModelTransport};
use crate::trace::{trace_info, TraceLogger};

/// Polls the transport and hands fresh model bytes to the update callback.
/// Skips the callback entirely when the refresh counter has not moved, so
/// an unchanged model never triggers a predictor rebuild.
pub struct ModelDownloader {
    transport: Arc<dyn ModelTransport>,
    trace: Arc<dyn TraceLogger>,
    on_update: Box<dyn FnMut(ModelData) -> RlResult<()> + Send>,
    last_refresh_count: u64,
}

impl ModelDownloader {
    pub fn new(
        transport: Arc<dyn ModelTransport>,
        trace: Arc<dyn TraceLogger>,
        on_update: Box<dyn FnMut(ModelData) -> RlResult<()> + Send>,
    ) -> Self {
        Self { transport, trace, on_update, last_refresh_count: 0 }
    }

    pub fn run_once(&mut self) -> RlResult<()> {
        let data = self.transport.get_data()?;
        if data.refresh_count == 0 || data.refresh_count == self.last_refresh_count {
            trace_info(self.trace.as_ref(), "model was not updated since previous download");
            return Ok(());
        }
        let count = data.refresh_count;
        (self.on_update)(data)?;
        self.last_refresh_count = count;
        trace_info(
            self.trace.as_ref(),
            &format!("model downloaded, refresh count {count}"),
        );
        Ok(())
    }
}
