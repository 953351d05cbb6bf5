// src/trace.rs
use std::sync::Arc;

use crate::config::{names, values, Configuration};
use crate::error::RlResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl TraceLevel {
    fn tag(self) -> &'static str {
        match self {
            TraceLevel::Error => "ERROR",
            TraceLevel::Warn => "WARN",
            TraceLevel::Info => "INFO",
            TraceLevel::Debug => "DEBUG",
        }
    }
}

/// API tracing sink. Implementations must be callable from background
/// threads, so the trait is Send + Sync.
pub trait TraceLogger: Send + Sync {
    fn log(&self, level: TraceLevel, msg: &str);
}

/// Discards everything. The default.
pub struct NullTraceLogger;

impl TraceLogger for NullTraceLogger {
    fn log(&self, _level: TraceLevel, _msg: &str) {}
}

/// Writes one line per message to stderr.
pub struct ConsoleTraceLogger;

impl TraceLogger for ConsoleTraceLogger {
    fn log(&self, level: TraceLevel, msg: &str) {
        eprintln!("[rlclient] [{}] {}", level.tag(), msg);
    }
}

/// Build the trace logger named in the configuration.
pub fn create_trace_logger(cfg: &Configuration) -> RlResult<Arc<dyn TraceLogger>> {
    let impl_name = cfg.get(names::TRACE_LOG_IMPLEMENTATION, values::NULL_TRACE_LOGGER);
    if impl_name == values::CONSOLE_TRACE_LOGGER {
        Ok(Arc::new(ConsoleTraceLogger))
    } else {
        Ok(Arc::new(NullTraceLogger))
    }
}

pub fn trace_info(trace: &dyn TraceLogger, msg: &str) {
    trace.log(TraceLevel::Info, msg);
}

pub fn trace_warn(trace: &dyn TraceLogger, msg: &str) {
    trace.log(TraceLevel::Warn, msg);
}

pub fn trace_error(trace: &dyn TraceLogger, msg: &str) {
    trace.log(TraceLevel::Error, msg);
}
