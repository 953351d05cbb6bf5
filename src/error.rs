// src/error.rs
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Stable numeric codes for every failure the library can surface.
/// Codes are part of the wire-adjacent contract (they show up in logs and
/// in callback payloads), so the discriminants are explicit and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,
    InvalidArgument = 1,
    NotInitialized = 2,
    ProtocolNotSupported = 3,
    ContentEncodingError = 4,
    ModelUpdateError = 5,
    ExplorationError = 6,
    ModelRankError = 7,
    UnhandledBackgroundErrorOccurred = 8,
    BaselineActionsNotDefined = 9,
    BackgroundQueueOverflow = 10,
    PreambleError = 11,
    SenderError = 12,
    JsonParseError = 13,
}

impl ErrorCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            ErrorCode::Success => "success",
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::NotInitialized => "not_initialized",
            ErrorCode::ProtocolNotSupported => "protocol_not_supported",
            ErrorCode::ContentEncodingError => "content_encoding_error",
            ErrorCode::ModelUpdateError => "model_update_error",
            ErrorCode::ExplorationError => "exploration_error",
            ErrorCode::ModelRankError => "model_rank_error",
            ErrorCode::UnhandledBackgroundErrorOccurred => "unhandled_background_error_occurred",
            ErrorCode::BaselineActionsNotDefined => "baseline_actions_not_defined",
            ErrorCode::BackgroundQueueOverflow => "background_queue_overflow",
            ErrorCode::PreambleError => "preamble_error",
            ErrorCode::SenderError => "sender_error",
            ErrorCode::JsonParseError => "json_parse_error",
        };
        write!(f, "{name}")
    }
}

/// Error carrier for the whole crate: a code from the taxonomy plus a
/// human-readable message. The hot path only ever matches on the code.
#[derive(Clone, Debug)]
pub struct RlError {
    code: ErrorCode,
    message: String,
}

impl RlError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for RlError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} ({}): {}", self.code, self.code.as_i32(), self.message)
    }
}

impl std::error::Error for RlError {}

impl From<serde_json::Error> for RlError {
    fn from(e: serde_json::Error) -> Self {
        RlError::new(ErrorCode::JsonParseError, format!("JSON parse error: {e}"))
    }
}

impl From<std::io::Error> for RlError {
    fn from(e: std::io::Error) -> Self {
        RlError::new(ErrorCode::SenderError, format!("IO error: {e}"))
    }
}

pub type RlResult<T> = Result<T, RlError>;

/// Shorthand constructors for the common codes.
pub fn invalid_argument(msg: impl Into<String>) -> RlError {
    RlError::new(ErrorCode::InvalidArgument, msg)
}

pub fn exploration_error(msg: impl Into<String>) -> RlError {
    RlError::new(ErrorCode::ExplorationError, msg)
}

pub fn model_rank_error(msg: impl Into<String>) -> RlError {
    RlError::new(ErrorCode::ModelRankError, msg)
}

pub fn model_update_error(msg: impl Into<String>) -> RlError {
    RlError::new(ErrorCode::ModelUpdateError, msg)
}

pub fn protocol_not_supported(msg: impl Into<String>) -> RlError {
    RlError::new(ErrorCode::ProtocolNotSupported, msg)
}
