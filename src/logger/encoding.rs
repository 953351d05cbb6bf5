// src/logger/encoding.rs
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::config::{names, Configuration};
use crate::error::{ErrorCode, RlError, RlResult};

/// Resolved content-encoding toggles for one logging queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContentEncoding {
    pub compress: bool,
    pub dedup: bool,
}

impl ContentEncoding {
    pub fn is_identity(&self) -> bool {
        !self.compress && !self.dedup
    }
}

/// Read the encoding toggles for a queue section and enforce the protocol
/// gate. Non-identity encoding under protocol version 1 is a static
/// configuration contradiction, so it fails at init, not per record.
pub fn resolve_content_encoding(
    cfg: &Configuration,
    section: QueueSection,
    protocol_version: i64,
) -> RlResult<ContentEncoding> {
    let (compress_key, dedup_key) = match section {
        QueueSection::Interaction => {
            (names::INTERACTION_USE_COMPRESSION, names::INTERACTION_USE_DEDUP)
        }
        QueueSection::Observation => {
            (names::OBSERVATION_USE_COMPRESSION, names::OBSERVATION_USE_DEDUP)
        }
    };
    let encoding = ContentEncoding {
        compress: cfg.get_bool(compress_key, false),
        dedup: cfg.get_bool(dedup_key, false),
    };
    if !encoding.is_identity() && protocol_version < 2 {
        return Err(RlError::new(
            ErrorCode::ContentEncodingError,
            format!(
                "content encoding requires protocol version >= 2, configured version is {protocol_version}"
            ),
        ));
    }
    Ok(encoding)
}

/// Which logical queue a logger serves. Interaction and observation queues
/// are configured independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueSection {
    Interaction,
    Observation,
}

pub fn compress_payload(payload: &[u8]) -> RlResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload)?;
    Ok(encoder.finish()?)
}

pub fn decompress_payload(payload: &[u8]) -> RlResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(payload);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
