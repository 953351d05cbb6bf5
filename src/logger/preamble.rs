// src/logger/preamble.rs
use crate::error::{ErrorCode, RlError, RlResult};

/// Message type identifiers carried in the preamble.
///
/// WARNING: do not reuse message ids. Services already in the system key
/// their parsers on these values. Ids only get added to this list.
pub mod message_type {
    pub const UNKNOWN: u16 = 0;
    pub const JSON_RANKING_EVENT_COLLECTION: u16 = 3;
    pub const JSON_OUTCOME_EVENT_COLLECTION: u16 = 4;
}

pub const PREAMBLE_VERSION: u8 = 0;

/// Fixed 8-byte header prefixed to every transmitted record:
/// `[reserved:u8][version:u8][msg_type:u16 BE][payload_len:u32 BE]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Preamble {
    pub reserved: u8,
    pub version: u8,
    pub msg_type: u16,
    pub msg_size: u32,
}

impl Preamble {
    pub const SIZE: usize = 8;

    pub fn write_to_bytes(&self, buffer: &mut [u8]) -> RlResult<()> {
        if buffer.len() < Self::SIZE {
            return Err(RlError::new(ErrorCode::PreambleError, "preamble buffer too small"));
        }
        buffer[0] = self.reserved;
        buffer[1] = self.version;
        buffer[2..4].copy_from_slice(&self.msg_type.to_be_bytes());
        buffer[4..8].copy_from_slice(&self.msg_size.to_be_bytes());
        Ok(())
    }

    pub fn read_from_bytes(buffer: &[u8]) -> RlResult<Self> {
        if buffer.len() < Self::SIZE {
            return Err(RlError::new(ErrorCode::PreambleError, "preamble buffer too small"));
        }
        Ok(Self {
            reserved: buffer[0],
            version: buffer[1],
            msg_type: u16::from_be_bytes([buffer[2], buffer[3]]),
            msg_size: u32::from_be_bytes([buffer[4], buffer[5], buffer[6], buffer[7]]),
        })
    }
}

/// Frame a payload: 8-byte preamble followed by exactly `payload.len()`
/// bytes. The length field always matches the actual byte count.
pub fn frame_message(msg_type: u16, payload: &[u8]) -> RlResult<Vec<u8>> {
    let msg_size = u32::try_from(payload.len())
        .map_err(|_| RlError::new(ErrorCode::PreambleError, "payload exceeds u32 length"))?;
    let pre = Preamble {
        reserved: 0,
        version: PREAMBLE_VERSION,
        msg_type,
        msg_size,
    };
    let mut framed = vec![0u8; Preamble::SIZE + payload.len()];
    pre.write_to_bytes(&mut framed[..Preamble::SIZE])?;
    framed[Preamble::SIZE..].copy_from_slice(payload);
    Ok(framed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_layout_is_bit_exact() {
        let pre = Preamble {
            reserved: 0,
            version: 1,
            msg_type: 0x0304,
            msg_size: 0x01020304,
        };
        let mut buf = [0u8; Preamble::SIZE];
        pre.write_to_bytes(&mut buf).unwrap();
        assert_eq!(buf, [0, 1, 0x03, 0x04, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(Preamble::read_from_bytes(&buf).unwrap(), pre);
    }

    #[test]
    fn framed_length_matches_payload() {
        let payload = b"hello world";
        let framed = frame_message(message_type::JSON_RANKING_EVENT_COLLECTION, payload).unwrap();
        assert_eq!(framed.len(), Preamble::SIZE + payload.len());
        let pre = Preamble::read_from_bytes(&framed).unwrap();
        assert_eq!(pre.msg_size as usize, payload.len());
        assert_eq!(&framed[Preamble::SIZE..], payload);
    }

    #[test]
    fn short_buffers_are_rejected() {
        let pre = Preamble::default();
        let mut short = [0u8; 4];
        assert!(pre.write_to_bytes(&mut short).is_err());
        assert!(Preamble::read_from_bytes(&short).is_err());
    }
}
