//! PostgreSQL v3 message codec, without I/O.

pub mod backend;
pub mod frontend;
pub mod primitive;

use zerocopy::byteorder::big_endian::I32 as I32BE;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};

/// Message header shared by both directions (zero-copy)
///
/// - tag: 1 byte
/// - length: 4 bytes (big-endian, counts itself but not the tag)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct MessageHeader {
    pub tag: u8,
    length: I32BE,
}

impl MessageHeader {
    pub fn encode(tag: u8, body_len: usize) -> Result<Self> {
        let length = i32::try_from(body_len + 4)
            .map_err(|_| Error::BadUsageError(format!("message too large: {}", body_len)))?;
        Ok(Self {
            tag,
            length: I32BE::new(length),
        })
    }

    /// Length of the message body
    pub fn body_len(&self) -> Result<usize> {
        let length = self.length.get();
        usize::try_from(length)
            .ok()
            .and_then(|len| len.checked_sub(4))
            .ok_or_else(|| Error::ProtocolError(format!("invalid message length: {}", length)))
    }
}
