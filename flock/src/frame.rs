//! Binary diagnostic frame carried on `#`-prefixed data-channel labels.
//!
//! Layout (48 bytes, big endian):
//!
//! | offset | len | field                         |
//! |--------|-----|-------------------------------|
//! | 0      | 6   | magic `ZAKURO`                |
//! | 6      | 8   | send time, microseconds       |
//! | 14     | 8   | per-label counter             |
//! | 22     | 26  | connection id, NUL padded     |
use crate::error::CodecError;
use std::time::{SystemTime, UNIX_EPOCH};

pub const FRAME_MAGIC: &[u8; 6] = b"ZAKURO";
pub const FRAME_LEN: usize = 48;
pub const CONNECTION_ID_LEN: usize = 26;

const TIME_OFFSET: usize = 6;
const COUNTER_OFFSET: usize = 14;
const CONNECTION_ID_OFFSET: usize = 22;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticFrame {
    pub timestamp_us: u64,
    pub counter: u64,
    pub connection_id: String,
}

impl DiagnosticFrame {
    /// A frame stamped with the current wall clock.
    pub fn now(counter: u64, connection_id: &str) -> Self {
        let timestamp_us = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or_default();
        Self {
            timestamp_us,
            counter,
            connection_id: connection_id.to_string(),
        }
    }

    /// Write the header into the first [`FRAME_LEN`] bytes of `buf`.
    ///
    /// Connection ids longer than 26 bytes are truncated.
    pub fn write_to(&self, buf: &mut [u8]) -> Result<(), CodecError> {
        if buf.len() < FRAME_LEN {
            return Err(CodecError::Short(buf.len()));
        }
        buf[..TIME_OFFSET].copy_from_slice(FRAME_MAGIC);
        buf[TIME_OFFSET..COUNTER_OFFSET].copy_from_slice(&self.timestamp_us.to_be_bytes());
        buf[COUNTER_OFFSET..CONNECTION_ID_OFFSET].copy_from_slice(&self.counter.to_be_bytes());

        let id = self.connection_id.as_bytes();
        let n = id.len().min(CONNECTION_ID_LEN);
        let slot = &mut buf[CONNECTION_ID_OFFSET..FRAME_LEN];
        slot.fill(0);
        slot[..n].copy_from_slice(&id[..n]);
        Ok(())
    }

    pub fn parse(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() < FRAME_LEN {
            return Err(CodecError::Short(data.len()));
        }
        if &data[..TIME_OFFSET] != FRAME_MAGIC {
            return Err(CodecError::Magic);
        }

        let mut word = [0u8; 8];
        word.copy_from_slice(&data[TIME_OFFSET..COUNTER_OFFSET]);
        let timestamp_us = u64::from_be_bytes(word);
        word.copy_from_slice(&data[COUNTER_OFFSET..CONNECTION_ID_OFFSET]);
        let counter = u64::from_be_bytes(word);

        let id = &data[CONNECTION_ID_OFFSET..FRAME_LEN];
        let end = id.iter().position(|b| *b == 0).unwrap_or(id.len());
        let connection_id = String::from_utf8_lossy(&id[..end]).into_owned();

        Ok(Self {
            timestamp_us,
            counter,
            connection_id,
        })
    }
}
