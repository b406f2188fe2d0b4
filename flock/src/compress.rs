//! zlib framing for data-channel labels the server flagged as compressed.
use crate::error::CodecError;
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use flock_core::MAX_DECOMPRESSED_SIZE;
use std::collections::HashSet;
use std::io::{Read, Write};

pub fn compress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflate `data`, refusing anything that grows past [`MAX_DECOMPRESSED_SIZE`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let limit = MAX_DECOMPRESSED_SIZE;
    let mut decoder = ZlibDecoder::new(data).take(limit as u64 + 1);
    let mut out = Vec::with_capacity(data.len().saturating_mul(2).min(limit));
    decoder.read_to_end(&mut out)?;
    if out.len() > limit {
        return Err(CodecError::TooLarge(limit));
    }
    Ok(out)
}

/// Set of labels whose payloads are zlib-compressed in both directions.
#[derive(Debug, Clone, Default)]
pub struct CompressedLabels(HashSet<String>);

impl CompressedLabels {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(labels.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn encode(&self, label: &str, data: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        if self.contains(label) {
            compress(&data)
        } else {
            Ok(data)
        }
    }

    pub fn decode(&self, label: &str, data: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        if self.contains(label) {
            decompress(&data)
        } else {
            Ok(data)
        }
    }
}
