use crate::error::CodecError;
use crate::frame::{DiagnosticFrame, FRAME_LEN};
use rand::{Rng, RngCore};

/// Shared pool of pseudo-random bytes that outgoing payloads are cut from.
///
/// Filling a fresh buffer from an RNG for every message is wasteful at load-test rates,
/// so messages copy a window starting at a random offset, wrapping around the end.
pub struct PayloadPool {
    bytes: Vec<u8>,
}

impl PayloadPool {
    pub fn new<R: RngCore>(size: usize, rng: &mut R) -> Self {
        let mut bytes = vec![0u8; size.max(1)];
        rng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Fill `out` with pool bytes starting at a random offset.
    pub fn fill<R: Rng>(&self, out: &mut [u8], rng: &mut R) {
        let mut pos = rng.gen_range(0..self.bytes.len());
        let mut written = 0;
        while written < out.len() {
            let n = (out.len() - written).min(self.bytes.len() - pos);
            out[written..written + n].copy_from_slice(&self.bytes[pos..pos + n]);
            written += n;
            pos = (pos + n) % self.bytes.len();
        }
    }

    /// Build a message of exactly `size` bytes.
    ///
    /// With a frame and `size >= 48` the first 48 bytes are the diagnostic header.
    pub fn message<R: Rng>(
        &self,
        size: usize,
        frame: Option<&DiagnosticFrame>,
        rng: &mut R,
    ) -> Result<Vec<u8>, CodecError> {
        let mut out = vec![0u8; size];
        match frame {
            Some(frame) if size >= FRAME_LEN => {
                frame.write_to(&mut out)?;
                self.fill(&mut out[FRAME_LEN..], rng);
            }
            _ => self.fill(&mut out, rng),
        }
        Ok(out)
    }
}
