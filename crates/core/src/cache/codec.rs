//! Bridges the compression flag and the compressor for every adapter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::Error;
use crate::compress::{CompressionAlgorithm, Compressor};

/// Encodes payloads on the way into storage and decodes them on the way out.
///
/// The flag is read on every call, so toggling it affects subsequent
/// operations only. Rows already stored keep whatever encoding they were
/// written with.
#[derive(Debug)]
pub struct PayloadCodec {
    compressor: Arc<dyn Compressor>,
    enabled: AtomicBool,
}

impl Default for PayloadCodec {
    fn default() -> Self {
        Self::new(CompressionAlgorithm::default().compressor())
    }
}

impl PayloadCodec {
    /// Codec with compression initially disabled.
    pub fn new(compressor: Arc<dyn Compressor>) -> Self {
        Self { compressor, enabled: AtomicBool::new(false) }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Swap the compressor, keeping the current flag.
    pub fn replace_compressor(&mut self, compressor: Arc<dyn Compressor>) {
        self.compressor = compressor;
    }

    pub fn encode(&self, value: &[u8]) -> Result<Vec<u8>, Error> {
        if !self.is_enabled() {
            return Ok(value.to_vec());
        }
        self.compressor.compress(value).map_err(Error::Compress)
    }

    /// Decode a stored payload. A payload the compressor rejects is reported
    /// as [`Error::Corrupted`].
    pub fn decode(&self, key: &str, stored: Vec<u8>) -> Result<Vec<u8>, Error> {
        if !self.is_enabled() {
            return Ok(stored);
        }
        self.compressor.decompress(&stored).map_err(|source| {
            tracing::error!(key, error = %source, "cached payload failed to decompress");
            Error::Corrupted { key: key.to_string(), source }
        })
    }
}
