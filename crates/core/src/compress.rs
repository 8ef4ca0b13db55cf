//! Payload compression.
//!
//! The cache treats compression as an opaque byte transform. Two built-in
//! algorithms are provided; callers can install their own [`Compressor`].

use std::io::{Read, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Byte transform applied to payloads when compression is enabled.
///
/// `decompress(compress(v))` must return `v` for every input.
pub trait Compressor: Send + Sync + std::fmt::Debug {
    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>>;

    fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>>;
}

/// Built-in compression algorithms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    /// Zstandard, better ratio (default)
    #[default]
    Zstd,
    /// LZ4 frame format, faster
    Lz4,
}

impl CompressionAlgorithm {
    /// Shared compressor instance for this algorithm.
    pub fn compressor(self) -> Arc<dyn Compressor> {
        match self {
            CompressionAlgorithm::Zstd => Arc::new(ZstdCompressor::default()),
            CompressionAlgorithm::Lz4 => Arc::new(Lz4Compressor::default()),
        }
    }
}

/// Zstandard compressor.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCompressor {
    /// Compression level (1-22)
    pub level: i32,
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl Compressor for ZstdCompressor {
    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let compressed = zstd::encode_all(data, self.level)?;
        debug!("zstd compressed: {} → {} bytes", data.len(), compressed.len());
        Ok(compressed)
    }

    fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let decompressed = zstd::decode_all(data)?;
        debug!("zstd decompressed: {} → {} bytes", data.len(), decompressed.len());
        Ok(decompressed)
    }
}

/// LZ4 frame compressor.
#[derive(Debug, Clone, Copy)]
pub struct Lz4Compressor {
    pub level: u32,
}

impl Default for Lz4Compressor {
    fn default() -> Self {
        Self { level: 4 }
    }
}

impl Compressor for Lz4Compressor {
    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut encoder = lz4::EncoderBuilder::new().level(self.level).build(Vec::new())?;
        encoder.write_all(data)?;
        let (compressed, result) = encoder.finish();
        result?;

        debug!("lz4 compressed: {} → {} bytes", data.len(), compressed.len());
        Ok(compressed)
    }

    fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut decoder = lz4::Decoder::new(data)?;
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;

        debug!("lz4 decompressed: {} → {} bytes", data.len(), decompressed.len());
        Ok(decompressed)
    }
}
