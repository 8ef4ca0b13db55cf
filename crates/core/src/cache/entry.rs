//! Persisted shape of one cache entry.

/// One row of the `cache` table.
///
/// `value` holds the payload exactly as written, so it is the compressed
/// encoding when the adapter had compression enabled at store time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub value: Option<Vec<u8>>,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self { key: key.into(), value: Some(value) }
    }
}
