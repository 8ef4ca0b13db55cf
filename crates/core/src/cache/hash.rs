//! Request fingerprints used as cache keys.

use sha2::{Digest, Sha256};

/// Compute a deterministic cache key for an outgoing request.
///
/// The method is case-insensitive; the URL and body are taken verbatim, so
/// callers should normalize them first if equivalent spellings must collide.
pub fn request_key(method: &str, url: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(body);
    hex::encode(hasher.finalize())
}
