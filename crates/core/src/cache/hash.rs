//! Storage digests for cache keys.

use sha2::{Digest, Sha256};

/// Compute the fixed-width digest a cache key is stored under.
///
/// Keys are full serialized requests and may be arbitrarily long, so the
/// store indexes on this digest and keeps the key text beside it.
pub fn key_digest(namespace: &str, key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b"\n");
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}
