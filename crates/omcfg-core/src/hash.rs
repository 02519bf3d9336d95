//! Content hashing for configuration artifacts.
//!
//! Downstream build steps key their caches on the hash of the configuration
//! they consume. The hash covers the serialized JSON form, so two builds
//! producing identical configuration hash identically.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 content hash.
pub type ContentHash = [u8; 32];

/// Hash any serializable value.
pub fn content_hash<T: Serialize>(value: &T) -> serde_json::Result<ContentHash> {
    let json = serde_json::to_vec(value)?;
    let mut hasher = Sha256::new();
    hasher.update(&json);
    Ok(hasher.finalize().into())
}

/// Lowercase hex rendering of a hash.
pub fn hash_hex(hash: &ContentHash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}
