//! Content-addressed hashing for packs and request inputs.
//!
//! Packs and raw-input maps are fingerprinted via SHA-256 over their
//! canonical JSON form. Because every map in the data model is a
//! `BTreeMap` (or an ordered `Vec`), serialization is key-ordered and the
//! fingerprint is stable across runs.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 content hash.
pub type ContentHash = [u8; 32];

/// Compute the SHA-256 content hash of any serializable value.
pub fn content_hash<T: Serialize>(value: &T) -> ContentHash {
    let json = serde_json::to_vec(value).expect("serialization should not fail");
    let mut hasher = Sha256::new();
    hasher.update(&json);
    hasher.finalize().into()
}

/// Format a content hash as a hex string.
pub fn hash_hex(hash: &ContentHash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Hex-encoded SHA-256 fingerprint of a serializable value.
pub fn fingerprint<T: Serialize>(value: &T) -> String {
    hash_hex(&content_hash(value))
}
