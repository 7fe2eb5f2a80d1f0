//! Shared SHA-256 hex digest helper.
//!
//! The audit chain and document content hashes both use this encoding,
//! so it lives in one place.

use sha2::{Digest, Sha256};

/// Compute a lowercase SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}
