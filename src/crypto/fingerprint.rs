use crate::error::EraseResult;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA-256 over the canonical JSON encoding of `value`, hex encoded.
pub fn sha256_fingerprint<T: Serialize>(value: &T) -> EraseResult<String> {
    let bytes = serde_json::to_vec(value)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}
