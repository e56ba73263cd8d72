//! Content hashing for dependency-cache invalidation.

use sha2::{Digest, Sha256};

/// SHA-256 of a calculation expression, as a 64-character lowercase hex
/// string. Persisted dependency rows carry this hash so a changed expression
/// invalidates its cached dependencies.
pub fn expression_hash(expression: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(expression.as_bytes());
    format!("{:x}", hasher.finalize())
}
