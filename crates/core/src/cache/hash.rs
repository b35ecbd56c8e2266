//! Stable digests for cache keys.

use sha2::{Digest, Sha256};

/// Compute the storage digest for a cache key's components.
///
/// Each component is prefixed with its byte length, and the cursor with a
/// presence tag, so distinct component tuples never share an input.
pub fn compute_cache_key(kind: &str, subject: &str, cursor: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    update_field(&mut hasher, kind);
    update_field(&mut hasher, subject);
    match cursor {
        Some(cursor) => {
            hasher.update([1u8]);
            update_field(&mut hasher, cursor);
        }
        None => hasher.update([0u8]),
    }
    hex::encode(hasher.finalize())
}

fn update_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_be_bytes());
    hasher.update(field.as_bytes());
}
