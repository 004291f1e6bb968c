//! Pair hash adapters
//!
//! The tree only needs `Fn(&Root, &Root) -> Root`; these wrap the
//! usual digests so callers do not have to.

use sha2::{Digest, Sha256};

use super::Root;

/// SHA-256 of `left || right`, the standard SSZ node hash.
pub fn sha256_pair(left: &Root, right: &Root) -> Root {
    let mut hasher = Sha256::new();
    hasher.update(left.as_ref());
    hasher.update(right.as_ref());
    Root(hasher.finalize().into())
}

/// BLAKE3 of `left || right`.
pub fn blake3_pair(left: &Root, right: &Root) -> Root {
    let mut hasher = blake3::Hasher::new();
    hasher.update(left.as_ref());
    hasher.update(right.as_ref());
    Root(*hasher.finalize().as_bytes())
}
