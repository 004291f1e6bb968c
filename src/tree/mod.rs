//! Persistent binary Merkle tree
//!
//! Nodes are immutable: a leaf holds one 32-byte chunk, a pair holds two
//! reference-counted children. Every edit rebuilds only the path from the
//! edited position up to the current root and shares all other subtrees.
//!
//! Positions are addressed with generalized indices (root = 1, children of
//! `g` are `2g` and `2g + 1`).

mod gindex;
mod hash;
mod node;
mod traversal;
mod zero;

pub use gindex::{
    check_gindex, cover_depth, gindex_depth, to_gindex, Direction, Gindex, GindexPath,
    LEFT_GINDEX, RIGHT_GINDEX, ROOT_GINDEX,
};
pub use hash::{blake3_pair, sha256_pair};
pub use node::{subtree_fill_to_contents, Node, Rebind};
pub(crate) use node::fill;
pub use traversal::ChunkIter;
pub use zero::{zero_node, zero_root};

use std::fmt;
use std::ops::{Deref, DerefMut};

use thiserror::Error;

use crate::codec::LENGTH_BYTE_LENGTH;

/// Size in bytes of every tree leaf.
pub const CHUNK_SIZE: usize = 32;

/// Deepest generalized index that still fits a `u64`.
pub const MAX_GINDEX_DEPTH: u8 = 63;

/// A 32-byte chunk: leaf content or a hash output.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Root(pub [u8; CHUNK_SIZE]);

impl Root {
    /// The all-zero chunk.
    pub const ZERO: Root = Root([0u8; CHUNK_SIZE]);

    /// Whether every byte of the chunk is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Chunk holding `value` as 8 little-endian bytes followed by zeros.
    pub fn from_u64(value: u64) -> Self {
        let mut out = Root::ZERO;
        out.0[..LENGTH_BYTE_LENGTH as usize].copy_from_slice(&value.to_le_bytes());
        out
    }

    /// Read the first 8 bytes as a little-endian integer.
    pub fn low_u64(&self) -> u64 {
        let mut word = [0u8; LENGTH_BYTE_LENGTH as usize];
        word.copy_from_slice(&self.0[..LENGTH_BYTE_LENGTH as usize]);
        u64::from_le_bytes(word)
    }
}

impl From<[u8; CHUNK_SIZE]> for Root {
    fn from(bytes: [u8; CHUNK_SIZE]) -> Self {
        Root(bytes)
    }
}

impl AsRef<[u8]> for Root {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for Root {
    type Target = [u8; CHUNK_SIZE];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Root {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Root(")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

/// Errors raised while navigating or rebuilding a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// The generalized index does not sit at the requested depth.
    #[error("generalized index {target} is not at depth {depth}")]
    DepthMismatch {
        /// Requested position.
        target: Gindex,
        /// Requested depth.
        depth: u8,
    },

    /// A leaf was reached before the descent finished.
    #[error("reached a leaf before generalized index {target} (depth {depth})")]
    LeafReached {
        /// Requested position.
        target: Gindex,
        /// Requested depth.
        depth: u8,
    },

    /// A pair was found where a leaf chunk was required.
    #[error("expected a leaf at generalized index {target}, found a pair")]
    NotALeaf {
        /// Position of the offending node.
        target: Gindex,
    },

    /// Element index does not fit below the given depth.
    #[error("index {index} does not fit in a subtree of depth {depth}")]
    IndexOutOfRange {
        /// Logical element index.
        index: u64,
        /// Subtree depth.
        depth: u8,
    },

    /// Depth exceeds what a `u64` generalized index can encode.
    #[error("depth {depth} exceeds the maximum of {max}", max = MAX_GINDEX_DEPTH)]
    DepthTooLarge {
        /// Requested depth.
        depth: u8,
    },

    /// A non-zero leaf sits where expansion would need to synthesize pairs.
    #[error("cannot expand through non-zero leaf on the path to {target}")]
    CannotExpand {
        /// Requested position.
        target: Gindex,
    },
}
