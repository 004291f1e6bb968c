//! # Typed Views over a Persistent Merkle Tree
//!
//! Values are stored as immutable binary Merkle trees of 32-byte chunks.
//! Typed views map logical element indices onto tree positions and commit
//! edits by rebuilding only the path from the edit to the root.
//!
//! ## Layers
//!
//! 1. **Tree**: leaves and pairs, generalized-index navigation,
//!    copy-on-write rebinding, shared zero subtrees, merkleization
//! 2. **Views**: scalars, bit-lists with a mixed-in length, containers;
//!    nested views commit into their parent through a hook
//! 3. **Codec**: two-pass fixed/variable byte layout with an offset table
//!
//! ## Usage Example
//!
//! ```
//! use ssz_view::tree::sha256_pair;
//! use ssz_view::view::{BitListType, View};
//!
//! let mut bits = BitListType::new(16).new_view();
//! for _ in 0..4 {
//!     bits.append(true)?;
//! }
//! assert!(bits.get(2)?);
//! assert_eq!(bits.length()?, 4);
//! let _root = bits.backing().merkle_root(sha256_pair);
//! # Ok::<(), ssz_view::view::ViewError>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod codec; // Composite byte layout
pub mod tree; // Persistent Merkle tree
pub mod view; // Typed views

// Re-exports for convenience
pub use codec::{CodecError, SizeBounds};
pub use tree::{Gindex, NavigationError, Node, Root};
pub use view::{BitListType, BitListView, ContainerType, ContainerView, TypeDef, View, ViewError};
