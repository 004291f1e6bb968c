//! Generalized-index arithmetic
//!
//! A generalized index packs a path and its depth into one integer:
//! the leading 1 marks the root, every bit below it is one turn
//! (0 = left, 1 = right), read from most to least significant.

use super::{NavigationError, MAX_GINDEX_DEPTH};

/// Generalized index of a tree position.
pub type Gindex = u64;

/// The root itself.
pub const ROOT_GINDEX: Gindex = 1;

/// Left child of the root.
pub const LEFT_GINDEX: Gindex = 2;

/// Right child of the root; the address of a mixed-in length.
pub const RIGHT_GINDEX: Gindex = 3;

/// One turn on the way down from a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Descend into the left child
    Left,

    /// Descend into the right child
    Right,
}

/// Place `index` directly below a leading 1 shifted left by `depth`.
///
/// Fails when `index` needs more than `depth` bits.
pub fn to_gindex(index: u64, depth: u8) -> Result<Gindex, NavigationError> {
    if depth > MAX_GINDEX_DEPTH {
        return Err(NavigationError::DepthTooLarge { depth });
    }
    let anchor = 1u64 << depth;
    if index >= anchor {
        return Err(NavigationError::IndexOutOfRange { index, depth });
    }
    Ok(anchor | index)
}

/// Smallest depth whose `2^depth` bottom chunks can hold `n` chunks.
pub fn cover_depth(n: u64) -> u8 {
    if n <= 1 {
        0
    } else {
        (u64::BITS - (n - 1).leading_zeros()) as u8
    }
}

/// Number of binary digits below the leading 1, or `None` for index 0.
pub fn gindex_depth(target: Gindex) -> Option<u8> {
    if target == 0 {
        None
    } else {
        Some((u64::BITS - 1 - target.leading_zeros()) as u8)
    }
}

/// Verify that `target` lives exactly `depth` levels below the root.
pub fn check_gindex(target: Gindex, depth: u8) -> Result<(), NavigationError> {
    if depth > MAX_GINDEX_DEPTH {
        return Err(NavigationError::DepthTooLarge { depth });
    }
    match gindex_depth(target) {
        Some(found) if found == depth => Ok(()),
        _ => Err(NavigationError::DepthMismatch { target, depth }),
    }
}

/// Turns encoded by a generalized index, root first.
///
/// Yields exactly `depth` directions; construct with [`GindexPath::new`]
/// after validating the index with [`check_gindex`].
#[derive(Debug, Clone)]
pub struct GindexPath {
    target: Gindex,
    remaining: u8,
}

impl GindexPath {
    /// Walk the bits of `target` below its leading 1.
    pub fn new(target: Gindex, depth: u8) -> Self {
        Self {
            target,
            remaining: depth,
        }
    }
}

impl Iterator for GindexPath {
    type Item = Direction;

    fn next(&mut self) -> Option<Direction> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        if (self.target >> self.remaining) & 1 == 1 {
            Some(Direction::Right)
        } else {
            Some(Direction::Left)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for GindexPath {}
