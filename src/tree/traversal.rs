//! Stack-based walk over bottom chunks
//!
//! Visits the leaves of a subtree of known depth left to right without
//! computing a generalized index per chunk. The stack never holds more
//! than one pending right sibling per level.

use std::sync::Arc;

use super::{Gindex, NavigationError, Node, Root, ROOT_GINDEX};

/// Pending subtree on the walk stack
#[derive(Debug)]
struct Frame {
    node: Arc<Node>,
    gindex: Gindex,
    height: u8,
}

/// In-order iterator over the first `count` bottom chunks of a subtree.
///
/// Yields an error and stops if the subtree is shallower than `depth`
/// or has a pair where a chunk is expected.
#[derive(Debug)]
pub struct ChunkIter {
    stack: Vec<Frame>,
    depth: u8,
    remaining: u64,
}

impl ChunkIter {
    /// Walk `count` chunks below `root`, which spans `depth` levels.
    pub fn new(root: Arc<Node>, depth: u8, count: u64) -> Self {
        let mut stack = Vec::with_capacity(depth as usize + 1);
        stack.push(Frame {
            node: root,
            gindex: ROOT_GINDEX,
            height: depth,
        });
        Self {
            stack,
            depth,
            remaining: count,
        }
    }

    fn fail(&mut self, err: NavigationError) -> Option<Result<Root, NavigationError>> {
        self.stack.clear();
        self.remaining = 0;
        Some(Err(err))
    }
}

impl Iterator for ChunkIter {
    type Item = Result<Root, NavigationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        while let Some(frame) = self.stack.pop() {
            match (frame.node.as_ref(), frame.height) {
                (Node::Leaf(chunk), 0) => {
                    self.remaining -= 1;
                    return Some(Ok(*chunk));
                }
                (Node::Pair(..), 0) => {
                    return self.fail(NavigationError::NotALeaf {
                        target: frame.gindex,
                    });
                }
                (Node::Pair(left, right), height) => {
                    self.stack.push(Frame {
                        node: Arc::clone(right),
                        gindex: frame.gindex << 1 | 1,
                        height: height - 1,
                    });
                    self.stack.push(Frame {
                        node: Arc::clone(left),
                        gindex: frame.gindex << 1,
                        height: height - 1,
                    });
                }
                (Node::Leaf(_), _) => {
                    return self.fail(NavigationError::LeafReached {
                        target: frame.gindex,
                        depth: self.depth - frame.height,
                    });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::subtree_fill_to_contents;

    #[test]
    fn test_walks_chunks_in_order() {
        let chunks: Vec<_> = (1..=5u64).map(|v| Node::leaf(Root::from_u64(v))).collect();
        let tree = subtree_fill_to_contents(&chunks, 3).unwrap();

        let walked: Vec<u64> = ChunkIter::new(tree, 3, 5)
            .map(|c| c.unwrap().low_u64())
            .collect();
        assert_eq!(walked, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_stops_after_count() {
        let chunks: Vec<_> = (1..=4u64).map(|v| Node::leaf(Root::from_u64(v))).collect();
        let tree = subtree_fill_to_contents(&chunks, 2).unwrap();
        assert_eq!(ChunkIter::new(tree, 2, 2).count(), 2);
    }

    #[test]
    fn test_reports_shallow_tree() {
        let tree = Node::pair(Node::leaf(Root::ZERO), Node::leaf(Root::ZERO));
        let mut walk = ChunkIter::new(tree, 2, 4);
        assert_eq!(
            walk.next(),
            Some(Err(NavigationError::LeafReached { target: 2, depth: 1 }))
        );
        assert_eq!(walk.next(), None);
    }
}
