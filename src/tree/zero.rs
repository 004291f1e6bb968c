//! Canonical all-zero subtrees
//!
//! Entry 0 is the zero chunk, entry d is pair(entry d-1, entry d-1).
//! The table is process-wide, grows on demand and never changes an
//! entry once written, so callers share the same allocations.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use super::{Node, Root};

static ZERO_NODES: OnceLock<RwLock<Vec<Arc<Node>>>> = OnceLock::new();

fn table() -> &'static RwLock<Vec<Arc<Node>>> {
    ZERO_NODES.get_or_init(|| RwLock::new(vec![Node::leaf(Root::ZERO)]))
}

/// The all-zero subtree of the given depth.
pub fn zero_node(depth: u8) -> Arc<Node> {
    let index = depth as usize;
    {
        let nodes = table().read();
        if let Some(node) = nodes.get(index) {
            return Arc::clone(node);
        }
    }

    let mut nodes = table().write();
    // another writer may have extended the table in between
    while nodes.len() <= index {
        let below = Arc::clone(&nodes[nodes.len() - 1]);
        nodes.push(Node::pair(Arc::clone(&below), below));
    }
    debug!(depth, entries = nodes.len(), "extended zero-subtree cache");
    Arc::clone(&nodes[index])
}

/// Merkle root of the all-zero subtree of the given depth.
pub fn zero_root<H>(depth: u8, hash: H) -> Root
where
    H: Fn(&Root, &Root) -> Root,
{
    zero_node(depth).merkle_root(hash)
}
