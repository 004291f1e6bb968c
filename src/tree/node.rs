//! Tree nodes, navigation and copy-on-write rebinding
//!
//! Node = Leaf(chunk) | Pair(left, right)
//! Rebinding a position collects the siblings along its path, then
//! rebuilds only that path around the replacement.

use std::collections::HashMap;
use std::sync::Arc;

use super::gindex::{check_gindex, Direction, Gindex, GindexPath};
use super::{zero_node, NavigationError, Root, MAX_GINDEX_DEPTH};

/// Immutable binary tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// 32 bytes of chunk content
    Leaf(Root),

    /// Internal node owning two shared children
    Pair(Arc<Node>, Arc<Node>),
}

/// Pending rebuild of the path to one position.
///
/// Produced by [`Node::set`] and [`Node::expand`]; holds every sibling
/// met on the way down and is applied exactly once.
#[derive(Debug, Clone)]
pub struct Rebind {
    siblings: Vec<(Direction, Arc<Node>)>,
}

impl Rebind {
    /// Rebuild the path with `replacement` at the bottom.
    ///
    /// Allocates one pair per level; every sibling is reused as-is.
    pub fn apply(self, replacement: Arc<Node>) -> Arc<Node> {
        self.siblings
            .into_iter()
            .rev()
            .fold(replacement, |child, (direction, sibling)| match direction {
                Direction::Left => Arc::new(Node::Pair(child, sibling)),
                Direction::Right => Arc::new(Node::Pair(sibling, child)),
            })
    }

    /// Number of levels between the frame root and the position.
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }
}

impl Node {
    /// Wrap a chunk as a shared leaf.
    pub fn leaf(chunk: Root) -> Arc<Node> {
        Arc::new(Node::Leaf(chunk))
    }

    /// Join two subtrees under a new shared pair.
    pub fn pair(left: Arc<Node>, right: Arc<Node>) -> Arc<Node> {
        Arc::new(Node::Pair(left, right))
    }

    /// Whether this node is a chunk.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Chunk content, if this is a leaf.
    pub fn chunk(&self) -> Option<&Root> {
        match self {
            Node::Leaf(root) => Some(root),
            Node::Pair(..) => None,
        }
    }

    /// Left child, if this is a pair.
    pub fn left(&self) -> Option<&Arc<Node>> {
        match self {
            Node::Pair(left, _) => Some(left),
            Node::Leaf(_) => None,
        }
    }

    /// Right child, if this is a pair.
    pub fn right(&self) -> Option<&Arc<Node>> {
        match self {
            Node::Pair(_, right) => Some(right),
            Node::Leaf(_) => None,
        }
    }

    /// Fetch the node at `target`, `depth` levels below `self`.
    pub fn get(self: &Arc<Self>, target: Gindex, depth: u8) -> Result<Arc<Node>, NavigationError> {
        check_gindex(target, depth)?;
        let mut node = self;
        for direction in GindexPath::new(target, depth) {
            node = match (node.as_ref(), direction) {
                (Node::Pair(left, _), Direction::Left) => left,
                (Node::Pair(_, right), Direction::Right) => right,
                (Node::Leaf(_), _) => {
                    return Err(NavigationError::LeafReached { target, depth });
                }
            };
        }
        Ok(Arc::clone(node))
    }

    /// Prepare a copy-on-write replacement of the node at `target`.
    ///
    /// Fails like [`Node::get`] when the path does not exist.
    pub fn set(self: &Arc<Self>, target: Gindex, depth: u8) -> Result<Rebind, NavigationError> {
        self.collect_path(target, depth, false)
    }

    /// Like [`Node::set`], but zero-chunk placeholders on the path are
    /// expanded into zero-subtree pairs first.
    pub fn expand(self: &Arc<Self>, target: Gindex, depth: u8) -> Result<Rebind, NavigationError> {
        self.collect_path(target, depth, true)
    }

    fn collect_path(
        self: &Arc<Self>,
        target: Gindex,
        depth: u8,
        expand: bool,
    ) -> Result<Rebind, NavigationError> {
        check_gindex(target, depth)?;
        let mut siblings = Vec::with_capacity(depth as usize);
        let mut node = Arc::clone(self);
        for (level, direction) in GindexPath::new(target, depth).enumerate() {
            let (left, right) = match node.as_ref() {
                Node::Pair(left, right) => (Arc::clone(left), Arc::clone(right)),
                Node::Leaf(chunk) if expand && chunk.is_zero() => {
                    // levels left below this placeholder, minus the one we descend now
                    let below = zero_node(depth - level as u8 - 1);
                    (Arc::clone(&below), below)
                }
                Node::Leaf(_) if expand => {
                    return Err(NavigationError::CannotExpand { target });
                }
                Node::Leaf(_) => {
                    return Err(NavigationError::LeafReached { target, depth });
                }
            };
            node = match direction {
                Direction::Left => {
                    siblings.push((direction, right));
                    left
                }
                Direction::Right => {
                    siblings.push((direction, left));
                    right
                }
            };
        }
        Ok(Rebind { siblings })
    }

    /// Merkle root under `hash`.
    ///
    /// Digests of shared subtrees are computed once per call.
    pub fn merkle_root<H>(&self, hash: H) -> Root
    where
        H: Fn(&Root, &Root) -> Root,
    {
        let mut memo = HashMap::new();
        self.merkle_root_memo(&hash, &mut memo)
    }

    fn merkle_root_memo<H>(&self, hash: &H, memo: &mut HashMap<*const Node, Root>) -> Root
    where
        H: Fn(&Root, &Root) -> Root,
    {
        match self {
            Node::Leaf(chunk) => *chunk,
            Node::Pair(left, right) => {
                let left_root = Self::child_root(left, hash, memo);
                let right_root = Self::child_root(right, hash, memo);
                hash(&left_root, &right_root)
            }
        }
    }

    fn child_root<H>(child: &Arc<Node>, hash: &H, memo: &mut HashMap<*const Node, Root>) -> Root
    where
        H: Fn(&Root, &Root) -> Root,
    {
        let key = Arc::as_ptr(child);
        if let Some(root) = memo.get(&key) {
            return *root;
        }
        let root = child.merkle_root_memo(hash, memo);
        memo.insert(key, root);
        root
    }
}

/// Build a subtree of `depth` whose bottom nodes are `nodes`, left to
/// right, padded on the right with zero subtrees.
pub fn subtree_fill_to_contents(nodes: &[Arc<Node>], depth: u8) -> Result<Arc<Node>, NavigationError> {
    if depth > MAX_GINDEX_DEPTH {
        return Err(NavigationError::DepthTooLarge { depth });
    }
    let count = nodes.len() as u64;
    if count > 1u64 << depth {
        return Err(NavigationError::IndexOutOfRange {
            index: count - 1,
            depth,
        });
    }
    Ok(fill(nodes, depth))
}

/// Unchecked [`subtree_fill_to_contents`]; `nodes` must fit under `depth`.
pub(crate) fn fill(nodes: &[Arc<Node>], depth: u8) -> Arc<Node> {
    if nodes.is_empty() {
        return zero_node(depth);
    }
    if depth == 0 {
        return Arc::clone(&nodes[0]);
    }
    let half = 1u64 << (depth - 1);
    if nodes.len() as u64 <= half {
        Node::pair(fill(nodes, depth - 1), zero_node(depth - 1))
    } else {
        let (left, right) = nodes.split_at(half as usize);
        Node::pair(fill(left, depth - 1), fill(right, depth - 1))
    }
}
