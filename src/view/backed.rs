//! Backing-node holders
//!
//! `BackedView` owns the one mutable reference of a view: its backing
//! node. `SubtreeView` adds a fixed depth so logical child indices can
//! be turned into generalized indices.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::{BackingHook, ViewError};
use crate::tree::{to_gindex, Gindex, Node, Rebind};

/// Backing node plus optional commit hook
pub struct BackedView<'a> {
    backing: Arc<Node>,
    hook: Option<BackingHook<'a>>,
}

impl<'a> BackedView<'a> {
    /// Bind `backing`; views nested in a composite pass a hook.
    pub fn new(backing: Arc<Node>, hook: Option<BackingHook<'a>>) -> Self {
        Self { backing, hook }
    }

    /// Current backing node.
    pub fn backing(&self) -> &Arc<Node> {
        &self.backing
    }

    /// Replace the backing node.
    ///
    /// With a hook, the node is first propagated upward; if that fails
    /// nothing changes. Returns the new root at the top of the chain.
    pub fn set_backing(&mut self, node: Arc<Node>) -> Result<Arc<Node>, ViewError> {
        let root = match self.hook.as_mut() {
            Some(hook) => {
                let root = hook(Arc::clone(&node))?;
                trace!("propagated commit to enclosing view");
                root
            }
            None => Arc::clone(&node),
        };
        self.backing = node;
        Ok(root)
    }

    /// Same backing node, no hook.
    pub fn detached(&self) -> BackedView<'static> {
        BackedView::new(Arc::clone(&self.backing), None)
    }
}

impl fmt::Debug for BackedView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackedView")
            .field("backing", &self.backing)
            .field("nested", &self.hook.is_some())
            .finish()
    }
}

/// Backed view whose children sit `depth` levels below the backing node
#[derive(Debug)]
pub struct SubtreeView<'a> {
    backed: BackedView<'a>,
    depth: u8,
}

impl<'a> SubtreeView<'a> {
    /// Bind `backing` with children at `depth`.
    pub fn new(backing: Arc<Node>, hook: Option<BackingHook<'a>>, depth: u8) -> Self {
        Self {
            backed: BackedView::new(backing, hook),
            depth,
        }
    }

    /// Traversal depth from the backing node to the children.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Current backing node.
    pub fn backing(&self) -> &Arc<Node> {
        self.backed.backing()
    }

    /// Replace the whole backing node.
    pub fn set_backing(&mut self, node: Arc<Node>) -> Result<Arc<Node>, ViewError> {
        self.backed.set_backing(node)
    }

    /// Generalized index of child `index`, relative to the backing node.
    pub fn child_gindex(&self, index: u64) -> Result<Gindex, ViewError> {
        Ok(to_gindex(index, self.depth)?)
    }

    /// Node of child `index`.
    pub fn get_node(&self, index: u64) -> Result<Arc<Node>, ViewError> {
        let target = self.child_gindex(index)?;
        Ok(self.backing().get(target, self.depth)?)
    }

    /// Path to child `index`, ready to take a replacement.
    ///
    /// With `expand`, zero placeholders on the way become pairs.
    pub fn child_rebind(&self, index: u64, expand: bool) -> Result<Rebind, ViewError> {
        let target = self.child_gindex(index)?;
        let rebind = if expand {
            self.backing().expand(target, self.depth)?
        } else {
            self.backing().set(target, self.depth)?
        };
        Ok(rebind)
    }

    /// Replace child `index` and commit.
    pub fn set_node(&mut self, index: u64, node: Arc<Node>) -> Result<Arc<Node>, ViewError> {
        let rebind = self.child_rebind(index, false)?;
        self.set_backing(rebind.apply(node))
    }

    /// Same backing node and depth, no hook.
    pub fn detached(&self) -> SubtreeView<'static> {
        SubtreeView {
            backed: self.backed.detached(),
            depth: self.depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{zero_node, Root};
    use std::sync::Mutex;

    #[test]
    fn test_standalone_commit_replaces_backing() {
        let mut view = SubtreeView::new(zero_node(2), None, 2);
        let leaf = Node::leaf(Root::from_u64(42));
        let root = view.set_node(3, Arc::clone(&leaf)).unwrap();

        assert!(Arc::ptr_eq(&root, view.backing()));
        assert_eq!(view.get_node(3).unwrap(), leaf);
        assert_eq!(view.get_node(0).unwrap(), zero_node(0));
    }

    #[test]
    fn test_hook_receives_each_commit_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let hook: BackingHook<'static> = Box::new(move |node| {
            sink.lock().unwrap().push(Arc::clone(&node));
            Ok(node)
        });
        let mut view = SubtreeView::new(zero_node(1), Some(hook), 1);
        view.set_node(1, Node::leaf(Root::from_u64(1))).unwrap();
        view.set_node(0, Node::leaf(Root::from_u64(2))).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(Arc::ptr_eq(&seen[1], view.backing()));
    }

    #[test]
    fn test_failed_hook_keeps_backing() {
        let hook: BackingHook<'static> = Box::new(|_| Err(ViewError::EmptyList));
        let before = zero_node(1);
        let mut view = SubtreeView::new(Arc::clone(&before), Some(hook), 1);

        assert!(view.set_node(0, Node::leaf(Root::from_u64(9))).is_err());
        assert!(Arc::ptr_eq(view.backing(), &before));
    }

    #[test]
    fn test_child_rebind_expands_zero_placeholder() {
        let view = SubtreeView::new(Node::leaf(Root::ZERO), None, 2);
        assert!(view.child_rebind(2, false).is_err());

        let node = view.child_rebind(2, true).unwrap().apply(Node::leaf(Root::from_u64(3)));
        assert_eq!(node.get(6, 2).unwrap(), Node::leaf(Root::from_u64(3)));
        assert_eq!(node.get(7, 2).unwrap(), zero_node(0));
        // rebind alone does not commit
        assert!(view.backing().is_leaf());
    }

    #[test]
    fn test_bad_index_leaves_view_untouched() {
        let before = zero_node(2);
        let mut view = SubtreeView::new(Arc::clone(&before), None, 2);
        assert!(view.set_node(4, zero_node(0)).is_err());
        assert!(Arc::ptr_eq(view.backing(), &before));
    }
}
