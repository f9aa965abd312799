//! Author-declared route tree.

use std::collections::BTreeMap;

use crate::routing::segment::split_path;

/// Nested mapping of segment keys (`"user"`, `":id"`) to subtrees.
///
/// A node may hold a leaf (the hierarchy end) and children at the same
/// time, so `/user/:id` can be an endpoint and a prefix of
/// `/user/:id/message`.
#[derive(Debug, Clone)]
pub struct RawRouteTree<L> {
    children: BTreeMap<String, RawRouteTree<L>>,
    leaf: Option<L>,
}

impl<L> Default for RawRouteTree<L> {
    fn default() -> Self {
        Self {
            children: BTreeMap::new(),
            leaf: None,
        }
    }
}

impl<L> RawRouteTree<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tree that is only a hierarchy end.
    pub fn leaf(leaf: L) -> Self {
        Self {
            children: BTreeMap::new(),
            leaf: Some(leaf),
        }
    }

    /// Builder form: attach a subtree under `segment`.
    pub fn with_child(mut self, segment: impl Into<String>, child: RawRouteTree<L>) -> Self {
        self.children.insert(segment.into(), child);
        self
    }

    /// Builder form: set this node's hierarchy end.
    pub fn with_leaf(mut self, leaf: L) -> Self {
        self.leaf = Some(leaf);
        self
    }

    /// Child under `segment`, created on first use.
    pub fn child_mut(&mut self, segment: &str) -> &mut RawRouteTree<L> {
        self.children.entry(segment.to_string()).or_default()
    }

    /// Node reached by walking `path`, creating intermediate nodes.
    pub fn node_mut(&mut self, path: &str) -> &mut RawRouteTree<L> {
        split_path(path)
            .into_iter()
            .fold(self, |node, segment| node.child_mut(segment))
    }

    pub fn leaf_ref(&self) -> Option<&L> {
        self.leaf.as_ref()
    }

    pub fn leaf_mut(&mut self) -> &mut Option<L> {
        &mut self.leaf
    }

    pub fn children(&self) -> impl Iterator<Item = (&String, &RawRouteTree<L>)> {
        self.children.iter()
    }

    /// True when neither this node nor any descendant holds a leaf.
    pub fn is_empty(&self) -> bool {
        self.leaf.is_none() && self.children.values().all(RawRouteTree::is_empty)
    }
}
