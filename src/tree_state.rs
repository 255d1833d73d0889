use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::NodeId;
use crate::key::KeySet;
use crate::node::{NodeIndex, NodeRef};

/// Expansion state of a tree plus the id index it is resolved against.
///
/// Read access is public; mutations go through [`crate::TreeVirtualizer`] so the visible
/// projection never falls out of sync with the expanded set.
pub struct TreeState<T> {
    index: NodeIndex<T>,
    expanded: KeySet<NodeId>,
}

impl<T> TreeState<T> {
    pub(crate) fn new(data: Arc<[NodeRef<T>]>) -> Self {
        Self {
            index: NodeIndex::build(data),
            expanded: KeySet::new(),
        }
    }

    pub(crate) fn index(&self) -> &NodeIndex<T> {
        &self.index
    }

    /// The records the engine was constructed with, in source order.
    pub fn data(&self) -> &[NodeRef<T>] {
        self.index.data()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.len() == 0
    }

    pub fn find(&self, id: &NodeId) -> Option<&NodeRef<T>> {
        self.index.get(id)
    }

    pub fn roots(&self) -> &[NodeRef<T>] {
        self.index.roots()
    }

    pub fn children_of(&self, id: &NodeId) -> &[NodeRef<T>] {
        self.index.children(id)
    }

    pub fn has_children(&self, id: &NodeId) -> bool {
        self.index.has_children(id)
    }

    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.expanded.contains(id)
    }

    pub fn expanded(&self) -> &KeySet<NodeId> {
        &self.expanded
    }

    /// Adds `id` to the expanded set. Leaves and unknown ids are ignored.
    pub(crate) fn expand(&mut self, id: &NodeId) -> bool {
        if !self.index.has_children(id) {
            return false;
        }
        self.expanded.insert(id.clone())
    }

    /// Removes `id` and every transitive descendant from the expanded set.
    ///
    /// Only the subtree below `id` is visited, hidden branches included, so the cost does not
    /// depend on how many unrelated nodes are expanded.
    pub(crate) fn collapse(&mut self, id: &NodeId) -> bool {
        let was_expanded = self.expanded.remove(id);
        let index = &self.index;
        let mut stack: Vec<&NodeRef<T>> = index.children(id).iter().collect();
        let mut visited = 0usize;
        while let Some(node) = stack.pop() {
            if self.expanded.is_empty() {
                break;
            }
            visited += 1;
            if visited > index.len() {
                vwarn!(id = %id, "children links form a cycle; collapse stopped");
                break;
            }
            self.expanded.remove(&node.id);
            stack.extend(index.children(&node.id));
        }
        was_expanded
    }

    /// Replaces the expanded set. Returns how many ids were dropped because they do not
    /// resolve to a node with children.
    pub(crate) fn replace_expanded(&mut self, ids: impl IntoIterator<Item = NodeId>) -> usize {
        let mut dropped = 0usize;
        let mut next = KeySet::new();
        for id in ids {
            if self.index.has_children(&id) {
                next.insert(id);
            } else {
                dropped += 1;
            }
        }
        self.expanded = next;
        dropped
    }

    /// Returns `[id, parent, grandparent, .., root]`.
    ///
    /// Unknown ids yield an empty chain. The walk stops at the first parent id that does not
    /// resolve to a node.
    pub fn ancestor_chain(&self, id: &NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        if self.index.get(id).is_none() {
            return chain;
        }
        chain.push(id.clone());
        let mut cur = id;
        let limit = self.index.len();
        while let Some(parent) = self.index.parent(cur) {
            if chain.len() > limit {
                vwarn!(id = %id, "parent links form a cycle; ancestor walk stopped");
                break;
            }
            chain.push(parent.id.clone());
            cur = &parent.id;
        }
        chain
    }

    /// Whether `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: &NodeId, id: &NodeId) -> bool {
        is_ancestor_in(&self.index, ancestor, id)
    }
}

fn is_ancestor_in<T>(index: &NodeIndex<T>, ancestor: &NodeId, id: &NodeId) -> bool {
    let mut cur = id;
    let mut steps = 0usize;
    while let Some(parent) = index.parent(cur) {
        if &parent.id == ancestor {
            return true;
        }
        steps += 1;
        if steps > index.len() {
            return false;
        }
        cur = &parent.id;
    }
    false
}
