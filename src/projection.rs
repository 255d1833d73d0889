use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::NodeId;
use crate::key::KeySet;
use crate::node::{NodeIndex, NodeRef};
use crate::tree_state::TreeState;

/// The ordered, depth-first sequence of nodes eligible for rendering.
///
/// Invariant: a node is present iff it is a root, or its parent is present and expanded.
/// Each expanded node's visible subtree occupies the positions right after it.
///
/// Every change installs a new `Arc`, so identity comparisons (see [`crate::ByRef`]) observe
/// it even when no rows moved.
pub(crate) struct VisibleProjection<T> {
    nodes: Arc<[NodeRef<T>]>,
}

impl<T> VisibleProjection<T> {
    pub(crate) fn new(tree: &TreeState<T>) -> Self {
        let mut p = Self {
            nodes: Arc::from(Vec::new()),
        };
        p.rebuild(tree);
        p
    }

    pub(crate) fn visible(&self) -> &Arc<[NodeRef<T>]> {
        &self.nodes
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn position_of(&self, id: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| &n.id == id)
    }

    /// Uses `hint` when it points at `id`, otherwise searches.
    fn resolve_position(&self, id: &NodeId, hint: Option<usize>) -> Option<usize> {
        let Some(hint) = hint else {
            return self.position_of(id);
        };
        if self.nodes.get(hint).is_some_and(|n| &n.id == id) {
            return Some(hint);
        }
        let found = self.position_of(id);
        if found.is_some() {
            vwarn!(id = %id, hint, "visible index does not point at node; using its actual position");
        }
        found
    }

    /// Recomputes the whole sequence from the roots and the expanded set.
    pub(crate) fn rebuild(&mut self, tree: &TreeState<T>) {
        let index = tree.index();
        let expanded = tree.expanded();
        let mut out = Vec::with_capacity(index.roots().len());
        for root in index.roots().iter() {
            out.push(Arc::clone(root));
            if expanded.contains(&root.id) {
                materialize(index, expanded, &root.id, &mut out);
            }
        }
        vtrace!(visible = out.len(), "VisibleProjection::rebuild");
        self.nodes = Arc::from(out);
    }

    /// Expands (`expand = true`) or collapses `id`, splicing the sequence around the node at
    /// `visible_index` (searched for when `None` or stale).
    ///
    /// Returns `false` for unknown ids, which leave both the set and the sequence untouched.
    pub(crate) fn apply(
        &mut self,
        tree: &mut TreeState<T>,
        id: &NodeId,
        visible_index: Option<usize>,
        expand: bool,
    ) -> bool {
        if tree.find(id).is_none() {
            return false;
        }
        if expand {
            self.expand(tree, id, visible_index);
        } else {
            self.collapse(tree, id, visible_index);
        }
        true
    }

    fn expand(&mut self, tree: &mut TreeState<T>, id: &NodeId, visible_index: Option<usize>) {
        if tree.is_expanded(id) || !tree.expand(id) {
            self.refresh();
            return;
        }
        let Some(pos) = self.resolve_position(id, visible_index) else {
            self.refresh();
            return;
        };

        let before = self.nodes.len();
        let mut next = Vec::with_capacity(before + tree.children_of(id).len());
        next.extend(self.nodes[..=pos].iter().cloned());
        materialize(tree.index(), tree.expanded(), id, &mut next);
        next.extend(self.nodes[pos + 1..].iter().cloned());
        vtrace!(
            id = %id,
            at = pos,
            inserted = next.len() - before,
            "VisibleProjection::expand"
        );
        self.nodes = Arc::from(next);
    }

    fn collapse(&mut self, tree: &mut TreeState<T>, id: &NodeId, visible_index: Option<usize>) {
        let was_expanded = tree.is_expanded(id);
        let position = if was_expanded {
            self.resolve_position(id, visible_index)
        } else {
            None
        };

        let run = count_visible_subtree(tree.index(), tree.expanded(), id);
        tree.collapse(id);

        let Some(pos) = position else {
            self.refresh();
            return;
        };
        let start = pos + 1;
        let end = start.saturating_add(run).min(self.nodes.len());
        debug_assert!(
            start + run <= self.nodes.len(),
            "visible subtree of {id} runs past the end of the sequence"
        );
        let mut next = Vec::with_capacity(self.nodes.len() - (end - start));
        next.extend(self.nodes[..start].iter().cloned());
        next.extend(self.nodes[end..].iter().cloned());
        vtrace!(id = %id, at = pos, removed = end - start, "VisibleProjection::collapse");
        self.nodes = Arc::from(next);
    }

    /// Installs a new sequence instance with the same content.
    fn refresh(&mut self) {
        self.nodes = self.nodes.iter().cloned().collect();
    }
}

/// Appends the visible subtree below `id` in pre-order: each child, then the visible subtree
/// of that child when it is expanded.
///
/// Walks with an explicit stack of child iterators, so tree depth never grows the call stack.
fn materialize<T>(
    index: &NodeIndex<T>,
    expanded: &KeySet<NodeId>,
    id: &NodeId,
    out: &mut Vec<NodeRef<T>>,
) {
    let mut stack = Vec::new();
    stack.push(index.children(id).iter());
    while let Some(frame) = stack.last_mut() {
        let Some(child) = frame.next() else {
            stack.pop();
            continue;
        };
        out.push(Arc::clone(child));
        if !expanded.contains(&child.id) {
            continue;
        }
        if stack.len() > index.len() {
            vwarn!(id = %child.id, "children links form a cycle; projection truncated");
            continue;
        }
        stack.push(index.children(&child.id).iter());
    }
}

/// Counts the rows `materialize` produces for `id`, or zero when `id` is not expanded.
fn count_visible_subtree<T>(
    index: &NodeIndex<T>,
    expanded: &KeySet<NodeId>,
    id: &NodeId,
) -> usize {
    if !expanded.contains(id) {
        return 0;
    }
    let mut count = 0usize;
    let mut stack = Vec::new();
    stack.push(index.children(id).iter());
    while let Some(frame) = stack.last_mut() {
        let Some(child) = frame.next() else {
            stack.pop();
            continue;
        };
        count += 1;
        if expanded.contains(&child.id) && stack.len() <= index.len() {
            stack.push(index.children(&child.id).iter());
        }
    }
    count
}
