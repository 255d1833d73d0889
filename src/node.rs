use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::NodeId;
use crate::key::{KeyMap, KeySet};

/// A shared, read-only tree node.
pub type NodeRef<T> = Arc<TreeNode<T>>;

/// One record of the tree dataset.
///
/// The dataset is a flat list with `parent_id` links. A record may additionally carry its
/// children inline; those come first, followed by any other records that point at it through
/// `parent_id`.
#[derive(Clone, Debug)]
pub struct TreeNode<T> {
    pub id: NodeId,
    /// `None` marks a root.
    pub parent_id: Option<NodeId>,
    pub children: Vec<NodeRef<T>>,
    pub is_leaf: Option<bool>,
    pub level: u32,
    /// Payload; the display value is read from it through the configured accessor.
    pub data: T,
}

impl<T> TreeNode<T> {
    pub fn new(id: impl Into<NodeId>, parent_id: Option<NodeId>, data: T) -> Self {
        Self {
            id: id.into(),
            parent_id,
            children: Vec::new(),
            is_leaf: None,
            level: 0,
            data,
        }
    }

    pub fn root(id: impl Into<NodeId>, data: T) -> Self {
        Self::new(id, None, data)
    }

    pub fn child(id: impl Into<NodeId>, parent_id: impl Into<NodeId>, data: T) -> Self {
        Self::new(id, Some(parent_id.into()), data)
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = TreeNode<T>>) -> Self {
        self.children = children.into_iter().map(Arc::new).collect();
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_is_leaf(mut self, is_leaf: bool) -> Self {
        self.is_leaf = Some(is_leaf);
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Id-indexed view of the dataset, built once per data set.
///
/// Every lookup (`find`, ancestor walks, children resolution) goes through this index instead
/// of scanning the records.
pub(crate) struct NodeIndex<T> {
    data: Arc<[NodeRef<T>]>,
    nodes: KeyMap<NodeId, NodeRef<T>>,
    children: KeyMap<NodeId, Arc<[NodeRef<T>]>>,
    roots: Arc<[NodeRef<T>]>,
}

impl<T> NodeIndex<T> {
    pub(crate) fn build(data: Arc<[NodeRef<T>]>) -> Self {
        let mut nodes: KeyMap<NodeId, NodeRef<T>> = KeyMap::new();

        // Flat records win over inline copies with the same id.
        for node in data.iter() {
            if nodes.contains_key(&node.id) {
                vwarn!(id = %node.id, "duplicate node id in dataset; keeping the first record");
                continue;
            }
            nodes.insert(node.id.clone(), Arc::clone(node));
        }
        let mut stack: Vec<NodeRef<T>> = data.iter().cloned().collect();
        while let Some(node) = stack.pop() {
            for child in node.children.iter() {
                if !nodes.contains_key(&child.id) {
                    nodes.insert(child.id.clone(), Arc::clone(child));
                    stack.push(Arc::clone(child));
                }
            }
        }

        let mut by_parent: KeyMap<NodeId, Vec<NodeRef<T>>> = KeyMap::new();
        for node in data.iter() {
            if let Some(parent) = &node.parent_id {
                by_parent
                    .entry(parent.clone())
                    .or_default()
                    .push(canonical(&nodes, node));
            }
        }

        let mut children: KeyMap<NodeId, Arc<[NodeRef<T>]>> = KeyMap::new();
        for (id, node) in nodes.iter() {
            let linked = by_parent.remove(id).unwrap_or_default();
            let resolved: Vec<NodeRef<T>> = if node.children.is_empty() {
                linked
            } else {
                // Inline children first, then parent-linked records not already listed.
                let mut seen: KeySet<NodeId> = KeySet::new();
                node.children
                    .iter()
                    .map(|c| canonical(&nodes, c))
                    .chain(linked)
                    .filter(|c| seen.insert(c.id.clone()))
                    .collect()
            };
            if resolved.is_empty() {
                continue;
            }
            children.insert(id.clone(), Arc::from(resolved));
        }

        let roots: Vec<NodeRef<T>> = data
            .iter()
            .filter(|node| {
                let is_canonical = nodes
                    .get(&node.id)
                    .is_some_and(|indexed| Arc::ptr_eq(indexed, node));
                let parent_known = node
                    .parent_id
                    .as_ref()
                    .is_some_and(|p| nodes.contains_key(p));
                is_canonical && !parent_known
            })
            .cloned()
            .collect();

        vdebug!(
            records = data.len(),
            indexed = nodes.len(),
            roots = roots.len(),
            "NodeIndex::build"
        );

        Self {
            data,
            nodes,
            children,
            roots: Arc::from(roots),
        }
    }

    pub(crate) fn data(&self) -> &Arc<[NodeRef<T>]> {
        &self.data
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn get(&self, id: &NodeId) -> Option<&NodeRef<T>> {
        self.nodes.get(id)
    }

    pub(crate) fn children(&self, id: &NodeId) -> &[NodeRef<T>] {
        self.children.get(id).map(|c| &c[..]).unwrap_or(&[])
    }

    pub(crate) fn has_children(&self, id: &NodeId) -> bool {
        !self.children(id).is_empty()
    }

    pub(crate) fn roots(&self) -> &Arc<[NodeRef<T>]> {
        &self.roots
    }

    /// The parent of `id`, if it resolves to an indexed node.
    pub(crate) fn parent(&self, id: &NodeId) -> Option<&NodeRef<T>> {
        let node = self.nodes.get(id)?;
        self.nodes.get(node.parent_id.as_ref()?)
    }
}

fn canonical<T>(nodes: &KeyMap<NodeId, NodeRef<T>>, node: &NodeRef<T>) -> NodeRef<T> {
    nodes
        .get(&node.id)
        .cloned()
        .unwrap_or_else(|| Arc::clone(node))
}
