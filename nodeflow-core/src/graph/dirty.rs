//! Dirty Tracking
//!
//! The dirty set holds the nodes whose outputs can no longer be trusted.
//! It only records; the scheduler decides what else is affected.

use indexmap::IndexSet;

use super::node::NodeId;

/// Nodes awaiting re-evaluation, in the order they were marked.
#[derive(Debug, Default, Clone)]
pub struct DirtySet {
    pending: IndexSet<NodeId>,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Returns `false` if it was already pending.
    pub fn insert(&mut self, node: NodeId) -> bool {
        self.pending.insert(node)
    }

    /// Drop a node. Returns `false` if it was not pending.
    pub fn remove(&mut self, node: NodeId) -> bool {
        self.pending.shift_remove(&node)
    }

    /// Whether `node` is pending.
    pub fn contains(&self, node: NodeId) -> bool {
        self.pending.contains(&node)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of pending nodes.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Pending nodes in marking order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.pending.iter().copied()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
