//! Entity Store
//!
//! [`Graph`] owns every node, port and edge, keyed by generation-checked
//! handles. A handle to a removed entity stays dead even after its slot is
//! reused, so stale ids are reported as `Unknown*` instead of aliasing.
//!
//! Removal cascades downward: a node takes its ports with it, a port takes
//! its edges with it, and an edge clears the values at both of its ends.

use indexmap::IndexSet;
use slotmap::{SecondaryMap, SlotMap};
use tracing::debug;

use super::dirty::DirtySet;
use super::node::{Edge, EdgeId, Node, NodeId, Port, PortId};
use crate::behavior::{EvalContext, Fields, NodeBehavior, NodeObserver, NodeRegistry, PortBuilder};
use crate::config::EngineConfig;
use crate::error::{GraphError, GraphResult};
use crate::types::{Direction, Value, ValueType};

/// The dataflow graph: entities, root index, dirty set.
pub struct Graph {
    pub(super) nodes: SlotMap<NodeId, Node>,
    pub(super) ports: SlotMap<PortId, Port>,
    pub(super) edges: SlotMap<EdgeId, Edge>,

    /// Behavior per node. Kept beside `nodes` so a behavior can evaluate
    /// while its node and the port table are borrowed.
    pub(super) behaviors: SecondaryMap<NodeId, Box<dyn NodeBehavior>>,

    pub(super) observers: SecondaryMap<NodeId, Box<dyn NodeObserver>>,

    /// Nodes with no input ports.
    roots: IndexSet<NodeId>,

    pub(super) dirty: DirtySet,

    pub(super) config: EngineConfig,
}

impl Graph {
    /// Create an empty graph with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an empty graph with the given configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            ports: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            behaviors: SecondaryMap::new(),
            observers: SecondaryMap::new(),
            roots: IndexSet::new(),
            dirty: DirtySet::new(),
            config,
        }
    }

    /// The configuration this graph was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---- mutation ---------------------------------------------------------

    /// Add a node driven by `behavior`.
    ///
    /// The behavior's `initialize` runs before this returns, so the node's
    /// ports are in place. The new node starts dirty.
    pub fn add_node(&mut self, mut behavior: Box<dyn NodeBehavior>) -> NodeId {
        let kind = behavior.kind().to_string();
        let id = self.nodes.insert_with_key(|id| Node::new(id, kind));

        behavior.initialize(&mut PortBuilder::new(self, id));
        self.behaviors.insert(id, behavior);
        self.refresh_root(id);
        self.mark_dirty(id);

        debug!(node = ?id, kind = self.nodes[id].kind(), "added node");
        id
    }

    /// Add a node of a registered kind.
    pub fn add_node_of_kind(&mut self, registry: &NodeRegistry, kind: &str) -> GraphResult<NodeId> {
        let behavior = registry.create(kind)?;
        Ok(self.add_node(behavior))
    }

    /// Attach a new port to an existing node.
    pub fn add_port(
        &mut self,
        node: NodeId,
        direction: Direction,
        value_type: ValueType,
    ) -> GraphResult<PortId> {
        if !self.nodes.contains_key(node) {
            return Err(GraphError::UnknownNode(node));
        }
        let id = self.insert_port(node, direction, value_type);
        self.refresh_root(node);
        self.mark_dirty(node);
        Ok(id)
    }

    /// Allocate a port on a node known to exist.
    pub(crate) fn insert_port(
        &mut self,
        node: NodeId,
        direction: Direction,
        value_type: ValueType,
    ) -> PortId {
        let id = self
            .ports
            .insert_with_key(|id| Port::new(id, node, direction, value_type));
        if let Some(owner) = self.nodes.get_mut(node) {
            owner.attach_port(direction, id);
        }
        debug!(node = ?node, port = ?id, %direction, %value_type, "added port");
        id
    }

    /// Remove a port and every edge touching it.
    pub fn remove_port(&mut self, port: PortId) -> GraphResult<Port> {
        let (removed, owner) = self.discard_port(port)?;
        self.refresh_root(owner);
        self.mark_dirty(owner);
        Ok(removed)
    }

    /// Remove a node with all of its ports and edges.
    ///
    /// Removing a node that is already gone is a no-op and returns `None`.
    /// Otherwise the node's behavior is handed back.
    pub fn remove_node(&mut self, node: NodeId) -> Option<Box<dyn NodeBehavior>> {
        let Some(entry) = self.nodes.get(node) else {
            debug!(node = ?node, "remove of absent node ignored");
            return None;
        };

        let ports: Vec<PortId> = entry.inputs().iter().chain(entry.outputs()).copied().collect();
        self.roots.shift_remove(&node);
        for port in ports {
            // Every id in the node's own lists is live.
            let _ = self.discard_port(port);
        }

        self.nodes.remove(node);
        self.observers.remove(node);
        self.dirty.remove(node);
        debug!(node = ?node, "removed node");
        self.behaviors.remove(node)
    }

    /// Remove an edge, empty both of its ports and mark both nodes dirty.
    pub fn remove_edge(&mut self, edge: EdgeId) -> GraphResult<Edge> {
        let removed = self.edges.remove(edge).ok_or(GraphError::UnknownEdge(edge))?;

        for port_id in [removed.input(), removed.output()] {
            if let Some(port) = self.ports.get_mut(port_id) {
                port.unlink(edge);
                port.clear_value();
                let owner = port.node();
                self.mark_dirty(owner);
            }
        }

        debug!(edge = ?edge, "removed edge");
        Ok(removed)
    }

    /// Queue a node for re-evaluation. Unknown nodes are ignored.
    pub fn mark_dirty(&mut self, node: NodeId) {
        if self.nodes.contains_key(node) {
            self.dirty.insert(node);
        }
    }

    /// Deliver out-of-band parameters to a node and mark it dirty.
    pub fn set_external_data(&mut self, node: NodeId, fields: &Fields) -> GraphResult<()> {
        let behavior = self
            .behaviors
            .get_mut(node)
            .ok_or(GraphError::UnknownNode(node))?;
        behavior.set_external_data(fields);
        self.mark_dirty(node);
        Ok(())
    }

    /// Register the observer for a node, replacing any previous one.
    pub fn observe(&mut self, node: NodeId, observer: Box<dyn NodeObserver>) -> GraphResult<()> {
        if !self.nodes.contains_key(node) {
            return Err(GraphError::UnknownNode(node));
        }
        self.observers.insert(node, observer);
        Ok(())
    }

    /// Detach a node's observer.
    pub fn unobserve(&mut self, node: NodeId) -> Option<Box<dyn NodeObserver>> {
        self.observers.remove(node)
    }

    fn discard_port(&mut self, port: PortId) -> GraphResult<(Port, NodeId)> {
        let entry = self.ports.get(port).ok_or(GraphError::UnknownPort(port))?;
        let owner = entry.node();
        let edges: Vec<EdgeId> = entry.edges().to_vec();

        for edge in edges {
            // Ids listed on a live port always resolve.
            let _ = self.remove_edge(edge);
        }
        if let Some(node) = self.nodes.get_mut(owner) {
            node.detach_port(port);
        }

        let removed = self.ports.remove(port).ok_or(GraphError::UnknownPort(port))?;
        debug!(port = ?port, node = ?owner, "removed port");
        Ok((removed, owner))
    }

    fn refresh_root(&mut self, node: NodeId) {
        match self.nodes.get(node) {
            Some(entry) if entry.is_root() => {
                self.roots.insert(node);
            }
            _ => {
                self.roots.shift_remove(&node);
            }
        }
    }

    /// Run `f` against a node's evaluation view of itself.
    pub(crate) fn with_eval_context<R>(
        &mut self,
        node: NodeId,
        f: impl FnOnce(&mut EvalContext<'_>) -> R,
    ) -> GraphResult<R> {
        let entry = self.nodes.get_mut(node).ok_or(GraphError::UnknownNode(node))?;
        let mut ctx = EvalContext::new(entry, &mut self.ports);
        Ok(f(&mut ctx))
    }

    // ---- reads ------------------------------------------------------------

    /// Get a reference to a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get a reference to a port.
    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id)
    }

    /// Get a reference to an edge.
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Whether `id` names a live node.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// All nodes, in slot order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All edges, in slot order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live ports.
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// A node's input ports in creation order.
    pub fn input_ports(&self, node: NodeId) -> GraphResult<&[PortId]> {
        self.nodes
            .get(node)
            .map(Node::inputs)
            .ok_or(GraphError::UnknownNode(node))
    }

    /// A node's output ports in creation order.
    pub fn output_ports(&self, node: NodeId) -> GraphResult<&[PortId]> {
        self.nodes
            .get(node)
            .map(Node::outputs)
            .ok_or(GraphError::UnknownNode(node))
    }

    /// The `index`-th input port of a node.
    pub fn input_port(&self, node: NodeId, index: usize) -> Option<PortId> {
        self.nodes.get(node)?.inputs().get(index).copied()
    }

    /// The `index`-th output port of a node.
    pub fn output_port(&self, node: NodeId, index: usize) -> Option<PortId> {
        self.nodes.get(node)?.outputs().get(index).copied()
    }

    /// The current value of a port; `Ok(None)` when the slot is empty.
    pub fn port_value(&self, port: PortId) -> GraphResult<Option<&Value>> {
        self.ports
            .get(port)
            .map(Port::value)
            .ok_or(GraphError::UnknownPort(port))
    }

    /// Root nodes, in the order they became roots.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.roots.iter().copied()
    }

    /// Whether `node` currently has no input ports.
    pub fn is_root(&self, node: NodeId) -> bool {
        self.roots.contains(&node)
    }

    /// Nodes awaiting evaluation, in marking order.
    pub fn dirty_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.dirty.iter()
    }

    /// Whether `node` is queued for the next pass.
    pub fn is_dirty(&self, node: NodeId) -> bool {
        self.dirty.contains(node)
    }

    /// Nodes fed directly by `node`, one entry per outgoing edge.
    pub fn downstream(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .get(node)
            .into_iter()
            .flat_map(|n| n.outputs().iter())
            .filter_map(|port| self.ports.get(*port))
            .flat_map(|port| port.edges().iter())
            .filter_map(|edge| self.edges.get(*edge))
            .filter_map(|edge| self.ports.get(edge.input()))
            .map(Port::node)
    }

    /// Nodes feeding `node`, one entry per incoming edge.
    pub fn upstream(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .get(node)
            .into_iter()
            .flat_map(|n| n.inputs().iter())
            .filter_map(|port| self.ports.get(*port))
            .filter_map(Port::incoming)
            .filter_map(|edge| self.edges.get(edge))
            .filter_map(|edge| self.ports.get(edge.output()))
            .map(Port::node)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.len())
            .field("ports", &self.ports.len())
            .field("edges", &self.edges.len())
            .field("roots", &self.roots)
            .field("dirty", &self.dirty)
            .field("config", &self.config)
            .finish()
    }
}
