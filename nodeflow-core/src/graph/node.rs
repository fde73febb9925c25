//! Graph Entities
//!
//! This module defines the three entities that live in the graph store:
//! nodes, the ports attached to them, and the edges between ports.
//!
//! Entities refer to each other by id only. A port points back at its node,
//! an edge names its two ports; ownership of all of them stays with the
//! [`Graph`](super::Graph).

use indexmap::IndexMap;
use smallvec::SmallVec;
use slotmap::new_key_type;

use crate::types::{Direction, Value, ValueType};

new_key_type! {
    /// Handle to a node. Stale handles to removed nodes never resolve.
    pub struct NodeId;

    /// Handle to a port.
    pub struct PortId;

    /// Handle to an edge.
    pub struct EdgeId;
}

/// Port id lists are short for every realistic node kind.
pub(crate) type PortList = SmallVec<[PortId; 4]>;

/// A computation unit in the graph.
///
/// The node itself only records its ports and auxiliary data. Its behavior
/// lives beside it in the store so it can borrow the graph while evaluating.
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique identifier for this node.
    id: NodeId,

    /// Registered kind name of the behavior driving this node.
    kind: String,

    /// Input ports in creation order.
    inputs: PortList,

    /// Output ports in creation order.
    outputs: PortList,

    /// Named data for collaborators, e.g. the last result or last error.
    aux: IndexMap<String, serde_json::Value>,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            inputs: PortList::new(),
            outputs: PortList::new(),
            aux: IndexMap::new(),
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the node's kind name.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Input port ids in creation order.
    pub fn inputs(&self) -> &[PortId] {
        &self.inputs
    }

    /// Output port ids in creation order.
    pub fn outputs(&self) -> &[PortId] {
        &self.outputs
    }

    /// Port ids on the given side.
    pub fn ports(&self, direction: Direction) -> &[PortId] {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }

    /// A node without input ports is a root: it needs no upstream data.
    pub fn is_root(&self) -> bool {
        self.inputs.is_empty()
    }

    /// The full auxiliary data mapping.
    pub fn aux(&self) -> &IndexMap<String, serde_json::Value> {
        &self.aux
    }

    /// Look up one auxiliary entry.
    pub fn aux_get(&self, key: &str) -> Option<&serde_json::Value> {
        self.aux.get(key)
    }

    pub(crate) fn set_aux(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.aux.insert(key.into(), value);
    }

    pub(crate) fn remove_aux(&mut self, key: &str) -> Option<serde_json::Value> {
        self.aux.shift_remove(key)
    }

    pub(crate) fn attach_port(&mut self, direction: Direction, port: PortId) {
        match direction {
            Direction::Input => self.inputs.push(port),
            Direction::Output => self.outputs.push(port),
        }
    }

    /// Remove a port from whichever list holds it, keeping the order of the rest.
    pub(crate) fn detach_port(&mut self, port: PortId) {
        self.inputs.retain(|p| *p != port);
        self.outputs.retain(|p| *p != port);
    }
}

/// A typed connection point on a node.
#[derive(Debug, Clone)]
pub struct Port {
    id: PortId,

    /// Owning node (a back-reference, not ownership).
    node: NodeId,

    direction: Direction,

    value_type: ValueType,

    /// Edges touching this port. Never more than one for an input port.
    edges: SmallVec<[EdgeId; 2]>,

    /// Current value slot; `None` means empty.
    value: Option<Value>,
}

impl Port {
    pub(crate) fn new(
        id: PortId,
        node: NodeId,
        direction: Direction,
        value_type: ValueType,
    ) -> Self {
        Self {
            id,
            node,
            direction,
            value_type,
            edges: SmallVec::new(),
            value: None,
        }
    }

    /// Get the port's ID.
    pub fn id(&self) -> PortId {
        self.id
    }

    /// The node this port belongs to.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Whether this port consumes or produces data.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// True for input ports.
    pub fn is_input(&self) -> bool {
        self.direction == Direction::Input
    }

    /// The type of value this port carries.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// All edges touching this port.
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// The incoming edge of an input port, if bound.
    pub fn incoming(&self) -> Option<EdgeId> {
        if self.is_input() {
            self.edges.first().copied()
        } else {
            None
        }
    }

    /// True if at least one edge touches this port.
    pub fn is_connected(&self) -> bool {
        !self.edges.is_empty()
    }

    /// The current value, or `None` if the slot is empty.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub(crate) fn link(&mut self, edge: EdgeId) {
        self.edges.push(edge);
    }

    pub(crate) fn unlink(&mut self, edge: EdgeId) {
        self.edges.retain(|e| *e != edge);
    }

    pub(crate) fn set_value(&mut self, value: Option<Value>) {
        self.value = value;
    }

    pub(crate) fn clear_value(&mut self) {
        self.value = None;
    }
}

/// A directed data-flow arc from an output port to an input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    id: EdgeId,
    input: PortId,
    output: PortId,
}

impl Edge {
    pub(crate) fn new(id: EdgeId, input: PortId, output: PortId) -> Self {
        Self { id, input, output }
    }

    /// Get the edge's ID.
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// The consuming (downstream) port.
    pub fn input(&self) -> PortId {
        self.input
    }

    /// The producing (upstream) port.
    pub fn output(&self) -> PortId {
        self.output
    }

    /// The endpoint that is not `port`, if `port` is an endpoint at all.
    pub fn other_end(&self, port: PortId) -> Option<PortId> {
        if port == self.input {
            Some(self.output)
        } else if port == self.output {
            Some(self.input)
        } else {
            None
        }
    }
}
