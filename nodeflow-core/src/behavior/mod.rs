//! Node Behavior
//!
//! A node kind is any type implementing [`NodeBehavior`]. The graph calls it
//! at three points in a node's life:
//!
//! 1. `initialize` once, right after the node is allocated. The behavior
//!    attaches its ports through a [`PortBuilder`]. A node normally creates
//!    all of its ports here and never again.
//! 2. `evaluate` whenever the scheduler reaches the node during a pass. The
//!    behavior reads its inputs and writes its outputs through an
//!    [`EvalContext`], which only exposes this node's own ports.
//! 3. `set_external_data` when something outside the graph (a text field, a
//!    file loader) pushes new parameters. The graph marks the node dirty
//!    afterwards, so the next pass picks the change up.
//!
//! Observers ([`NodeObserver`]) are the other direction: they hear about each
//! evaluation without the engine knowing anything about what they draw.

mod kinds;
mod registry;

pub use kinds::{Add, Constant};
pub use registry::{NodeFactory, NodeRegistry};

use slotmap::SlotMap;

use crate::error::EvaluationFault;
use crate::graph::{Graph, Node, NodeId, Port, PortId};
use crate::types::{Direction, Value, ValueType};

/// Out-of-band parameters delivered to a node.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// The contract every node kind implements.
pub trait NodeBehavior: Send {
    /// Stable name of this kind, e.g. `"ADD"`.
    fn kind(&self) -> &str;

    /// Attach this node's ports. Called exactly once.
    fn initialize(&mut self, ports: &mut PortBuilder<'_>);

    /// Compute outputs from inputs.
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> Result<(), EvaluationFault>;

    /// Accept parameters from outside the graph.
    fn set_external_data(&mut self, _fields: &Fields) {}
}

/// Receives the outcome of each evaluation of one node.
pub trait NodeObserver: Send {
    /// Called after the node evaluated successfully.
    fn on_evaluated(&mut self, _node: &Node) {}

    /// Called after the node's evaluation faulted.
    fn on_faulted(&mut self, _node: &Node, _fault: &EvaluationFault) {}
}

/// Attaches ports to a node during `initialize`.
pub struct PortBuilder<'a> {
    graph: &'a mut Graph,
    node: NodeId,
}

impl<'a> PortBuilder<'a> {
    pub(crate) fn new(graph: &'a mut Graph, node: NodeId) -> Self {
        Self { graph, node }
    }

    /// The node being initialized.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Attach a new input port.
    pub fn input(&mut self, value_type: ValueType) -> PortId {
        self.graph.insert_port(self.node, Direction::Input, value_type)
    }

    /// Attach a new output port.
    pub fn output(&mut self, value_type: ValueType) -> PortId {
        self.graph.insert_port(self.node, Direction::Output, value_type)
    }
}

/// A node's view of its own ports while it evaluates.
///
/// Ports are addressed by index in creation order, so "input 0" is the
/// first input port the node attached.
pub struct EvalContext<'a> {
    node: &'a mut Node,
    ports: &'a mut SlotMap<PortId, Port>,
}

impl<'a> EvalContext<'a> {
    pub(crate) fn new(node: &'a mut Node, ports: &'a mut SlotMap<PortId, Port>) -> Self {
        Self { node, ports }
    }

    /// The node being evaluated.
    pub fn node_id(&self) -> NodeId {
        self.node.id()
    }

    /// Number of input ports on this node.
    pub fn input_count(&self) -> usize {
        self.node.inputs().len()
    }

    /// Number of output ports on this node.
    pub fn output_count(&self) -> usize {
        self.node.outputs().len()
    }

    /// The value currently in input `index`, `None` if the slot is empty.
    pub fn input(&self, index: usize) -> Result<Option<&Value>, EvaluationFault> {
        let id = self.port_id(Direction::Input, index)?;
        self.ports
            .get(id)
            .map(Port::value)
            .ok_or(EvaluationFault::MissingPort {
                direction: Direction::Input,
                index,
            })
    }

    /// Input `index` as a number.
    ///
    /// An empty slot is `Ok(None)`. A slot holding a non-numeric value is a
    /// fault.
    pub fn input_numeric(&self, index: usize) -> Result<Option<f64>, EvaluationFault> {
        match self.input(index)? {
            None => Ok(None),
            Some(Value::Numeric(n)) => Ok(Some(*n)),
            Some(other) => Err(EvaluationFault::UnexpectedInput {
                index,
                expected: ValueType::Numeric,
                found: other.value_type(),
            }),
        }
    }

    /// Write output `index`. The value must match the port's type.
    pub fn set_output(
        &mut self,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<(), EvaluationFault> {
        let value = value.into();
        let port = self.port_mut(Direction::Output, index)?;
        if value.value_type() != port.value_type() {
            return Err(EvaluationFault::OutputTypeMismatch {
                index,
                expected: port.value_type(),
                found: value.value_type(),
            });
        }
        port.set_value(Some(value));
        Ok(())
    }

    /// Empty output `index`.
    pub fn clear_output(&mut self, index: usize) -> Result<(), EvaluationFault> {
        self.port_mut(Direction::Output, index)?.clear_value();
        Ok(())
    }

    /// Publish an auxiliary entry for collaborators.
    pub fn set_aux(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.node.set_aux(key, value);
    }

    /// Withdraw an auxiliary entry.
    pub fn remove_aux(&mut self, key: &str) -> Option<serde_json::Value> {
        self.node.remove_aux(key)
    }

    fn port_id(&self, direction: Direction, index: usize) -> Result<PortId, EvaluationFault> {
        self.node
            .ports(direction)
            .get(index)
            .copied()
            .ok_or(EvaluationFault::MissingPort { direction, index })
    }

    fn port_mut(
        &mut self,
        direction: Direction,
        index: usize,
    ) -> Result<&mut Port, EvaluationFault> {
        let id = self.port_id(direction, index)?;
        self.ports
            .get_mut(id)
            .ok_or(EvaluationFault::MissingPort { direction, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Image;

    /// One numeric input, one image output. Exercises the context checks.
    struct Sampler;

    impl NodeBehavior for Sampler {
        fn kind(&self) -> &str {
            "SAMPLER"
        }

        fn initialize(&mut self, ports: &mut PortBuilder<'_>) {
            ports.input(ValueType::Numeric);
            ports.output(ValueType::Image);
        }

        fn evaluate(&mut self, _ctx: &mut EvalContext<'_>) -> Result<(), EvaluationFault> {
            Ok(())
        }
    }

    fn with_context<R>(f: impl FnOnce(&mut EvalContext<'_>) -> R) -> R {
        let mut graph = Graph::new();
        let id = graph.add_node(Box::new(Sampler));
        graph.with_eval_context(id, f).unwrap()
    }

    #[test]
    fn empty_input_reads_as_none() {
        with_context(|ctx| {
            assert_eq!(ctx.input_count(), 1);
            assert_eq!(ctx.input_numeric(0), Ok(None));
        });
    }

    #[test]
    fn out_of_range_port_is_a_fault() {
        with_context(|ctx| {
            assert_eq!(
                ctx.input(4),
                Err(EvaluationFault::MissingPort {
                    direction: Direction::Input,
                    index: 4
                })
            );
            assert!(ctx.set_output(1, Image::filled(1, 1, 0.0).unwrap()).is_err());
        });
    }

    #[test]
    fn output_type_is_enforced() {
        with_context(|ctx| {
            assert_eq!(
                ctx.set_output(0, 1.0),
                Err(EvaluationFault::OutputTypeMismatch {
                    index: 0,
                    expected: ValueType::Image,
                    found: ValueType::Numeric,
                })
            );
            assert!(ctx.set_output(0, Image::filled(2, 2, 1.0).unwrap()).is_ok());
        });
    }

    #[test]
    fn aux_written_through_context_is_visible() {
        let mut graph = Graph::new();
        let id = graph.add_node(Box::new(Sampler));
        graph
            .with_eval_context(id, |ctx| ctx.set_aux("note", serde_json::json!("hi")))
            .unwrap();
        assert_eq!(
            graph.node(id).unwrap().aux_get("note"),
            Some(&serde_json::json!("hi"))
        );
    }
}
