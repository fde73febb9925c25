//! Connection Validation
//!
//! An edge is legal when it joins one input port to one output port of the
//! same type, the input is still free, and the edge would not close a cycle.
//!
//! # Cycle check
//!
//! Adding `output_node -> input_node` closes a cycle exactly when
//! `output_node` is already reachable from `input_node`. We answer that with
//! a forward breadth-first search from the input side over existing edges.
//! A node joined to itself is the degenerate case and is rejected the same
//! way.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use super::node::{Edge, EdgeId, NodeId, Port, PortId};
use super::store::Graph;
use crate::error::{GraphError, GraphResult};
use crate::types::Direction;

impl Graph {
    /// Check whether `a` and `b` may be connected.
    ///
    /// Argument order does not matter: the ports are sorted into input and
    /// output by direction. On success returns `(input, output)`.
    pub fn validate(&self, a: PortId, b: PortId) -> GraphResult<(PortId, PortId)> {
        let port_a = self.ports.get(a).ok_or(GraphError::UnknownPort(a))?;
        let port_b = self.ports.get(b).ok_or(GraphError::UnknownPort(b))?;

        if a == b {
            return Err(GraphError::SelfConnection);
        }

        let (input, output): (&Port, &Port) = match (port_a.direction(), port_b.direction()) {
            (Direction::Input, Direction::Output) => (port_a, port_b),
            (Direction::Output, Direction::Input) => (port_b, port_a),
            _ => return Err(GraphError::SameDirection),
        };

        if input.incoming().is_some() {
            return Err(GraphError::InputAlreadyBound);
        }

        if !input.value_type().is_compatible(output.value_type()) {
            return Err(GraphError::TypeMismatch {
                input: input.value_type(),
                output: output.value_type(),
            });
        }

        if self.can_reach(input.node(), output.node()) {
            return Err(GraphError::CycleDetected);
        }

        Ok((input.id(), output.id()))
    }

    /// Connect two ports.
    ///
    /// Validation runs again here, so a stale `validate` result can never
    /// produce an illegal edge. Both endpoint nodes are marked dirty.
    pub fn connect(&mut self, a: PortId, b: PortId) -> GraphResult<EdgeId> {
        let (input, output) = self.validate(a, b)?;

        let id = self.edges.insert_with_key(|id| Edge::new(id, input, output));

        let mut touched: [Option<NodeId>; 2] = [None; 2];
        for (slot, port_id) in touched.iter_mut().zip([output, input]) {
            if let Some(port) = self.ports.get_mut(port_id) {
                port.link(id);
                *slot = Some(port.node());
            }
        }
        for node in touched.into_iter().flatten() {
            self.mark_dirty(node);
        }

        debug!(edge = ?id, input = ?input, output = ?output, "connected ports");
        Ok(id)
    }

    /// Whether `to` can be reached from `from` by following edges forward.
    ///
    /// A node always reaches itself.
    pub fn can_reach(&self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }

        let mut seen = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            for next in self.downstream(current) {
                if next == to {
                    return true;
                }
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{Add, Constant};
    use crate::types::ValueType;

    fn chain() -> (Graph, NodeId, NodeId) {
        let mut graph = Graph::new();
        let a = graph.add_node(Box::new(Add::new()));
        let b = graph.add_node(Box::new(Add::new()));
        graph
            .connect(graph.output_port(a, 0).unwrap(), graph.input_port(b, 0).unwrap())
            .unwrap();
        (graph, a, b)
    }

    #[test]
    fn argument_order_does_not_matter() {
        let mut graph = Graph::new();
        let c = graph.add_node(Box::new(Constant::new()));
        let d = graph.add_node(Box::new(Add::new()));
        let out = graph.output_port(c, 0).unwrap();
        let inp = graph.input_port(d, 0).unwrap();

        assert_eq!(graph.validate(out, inp), Ok((inp, out)));
        assert_eq!(graph.validate(inp, out), Ok((inp, out)));

        let edge = graph.connect(inp, out).unwrap();
        let edge = graph.edge(edge).unwrap();
        assert_eq!(edge.input(), inp);
        assert_eq!(edge.output(), out);
    }

    #[test]
    fn rejects_same_port() {
        let mut graph = Graph::new();
        let d = graph.add_node(Box::new(Add::new()));
        let inp = graph.input_port(d, 0).unwrap();
        assert_eq!(graph.validate(inp, inp), Err(GraphError::SelfConnection));
    }

    #[test]
    fn rejects_same_direction() {
        let mut graph = Graph::new();
        let d = graph.add_node(Box::new(Add::new()));
        let e = graph.add_node(Box::new(Add::new()));
        assert_eq!(
            graph.validate(graph.input_port(d, 0).unwrap(), graph.input_port(e, 1).unwrap()),
            Err(GraphError::SameDirection)
        );
        assert_eq!(
            graph.validate(graph.output_port(d, 0).unwrap(), graph.output_port(e, 0).unwrap()),
            Err(GraphError::SameDirection)
        );
    }

    #[test]
    fn rejects_type_mismatch() {
        let mut graph = Graph::new();
        let c = graph.add_node(Box::new(Constant::new()));
        let sink = graph.add_node(Box::new(Constant::new()));
        let image_in = graph.add_port(sink, Direction::Input, ValueType::Image).unwrap();

        assert_eq!(
            graph.connect(graph.output_port(c, 0).unwrap(), image_in),
            Err(GraphError::TypeMismatch {
                input: ValueType::Image,
                output: ValueType::Numeric,
            })
        );
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn rejects_loop_onto_same_node() {
        let mut graph = Graph::new();
        let d = graph.add_node(Box::new(Add::new()));
        assert_eq!(
            graph.validate(graph.output_port(d, 0).unwrap(), graph.input_port(d, 0).unwrap()),
            Err(GraphError::CycleDetected)
        );
    }

    #[test]
    fn rejects_back_edge() {
        let (mut graph, a, b) = chain();
        assert_eq!(
            graph.connect(graph.output_port(b, 0).unwrap(), graph.input_port(a, 0).unwrap()),
            Err(GraphError::CycleDetected)
        );
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn reachability_is_transitive_and_directed() {
        let (mut graph, a, b) = chain();
        let c = graph.add_node(Box::new(Add::new()));
        graph
            .connect(graph.output_port(b, 0).unwrap(), graph.input_port(c, 0).unwrap())
            .unwrap();

        assert!(graph.can_reach(a, c));
        assert!(!graph.can_reach(c, a));
        assert!(graph.can_reach(b, b));

        assert_eq!(
            graph.connect(graph.output_port(c, 0).unwrap(), graph.input_port(a, 1).unwrap()),
            Err(GraphError::CycleDetected)
        );
    }

    #[test]
    fn connect_marks_both_ends_dirty() {
        let (mut graph, a, b) = chain();
        graph.propagate();
        assert_eq!(graph.dirty_nodes().count(), 0);

        let c = graph.add_node(Box::new(Constant::new()));
        graph.propagate();
        graph
            .connect(graph.output_port(c, 0).unwrap(), graph.input_port(b, 1).unwrap())
            .unwrap();
        assert!(graph.is_dirty(c));
        assert!(graph.is_dirty(b));
        assert!(!graph.is_dirty(a));
    }
}
