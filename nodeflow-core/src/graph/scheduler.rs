//! Incremental Scheduler
//!
//! [`Graph::propagate`] re-evaluates exactly the part of the graph that can
//! have changed since the last pass, in dependency order.
//!
//! # Algorithm
//!
//! 1. If nothing is dirty, return. This is the common case on most ticks.
//! 2. Collect the affected set: every dirty node plus everything downstream
//!    of one (forward BFS over edges).
//! 3. Count, for each affected node, the incoming edges whose source is also
//!    affected. Edges from outside the set carry stable data and are treated
//!    as already satisfied.
//! 4. Kahn's algorithm over the affected set: evaluate a node once its count
//!    reaches zero, copy its outputs along its edges, decrement consumers.
//! 5. Clear the dirty set.
//!
//! A node that faults is reported to its observer and the pass carries on.
//! Whatever its outputs hold is still copied downstream unless the graph is
//! configured with [`FaultPolicy::ClearOutputs`].

use std::collections::{HashMap, VecDeque};

use indexmap::IndexSet;
use tracing::{debug, trace, warn};

use super::node::NodeId;
use super::store::Graph;
use crate::behavior::EvalContext;
use crate::config::FaultPolicy;
use crate::error::EvaluationFault;

/// What happened during one call to [`Graph::propagate`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PropagationReport {
    evaluated: Vec<NodeId>,
    faults: Vec<(NodeId, EvaluationFault)>,
}

impl PropagationReport {
    /// Nodes evaluated, in evaluation order.
    pub fn evaluated(&self) -> &[NodeId] {
        &self.evaluated
    }

    /// Faults raised during the pass.
    pub fn faults(&self) -> &[(NodeId, EvaluationFault)] {
        &self.faults
    }

    /// Number of nodes evaluated.
    pub fn evaluation_count(&self) -> usize {
        self.evaluated.len()
    }

    /// Whether `node` was evaluated in this pass.
    pub fn was_evaluated(&self, node: NodeId) -> bool {
        self.evaluated.contains(&node)
    }

    /// Position of `node` in the evaluation order.
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.evaluated.iter().position(|&id| id == node)
    }

    /// True if no node faulted.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

impl Graph {
    /// Run one evaluation pass over the dirty part of the graph.
    pub fn propagate(&mut self) -> PropagationReport {
        let mut report = PropagationReport::default();
        if self.dirty.is_empty() {
            return report;
        }

        let affected = self.affected_set();
        let mut remaining: HashMap<NodeId, usize> = affected
            .iter()
            .map(|&id| (id, self.local_in_degree(id, &affected)))
            .collect();

        let mut ready: VecDeque<NodeId> = affected
            .iter()
            .copied()
            .filter(|id| remaining.get(id) == Some(&0))
            .collect();

        debug!(
            dirty = self.dirty.len(),
            affected = affected.len(),
            "propagation pass"
        );

        while let Some(id) = ready.pop_front() {
            match self.evaluate_node(id) {
                Ok(()) => self.settle(id),
                Err(fault) => {
                    self.record_fault(id, &fault);
                    report.faults.push((id, fault));
                }
            }
            report.evaluated.push(id);

            for consumer in self.push_outputs(id) {
                if let Some(count) = remaining.get_mut(&consumer) {
                    if *count > 0 {
                        *count -= 1;
                        if *count == 0 {
                            ready.push_back(consumer);
                        }
                    }
                }
            }
        }

        self.dirty.clear();
        debug!(
            evaluated = report.evaluated.len(),
            faults = report.faults.len(),
            "propagation finished"
        );
        report
    }

    /// Dirty nodes and everything downstream of them, in BFS order.
    fn affected_set(&self) -> IndexSet<NodeId> {
        let mut affected: IndexSet<NodeId> = self
            .dirty
            .iter()
            .filter(|&id| self.nodes.contains_key(id))
            .collect();

        let mut cursor = 0;
        while let Some(&current) = affected.get_index(cursor) {
            let next: Vec<NodeId> = self.downstream(current).collect();
            affected.extend(next);
            cursor += 1;
        }
        affected
    }

    /// Incoming edges of `node` whose source is inside `affected`.
    fn local_in_degree(&self, node: NodeId, affected: &IndexSet<NodeId>) -> usize {
        self.upstream(node)
            .filter(|source| affected.contains(source))
            .count()
    }

    fn evaluate_node(&mut self, id: NodeId) -> Result<(), EvaluationFault> {
        let (Some(behavior), Some(node)) = (self.behaviors.get_mut(id), self.nodes.get_mut(id))
        else {
            return Ok(());
        };
        trace!(node = ?id, kind = node.kind(), "evaluating");
        let mut ctx = EvalContext::new(node, &mut self.ports);
        behavior.evaluate(&mut ctx)
    }

    /// Bookkeeping after a successful evaluation.
    fn settle(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        node.remove_aux("error");
        if let Some(observer) = self.observers.get_mut(id) {
            observer.on_evaluated(node);
        }
    }

    fn record_fault(&mut self, id: NodeId, fault: &EvaluationFault) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        warn!(node = ?id, kind = node.kind(), %fault, "node evaluation failed");
        node.set_aux("error", serde_json::Value::String(fault.to_string()));

        if self.config.fault_policy == FaultPolicy::ClearOutputs {
            for port in node.outputs() {
                if let Some(port) = self.ports.get_mut(*port) {
                    port.clear_value();
                }
            }
        }

        if let Some(observer) = self.observers.get_mut(id) {
            observer.on_faulted(node, fault);
        }
    }

    /// Copy each output value of `id` into every input it feeds.
    ///
    /// Returns the consuming node of each edge, one entry per edge.
    fn push_outputs(&mut self, id: NodeId) -> Vec<NodeId> {
        let mut transfers = Vec::new();
        if let Some(node) = self.nodes.get(id) {
            for &output in node.outputs() {
                let Some(port) = self.ports.get(output) else {
                    continue;
                };
                for edge in port.edges() {
                    if let Some(edge) = self.edges.get(*edge) {
                        transfers.push((edge.input(), port.value().cloned()));
                    }
                }
            }
        }

        let mut consumers = Vec::with_capacity(transfers.len());
        for (input, value) in transfers {
            if let Some(port) = self.ports.get_mut(input) {
                port.set_value(value);
                consumers.push(port.node());
            }
        }
        consumers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{Add, Constant, EvalContext, NodeBehavior, PortBuilder};
    use crate::config::EngineConfig;
    use crate::types::{Value, ValueType};

    /// Passes its input through, counting evaluations.
    struct Relay;

    impl NodeBehavior for Relay {
        fn kind(&self) -> &str {
            "RELAY"
        }

        fn initialize(&mut self, ports: &mut PortBuilder<'_>) {
            ports.input(ValueType::Numeric);
            ports.output(ValueType::Numeric);
        }

        fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> Result<(), EvaluationFault> {
            let value = ctx.input_numeric(0)?.unwrap_or(0.0);
            ctx.set_output(0, value)
        }
    }

    /// Writes its output, then fails.
    struct Faulty;

    impl NodeBehavior for Faulty {
        fn kind(&self) -> &str {
            "FAULTY"
        }

        fn initialize(&mut self, ports: &mut PortBuilder<'_>) {
            ports.output(ValueType::Numeric);
        }

        fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> Result<(), EvaluationFault> {
            ctx.set_output(0, 9.0)?;
            Err(EvaluationFault::failed("bad input"))
        }
    }

    fn link(graph: &mut Graph, from: NodeId, to: NodeId, input: usize) {
        let out = graph.output_port(from, 0).unwrap();
        let inp = graph.input_port(to, input).unwrap();
        graph.connect(out, inp).unwrap();
    }

    fn output(graph: &Graph, node: NodeId) -> Option<f64> {
        let port = graph.output_port(node, 0).unwrap();
        graph.port_value(port).unwrap().and_then(Value::as_numeric)
    }

    #[test]
    fn empty_dirty_set_is_a_no_op() {
        let mut graph = Graph::new();
        let report = graph.propagate();
        assert_eq!(report.evaluation_count(), 0);
    }

    #[test]
    fn evaluates_in_topological_order() {
        let mut graph = Graph::new();
        let c = graph.add_node(Box::new(Constant::with_value(2.0)));
        let r1 = graph.add_node(Box::new(Relay));
        let r2 = graph.add_node(Box::new(Relay));
        // Created out of order on purpose: r2 feeds from r1.
        link(&mut graph, r1, r2, 0);
        link(&mut graph, c, r1, 0);

        let report = graph.propagate();
        assert_eq!(report.evaluation_count(), 3);
        assert!(report.position(c) < report.position(r1));
        assert!(report.position(r1) < report.position(r2));
        assert_eq!(output(&graph, r2), Some(2.0));
    }

    #[test]
    fn diamond_waits_for_both_branches() {
        let mut graph = Graph::new();
        let c = graph.add_node(Box::new(Constant::with_value(1.0)));
        let left = graph.add_node(Box::new(Relay));
        let right = graph.add_node(Box::new(Relay));
        let join = graph.add_node(Box::new(Add::new()));
        link(&mut graph, c, left, 0);
        link(&mut graph, c, right, 0);
        link(&mut graph, left, join, 0);
        link(&mut graph, right, join, 1);

        let report = graph.propagate();
        assert_eq!(report.evaluation_count(), 4);
        assert_eq!(report.position(join), Some(3));
        assert_eq!(output(&graph, join), Some(2.0));
    }

    #[test]
    fn unaffected_upstream_output_is_reused() {
        let mut graph = Graph::new();
        let a = graph.add_node(Box::new(Constant::with_value(5.0)));
        let b = graph.add_node(Box::new(Constant::with_value(1.0)));
        let sum = graph.add_node(Box::new(Add::new()));
        link(&mut graph, a, sum, 0);
        link(&mut graph, b, sum, 1);
        graph.propagate();

        let mut fields = crate::behavior::Fields::new();
        fields.insert("value".into(), serde_json::json!(10.0));
        graph.set_external_data(b, &fields).unwrap();

        let report = graph.propagate();
        assert!(!report.was_evaluated(a));
        assert_eq!(report.evaluated(), &[b, sum]);
        assert_eq!(output(&graph, sum), Some(15.0));
    }

    #[test]
    fn fault_is_isolated_and_outputs_still_flow() {
        let mut graph = Graph::new();
        let bad = graph.add_node(Box::new(Faulty));
        let relay = graph.add_node(Box::new(Relay));
        link(&mut graph, bad, relay, 0);

        let report = graph.propagate();
        assert_eq!(report.evaluation_count(), 2);
        assert_eq!(report.faults().len(), 1);
        assert_eq!(report.faults()[0].0, bad);
        assert_eq!(output(&graph, relay), Some(9.0));
        assert_eq!(
            graph.node(bad).unwrap().aux_get("error"),
            Some(&serde_json::json!("bad input"))
        );
        assert_eq!(graph.dirty_nodes().count(), 0);
    }

    #[test]
    fn clear_outputs_policy_hides_faulted_data() {
        let config = EngineConfig::default().with_fault_policy(FaultPolicy::ClearOutputs);
        let mut graph = Graph::with_config(config);
        let bad = graph.add_node(Box::new(Faulty));
        let relay = graph.add_node(Box::new(Relay));
        link(&mut graph, bad, relay, 0);

        graph.propagate();
        assert_eq!(output(&graph, bad), None);
        assert_eq!(output(&graph, relay), Some(0.0));
        let relay_in = graph.input_port(relay, 0).unwrap();
        assert_eq!(graph.port_value(relay_in), Ok(None));
    }

    #[test]
    fn successful_evaluation_clears_previous_error() {
        let mut graph = Graph::new();
        let c = graph.add_node(Box::new(Constant::new()));

        let mut fields = crate::behavior::Fields::new();
        fields.insert("value".into(), serde_json::json!("abc"));
        graph.set_external_data(c, &fields).unwrap();
        assert!(!graph.propagate().is_clean());
        assert!(graph.node(c).unwrap().aux_get("error").is_some());

        fields.insert("value".into(), serde_json::json!("4"));
        graph.set_external_data(c, &fields).unwrap();
        assert!(graph.propagate().is_clean());
        assert!(graph.node(c).unwrap().aux_get("error").is_none());
        assert_eq!(output(&graph, c), Some(4.0));
    }
}
