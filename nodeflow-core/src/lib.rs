//! Nodeflow Core
//!
//! This crate provides the engine behind a node-based editor: nodes with
//! typed ports wired into a directed acyclic graph, re-evaluated
//! incrementally as values change or the graph is edited.
//! It implements:
//!
//! - The node/port/edge store with cascading removal
//! - Connection validation (direction, fan-in, types, cycles)
//! - Dirty tracking and an incremental topological scheduler
//! - The node behavior contract, with `Add` and `Constant` as built-in kinds
//!
//! Rendering, persistence and undo live outside this crate. Everything they
//! need goes through the mutation and read API on [`Graph`] and the
//! [`NodeObserver`] callbacks.
//!
//! # Architecture
//!
//! - `types`: value types carried by ports
//! - `graph`: entity store, validator, dirty tracker, scheduler
//! - `behavior`: node kinds, evaluation context, observers, kind registry
//! - `config`: engine settings
//! - `sync`: a locked handle for multi-threaded embeddings
//!
//! # Example
//!
//! ```rust
//! use nodeflow_core::behavior::{Add, Constant};
//! use nodeflow_core::graph::Graph;
//!
//! let mut graph = Graph::new();
//! let three = graph.add_node(Box::new(Constant::with_value(3.0)));
//! let sum = graph.add_node(Box::new(Add::new()));
//!
//! let out = graph.output_port(three, 0).unwrap();
//! graph.connect(out, graph.input_port(sum, 0).unwrap()).unwrap();
//! graph.connect(out, graph.input_port(sum, 1).unwrap()).unwrap();
//!
//! graph.propagate();
//! let result = graph.port_value(graph.output_port(sum, 0).unwrap()).unwrap();
//! assert_eq!(result.and_then(|v| v.as_numeric()), Some(6.0));
//! ```

pub mod behavior;
pub mod config;
pub mod error;
pub mod graph;
pub mod sync;
pub mod types;

pub use behavior::{EvalContext, Fields, NodeBehavior, NodeObserver, NodeRegistry, PortBuilder};
pub use config::{EngineConfig, FaultPolicy};
pub use error::{EvaluationFault, GraphError, GraphResult};
pub use graph::{Edge, EdgeId, Graph, Node, NodeId, Port, PortId, PropagationReport};
pub use sync::SharedGraph;
pub use types::{Direction, Image, Value, ValueType};
