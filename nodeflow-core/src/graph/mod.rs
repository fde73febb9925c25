//! Dataflow Graph
//!
//! This module implements the graph engine: the entity store, connection
//! validation, dirty tracking and the incremental scheduler.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph where:
//!
//! - Nodes are computations with typed input and output ports
//! - Edges run from one node's output port to another node's input port
//!
//! When a node's parameters change or the topology around it is edited, the
//! node is marked dirty. On the next [`Graph::propagate`] the scheduler
//! re-evaluates the dirty nodes and everything downstream of them, and
//! nothing else.
//!
//! # Design Decisions
//!
//! 1. Entities are stored in generation-checked arenas, so lookups are O(1)
//!    and a handle to a removed entity can never alias a new one.
//!
//! 2. Acyclicity is enforced when an edge is added rather than discovered
//!    during evaluation, so the scheduler can rely on it.
//!
//! 3. The graph is single-threaded. Embeddings that share it across threads
//!    wrap the whole store in one lock (see [`crate::sync::SharedGraph`]).

mod dirty;
mod node;
mod scheduler;
mod store;
mod validate;

pub use dirty::DirtySet;
pub use node::{Edge, EdgeId, Node, NodeId, Port, PortId};
pub use scheduler::PropagationReport;
pub use store::Graph;
