//! Error Types
//!
//! Two classes of failure exist in the engine:
//!
//! - [`GraphError`] is structural. It is returned synchronously from a
//!   mutation call and the store is left untouched: every check runs before
//!   the first write.
//! - [`EvaluationFault`] is raised by a node's `evaluate`. The scheduler
//!   catches it, reports it to the node's observer and keeps going.

use thiserror::Error;

use crate::graph::{EdgeId, NodeId, PortId};
use crate::types::{Direction, ValueType};

/// A rejected mutation of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("unknown port {0:?}")]
    UnknownPort(PortId),

    #[error("unknown edge {0:?}")]
    UnknownEdge(EdgeId),

    #[error("no node kind registered as {0:?}")]
    UnknownKind(String),

    #[error("both ports have the same direction")]
    SameDirection,

    #[error("a port cannot be connected to itself")]
    SelfConnection,

    #[error("input port is already connected")]
    InputAlreadyBound,

    #[error("cannot connect {output} output to {input} input")]
    TypeMismatch { input: ValueType, output: ValueType },

    #[error("connection would create a cycle")]
    CycleDetected,
}

/// A failure inside a node's evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationFault {
    #[error("malformed parameter {field:?}: {reason}")]
    MalformedParameter { field: String, reason: String },

    #[error("node has no {direction} port at index {index}")]
    MissingPort { direction: Direction, index: usize },

    #[error("input {index} holds a {found} value, expected {expected}")]
    UnexpectedInput {
        index: usize,
        expected: ValueType,
        found: ValueType,
    },

    #[error("output {index} accepts {expected} values, got {found}")]
    OutputTypeMismatch {
        index: usize,
        expected: ValueType,
        found: ValueType,
    },

    #[error("{0}")]
    Failed(String),
}

impl EvaluationFault {
    /// Convenience constructor for kinds that only have a message to report.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Result alias for structural graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
