//! Engine Configuration
//!
//! Settings that change how the scheduler behaves. Everything has a default,
//! so an empty JSON object is a valid configuration.

use serde::{Deserialize, Serialize};

/// What downstream nodes see when an upstream node faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Copy the faulted node's outputs downstream as they are. They may be
    /// stale or default values and look identical to a good result.
    #[default]
    PropagateOutputs,

    /// Empty the faulted node's output slots before copying, so consumers
    /// receive no data for this pass.
    ClearOutputs,
}

/// Configuration for a [`Graph`](crate::graph::Graph).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fault_policy: FaultPolicy,
}

impl EngineConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Replace the fault policy.
    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }
}
