//! Kind Registry
//!
//! Maps kind names to factories so collaborators (a node menu, a file
//! loader) can create nodes by name without knowing the concrete types.

use indexmap::IndexMap;

use super::{Add, Constant, NodeBehavior};
use crate::error::{GraphError, GraphResult};

/// Builds a fresh behavior instance.
pub type NodeFactory = Box<dyn Fn() -> Box<dyn NodeBehavior> + Send + Sync>;

/// Registered node kinds, in registration order.
#[derive(Default)]
pub struct NodeRegistry {
    factories: IndexMap<String, NodeFactory>,
}

impl NodeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with `ADD` and `CONSTANT`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Add::KIND, || Box::new(Add::new()));
        registry.register(Constant::KIND, || Box::new(Constant::new()));
        registry
    }

    /// Register a factory. Re-registering a kind replaces its factory.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn NodeBehavior> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    /// Instantiate a behavior of the given kind.
    pub fn create(&self, kind: &str) -> GraphResult<Box<dyn NodeBehavior>> {
        self.factories
            .get(kind)
            .map(|factory| factory())
            .ok_or_else(|| GraphError::UnknownKind(kind.to_string()))
    }

    /// Whether `kind` has a registered factory.
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kind names.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
