//! Shared Access
//!
//! [`Graph`] does no locking of its own. When an embedding needs to touch
//! the graph from more than one thread, every operation must hold one
//! exclusive lock over the whole store: graph-wide invariants such as
//! acyclicity cannot be checked under partial locks.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::graph::{Graph, PropagationReport};

/// A cloneable handle to a graph behind a single mutex.
#[derive(Clone, Default)]
pub struct SharedGraph {
    inner: Arc<Mutex<Graph>>,
}

impl SharedGraph {
    /// Take ownership of `graph` and share it.
    pub fn new(graph: Graph) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Lock the graph. Hold the guard for the whole operation.
    pub fn lock(&self) -> MutexGuard<'_, Graph> {
        self.inner.lock()
    }

    /// Run `f` with the graph locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut Graph) -> R) -> R {
        let mut graph = self.inner.lock();
        f(&mut graph)
    }

    /// Run one evaluation pass with the graph locked.
    pub fn propagate(&self) -> PropagationReport {
        self.inner.lock().propagate()
    }
}

impl std::fmt::Debug for SharedGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedGraph").finish_non_exhaustive()
    }
}
