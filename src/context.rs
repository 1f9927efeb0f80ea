//! Caller-owned state threaded through a run.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Shared, read-only handle to caller state for the duration of a run.
///
/// The framework never mutates the state. Callers that need counters or
/// other mutable bookkeeping store interior-mutable types (atomics, mutexes)
/// inside it. Cloning is cheap: clones share the same state.
#[derive(Clone)]
pub struct RunContext {
    run_id: String,
    state: Option<Arc<dyn Any + Send + Sync>>,
}

impl RunContext {
    /// Context without caller state.
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            state: None,
        }
    }

    /// Context carrying `state`.
    pub fn with_state<T: Any + Send + Sync>(state: T) -> Self {
        Self::from_arc(Arc::new(state))
    }

    /// Context sharing an existing state handle.
    pub fn from_arc<T: Any + Send + Sync>(state: Arc<T>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            state: Some(state),
        }
    }

    /// Borrow the state as `T`, if present and of that type.
    pub fn state<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.state.as_deref().and_then(|s| s.downcast_ref::<T>())
    }

    pub fn has_state(&self) -> bool {
        self.state.is_some()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("has_state", &self.state.is_some())
            .finish()
    }
}
