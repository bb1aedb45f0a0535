//! Workflow engine boundary.
//!
//! The saga only needs two operations from the engine: start an instance of
//! a process definition, and signal a suspended execution point to continue
//! (with fresh variables) or to take a failure branch.

mod bridge;
#[cfg(feature = "local")]
mod in_memory;

pub use bridge::WorkflowBridge;
#[cfg(feature = "local")]
pub use in_memory::{InMemoryEngine, StartedInstance};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named values the workflow definition branches on.
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// Failure details handed to the workflow instead of variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: String,
    pub message: String,
}

/// What a suspended execution point is told.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Continue past the point with a fresh state snapshot.
    Resume(Variables),
    /// Continue along the failure branch.
    Fail(Failure),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine refused the operation, typically on an optimistic
    /// concurrency conflict with its own bookkeeping.
    #[error("rejected by workflow engine: {0}")]
    Rejected(String),
    #[error("unknown process definition `{0}`")]
    UnknownDefinition(String),
    #[error("unknown execution point `{0}`")]
    UnknownExecutionPoint(String),
    #[error("workflow engine unavailable: {0}")]
    Unavailable(String),
}

/// The operations the orchestrator needs from a workflow engine.
pub trait WorkflowEngine: Send + Sync {
    /// Start an instance of `definition_key`; returns the instance id.
    fn start_instance(
        &self,
        definition_key: &str,
        variables: &Variables,
    ) -> Result<String, EngineError>;

    /// Signal a suspended execution point.
    fn signal(&self, execution_point_id: &str, signal: &Signal) -> Result<(), EngineError>;
}

impl<T: WorkflowEngine + ?Sized> WorkflowEngine for Arc<T> {
    fn start_instance(
        &self,
        definition_key: &str,
        variables: &Variables,
    ) -> Result<String, EngineError> {
        (**self).start_instance(definition_key, variables)
    }

    fn signal(&self, execution_point_id: &str, signal: &Signal) -> Result<(), EngineError> {
        (**self).signal(execution_point_id, signal)
    }
}
