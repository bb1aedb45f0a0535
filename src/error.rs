use thiserror::Error;

use crate::message::MessageKind;
use crate::saga::{Association, SagaStatus};
use crate::workflow::EngineError;

/// Error type for orchestration operations.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The workflow asked for a message type no factory produces.
    #[error("no message factory registered for type `{type_name}`")]
    NoFactory { type_name: String },

    /// A response type was requested for a message that is not a query.
    #[error("`{type_name}` is not a registered query factory")]
    NotAQuery { type_name: String },

    /// A query response arrived that no handler accepts.
    #[error("no response handler registered for `{response_type}`")]
    NoResponseHandler { response_type: String },

    /// The callback category does not match the factory category.
    #[error("`{type_name}` is registered as {actual:?} but was requested as {expected:?}")]
    KindMismatch {
        type_name: String,
        expected: MessageKind,
        actual: MessageKind,
    },

    /// Encoding or decoding a message payload failed.
    #[error("codec failed for `{message_type}`: {reason}")]
    Codec {
        message_type: String,
        reason: String,
    },

    /// No saga instance is associated with the key.
    #[error("no saga associated with {0}")]
    UnknownAssociation(Association),

    /// No saga instance with the id exists.
    #[error("saga {0} not found")]
    UnknownSaga(String),

    /// The instance is not in a state that accepts the message.
    #[error("saga {saga_id} is {status:?}")]
    NotRunning { saga_id: String, status: SagaStatus },

    /// A start event reached a saga that is already started. The event was
    /// not applied.
    #[error("saga {saga_id} is already started; `{event_type}` not applied")]
    AlreadyStarted {
        saga_id: String,
        event_type: String,
    },

    /// An event that cannot start a saga was used to create one.
    #[error("`{event_type}` cannot start a saga")]
    NotAStartEvent { event_type: String },

    /// A second workflow instance was attached to a saga.
    #[error("saga {saga_id} is already attached to workflow instance {workflow_instance_id}")]
    WorkflowAlreadyAttached {
        saga_id: String,
        workflow_instance_id: String,
    },

    /// The workflow engine refused a non-retried operation.
    #[error("workflow engine error: {0}")]
    Engine(#[from] EngineError),

    /// A bounded signal retry ran out of attempts.
    #[error("signal to execution point `{execution_point_id}` abandoned after {attempts} attempts: {source}")]
    SignalAbandoned {
        execution_point_id: String,
        attempts: usize,
        #[source]
        source: EngineError,
    },

    /// The instance worker thread is gone.
    #[error("saga instance {0} has stopped")]
    InstanceStopped(String),

    /// Spawning an instance worker thread failed.
    #[error("failed to spawn saga instance thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("lock poisoned during {0}")]
    LockPoisoned(&'static str),

    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}

impl SagaError {
    /// Routing and configuration errors: the workflow definition and the
    /// saga registrations disagree, so retrying cannot succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SagaError::NoFactory { .. }
                | SagaError::NotAQuery { .. }
                | SagaError::NoResponseHandler { .. }
                | SagaError::KindMismatch { .. }
        )
    }

    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            SagaError::UnknownAssociation(_) | SagaError::UnknownSaga(_) => 404,
            SagaError::NotRunning { .. }
            | SagaError::AlreadyStarted { .. }
            | SagaError::WorkflowAlreadyAttached { .. } => 409,
            SagaError::NotAStartEvent { .. } | SagaError::Codec { .. } => 400,
            e if e.is_fatal() => 422,
            SagaError::Engine(_) | SagaError::SignalAbandoned { .. } => 502,
            _ => 500,
        }
    }
}
