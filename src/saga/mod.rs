//! Saga state, lifecycle and orchestration.
//!
//! A saga type implements [`Saga`]: it says how it is created from a start
//! event, how later domain events change it, and which messages it can
//! build ([`SagaDefinition`]). The [`Orchestrator`] drives one
//! [`SagaInstance`] through workflow callbacks and domain events.
//!
//! ```text
//!   PaymentCreated ──► Created ──start workflow──► Associated ──► Running
//!                                                                   │
//!        CommandIssued / EventRaised / QueryRequested ◄─────────────┤
//!        CreditCardDetailsUpdated                    ◄─────────────┤
//!                                                                   ▼
//!   PaymentReceived ──────────────────────────────────────────► Terminal
//! ```

mod callback;
mod definition;
mod instance;
mod orchestration;

pub use callback::{Callback, WorkflowCallback};
pub use definition::SagaDefinition;
pub use instance::SagaInstance;
pub use orchestration::{Orchestrator, SAGA_ID_METADATA, WORKFLOW_INSTANCE_METADATA};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SagaError;
use crate::workflow::Variables;

/// Association property naming the workflow instance a saga is attached to.
pub const WORKFLOW_INSTANCE_PROPERTY: &str = "workflowInstanceId";

/// A key routing inbound messages to a saga instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Association {
    pub property: String,
    pub value: String,
}

impl Association {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }

    /// Association by workflow instance id.
    pub fn workflow_instance(instance_id: impl Into<String>) -> Self {
        Self::new(WORKFLOW_INSTANCE_PROPERTY, instance_id)
    }
}

impl fmt::Display for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.property, self.value)
    }
}

/// Lifecycle position of a saga instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SagaStatus {
    /// State exists, no workflow instance yet.
    Created,
    /// Attached to its workflow instance.
    Associated,
    /// Accepting callbacks and domain events.
    Running,
    /// Ended; accepts nothing further.
    Terminal,
}

/// What a domain event does to the saga it reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Creates a saga when none is associated with the event's key.
    Start,
    Continue,
    /// Ends the saga after it has been applied.
    End,
}

/// Saga state exposed to the workflow engine.
pub trait SagaState: Send + 'static {
    /// Snapshot of the state as named workflow variables.
    fn variables(&self) -> Variables;
}

/// An inbound domain event.
pub trait DomainEvent: fmt::Debug + Send + 'static {
    /// Stable event type name, for logging and errors.
    fn event_type(&self) -> &'static str;

    /// The key this event is routed by.
    fn association(&self) -> Association;

    fn lifecycle(&self) -> Lifecycle;
}

/// A saga type.
pub trait Saga: SagaState + Sized {
    /// Domain events this saga reacts to.
    type Event: DomainEvent;

    /// Shared, read-only settings consulted when a saga is created.
    type Settings: Send + Sync + 'static;

    /// Message factories and response handlers for this saga.
    fn definition() -> SagaDefinition<Self>;

    /// Create state from a start event.
    ///
    /// Fails with [`SagaError::NotAStartEvent`] for any other event.
    fn start(event: &Self::Event, settings: &Self::Settings) -> Result<Self, SagaError>;

    /// Apply a continue or end event.
    fn on(&mut self, event: &Self::Event);
}
