//! Saga orchestration between a workflow engine and message channels.
//!
//! A saga instance holds the state of one long-running business
//! transaction. The workflow engine decides what happens next and calls back
//! with the name of a message to send; the saga builds that message from its
//! current state, dispatches it on the command, event or query channel, and
//! signals the engine to continue.

pub mod bus;
pub mod config;
mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod logging;
pub mod manager;
pub mod message;
pub mod payment;
pub mod registry;
pub mod saga;
pub mod workflow;

pub use bus::{Channels, CommandBus, CommandCallback, DispatchFailure, EventBus, QueryBus};
#[cfg(feature = "local")]
pub use bus::LocalBus;
pub use config::{RetryConfig, SagaConfig};
pub use error::SagaError;
pub use manager::{InstanceStats, Inbound, Receipt, SagaManager};
pub use message::{Message, MessageKind, MessageType, Outbound};
pub use registry::{MessageFactoryRegistry, ResponseHandlerRegistry};
pub use saga::{
    Association, Callback, DomainEvent, Lifecycle, Orchestrator, Saga, SagaDefinition,
    SagaInstance, SagaState, SagaStatus, WorkflowCallback, SAGA_ID_METADATA,
    WORKFLOW_INSTANCE_METADATA,
};
pub use workflow::{
    EngineError, Failure, Signal, Variables, WorkflowBridge, WorkflowEngine,
};
#[cfg(feature = "local")]
pub use workflow::InMemoryEngine;
