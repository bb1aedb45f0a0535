//! Outbound channels - the command, event and query buses a saga dispatches on.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Channels                             │
//! │   commands: dispatch(message, callback)   request/outcome    │
//! │   events:   publish(message)              fire-and-forget    │
//! │   queries:  query(message, response_type) request/response   │
//! └──────────────────────────────────────────────────────────────┘
//!          │                    │                     │
//!          ▼                    ▼                     ▼
//!   ┌────────────┐      ┌──────────────┐      ┌──────────────┐
//!   │  LocalBus  │      │ broker-backed│      │  RPC-backed  │
//!   │ (included) │      │  (external)  │      │  (external)  │
//!   └────────────┘      └──────────────┘      └──────────────┘
//! ```
//!
//! Command dispatch is asynchronous from the transport's point of view: the
//! bus takes ownership of a [`CommandCallback`] and invokes it whenever the
//! outcome is known, possibly from another thread.

#[cfg(feature = "local")]
mod local;

#[cfg(feature = "local")]
pub use local::LocalBus;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::Message;
use crate::workflow::Failure;

/// A downstream command or query failed.
///
/// Not an orchestrator error: the failure is handed to the workflow so its
/// definition can branch (e.g. to a compensating path).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct DispatchFailure {
    /// Failure classification (e.g. "InsufficientFunds").
    pub kind: String,
    pub message: String,
}

impl DispatchFailure {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl From<DispatchFailure> for Failure {
    fn from(failure: DispatchFailure) -> Self {
        Failure {
            kind: failure.kind,
            message: failure.message,
        }
    }
}

/// Completion callback for a dispatched command.
pub type CommandCallback = Box<dyn FnOnce(Result<(), DispatchFailure>) + Send>;

/// Channel for commands.
pub trait CommandBus: Send + Sync {
    /// Dispatch a command. `callback` must be invoked exactly once.
    fn dispatch(&self, command: Message, callback: CommandCallback);
}

/// Channel for events.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: Message) -> Result<(), DispatchFailure>;
}

/// Channel for queries.
pub trait QueryBus: Send + Sync {
    /// Run a query and wait for its single response of type `response_type`.
    fn query(&self, query: Message, response_type: &str) -> Result<Message, DispatchFailure>;
}

/// The three channels a saga dispatches on.
#[derive(Clone)]
pub struct Channels {
    pub commands: Arc<dyn CommandBus>,
    pub events: Arc<dyn EventBus>,
    pub queries: Arc<dyn QueryBus>,
}

impl Channels {
    pub fn new(
        commands: Arc<dyn CommandBus>,
        events: Arc<dyn EventBus>,
        queries: Arc<dyn QueryBus>,
    ) -> Self {
        Self {
            commands,
            events,
            queries,
        }
    }

    /// Use one bus implementation for all three channels.
    pub fn from_bus<B>(bus: B) -> Self
    where
        B: CommandBus + EventBus + QueryBus + 'static,
    {
        let bus = Arc::new(bus);
        Self {
            commands: bus.clone(),
            events: bus.clone(),
            queries: bus,
        }
    }
}
