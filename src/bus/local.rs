//! In-process bus for tests and single-process deployments.
//!
//! `LocalBus` implements all three channels. Command and query handlers are
//! registered per message type; every dispatched message is appended to a
//! shared log so callers can inspect what a saga sent.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::thread;

use tracing::{debug, warn};

use super::{CommandBus, CommandCallback, DispatchFailure, EventBus, QueryBus};
use crate::message::{Message, MessageKind, MessageType};

type CommandHandler = Arc<dyn Fn(&Message) -> Result<(), DispatchFailure> + Send + Sync>;
type QueryHandler = Arc<dyn Fn(&Message) -> Result<Message, DispatchFailure> + Send + Sync>;

/// In-process implementation of the command, event and query channels.
///
/// Cloning yields another handle to the same handlers and log.
///
/// ## Example
///
/// ```ignore
/// let bus = LocalBus::new();
/// bus.handle_command(|cmd: WithdrawAmount| {
///     ledger.withdraw(&cmd.account_id, cmd.amount)
/// });
/// bus.handle_query(|q: DocumentAccountSummary| {
///     Ok(AccountSummary { account_id: q.account_id, balance: 40.0 })
/// });
///
/// let channels = Channels::from_bus(bus.clone());
/// ```
///
/// Commands run on a spawned thread and report through their callback, so
/// completion is asynchronous like a real transport. A command with no
/// registered handler completes with a `NoHandler` failure.
#[derive(Clone, Default)]
pub struct LocalBus {
    commands: Arc<RwLock<HashMap<String, CommandHandler>>>,
    queries: Arc<RwLock<HashMap<String, QueryHandler>>>,
    log: Arc<RwLock<Vec<(MessageKind, Message)>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for command type `T`, replacing any previous one.
    pub fn handle_command<T, F>(&self, handler: F)
    where
        T: MessageType,
        F: Fn(T) -> Result<(), DispatchFailure> + Send + Sync + 'static,
    {
        let handler: CommandHandler = Arc::new(move |message: &Message| {
            let command = message
                .decode::<T>()
                .map_err(|e| DispatchFailure::new("DecodeFailed", e.to_string()))?;
            handler(command)
        });
        self.commands
            .write()
            .unwrap()
            .insert(T::TYPE_NAME.to_string(), handler);
    }

    /// Register the handler for query type `Q` answering with `R`.
    pub fn handle_query<Q, R, F>(&self, handler: F)
    where
        Q: MessageType,
        R: MessageType,
        F: Fn(Q) -> Result<R, DispatchFailure> + Send + Sync + 'static,
    {
        let handler: QueryHandler = Arc::new(move |message: &Message| {
            let query = message
                .decode::<Q>()
                .map_err(|e| DispatchFailure::new("DecodeFailed", e.to_string()))?;
            let response = handler(query)?;
            Message::encode(&response).map_err(|e| DispatchFailure::new("EncodeFailed", e.to_string()))
        });
        self.queries
            .write()
            .unwrap()
            .insert(Q::TYPE_NAME.to_string(), handler);
    }

    /// Every dispatched message, in dispatch order.
    pub fn dispatched(&self) -> Vec<(MessageKind, Message)> {
        self.log.read().unwrap().clone()
    }

    /// Dispatched messages of one category.
    pub fn messages(&self, kind: MessageKind) -> Vec<Message> {
        self.log
            .read()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Type names of messages of one category, in dispatch order.
    pub fn message_types(&self, kind: MessageKind) -> Vec<String> {
        self.messages(kind)
            .into_iter()
            .map(|m| m.message_type)
            .collect()
    }

    /// Last dispatched message of type `T`, decoded.
    pub fn last<T: MessageType>(&self) -> Option<T> {
        self.log
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|(_, m)| m.is::<T>())
            .and_then(|(_, m)| m.decode::<T>().ok())
    }

    pub fn len(&self) -> usize {
        self.log.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.read().unwrap().is_empty()
    }

    /// Clear the dispatch log. Handlers stay registered.
    pub fn clear(&self) {
        self.log.write().unwrap().clear();
    }

    fn record(&self, kind: MessageKind, message: &Message) {
        debug!(message_type = %message.message_type, ?kind, "local bus dispatch");
        self.log.write().unwrap().push((kind, message.clone()));
    }
}

impl CommandBus for LocalBus {
    fn dispatch(&self, command: Message, callback: CommandCallback) {
        self.record(MessageKind::Command, &command);
        let handler = self.commands.read().unwrap().get(&command.message_type).cloned();

        thread::spawn(move || {
            let outcome = match handler {
                Some(handler) => handler(&command),
                None => Err(DispatchFailure::new(
                    "NoHandler",
                    format!("no handler for command `{}`", command.message_type),
                )),
            };
            if let Err(failure) = &outcome {
                warn!(message_type = %command.message_type, %failure, "command failed");
            }
            callback(outcome);
        });
    }
}

impl EventBus for LocalBus {
    fn publish(&self, event: Message) -> Result<(), DispatchFailure> {
        self.record(MessageKind::Event, &event);
        Ok(())
    }
}

impl QueryBus for LocalBus {
    fn query(&self, query: Message, response_type: &str) -> Result<Message, DispatchFailure> {
        self.record(MessageKind::Query, &query);
        let handler = self
            .queries
            .read()
            .unwrap()
            .get(&query.message_type)
            .cloned()
            .ok_or_else(|| {
                DispatchFailure::new(
                    "NoHandler",
                    format!("no handler for query `{}`", query.message_type),
                )
            })?;

        let response = handler(&query)?;
        if response.message_type != response_type {
            return Err(DispatchFailure::new(
                "UnexpectedResponse",
                format!(
                    "expected `{}`, got `{}`",
                    response_type, response.message_type
                ),
            ));
        }
        Ok(response)
    }
}
