//! Message factories: resolve a type name into a message built from saga state.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::simple_name;
use crate::error::SagaError;
use crate::message::{Message, MessageKind, MessageType, Outbound};

type BuildFn<S> = Box<dyn Fn(&S) -> Result<Message, SagaError> + Send + Sync>;

struct FactoryEntry<S> {
    kind: MessageKind,
    response_type: Option<&'static str>,
    build: BuildFn<S>,
}

/// Registered builders for the commands, events and queries a saga can send.
///
/// ## Example
///
/// ```ignore
/// let factories = MessageFactoryRegistry::new()
///     .query::<DocumentAccountSummary, AccountSummary, _>(|s: &PaymentSaga| {
///         DocumentAccountSummary { account_id: s.account_id().clone() }
///     })
///     .command(|s: &PaymentSaga| WithdrawAmount {
///         account_id: s.account_id().clone(),
///         amount: s.amount_withdrawn(),
///     });
///
/// let outbound = factories.resolve("WithdrawAmount", &saga)?;
/// ```
pub struct MessageFactoryRegistry<S> {
    entries: HashMap<&'static str, FactoryEntry<S>>,
}

impl<S> Default for MessageFactoryRegistry<S> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<S: 'static> MessageFactoryRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command builder.
    pub fn command<T, F>(self, build: F) -> Self
    where
        T: MessageType,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        self.register(MessageKind::Command, None, build)
    }

    /// Register an event builder.
    pub fn event<T, F>(self, build: F) -> Self
    where
        T: MessageType,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        self.register(MessageKind::Event, None, build)
    }

    /// Register a query builder whose response is an `R`.
    pub fn query<T, R, F>(self, build: F) -> Self
    where
        T: MessageType,
        R: MessageType,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        self.register(MessageKind::Query, Some(R::TYPE_NAME), build)
    }

    fn register<T, F>(
        mut self,
        kind: MessageKind,
        response_type: Option<&'static str>,
        build: F,
    ) -> Self
    where
        T: MessageType,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        let entry = FactoryEntry {
            kind,
            response_type,
            build: Box::new(move |state: &S| Message::encode(&build(state))),
        };
        if self.entries.insert(T::TYPE_NAME, entry).is_some() {
            warn!(message_type = T::TYPE_NAME, "message factory replaced");
        }
        self
    }
}

impl<S> MessageFactoryRegistry<S> {
    /// Build the message named by `type_name` from the current `state`.
    pub fn resolve(&self, type_name: &str, state: &S) -> Result<Outbound, SagaError> {
        let (name, entry) = self.entry(type_name)?;
        let message = (entry.build)(state)?;
        debug!(message_type = name, kind = ?entry.kind, message_id = %message.id, "message built");

        Ok(match (entry.kind, entry.response_type) {
            (MessageKind::Command, _) => Outbound::Command(message),
            (MessageKind::Event, _) => Outbound::Event(message),
            (MessageKind::Query, Some(response_type)) => Outbound::Query {
                query: message,
                response_type,
            },
            (MessageKind::Query, None) => {
                return Err(SagaError::NotAQuery {
                    type_name: type_name.to_string(),
                })
            }
        })
    }

    /// Response type declared by the query factory for `type_name`.
    pub fn response_type(&self, type_name: &str) -> Result<&'static str, SagaError> {
        match self.entry(type_name) {
            Ok((_, entry)) => entry.response_type.ok_or_else(|| SagaError::NotAQuery {
                type_name: type_name.to_string(),
            }),
            Err(_) => Err(SagaError::NotAQuery {
                type_name: type_name.to_string(),
            }),
        }
    }

    /// Category of the factory registered for `type_name`.
    pub fn kind(&self, type_name: &str) -> Option<MessageKind> {
        self.entry(type_name).ok().map(|(_, entry)| entry.kind)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entry(type_name).is_ok()
    }

    /// Registered type names of one category, sorted.
    pub fn message_types(&self, kind: MessageKind) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .entries
            .iter()
            .filter(|(_, e)| e.kind == kind)
            .map(|(name, _)| *name)
            .collect();
        names.sort_unstable();
        names
    }

    /// Response types declared by query factories.
    pub(crate) fn declared_response_types(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.entries
            .iter()
            .filter_map(|(name, e)| e.response_type.map(|r| (*name, r)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, type_name: &str) -> Result<(&'static str, &FactoryEntry<S>), SagaError> {
        self.entries
            .get_key_value(type_name)
            .or_else(|| self.entries.get_key_value(simple_name(type_name)))
            .map(|(name, entry)| (*name, entry))
            .ok_or_else(|| SagaError::NoFactory {
                type_name: type_name.to_string(),
            })
    }
}
