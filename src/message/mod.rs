//! Message envelopes and message categories.
//!
//! Every business message the saga builds or receives implements
//! [`MessageType`], which gives it a stable type name. The name is what the
//! workflow definition refers to and what the registries are keyed by.
//! On the wire a message travels as a [`Message`] envelope whose payload is
//! bitcode-encoded.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SagaError;

/// A typed message with a stable type name.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct WithdrawAmount { account_id: String, amount: f64 }
///
/// impl MessageType for WithdrawAmount {
///     const TYPE_NAME: &'static str = "WithdrawAmount";
/// }
/// ```
pub trait MessageType: Serialize + DeserializeOwned + Send + 'static {
    const TYPE_NAME: &'static str;
}

/// The channel a message is dispatched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Request with a single success/failure outcome.
    Command,
    /// Fire-and-forget notification.
    Event,
    /// Request with a typed response.
    Query,
}

/// A message envelope handed to a channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// Unique identifier for this message
    pub id: String,
    /// Type name (e.g., "WithdrawAmount", "AccountSummary")
    pub message_type: String,
    /// bitcode-encoded payload
    pub payload: Vec<u8>,
    /// Optional metadata (correlation ids, saga id, ...)
    pub metadata: Option<Vec<(String, String)>>,
}

impl Message {
    pub fn new(id: impl Into<String>, message_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            message_type: message_type.into(),
            payload,
            metadata: None,
        }
    }

    /// Encode a typed message into a fresh envelope.
    pub fn encode<T: MessageType>(message: &T) -> Result<Self, SagaError> {
        let payload = bitcode::serialize(message).map_err(|e| SagaError::Codec {
            message_type: T::TYPE_NAME.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(Uuid::new_v4().to_string(), T::TYPE_NAME, payload))
    }

    /// Decode the payload as `T`.
    pub fn decode<T: MessageType>(&self) -> Result<T, SagaError> {
        if !self.is::<T>() {
            return Err(SagaError::Codec {
                message_type: self.message_type.clone(),
                reason: format!("expected `{}`", T::TYPE_NAME),
            });
        }
        bitcode::deserialize(&self.payload).map_err(|e| SagaError::Codec {
            message_type: self.message_type.clone(),
            reason: e.to_string(),
        })
    }

    /// Whether the envelope carries a `T`.
    pub fn is<T: MessageType>(&self) -> bool {
        self.message_type == T::TYPE_NAME
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    /// First metadata value for `key`.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A built message together with the channel it belongs on.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    Command(Message),
    Event(Message),
    Query {
        query: Message,
        response_type: &'static str,
    },
}

impl Outbound {
    pub fn kind(&self) -> MessageKind {
        match self {
            Outbound::Command(_) => MessageKind::Command,
            Outbound::Event(_) => MessageKind::Event,
            Outbound::Query { .. } => MessageKind::Query,
        }
    }

    pub fn message(&self) -> &Message {
        match self {
            Outbound::Command(message) | Outbound::Event(message) => message,
            Outbound::Query { query, .. } => query,
        }
    }

    pub fn into_message(self) -> Message {
        match self {
            Outbound::Command(message) | Outbound::Event(message) => message,
            Outbound::Query { query, .. } => query,
        }
    }
}
