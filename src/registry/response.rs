//! Response handlers: apply query responses to saga state.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::SagaError;
use crate::message::{Message, MessageType};

type ApplyFn<S> = Box<dyn Fn(&mut S, &Message) -> Result<(), SagaError> + Send + Sync>;

/// Registered state mutations keyed by response type name.
pub struct ResponseHandlerRegistry<S> {
    handlers: HashMap<&'static str, ApplyFn<S>>,
}

impl<S> Default for ResponseHandlerRegistry<S> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<S: 'static> ResponseHandlerRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for responses of type `R`.
    pub fn on<R, F>(mut self, handler: F) -> Self
    where
        R: MessageType,
        F: Fn(&mut S, R) + Send + Sync + 'static,
    {
        let apply: ApplyFn<S> = Box::new(move |state: &mut S, message: &Message| {
            let response = message.decode::<R>()?;
            handler(state, response);
            Ok(())
        });
        if self.handlers.insert(R::TYPE_NAME, apply).is_some() {
            warn!(response_type = R::TYPE_NAME, "response handler replaced");
        }
        self
    }
}

impl<S> ResponseHandlerRegistry<S> {
    /// Apply `response` to `state`.
    ///
    /// The payload is decoded before the handler runs, so a malformed
    /// response leaves `state` untouched.
    pub fn dispatch(&self, state: &mut S, response: &Message) -> Result<(), SagaError> {
        let apply = self
            .handlers
            .get(response.message_type.as_str())
            .ok_or_else(|| SagaError::NoResponseHandler {
                response_type: response.message_type.clone(),
            })?;
        apply(state, response)?;
        debug!(response_type = %response.message_type, "response applied");
        Ok(())
    }

    pub fn accepts(&self, response_type: &str) -> bool {
        self.handlers.contains_key(response_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
