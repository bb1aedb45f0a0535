use crate::error::SagaError;
use crate::registry::{MessageFactoryRegistry, ResponseHandlerRegistry};

/// Everything a saga type registers: its name, message factories and
/// response handlers. Built once and shared by all instances.
pub struct SagaDefinition<S> {
    name: &'static str,
    factories: MessageFactoryRegistry<S>,
    responses: ResponseHandlerRegistry<S>,
}

impl<S> SagaDefinition<S> {
    pub fn new(
        name: &'static str,
        factories: MessageFactoryRegistry<S>,
        responses: ResponseHandlerRegistry<S>,
    ) -> Self {
        Self {
            name,
            factories,
            responses,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn factories(&self) -> &MessageFactoryRegistry<S> {
        &self.factories
    }

    pub fn responses(&self) -> &ResponseHandlerRegistry<S> {
        &self.responses
    }

    /// Check that every response type a query factory declares has a handler.
    pub fn validate(&self) -> Result<(), SagaError> {
        let mut missing: Vec<&'static str> = self
            .factories
            .declared_response_types()
            .filter(|(_, response_type)| !self.responses.accepts(response_type))
            .map(|(_, response_type)| response_type)
            .collect();
        missing.sort_unstable();

        match missing.first() {
            Some(response_type) => Err(SagaError::NoResponseHandler {
                response_type: response_type.to_string(),
            }),
            None => Ok(()),
        }
    }
}
