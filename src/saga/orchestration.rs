//! Reactions to workflow callbacks and domain events.

use std::sync::mpsc;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::{Callback, DomainEvent, Lifecycle, Saga, SagaDefinition, SagaInstance, SagaStatus};
use crate::bus::{Channels, DispatchFailure};
use crate::error::SagaError;
use crate::message::{Message, MessageKind, Outbound};
use crate::workflow::{Failure, WorkflowBridge, WorkflowEngine};

/// Metadata key carrying the saga id on outbound messages.
pub const SAGA_ID_METADATA: &str = "saga_id";
/// Metadata key carrying the workflow instance id on outbound messages.
pub const WORKFLOW_INSTANCE_METADATA: &str = "workflow_instance_id";

/// Drives saga instances of one type.
///
/// Holds the shared pieces (definition, channels, workflow bridge) and
/// operates on one [`SagaInstance`] at a time, borrowed mutably from the
/// thread that owns it.
pub struct Orchestrator<S: Saga, E> {
    definition: Arc<SagaDefinition<S>>,
    channels: Channels,
    bridge: Arc<WorkflowBridge<E>>,
    workflow_definition_key: String,
}

impl<S: Saga, E> Clone for Orchestrator<S, E> {
    fn clone(&self) -> Self {
        Self {
            definition: Arc::clone(&self.definition),
            channels: self.channels.clone(),
            bridge: Arc::clone(&self.bridge),
            workflow_definition_key: self.workflow_definition_key.clone(),
        }
    }
}

impl<S: Saga, E: WorkflowEngine> Orchestrator<S, E> {
    pub fn new(
        definition: Arc<SagaDefinition<S>>,
        channels: Channels,
        bridge: Arc<WorkflowBridge<E>>,
        workflow_definition_key: impl Into<String>,
    ) -> Self {
        Self {
            definition,
            channels,
            bridge,
            workflow_definition_key: workflow_definition_key.into(),
        }
    }

    pub fn definition(&self) -> &SagaDefinition<S> {
        &self.definition
    }

    pub fn bridge(&self) -> &WorkflowBridge<E> {
        &self.bridge
    }

    /// Apply a domain event.
    ///
    /// A start event reaching a `Created` instance starts its workflow and
    /// attaches it. A start event reaching a live instance is not applied
    /// and fails with [`SagaError::AlreadyStarted`].
    pub fn handle_event(
        &self,
        instance: &mut SagaInstance<S>,
        event: &S::Event,
    ) -> Result<(), SagaError> {
        match (event.lifecycle(), instance.status()) {
            (Lifecycle::Start, SagaStatus::Created) => self.start_workflow(instance),
            (Lifecycle::Start, SagaStatus::Associated | SagaStatus::Running) => {
                warn!(
                    saga_id = instance.id(),
                    event_type = event.event_type(),
                    event = ?event,
                    "start event for live saga rejected"
                );
                Err(SagaError::AlreadyStarted {
                    saga_id: instance.id().to_string(),
                    event_type: event.event_type().to_string(),
                })
            }
            (_, SagaStatus::Running) => {
                instance.state_mut().on(event);
                if event.lifecycle() == Lifecycle::End {
                    instance.mark_terminal();
                    info!(
                        saga_id = instance.id(),
                        event_type = event.event_type(),
                        "saga ended"
                    );
                } else {
                    debug!(
                        saga_id = instance.id(),
                        event_type = event.event_type(),
                        "event applied"
                    );
                }
                Ok(())
            }
            (_, status) => Err(SagaError::NotRunning {
                saga_id: instance.id().to_string(),
                status,
            }),
        }
    }

    fn start_workflow(&self, instance: &mut SagaInstance<S>) -> Result<(), SagaError> {
        let variables = instance.state().variables();
        let workflow_instance_id = self
            .bridge
            .start_instance(&self.workflow_definition_key, &variables)?;
        instance.attach_workflow(workflow_instance_id)?;
        instance.mark_running();
        info!(
            saga_id = instance.id(),
            saga = self.definition.name(),
            workflow_instance_id = instance.workflow_instance_id(),
            "saga started"
        );
        Ok(())
    }

    /// Perform the interaction a workflow callback asks for.
    pub fn handle_callback(
        &self,
        instance: &mut SagaInstance<S>,
        callback: &Callback,
    ) -> Result<(), SagaError> {
        if !instance.is_running() {
            return Err(SagaError::NotRunning {
                saga_id: instance.id().to_string(),
                status: instance.status(),
            });
        }
        let workflow_instance_id = callback.details().workflow_instance_id.as_str();
        if instance.workflow_instance_id() != Some(workflow_instance_id) {
            warn!(
                saga_id = instance.id(),
                workflow_instance_id,
                attached = instance.workflow_instance_id(),
                "callback for another workflow instance"
            );
            return Err(SagaError::UnknownAssociation(callback.association()));
        }

        let result = match callback {
            Callback::CommandIssued(_) => self.command_issued(instance, callback),
            Callback::EventRaised(_) => self.event_raised(instance, callback),
            Callback::QueryRequested(_) => self.query_requested(instance, callback),
        };

        if let Err(err) = &result {
            if err.is_fatal() {
                error!(
                    saga_id = instance.id(),
                    callback = callback.name(),
                    message_type = %callback.details().message_type,
                    error = %err,
                    "callback cannot be routed"
                );
            }
        }
        result
    }

    /// Dispatch the command and wait for its outcome, then resume on success
    /// or fail the execution point on failure.
    pub fn command_issued(
        &self,
        instance: &mut SagaInstance<S>,
        callback: &Callback,
    ) -> Result<(), SagaError> {
        let command = match self.build(instance, callback)? {
            Outbound::Command(command) => command,
            other => return Err(self.mismatch(callback, other.kind())),
        };
        let message_type = command.message_type.clone();

        let (tx, rx) = mpsc::channel();
        self.channels.commands.dispatch(
            command,
            Box::new(move |outcome: Result<(), DispatchFailure>| {
                let _ = tx.send(outcome);
            }),
        );
        let outcome = rx.recv().unwrap_or_else(|_| {
            Err(DispatchFailure::new(
                "CallbackDropped",
                format!("command `{message_type}` completed without an outcome"),
            ))
        });

        let point = &callback.details().execution_point_id;
        match outcome {
            Ok(()) => self.bridge.resume(point, instance.state().variables()),
            Err(failure) => {
                warn!(
                    saga_id = instance.id(),
                    execution_point_id = %point,
                    %failure,
                    "command failed"
                );
                self.bridge.fail(point, Failure::from(failure))
            }
        }
    }

    /// Publish the event. The workflow is not signalled.
    pub fn event_raised(
        &self,
        instance: &mut SagaInstance<S>,
        callback: &Callback,
    ) -> Result<(), SagaError> {
        let event = match self.build(instance, callback)? {
            Outbound::Event(event) => event,
            other => return Err(self.mismatch(callback, other.kind())),
        };
        let message_type = event.message_type.clone();

        if let Err(failure) = self.channels.events.publish(event) {
            warn!(
                saga_id = instance.id(),
                %message_type,
                %failure,
                "event publish failed"
            );
        }
        Ok(())
    }

    /// Run the query, apply its response to saga state and resume with the
    /// updated snapshot. A failed query fails the execution point.
    pub fn query_requested(
        &self,
        instance: &mut SagaInstance<S>,
        callback: &Callback,
    ) -> Result<(), SagaError> {
        let (query, response_type) = match self.build(instance, callback)? {
            Outbound::Query {
                query,
                response_type,
            } => (query, response_type),
            other => return Err(self.mismatch(callback, other.kind())),
        };

        let point = &callback.details().execution_point_id;
        match self.channels.queries.query(query, response_type) {
            Ok(response) => {
                self.definition
                    .responses()
                    .dispatch(instance.state_mut(), &response)?;
                self.bridge.resume(point, instance.state().variables())
            }
            Err(failure) => {
                warn!(
                    saga_id = instance.id(),
                    execution_point_id = %point,
                    %failure,
                    "query failed"
                );
                self.bridge.fail(point, Failure::from(failure))
            }
        }
    }

    /// Resolve the callback's message against current state, checking the
    /// registered category first.
    fn build(
        &self,
        instance: &SagaInstance<S>,
        callback: &Callback,
    ) -> Result<Outbound, SagaError> {
        let message_type = &callback.details().message_type;
        let factories = self.definition.factories();

        let actual = factories
            .kind(message_type)
            .ok_or_else(|| SagaError::NoFactory {
                type_name: message_type.clone(),
            })?;
        if actual != callback.expected_kind() {
            return Err(self.mismatch(callback, actual));
        }

        let outbound = factories.resolve(message_type, instance.state())?;
        Ok(match outbound {
            Outbound::Command(m) => Outbound::Command(self.stamp(instance, m)),
            Outbound::Event(m) => Outbound::Event(self.stamp(instance, m)),
            Outbound::Query {
                query,
                response_type,
            } => Outbound::Query {
                query: self.stamp(instance, query),
                response_type,
            },
        })
    }

    fn stamp(&self, instance: &SagaInstance<S>, message: Message) -> Message {
        let message = message.with_metadata(SAGA_ID_METADATA, instance.id());
        match instance.workflow_instance_id() {
            Some(id) => message.with_metadata(WORKFLOW_INSTANCE_METADATA, id),
            None => message,
        }
    }

    fn mismatch(&self, callback: &Callback, actual: MessageKind) -> SagaError {
        SagaError::KindMismatch {
            type_name: callback.details().message_type.clone(),
            expected: callback.expected_kind(),
            actual,
        }
    }
}
