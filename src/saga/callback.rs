//! Workflow callbacks: the engine asking the saga to perform one interaction.

use serde::{Deserialize, Serialize};

use super::Association;
use crate::message::MessageKind;

/// Details carried by every callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowCallback {
    /// Association key of the saga.
    pub workflow_instance_id: String,
    /// Handle of the suspended point to resume.
    pub execution_point_id: String,
    /// Name of the message to build.
    pub message_type: String,
}

impl WorkflowCallback {
    pub fn new(
        workflow_instance_id: impl Into<String>,
        execution_point_id: impl Into<String>,
        message_type: impl Into<String>,
    ) -> Self {
        Self {
            workflow_instance_id: workflow_instance_id.into(),
            execution_point_id: execution_point_id.into(),
            message_type: message_type.into(),
        }
    }
}

/// A callback from the workflow engine.
///
/// JSON form: `{"kind": "CommandIssued", "workflowInstanceId": ...,
/// "executionPointId": ..., "messageType": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Callback {
    /// Dispatch a command and resume on its outcome.
    CommandIssued(WorkflowCallback),
    /// Publish an event. The workflow is not signalled.
    EventRaised(WorkflowCallback),
    /// Run a query, apply the response and resume.
    QueryRequested(WorkflowCallback),
}

impl Callback {
    pub fn details(&self) -> &WorkflowCallback {
        match self {
            Callback::CommandIssued(details)
            | Callback::EventRaised(details)
            | Callback::QueryRequested(details) => details,
        }
    }

    /// The message category this callback asks for.
    pub fn expected_kind(&self) -> MessageKind {
        match self {
            Callback::CommandIssued(_) => MessageKind::Command,
            Callback::EventRaised(_) => MessageKind::Event,
            Callback::QueryRequested(_) => MessageKind::Query,
        }
    }

    pub fn association(&self) -> Association {
        Association::workflow_instance(self.details().workflow_instance_id.clone())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Callback::CommandIssued(_) => "CommandIssued",
            Callback::EventRaised(_) => "EventRaised",
            Callback::QueryRequested(_) => "QueryRequested",
        }
    }
}
