use super::{Association, SagaStatus};
use crate::error::SagaError;

/// One saga: identity, lifecycle position, associations and state.
#[derive(Debug, Clone)]
pub struct SagaInstance<S> {
    id: String,
    status: SagaStatus,
    workflow_instance_id: Option<String>,
    associations: Vec<Association>,
    state: S,
}

impl<S> SagaInstance<S> {
    /// A freshly created saga, associated by its business key only.
    pub fn new(id: impl Into<String>, business_key: Association, state: S) -> Self {
        Self {
            id: id.into(),
            status: SagaStatus::Created,
            workflow_instance_id: None,
            associations: vec![business_key],
            state,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> SagaStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == SagaStatus::Running
    }

    pub fn is_terminal(&self) -> bool {
        self.status == SagaStatus::Terminal
    }

    pub fn workflow_instance_id(&self) -> Option<&str> {
        self.workflow_instance_id.as_deref()
    }

    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    pub fn is_associated_with(&self, association: &Association) -> bool {
        self.associations.contains(association)
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Attach the workflow instance. Allowed exactly once.
    pub fn attach_workflow(&mut self, instance_id: impl Into<String>) -> Result<(), SagaError> {
        if let Some(existing) = &self.workflow_instance_id {
            return Err(SagaError::WorkflowAlreadyAttached {
                saga_id: self.id.clone(),
                workflow_instance_id: existing.clone(),
            });
        }
        let instance_id = instance_id.into();
        self.associations
            .push(Association::workflow_instance(instance_id.clone()));
        self.workflow_instance_id = Some(instance_id);
        self.status = SagaStatus::Associated;
        Ok(())
    }

    pub(crate) fn mark_running(&mut self) {
        self.status = SagaStatus::Running;
    }

    pub(crate) fn mark_terminal(&mut self) {
        self.status = SagaStatus::Terminal;
    }
}
