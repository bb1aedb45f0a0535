//! Start and signal operations on the engine, with signal retry.

use std::time::Duration;

use backon::BlockingRetryable;
use tracing::{debug, error, warn};

use super::{EngineError, Failure, Signal, Variables, WorkflowEngine};
use crate::config::RetryConfig;
use crate::error::SagaError;

/// Wraps a [`WorkflowEngine`] with the saga's signalling discipline.
///
/// `resume` and `fail` retry every engine rejection with a fixed delay until
/// the engine accepts the signal. With the default [`RetryConfig`] there is
/// no upper bound: the call blocks the calling saga instance until the
/// signal lands. Setting `max_attempts` turns exhaustion into
/// [`SagaError::SignalAbandoned`].
pub struct WorkflowBridge<E> {
    engine: E,
    retry: RetryConfig,
}

impl<E: WorkflowEngine> WorkflowBridge<E> {
    pub fn new(engine: E, retry: RetryConfig) -> Self {
        Self { engine, retry }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    /// Start one workflow instance. Not retried.
    pub fn start_instance(
        &self,
        definition_key: &str,
        variables: &Variables,
    ) -> Result<String, SagaError> {
        let instance_id = self.engine.start_instance(definition_key, variables)?;
        debug!(definition_key, %instance_id, "workflow instance started");
        Ok(instance_id)
    }

    /// Continue past `execution_point_id` with a snapshot of saga state.
    pub fn resume(&self, execution_point_id: &str, variables: Variables) -> Result<(), SagaError> {
        self.signal_until_accepted(execution_point_id, Signal::Resume(variables))
    }

    /// Send `execution_point_id` down its failure branch.
    pub fn fail(&self, execution_point_id: &str, failure: Failure) -> Result<(), SagaError> {
        self.signal_until_accepted(execution_point_id, Signal::Fail(failure))
    }

    fn signal_until_accepted(
        &self,
        execution_point_id: &str,
        signal: Signal,
    ) -> Result<(), SagaError> {
        let mut attempts = 0usize;
        let result = (|| {
            attempts += 1;
            self.engine.signal(execution_point_id, &signal)
        })
        .retry(self.retry.backoff())
        .sleep(std::thread::sleep)
        .notify(|err: &EngineError, delay: Duration| {
            warn!(
                execution_point_id,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "workflow signal rejected, retrying"
            );
        })
        .call();

        match result {
            Ok(()) => {
                debug!(execution_point_id, attempts, "workflow signal accepted");
                Ok(())
            }
            Err(source) => {
                error!(
                    execution_point_id,
                    attempts,
                    error = %source,
                    "workflow signal abandoned"
                );
                Err(SagaError::SignalAbandoned {
                    execution_point_id: execution_point_id.to_string(),
                    attempts,
                    source,
                })
            }
        }
    }
}
