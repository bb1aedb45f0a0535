//! In-memory workflow engine for testing and embedding.
//!
//! `InMemoryEngine` does not interpret process definitions. It records the
//! instances it was asked to start and the signals it received, and can be
//! told to reject upcoming signals to simulate transient engine conflicts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{EngineError, Signal, Variables, WorkflowEngine};

/// A workflow instance started on an [`InMemoryEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct StartedInstance {
    pub instance_id: String,
    pub definition_key: String,
    pub variables: Variables,
}

/// Recording workflow engine.
///
/// Thread-safe; clones share the same state.
///
/// ```
/// use saga_bridge::workflow::{InMemoryEngine, Signal, Variables, WorkflowEngine};
///
/// let engine = InMemoryEngine::new();
/// let id = engine.start_instance("PaymentSaga", &Variables::new()).unwrap();
/// assert_eq!(id, "PaymentSaga-1");
///
/// engine.reject_next(1);
/// assert!(engine.signal("exec-1", &Signal::Resume(Variables::new())).is_err());
/// assert!(engine.signal("exec-1", &Signal::Resume(Variables::new())).is_ok());
/// assert_eq!(engine.signal_attempts(), 2);
/// assert_eq!(engine.signals().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryEngine {
    started: Arc<Mutex<Vec<StartedInstance>>>,
    /// Accepted signals, in order.
    signals: Arc<Mutex<Vec<(String, Signal)>>>,
    attempts: Arc<AtomicUsize>,
    reject: Arc<AtomicUsize>,
    unavailable: Arc<Mutex<bool>>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` signals with [`EngineError::Rejected`].
    pub fn reject_next(&self, count: usize) {
        self.reject.fetch_add(count, Ordering::SeqCst);
    }

    /// Make `start_instance` fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    pub fn started(&self) -> Vec<StartedInstance> {
        self.started.lock().unwrap().clone()
    }

    pub fn signals(&self) -> Vec<(String, Signal)> {
        self.signals.lock().unwrap().clone()
    }

    /// Accepted signals for one execution point.
    pub fn signals_for(&self, execution_point_id: &str) -> Vec<Signal> {
        self.signals
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == execution_point_id)
            .map(|(_, s)| s.clone())
            .collect()
    }

    /// Total signal calls, including rejected ones.
    pub fn signal_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl WorkflowEngine for InMemoryEngine {
    fn start_instance(
        &self,
        definition_key: &str,
        variables: &Variables,
    ) -> Result<String, EngineError> {
        if *self.unavailable.lock().unwrap() {
            return Err(EngineError::Unavailable("engine offline".into()));
        }
        let mut started = self.started.lock().unwrap();
        let instance_id = format!("{}-{}", definition_key, started.len() + 1);
        started.push(StartedInstance {
            instance_id: instance_id.clone(),
            definition_key: definition_key.to_string(),
            variables: variables.clone(),
        });
        Ok(instance_id)
    }

    fn signal(&self, execution_point_id: &str, signal: &Signal) -> Result<(), EngineError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let rejected = self
            .reject
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            return Err(EngineError::Rejected(format!(
                "concurrent update of {}",
                execution_point_id
            )));
        }

        self.signals
            .lock()
            .unwrap()
            .push((execution_point_id.to_string(), signal.clone()));
        Ok(())
    }
}
