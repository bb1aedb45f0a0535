//! The thread that owns one saga instance.

use std::collections::VecDeque;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info_span, warn};

use super::{Inbound, Reply, Table};
use crate::error::SagaError;
use crate::saga::{Orchestrator, Saga, SagaInstance, SagaStatus};
use crate::workflow::WorkflowEngine;

/// Counters reported by an instance worker when it stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InstanceStats {
    /// Messages processed without error.
    pub handled: usize,
    /// Messages whose processing returned an error.
    pub failed: usize,
}

impl InstanceStats {
    pub fn merge(self, other: InstanceStats) -> InstanceStats {
        InstanceStats {
            handled: self.handled + other.handled,
            failed: self.failed + other.failed,
        }
    }
}

pub(crate) type Visitor<S> = Box<dyn FnOnce(&SagaInstance<S>) + Send>;

/// Work queued for an instance worker.
pub(crate) enum Envelope<S: Saga> {
    Handle {
        message: Inbound<S::Event>,
        reply: Reply,
    },
    Visit(Visitor<S>),
    Stop,
}

pub(crate) struct InstanceWorker<S: Saga, E> {
    pub(crate) instance: SagaInstance<S>,
    pub(crate) orchestrator: Orchestrator<S, E>,
    pub(crate) inbox: Receiver<Envelope<S>>,
    pub(crate) table: Arc<Mutex<Table<S>>>,
}

impl<S: Saga, E: WorkflowEngine> InstanceWorker<S, E> {
    /// Process the inbox in arrival order until stopped.
    pub(crate) fn run(mut self) -> InstanceStats {
        let span = info_span!(
            "saga",
            saga_id = %self.instance.id(),
            saga = self.orchestrator.definition().name()
        );
        let _enter = span.enter();
        let mut stats = InstanceStats::default();
        // Callbacks claimed from the parking area run before the inbox.
        let mut backlog = VecDeque::new();

        loop {
            let envelope = match backlog.pop_front() {
                Some(envelope) => envelope,
                None => match self.inbox.recv() {
                    Ok(envelope) => envelope,
                    Err(_) => break,
                },
            };
            match envelope {
                Envelope::Handle { message, reply } => {
                    let result = match &message {
                        Inbound::Event(event) => {
                            self.orchestrator.handle_event(&mut self.instance, event)
                        }
                        Inbound::Callback(callback) => {
                            self.orchestrator.handle_callback(&mut self.instance, callback)
                        }
                    };
                    match &result {
                        Ok(()) => stats.handled += 1,
                        Err(err) => {
                            stats.failed += 1;
                            debug!(inbound = message.name(), error = %err, "message failed");
                        }
                    }

                    // Routes are updated before the caller hears back.
                    let claimed = self.sync_routes();
                    let _ = reply.send(result.map(|()| self.instance.id().to_string()));
                    match claimed {
                        Some(parked) => backlog.extend(parked),
                        None => break,
                    }
                }
                Envelope::Visit(visit) => visit(&self.instance),
                Envelope::Stop => break,
            }
        }

        debug!(handled = stats.handled, failed = stats.failed, "saga worker stopped");
        stats
    }

    /// Publish this instance's associations and status to the routing
    /// table and claim callbacks parked for them.
    ///
    /// Returns `None` when the instance never started and was removed.
    fn sync_routes(&self) -> Option<Vec<Envelope<S>>> {
        let id = self.instance.id();
        let mut table = match self.table.lock() {
            Ok(table) => table,
            Err(_) => {
                error!("saga routing table poisoned");
                return Some(Vec::new());
            }
        };

        if self.instance.status() == SagaStatus::Created {
            warn!("saga did not start, removing");
            table.remove(id);
            return None;
        }

        let mut claimed = Vec::new();
        for association in self.instance.associations() {
            table
                .routes
                .entry(association.clone())
                .or_insert_with(|| id.to_string());
            claimed.extend(table.claim(association));
        }
        if !claimed.is_empty() {
            debug!(callbacks = claimed.len(), "claimed parked callbacks");
        }
        if let Some(handle) = table.handles.get_mut(id) {
            handle.starting = false;
            handle.terminal = self.instance.is_terminal();
        }
        table.reject_unclaimed();
        Some(claimed)
    }
}
