//! Saga manager - routes inbound messages to per-instance workers.
//!
//! Every saga instance is owned by its own worker thread with a FIFO inbox,
//! so messages for one instance are processed one at a time in arrival
//! order while different instances run concurrently.
//!
//! ```text
//!   dispatch(inbound)
//!        │
//!        ▼
//!   ┌─────────────────────────────┐
//!   │ routes: Association → saga  │──── no route + start event ──► spawn worker
//!   └─────────────────────────────┘
//!        │                  └─ no route + callback while a workflow
//!        │                     is starting ──► parked until attached
//!        │ saga id
//!        ▼
//!   ┌──────────┐   ┌──────────┐
//!   │ saga-a1… │   │ saga-b7… │   one thread + inbox per instance
//!   └──────────┘   └──────────┘
//! ```

mod worker;

pub use worker::InstanceStats;

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bus::Channels;
use crate::config::SagaConfig;
use crate::error::SagaError;
use crate::saga::{
    Association, Callback, DomainEvent, Lifecycle, Orchestrator, Saga, SagaInstance,
    WORKFLOW_INSTANCE_PROPERTY,
};
use crate::workflow::{WorkflowBridge, WorkflowEngine};
use worker::{Envelope, InstanceWorker};

/// A message for a saga: a domain event or a workflow callback.
#[derive(Debug, Clone)]
pub enum Inbound<Ev> {
    Event(Ev),
    Callback(Callback),
}

impl<Ev: DomainEvent> Inbound<Ev> {
    /// The key this message is routed by.
    pub fn association(&self) -> Association {
        match self {
            Inbound::Event(event) => event.association(),
            Inbound::Callback(callback) => callback.association(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Inbound::Event(event) => event.event_type(),
            Inbound::Callback(callback) => callback.name(),
        }
    }

    fn is_start(&self) -> bool {
        matches!(self, Inbound::Event(event) if event.lifecycle() == Lifecycle::Start)
    }
}

impl<Ev> From<Callback> for Inbound<Ev> {
    fn from(callback: Callback) -> Self {
        Inbound::Callback(callback)
    }
}

pub(crate) type Reply = Sender<Result<String, SagaError>>;

/// Handle on a dispatched message.
#[derive(Debug)]
pub struct Receipt {
    saga_id: Option<String>,
    reply: Receiver<Result<String, SagaError>>,
}

impl Receipt {
    /// The saga the message was routed to.
    ///
    /// `None` for a callback parked until its workflow instance is attached.
    pub fn saga_id(&self) -> Option<&str> {
        self.saga_id.as_deref()
    }

    /// Block until a saga has processed the message. Returns its id.
    pub fn wait(self) -> Result<String, SagaError> {
        match self.reply.recv() {
            Ok(result) => result,
            Err(_) => Err(SagaError::InstanceStopped(self.saga_id.unwrap_or_default())),
        }
    }
}

pub(crate) struct InstanceHandle<S: Saga> {
    inbox: Sender<Envelope<S>>,
    thread: Option<JoinHandle<InstanceStats>>,
    /// Created but its start event not yet processed.
    pub(crate) starting: bool,
    pub(crate) terminal: bool,
}

/// Routing table and live instances, guarded by one mutex.
pub(crate) struct Table<S: Saga> {
    pub(crate) routes: HashMap<Association, String>,
    pub(crate) handles: HashMap<String, InstanceHandle<S>>,
    /// Callbacks for workflow instances not attached yet.
    pending: HashMap<Association, Vec<Envelope<S>>>,
}

impl<S: Saga> Table<S> {
    fn new() -> Self {
        Self {
            routes: HashMap::new(),
            handles: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// Drop an instance and every route pointing at it.
    pub(crate) fn remove(&mut self, saga_id: &str) -> Option<InstanceHandle<S>> {
        self.routes.retain(|_, id| id != saga_id);
        let handle = self.handles.remove(saga_id);
        self.reject_unclaimed();
        handle
    }

    fn is_starting(&self) -> bool {
        self.handles.values().any(|h| h.starting)
    }

    /// A workflow engine may call back before `start_instance` has returned
    /// the instance id. Such callbacks wait here while any saga is starting.
    fn parks(&self, association: &Association) -> bool {
        association.property == WORKFLOW_INSTANCE_PROPERTY && self.is_starting()
    }

    fn park(&mut self, association: &Association, message: Inbound<S::Event>) -> Receipt {
        let (reply, rx) = mpsc::channel();
        debug!(%association, inbound = message.name(), "callback parked");
        self.pending
            .entry(association.clone())
            .or_default()
            .push(Envelope::Handle { message, reply });
        Receipt {
            saga_id: None,
            reply: rx,
        }
    }

    /// Parked callbacks for `association`, in arrival order.
    pub(crate) fn claim(&mut self, association: &Association) -> Vec<Envelope<S>> {
        self.pending.remove(association).unwrap_or_default()
    }

    /// Once no saga is starting, nothing can claim the parked callbacks.
    pub(crate) fn reject_unclaimed(&mut self) {
        if self.pending.is_empty() || self.is_starting() {
            return;
        }
        for (association, parked) in self.pending.drain() {
            warn!(%association, callbacks = parked.len(), "parked callbacks unclaimed");
            for envelope in parked {
                if let Envelope::Handle { reply, .. } = envelope {
                    let _ = reply.send(Err(SagaError::UnknownAssociation(association.clone())));
                }
            }
        }
    }
}

/// Creates saga instances, routes messages to them and owns their workers.
///
/// ## Example
///
/// ```ignore
/// let manager = PaymentSagaManager::new(settings, channels, engine, &config)?;
///
/// let receipt = manager.dispatch(Inbound::Event(PaymentEvent::PaymentCreated(created)))?;
/// let saga_id = receipt.wait()?;
///
/// manager.dispatch(Callback::QueryRequested(details).into())?.wait()?;
/// ```
pub struct SagaManager<S: Saga, E> {
    orchestrator: Orchestrator<S, E>,
    settings: Arc<S::Settings>,
    table: Arc<Mutex<Table<S>>>,
}

impl<S, E> SagaManager<S, E>
where
    S: Saga,
    E: WorkflowEngine + 'static,
{
    /// Build a manager for saga type `S`.
    ///
    /// Fails when the saga definition registers a query whose response type
    /// has no handler.
    pub fn new(
        settings: S::Settings,
        channels: Channels,
        engine: E,
        config: &SagaConfig,
    ) -> Result<Self, SagaError> {
        let definition = S::definition();
        definition.validate()?;
        info!(
            saga = definition.name(),
            workflow_definition_key = %config.workflow_definition_key,
            factories = definition.factories().len(),
            response_handlers = definition.responses().len(),
            "saga manager ready"
        );

        let bridge = WorkflowBridge::new(engine, config.signal_retry.clone());
        Ok(Self {
            orchestrator: Orchestrator::new(
                Arc::new(definition),
                channels,
                Arc::new(bridge),
                config.workflow_definition_key.clone(),
            ),
            settings: Arc::new(settings),
            table: Arc::new(Mutex::new(Table::new())),
        })
    }

    pub fn orchestrator(&self) -> &Orchestrator<S, E> {
        &self.orchestrator
    }

    /// Route `message` by its own association key.
    pub fn dispatch(&self, message: Inbound<S::Event>) -> Result<Receipt, SagaError> {
        let association = message.association();
        self.dispatch_to(&association, message)
    }

    /// Route `message` by an explicit association key, e.g. a terminal event
    /// addressed by workflow instance id.
    ///
    /// A start event creates a new saga when no live saga is associated with
    /// the key. A callback addressed by workflow instance id is parked while
    /// a saga is starting, and delivered once that saga attaches the
    /// workflow instance. Any other message without a route fails with
    /// [`SagaError::UnknownAssociation`].
    pub fn dispatch_to(
        &self,
        association: &Association,
        message: Inbound<S::Event>,
    ) -> Result<Receipt, SagaError> {
        let mut table = self.lock()?;

        let existing = table.routes.get(association).cloned().filter(|id| {
            !(message.is_start() && table.handles.get(id).map_or(true, |h| h.terminal))
        });

        if existing.is_none()
            && matches!(message, Inbound::Callback(_))
            && table.parks(association)
        {
            return Ok(table.park(association, message));
        }

        let saga_id = match existing {
            Some(id) => id,
            None => match &message {
                Inbound::Event(event) if event.lifecycle() == Lifecycle::Start => {
                    self.create(&mut table, association, event)?
                }
                _ => return Err(SagaError::UnknownAssociation(association.clone())),
            },
        };

        let handle = table
            .handles
            .get(&saga_id)
            .ok_or_else(|| SagaError::UnknownSaga(saga_id.clone()))?;
        debug!(saga_id = %saga_id, %association, inbound = message.name(), "routing");

        let (reply, rx) = mpsc::channel();
        handle
            .inbox
            .send(Envelope::Handle { message, reply })
            .map_err(|_| SagaError::InstanceStopped(saga_id.clone()))?;

        Ok(Receipt {
            saga_id: Some(saga_id),
            reply: rx,
        })
    }

    /// Dispatch and wait. Returns the id of the saga that processed it.
    pub fn process(&self, message: Inbound<S::Event>) -> Result<String, SagaError> {
        self.dispatch(message)?.wait()
    }

    fn create(
        &self,
        table: &mut Table<S>,
        business_key: &Association,
        event: &S::Event,
    ) -> Result<String, SagaError> {
        let state = S::start(event, &self.settings)?;
        let saga_id = Uuid::new_v4().to_string();
        let (inbox, rx) = mpsc::channel();

        let worker = InstanceWorker {
            instance: SagaInstance::new(saga_id.clone(), business_key.clone(), state),
            orchestrator: self.orchestrator.clone(),
            inbox: rx,
            table: Arc::clone(&self.table),
        };
        let thread = thread::Builder::new()
            .name(format!("saga-{saga_id}"))
            .spawn(move || worker.run())?;

        table.routes.insert(business_key.clone(), saga_id.clone());
        table.handles.insert(
            saga_id.clone(),
            InstanceHandle {
                inbox,
                thread: Some(thread),
                starting: true,
                terminal: false,
            },
        );
        info!(saga_id = %saga_id, %business_key, "saga created");
        Ok(saga_id)
    }

    /// Run `f` against an instance after everything already queued for it.
    pub fn with_instance<R, F>(&self, saga_id: &str, f: F) -> Result<R, SagaError>
    where
        R: Send + 'static,
        F: FnOnce(&SagaInstance<S>) -> R + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        {
            let table = self.lock()?;
            let handle = table
                .handles
                .get(saga_id)
                .ok_or_else(|| SagaError::UnknownSaga(saga_id.to_string()))?;
            handle
                .inbox
                .send(Envelope::Visit(Box::new(move |instance: &SagaInstance<S>| {
                    let _ = tx.send(f(instance));
                })))
                .map_err(|_| SagaError::InstanceStopped(saga_id.to_string()))?;
        }
        rx.recv()
            .map_err(|_| SagaError::InstanceStopped(saga_id.to_string()))
    }

    /// A snapshot of an instance.
    pub fn inspect(&self, saga_id: &str) -> Result<SagaInstance<S>, SagaError>
    where
        S: Clone,
    {
        self.with_instance(saga_id, |instance| instance.clone())
    }

    /// The saga currently routed by `association`.
    pub fn find(&self, association: &Association) -> Option<String> {
        self.lock().ok()?.routes.get(association).cloned()
    }

    /// Ids of all live instances, sorted.
    pub fn saga_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = match self.lock() {
            Ok(table) => table.handles.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        ids.sort();
        ids
    }

    /// Stop an instance's worker and forget its routes.
    pub fn discard(&self, saga_id: &str) -> Result<InstanceStats, SagaError> {
        let handle = self
            .lock()?
            .remove(saga_id)
            .ok_or_else(|| SagaError::UnknownSaga(saga_id.to_string()))?;
        info!(saga_id, "saga discarded");
        Ok(stop(handle))
    }

    /// Discard every terminal instance. Returns how many were removed.
    pub fn discard_terminal(&self) -> Result<usize, SagaError> {
        let handles: Vec<InstanceHandle<S>> = {
            let mut table = self.lock()?;
            let ids: Vec<String> = table
                .handles
                .iter()
                .filter(|(_, h)| h.terminal)
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter().filter_map(|id| table.remove(id)).collect()
        };
        let count = handles.len();
        for handle in handles {
            stop(handle);
        }
        Ok(count)
    }

    /// Stop every worker after its queued messages and collect their stats.
    pub fn shutdown(self) -> InstanceStats {
        let handles: Vec<InstanceHandle<S>> = match self.table.lock() {
            Ok(mut table) => {
                table.routes.clear();
                table.handles.drain().map(|(_, h)| h).collect()
            }
            Err(_) => Vec::new(),
        };
        handles
            .into_iter()
            .map(stop)
            .fold(InstanceStats::default(), InstanceStats::merge)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Table<S>>, SagaError> {
        self.table
            .lock()
            .map_err(|_| SagaError::LockPoisoned("saga routing"))
    }
}

fn stop<S: Saga>(mut handle: InstanceHandle<S>) -> InstanceStats {
    let _ = handle.inbox.send(Envelope::Stop);
    match handle.thread.take() {
        // A worker discarding itself cannot join its own thread.
        Some(thread) if thread.thread().id() != thread::current().id() => {
            thread.join().unwrap_or_default()
        }
        _ => InstanceStats::default(),
    }
}

impl<S: Saga, E> Drop for SagaManager<S, E> {
    fn drop(&mut self) {
        if let Ok(table) = self.table.lock() {
            for handle in table.handles.values() {
                let _ = handle.inbox.send(Envelope::Stop);
            }
        }
    }
}
