//! Engines that run to their first wait state before `start_instance`
//! returns, calling back for an instance id the saga has not attached yet.

use std::sync::{Arc, Mutex, OnceLock, Weak};

use saga_bridge::payment::{
    AccountSummary, DocumentAccountSummary, PaymentCreated, PaymentEvent, PaymentSagaManager,
    PaymentSettings,
};
use saga_bridge::{
    Callback, Channels, EngineError, InMemoryEngine, Inbound, LocalBus, Receipt, SagaConfig,
    SagaError, SagaStatus, Signal, Variables, WorkflowCallback, WorkflowEngine,
};

type EagerManager = PaymentSagaManager<EagerEngine>;

/// Asks for the account summary from inside `start_instance`.
#[derive(Clone, Default)]
struct EagerEngine {
    inner: InMemoryEngine,
    manager: Arc<OnceLock<Weak<EagerManager>>>,
    first_callback: Arc<Mutex<Option<Result<Receipt, SagaError>>>>,
}

impl EagerEngine {
    fn call_back(&self, instance_id: &str) {
        let Some(manager) = self.manager.get().and_then(Weak::upgrade) else {
            return;
        };
        let callback = Callback::QueryRequested(WorkflowCallback::new(
            instance_id,
            "exec-1",
            "DocumentAccountSummary",
        ));
        // Waiting here would block the saga's own thread.
        let dispatched = manager.dispatch(callback.into());
        *self.first_callback.lock().unwrap() = Some(dispatched);
    }

    fn take_first_callback(&self) -> Result<Receipt, SagaError> {
        self.first_callback
            .lock()
            .unwrap()
            .take()
            .expect("callback dispatched during start")
    }
}

impl WorkflowEngine for EagerEngine {
    fn start_instance(
        &self,
        definition_key: &str,
        variables: &Variables,
    ) -> Result<String, EngineError> {
        let started = self.inner.start_instance(definition_key, variables);
        match &started {
            Ok(id) => self.call_back(id),
            Err(_) => self.call_back(&format!("{definition_key}-lost")),
        }
        started
    }

    fn signal(&self, execution_point_id: &str, signal: &Signal) -> Result<(), EngineError> {
        self.inner.signal(execution_point_id, signal)
    }
}

fn eager_manager() -> (Arc<EagerManager>, EagerEngine) {
    let engine = EagerEngine::default();
    let bus = LocalBus::new();
    bus.handle_query(|q: DocumentAccountSummary| {
        Ok(AccountSummary {
            account_id: q.account_id,
            balance: 40.0,
        })
    });

    let config = SagaConfig::for_test();
    let manager = Arc::new(
        PaymentSagaManager::new(
            PaymentSettings::from_config(&config),
            Channels::from_bus(bus),
            engine.clone(),
            &config,
        )
        .unwrap(),
    );
    assert!(engine.manager.set(Arc::downgrade(&manager)).is_ok());
    (manager, engine)
}

fn created(account: &str) -> Inbound<PaymentEvent> {
    Inbound::Event(
        PaymentCreated {
            account_id: account.into(),
            payment_id: "P1".into(),
            amount: 100.0,
        }
        .into(),
    )
}

#[test]
fn callback_during_start_is_delivered_after_attach() {
    let (manager, engine) = eager_manager();

    let saga_id = manager.process(created("kermit")).unwrap();

    let receipt = engine.take_first_callback().unwrap();
    assert_eq!(receipt.saga_id(), None);
    assert_eq!(receipt.wait().unwrap(), saga_id);

    let saga = manager.inspect(&saga_id).unwrap();
    assert_eq!(saga.status(), SagaStatus::Running);
    assert_eq!(saga.state().amount_withdrawn(), 40.0);

    let signals = engine.inner.signals_for("exec-1");
    match signals.as_slice() {
        [Signal::Resume(vars)] => {
            assert_eq!(vars["creditAvailable"], true);
            assert_eq!(vars["creditFullyCovering"], false);
        }
        other => panic!("expected one resume, got {other:?}"),
    }
}

#[test]
fn callback_during_failed_start_is_rejected() {
    let (manager, engine) = eager_manager();
    engine.inner.set_unavailable(true);

    let err = manager.process(created("kermit")).unwrap_err();
    assert!(matches!(err, SagaError::Engine(EngineError::Unavailable(_))));

    let err = engine.take_first_callback().unwrap().wait().unwrap_err();
    assert!(matches!(
        err,
        SagaError::UnknownAssociation(ref key) if key.value == "PaymentSaga-lost"
    ));
    assert!(manager.saga_ids().is_empty());
    assert!(engine.inner.signals().is_empty());
}
