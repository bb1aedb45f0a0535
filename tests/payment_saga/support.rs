//! Shared fixture: a payment saga manager over a local bus and an
//! in-memory workflow engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use saga_bridge::payment::{
    AccountSummary, ChargeCreditCard, CreditAmount, DocumentAccountSummary, PaymentCreated,
    PaymentEvent, PaymentSaga, PaymentSagaManager, PaymentSettings, WithdrawAmount,
};
use saga_bridge::{
    Callback, DispatchFailure, InMemoryEngine, Inbound, LocalBus, SagaConfig, SagaError,
    SagaInstance, Signal, WorkflowCallback,
};

pub struct Harness {
    pub manager: PaymentSagaManager<InMemoryEngine>,
    pub engine: InMemoryEngine,
    pub bus: LocalBus,
    balances: Arc<Mutex<HashMap<String, f64>>>,
}

/// A started saga and the workflow instance attached to it.
pub struct Started {
    pub saga_id: String,
    pub workflow_instance_id: String,
}

impl Harness {
    /// Kermit's card is expired; account services answer from `balances`.
    pub fn new() -> Self {
        Self::with_config(SagaConfig {
            expired_card_accounts: vec!["kermit".into()],
            ..SagaConfig::for_test()
        })
    }

    pub fn with_config(config: SagaConfig) -> Self {
        saga_bridge::logging::init_logging();
        let engine = InMemoryEngine::new();
        let bus = LocalBus::new();
        let balances: Arc<Mutex<HashMap<String, f64>>> = Arc::default();

        let lookup = balances.clone();
        bus.handle_query(move |query: DocumentAccountSummary| {
            let balance = lookup
                .lock()
                .unwrap()
                .get(query.account_id.as_str())
                .copied()
                .ok_or_else(|| {
                    DispatchFailure::new("AccountNotFound", query.account_id.to_string())
                })?;
            Ok(AccountSummary {
                account_id: query.account_id,
                balance,
            })
        });
        bus.handle_command(|_cmd: WithdrawAmount| Ok(()));
        bus.handle_command(|_cmd: CreditAmount| Ok(()));
        bus.handle_command(|cmd: ChargeCreditCard| {
            if cmd.card_expired {
                Err(DispatchFailure::new("CreditCardExpired", cmd.account_id.to_string()))
            } else {
                Ok(())
            }
        });

        let manager = PaymentSagaManager::new(
            PaymentSettings::from_config(&config),
            saga_bridge::Channels::from_bus(bus.clone()),
            engine.clone(),
            &config,
        )
        .unwrap();

        Self {
            manager,
            engine,
            bus,
            balances,
        }
    }

    pub fn set_balance(&self, account: &str, balance: f64) {
        self.balances
            .lock()
            .unwrap()
            .insert(account.to_string(), balance);
    }

    pub fn event(&self, event: impl Into<PaymentEvent>) -> Result<String, SagaError> {
        self.manager.process(Inbound::Event(event.into()))
    }

    /// Create a payment saga and return its ids.
    pub fn start(&self, account: &str, payment: &str, amount: f64) -> Started {
        let saga_id = self
            .event(PaymentCreated {
                account_id: account.into(),
                payment_id: payment.into(),
                amount,
            })
            .unwrap();
        let workflow_instance_id = self
            .saga(&saga_id)
            .workflow_instance_id()
            .expect("workflow attached")
            .to_string();
        Started {
            saga_id,
            workflow_instance_id,
        }
    }

    pub fn saga(&self, saga_id: &str) -> SagaInstance<PaymentSaga> {
        self.manager.inspect(saga_id).unwrap()
    }

    pub fn command(&self, started: &Started, exec: &str, message_type: &str) -> Result<String, SagaError> {
        self.callback(Callback::CommandIssued(details(started, exec, message_type)))
    }

    pub fn raise(&self, started: &Started, exec: &str, message_type: &str) -> Result<String, SagaError> {
        self.callback(Callback::EventRaised(details(started, exec, message_type)))
    }

    pub fn query(&self, started: &Started, exec: &str, message_type: &str) -> Result<String, SagaError> {
        self.callback(Callback::QueryRequested(details(started, exec, message_type)))
    }

    pub fn callback(&self, callback: Callback) -> Result<String, SagaError> {
        self.manager.process(callback.into())
    }

    /// The one accepted signal for `exec`.
    pub fn signal(&self, exec: &str) -> Signal {
        let signals = self.engine.signals_for(exec);
        assert_eq!(signals.len(), 1, "expected one signal for {exec}, got {signals:?}");
        signals.into_iter().next().unwrap()
    }
}

pub fn details(started: &Started, exec: &str, message_type: &str) -> WorkflowCallback {
    WorkflowCallback::new(started.workflow_instance_id.clone(), exec, message_type)
}

pub fn resumed_with(signal: &Signal, credit_available: bool, fully_covering: bool) -> bool {
    match signal {
        Signal::Resume(vars) => {
            vars["creditAvailable"] == credit_available && vars["creditFullyCovering"] == fully_covering
        }
        Signal::Fail(_) => false,
    }
}
