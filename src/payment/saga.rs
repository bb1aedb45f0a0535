//! The payment saga.
//!
//! Pays an amount first from the account balance and the remainder by
//! credit card. The process definition decides the order of steps; this
//! type only holds the state, builds the messages the steps ask for and
//! applies the account summary response.

use serde_json::Value;
use tracing::debug;

use super::messages::*;
use super::policy::PaymentSettings;
use crate::error::SagaError;
use crate::registry::{MessageFactoryRegistry, ResponseHandlerRegistry};
use crate::saga::{DomainEvent, Saga, SagaDefinition, SagaState};
use crate::workflow::Variables;

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSaga {
    payment_id: PaymentId,
    account_id: AccountId,
    payment_amount: f64,
    credit_available: f64,
    amount_withdrawn: f64,
    credit_card_expired: bool,
}

impl PaymentSaga {
    pub fn payment_id(&self) -> &PaymentId {
        &self.payment_id
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn payment_amount(&self) -> f64 {
        self.payment_amount
    }

    /// Account balance reported by the last account summary.
    pub fn credit_available(&self) -> f64 {
        self.credit_available
    }

    /// Part of the payment taken from the account balance.
    pub fn amount_withdrawn(&self) -> f64 {
        self.amount_withdrawn
    }

    /// Part of the payment left for the credit card.
    pub fn amount_outstanding(&self) -> f64 {
        self.payment_amount - self.amount_withdrawn
    }

    pub fn credit_card_expired(&self) -> bool {
        self.credit_card_expired
    }

    fn apply_account_summary(&mut self, summary: AccountSummary) {
        self.credit_available = summary.balance;
        self.amount_withdrawn = summary.balance.min(self.payment_amount);
        debug!(
            account_id = %self.account_id,
            balance = summary.balance,
            amount_withdrawn = self.amount_withdrawn,
            "account summary applied"
        );
    }
}

impl SagaState for PaymentSaga {
    fn variables(&self) -> Variables {
        let mut variables = Variables::new();
        variables.insert(
            "creditAvailable".into(),
            Value::Bool(self.credit_available > 0.0),
        );
        variables.insert(
            "creditFullyCovering".into(),
            Value::Bool(self.credit_available >= self.payment_amount),
        );
        variables
    }
}

impl Saga for PaymentSaga {
    type Event = PaymentEvent;
    type Settings = PaymentSettings;

    fn definition() -> SagaDefinition<Self> {
        let factories = MessageFactoryRegistry::new()
            .query::<DocumentAccountSummary, AccountSummary, _>(|s: &PaymentSaga| {
                DocumentAccountSummary {
                    account_id: s.account_id.clone(),
                }
            })
            .command(|s: &PaymentSaga| ChargeCreditCard {
                account_id: s.account_id.clone(),
                amount: s.amount_outstanding(),
                card_expired: s.credit_card_expired,
            })
            .command(|s: &PaymentSaga| WithdrawAmount {
                account_id: s.account_id.clone(),
                amount: s.amount_withdrawn,
            })
            .command(|s: &PaymentSaga| CreditAmount {
                account_id: s.account_id.clone(),
                amount: s.amount_withdrawn,
            })
            .event(|s: &PaymentSaga| PaymentReceived {
                payment_id: s.payment_id.clone(),
                account_id: s.account_id.clone(),
                amount: s.payment_amount,
            })
            .event(|s: &PaymentSaga| PaymentNotReceived {
                payment_id: s.payment_id.clone(),
                account_id: s.account_id.clone(),
                amount: s.amount_outstanding(),
            })
            .event(|s: &PaymentSaga| PaymentFullyCoveredByAccount {
                payment_id: s.payment_id.clone(),
                account_id: s.account_id.clone(),
                amount: s.amount_withdrawn,
            })
            .event(|s: &PaymentSaga| PaymentPartlyCoveredByAccount {
                payment_id: s.payment_id.clone(),
                account_id: s.account_id.clone(),
                amount: s.amount_withdrawn,
            })
            .event(|s: &PaymentSaga| UpdateCreditCardReminded {
                account_id: s.account_id.clone(),
            });

        let responses = ResponseHandlerRegistry::new()
            .on(|s: &mut PaymentSaga, summary: AccountSummary| s.apply_account_summary(summary));

        SagaDefinition::new("PaymentSaga", factories, responses)
    }

    fn start(event: &PaymentEvent, settings: &PaymentSettings) -> Result<Self, SagaError> {
        match event {
            PaymentEvent::PaymentCreated(created) => {
                debug!(?created, "payment created");
                Ok(Self {
                    payment_id: created.payment_id.clone(),
                    account_id: created.account_id.clone(),
                    payment_amount: created.amount,
                    credit_available: 0.0,
                    amount_withdrawn: 0.0,
                    credit_card_expired: settings.card_expiry.is_expired(&created.account_id),
                })
            }
            other => Err(SagaError::NotAStartEvent {
                event_type: other.event_type().to_string(),
            }),
        }
    }

    fn on(&mut self, event: &PaymentEvent) {
        match event {
            PaymentEvent::CreditCardDetailsUpdated(updated) => {
                debug!(?updated, "credit card details updated");
                self.credit_card_expired = false;
            }
            PaymentEvent::PaymentReceived(received) => {
                debug!(?received, "payment received");
            }
            // Creation-time fields never change after start.
            PaymentEvent::PaymentCreated(_) => {}
        }
    }
}
