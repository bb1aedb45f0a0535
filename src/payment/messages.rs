//! Payment message contracts.
//!
//! Field names serialize in camelCase so JSON payloads match the upstream
//! services (`accountId`, `paymentId`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::message::MessageType;
use crate::saga::{Association, DomainEvent, Lifecycle};

/// Association property for the business key.
pub const ACCOUNT_ID_PROPERTY: &str = "accountId";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub String);

impl PaymentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaymentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Implement [`MessageType`] with the struct name as type name.
macro_rules! message_types {
    ($($ty:ident),* $(,)?) => {
        $(
            impl MessageType for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);
            }
        )*
    };
}

// Domain events consumed by the saga

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCreated {
    pub account_id: AccountId,
    pub payment_id: PaymentId,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardDetailsUpdated {
    pub account_id: AccountId,
}

/// Published by the saga and consumed by it as its terminal event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceived {
    pub payment_id: PaymentId,
    pub account_id: AccountId,
    pub amount: f64,
}

// Query and response

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAccountSummary {
    pub account_id: AccountId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub account_id: AccountId,
    pub balance: f64,
}

// Commands

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeCreditCard {
    pub account_id: AccountId,
    pub amount: f64,
    pub card_expired: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawAmount {
    pub account_id: AccountId,
    pub amount: f64,
}

/// Compensation for [`WithdrawAmount`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditAmount {
    pub account_id: AccountId,
    pub amount: f64,
}

// Events published by the saga

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotReceived {
    pub payment_id: PaymentId,
    pub account_id: AccountId,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFullyCoveredByAccount {
    pub payment_id: PaymentId,
    pub account_id: AccountId,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPartlyCoveredByAccount {
    pub payment_id: PaymentId,
    pub account_id: AccountId,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCreditCardReminded {
    pub account_id: AccountId,
}

message_types!(
    PaymentCreated,
    CreditCardDetailsUpdated,
    PaymentReceived,
    DocumentAccountSummary,
    AccountSummary,
    ChargeCreditCard,
    WithdrawAmount,
    CreditAmount,
    PaymentNotReceived,
    PaymentFullyCoveredByAccount,
    PaymentPartlyCoveredByAccount,
    UpdateCreditCardReminded,
);

/// Domain events routed to payment sagas.
///
/// JSON form: `{"type": "PaymentCreated", "accountId": "kermit", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PaymentEvent {
    PaymentCreated(PaymentCreated),
    CreditCardDetailsUpdated(CreditCardDetailsUpdated),
    PaymentReceived(PaymentReceived),
}

impl PaymentEvent {
    pub fn account_id(&self) -> &AccountId {
        match self {
            PaymentEvent::PaymentCreated(e) => &e.account_id,
            PaymentEvent::CreditCardDetailsUpdated(e) => &e.account_id,
            PaymentEvent::PaymentReceived(e) => &e.account_id,
        }
    }
}

impl DomainEvent for PaymentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::PaymentCreated(_) => PaymentCreated::TYPE_NAME,
            PaymentEvent::CreditCardDetailsUpdated(_) => CreditCardDetailsUpdated::TYPE_NAME,
            PaymentEvent::PaymentReceived(_) => PaymentReceived::TYPE_NAME,
        }
    }

    fn association(&self) -> Association {
        Association::new(ACCOUNT_ID_PROPERTY, self.account_id().as_str())
    }

    fn lifecycle(&self) -> Lifecycle {
        match self {
            PaymentEvent::PaymentCreated(_) => Lifecycle::Start,
            PaymentEvent::CreditCardDetailsUpdated(_) => Lifecycle::Continue,
            PaymentEvent::PaymentReceived(_) => Lifecycle::End,
        }
    }
}

impl From<PaymentCreated> for PaymentEvent {
    fn from(event: PaymentCreated) -> Self {
        PaymentEvent::PaymentCreated(event)
    }
}

impl From<CreditCardDetailsUpdated> for PaymentEvent {
    fn from(event: CreditCardDetailsUpdated) -> Self {
        PaymentEvent::CreditCardDetailsUpdated(event)
    }
}

impl From<PaymentReceived> for PaymentEvent {
    fn from(event: PaymentReceived) -> Self {
        PaymentEvent::PaymentReceived(event)
    }
}
