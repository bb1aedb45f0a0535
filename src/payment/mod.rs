//! Payment saga: messages, state and the card-expiry rule.

pub mod messages;
mod policy;
mod saga;

pub use messages::{
    AccountId, AccountSummary, ChargeCreditCard, CreditAmount, CreditCardDetailsUpdated,
    DocumentAccountSummary, PaymentCreated, PaymentEvent, PaymentFullyCoveredByAccount,
    PaymentId, PaymentNotReceived, PaymentPartlyCoveredByAccount, PaymentReceived,
    UpdateCreditCardReminded, WithdrawAmount, ACCOUNT_ID_PROPERTY,
};
pub use policy::{CardExpiryPolicy, ExpiredAccounts, NeverExpired, PaymentSettings};
pub use saga::PaymentSaga;

use crate::manager::SagaManager;

/// Manager for payment sagas over engine `E`.
pub type PaymentSagaManager<E> = SagaManager<PaymentSaga, E>;
