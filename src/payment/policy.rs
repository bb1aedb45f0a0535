//! Business rule deciding whether an account's credit card is expired.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::messages::AccountId;
use crate::config::SagaConfig;

pub trait CardExpiryPolicy: Send + Sync {
    fn is_expired(&self, account_id: &AccountId) -> bool;
}

impl<F> CardExpiryPolicy for F
where
    F: Fn(&AccountId) -> bool + Send + Sync,
{
    fn is_expired(&self, account_id: &AccountId) -> bool {
        self(account_id)
    }
}

/// No card is ever expired.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverExpired;

impl CardExpiryPolicy for NeverExpired {
    fn is_expired(&self, _account_id: &AccountId) -> bool {
        false
    }
}

/// Cards of a fixed set of accounts are expired.
#[derive(Debug, Clone, Default)]
pub struct ExpiredAccounts {
    accounts: HashSet<String>,
}

impl ExpiredAccounts {
    pub fn new<I, T>(accounts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            accounts: accounts.into_iter().map(Into::into).collect(),
        }
    }
}

impl CardExpiryPolicy for ExpiredAccounts {
    fn is_expired(&self, account_id: &AccountId) -> bool {
        self.accounts.contains(account_id.as_str())
    }
}

/// Settings shared by all payment sagas.
#[derive(Clone)]
pub struct PaymentSettings {
    pub card_expiry: Arc<dyn CardExpiryPolicy>,
}

impl PaymentSettings {
    pub fn new(card_expiry: impl CardExpiryPolicy + 'static) -> Self {
        Self {
            card_expiry: Arc::new(card_expiry),
        }
    }

    /// Expired cards from `expired_card_accounts`.
    pub fn from_config(config: &SagaConfig) -> Self {
        if config.expired_card_accounts.is_empty() {
            Self::new(NeverExpired)
        } else {
            Self::new(ExpiredAccounts::new(
                config.expired_card_accounts.iter().cloned(),
            ))
        }
    }
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self::new(NeverExpired)
    }
}

impl fmt::Debug for PaymentSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentSettings").finish_non_exhaustive()
    }
}
