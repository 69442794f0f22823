//! Pending Payment Registry
//!
//! Correlates provider payment ids with the chat that started the purchase,
//! so an asynchronous confirmation can reach the buyer. Entries live only
//! in memory and expire after a time-to-live.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};

/// Default time-to-live for unconfirmed payments
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A charge awaiting confirmation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPayment {
    /// Telegram chat that started the purchase
    pub chat_id: i64,

    /// Amount charged in BRL
    pub amount: Decimal,

    /// Plan being bought
    pub plan_id: String,

    /// Registration time, used for expiry
    pub created_at: DateTime<Utc>,
}

impl PendingPayment {
    pub fn new(chat_id: i64, amount: Decimal, plan_id: impl Into<String>) -> Self {
        Self {
            chat_id,
            amount,
            plan_id: plan_id.into(),
            created_at: Utc::now(),
        }
    }

    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        chrono::Duration::from_std(ttl).is_ok_and(|ttl| now - self.created_at > ttl)
    }
}

/// Pending payment storage trait
pub trait PendingStore: Send + Sync {
    /// Register a payment id
    fn put(&self, payment_id: &str, payment: PendingPayment) -> Result<()>;

    /// Remove and return an entry. Of several concurrent callers for the
    /// same id, exactly one receives it.
    fn take(&self, payment_id: &str) -> Result<Option<PendingPayment>>;

    /// Drop expired entries, returning how many were removed
    fn sweep_expired(&self) -> Result<usize>;

    /// Number of live entries
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// In-memory pending payment store
pub struct MemoryPendingStore {
    payments: Mutex<HashMap<String, PendingPayment>>,
    ttl: Duration,
}

impl Default for MemoryPendingStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl MemoryPendingStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            payments: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, PendingPayment>>> {
        self.payments
            .lock()
            .map_err(|e| PaymentError::Storage(format!("pending store poisoned: {e}")))
    }

    fn sweep_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut payments = self.lock()?;
        let before = payments.len();
        payments.retain(|_, p| !p.is_expired(self.ttl, now));
        Ok(before - payments.len())
    }
}

impl PendingStore for MemoryPendingStore {
    fn put(&self, payment_id: &str, payment: PendingPayment) -> Result<()> {
        let mut payments = self.lock()?;

        if payments.insert(payment_id.to_string(), payment).is_some() {
            tracing::warn!(payment_id, "Replaced existing pending payment");
        }

        Ok(())
    }

    fn take(&self, payment_id: &str) -> Result<Option<PendingPayment>> {
        let mut payments = self.lock()?;

        match payments.remove(payment_id) {
            Some(payment) if payment.is_expired(self.ttl, Utc::now()) => {
                tracing::debug!(payment_id, "Pending payment expired before confirmation");
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn sweep_expired(&self) -> Result<usize> {
        self.sweep_at(Utc::now())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}
