//! Chat Notifications
//!
//! The payment core talks to the buyer only through [`ChatNotifier`]. The
//! chat layer implements it; calls are fire-and-forget from the core's
//! point of view, but the confirmation outcome is returned so a caller can
//! decide whether to retry.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::artifact::QrArtifact;
use crate::gateway::PaymentMethod;

/// Whether a notification reached the buyer
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum NotifyOutcome {
    Delivered,
    Failed(String),
}

impl NotifyOutcome {
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Buyer-facing notification sink
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    /// Tell the buyer their payment went through
    async fn notify_payment_confirmed(
        &self,
        chat_id: i64,
        plan_id: &str,
        method: PaymentMethod,
    ) -> NotifyOutcome;

    /// Send the PIX QR image and copy-and-paste code
    async fn present_payment_artifact(
        &self,
        chat_id: i64,
        artifact: &QrArtifact,
        copy_code: &str,
        amount: Decimal,
    ) -> NotifyOutcome;

    /// Send the crypto pay-to address
    async fn present_crypto_address(
        &self,
        chat_id: i64,
        address: &str,
        amount: Decimal,
        currency: &str,
    ) -> NotifyOutcome;
}
