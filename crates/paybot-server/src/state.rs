//! Application State

use std::sync::Arc;

use paybot_payments::{MemoryPendingStore, PaymentGateway, WebhookHandler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Provider gateway, used here only to report which methods are enabled
    pub gateway: Arc<PaymentGateway>,

    /// Verifies and settles provider callbacks
    pub webhooks: Arc<WebhookHandler<MemoryPendingStore>>,
}
