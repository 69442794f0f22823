//! # paybot-server
//!
//! HTTP side of the bot: provider webhooks, a health endpoint and the
//! background expiry sweep of pending payments.

pub mod config;
pub mod handlers;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use paybot_payments::PendingStore;
use tokio::task::JoinHandle;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use config::ServerConfig;
pub use state::AppState;

use crate::handlers::{crypto_webhook, health_check, pix_webhook};

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Provider callbacks
        .route("/webhook/pix", post(pix_webhook))
        .route("/webhook/crypto", post(crypto_webhook))
        // Legacy paths some provider dashboards still point at
        .route("/api/webhook/pix", post(pix_webhook))
        .route("/api/webhook/crypto", post(crypto_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically drop expired pending payments
pub fn spawn_sweeper<S>(store: Arc<S>, every: Duration) -> JoinHandle<()>
where
    S: PendingStore + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.sweep_expired() {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Swept expired pending payments"),
                Err(e) => tracing::warn!(error = %e, "Pending payment sweep failed"),
            }
        }
    })
}
