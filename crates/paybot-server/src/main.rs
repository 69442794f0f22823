//! paybot HTTP server and Telegram bot
//!
//! Runs the bot dispatcher and the webhook receiver in one process, sharing
//! the pending payment registry between them.

use std::sync::Arc;

use paybot_payments::{
    ChatNotifier, MemoryPendingStore, PaymentGateway, PaymentMethod, WebhookHandler,
    WebhookSecrets,
};
use paybot_server::{AppState, ServerConfig, router, spawn_sweeper};
use paybot_telegram::{BotContext, TelegramNotifier};
use teloxide::Bot;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    // Payments
    let gateway = Arc::new(PaymentGateway::from_env());
    for method in [PaymentMethod::Pix, PaymentMethod::Crypto] {
        if gateway.is_enabled(method) {
            tracing::info!("✓ {method} payments configured");
        }
    }

    let secrets = WebhookSecrets::from_env();
    if secrets.pix.is_none() {
        tracing::warn!("⚠ No PIX webhook secret - PIX callbacks will be rejected");
    }
    if secrets.crypto.is_none() {
        tracing::warn!("⚠ NOWPAYMENTS_IPN_SECRET not set - crypto callbacks will be rejected");
    }

    // Bot and shared registry
    let bot = Bot::new(&config.bot_token);
    let notifier: Arc<dyn ChatNotifier> = Arc::new(TelegramNotifier::new(bot.clone()));
    let pending = Arc::new(MemoryPendingStore::new(config.pending_ttl));
    tracing::info!(
        ttl_secs = pending.ttl().as_secs(),
        sweep_secs = config.sweep_interval.as_secs(),
        "Pending payment registry ready"
    );
    let webhooks = Arc::new(WebhookHandler::new(pending.clone(), notifier.clone(), secrets));

    let sweeper = spawn_sweeper(pending, config.sweep_interval);

    let ctx = Arc::new(BotContext::new(
        gateway.clone(),
        webhooks.clone(),
        notifier,
        &config.assets_dir,
    ));

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let bot_task = tokio::spawn(paybot_telegram::run(bot, ctx, async move {
        shutdown_rx.changed().await.ok();
    }));

    // HTTP server
    let app = router(AppState { gateway, webhooks });
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 paybot server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health         - Health check");
    tracing::info!("  POST /webhook/pix    - PIX provider callback");
    tracing::info!("  POST /webhook/crypto - Crypto provider callback");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Cannot listen for shutdown signal");
            }
            tracing::info!("Shutting down");
            shutdown_tx.send(true).ok();
        })
        .await?;

    bot_task.await?;
    sweeper.abort();

    Ok(())
}
