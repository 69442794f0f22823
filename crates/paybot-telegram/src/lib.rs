//! # paybot-telegram
//!
//! Telegram chat layer: welcome sequence, plan and payment menus, and the
//! [`TelegramNotifier`] the payment core uses to reach buyers.
//!
//! Teloxide's dispatcher runs the updates of one chat sequentially, so a
//! chat never has two handlers racing over its session.

mod error;
mod handlers;
mod keyboards;
mod notifier;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use paybot_payments::{ChatNotifier, MemoryPendingStore, PaymentGateway, WebhookHandler};
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

pub use error::{BotError, Result};
pub use handlers::{on_callback, on_message};
pub use keyboards::CallbackAction;
pub use notifier::TelegramNotifier;
pub use session::{ChatSessions, RecentUpdates, UPDATE_WINDOW};

/// Shared state injected into every handler
pub struct BotContext {
    pub gateway: Arc<PaymentGateway>,
    pub webhooks: Arc<WebhookHandler<MemoryPendingStore>>,
    pub notifier: Arc<dyn ChatNotifier>,
    pub sessions: ChatSessions,
    pub recent_messages: RecentUpdates,
    pub recent_callbacks: RecentUpdates,
    /// Directory holding `audio.mp3` and `topo.jpeg`
    pub assets_dir: PathBuf,
}

impl BotContext {
    pub fn new(
        gateway: Arc<PaymentGateway>,
        webhooks: Arc<WebhookHandler<MemoryPendingStore>>,
        notifier: Arc<dyn ChatNotifier>,
        assets_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            gateway,
            webhooks,
            notifier,
            sessions: ChatSessions::new(),
            recent_messages: RecentUpdates::default(),
            recent_callbacks: RecentUpdates::default(),
            assets_dir: assets_dir.into(),
        }
    }
}

/// Update routing tree
pub fn schema() -> UpdateHandler<BotError> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback))
}

/// Poll Telegram until `shutdown` resolves
pub async fn run(bot: Bot, ctx: Arc<BotContext>, shutdown: impl Future<Output = ()>) {
    tracing::info!("Starting bot dispatcher");

    let mut dispatcher = Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![ctx])
        .default_handler(|update: Arc<Update>| async move {
            tracing::debug!(update_id = ?update.id, "Unhandled update");
        })
        .build();

    tokio::select! {
        () = dispatcher.dispatch() => {
            tracing::info!("Bot dispatcher exited");
        }
        () = shutdown => {
            tracing::info!("Bot received shutdown signal, stopping");
        }
    }
}
