//! Message and command handlers

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile};

use crate::error::Result;
use crate::keyboards;
use crate::session::UPDATE_WINDOW;
use crate::BotContext;

const WELCOME_TEXT: &str = "Welcome to the VIP group!";
const WELCOME_DELAY: Duration = Duration::from_millis(1500);
const START_FAILED_TEXT: &str = "An error occurred while starting the bot. Please try again.";
const RECEIVED_TEXT: &str = "Message received!";

/// Entry point for message updates
pub async fn on_message(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> Result<()> {
    let key = format!("{}_{}", msg.chat.id.0, msg.id.0);

    let age = Utc::now().signed_duration_since(msg.date);
    if age.to_std().is_ok_and(|age| age > UPDATE_WINDOW) {
        tracing::debug!(%key, "Skipping old message");
        return Ok(());
    }

    if !ctx.recent_messages.first_seen(&key) {
        tracing::debug!(%key, "Skipping duplicate message");
        return Ok(());
    }

    match msg.text() {
        Some(text) if is_start_command(text) => {
            if let Err(e) = start(&bot, msg.chat.id, &ctx.assets_dir).await {
                tracing::error!(chat_id = msg.chat.id.0, error = %e, "Error in start command");
                bot.send_message(msg.chat.id, START_FAILED_TEXT).await?;
            }
        }
        Some(text) if text.starts_with('/') => {}
        _ => {
            bot.send_message(msg.chat.id, RECEIVED_TEXT).await?;
        }
    }

    Ok(())
}

/// `/start`, optionally addressed to the bot (`/start@name`) or with a
/// deep-link payload; `/startfoo` is a different command
fn is_start_command(text: &str) -> bool {
    text.split_whitespace()
        .next()
        .and_then(|command| command.split('@').next())
        == Some("/start")
}

/// Welcome sequence: voice note, short pause, banner with the access button
async fn start(bot: &Bot, chat: ChatId, assets_dir: &Path) -> Result<()> {
    let audio = assets_dir.join("audio.mp3");
    if tokio::fs::try_exists(&audio).await.unwrap_or(false) {
        bot.send_voice(chat, InputFile::file(audio)).await?;
    } else {
        tracing::warn!(path = %audio.display(), "Welcome audio not found");
    }

    tokio::time::sleep(WELCOME_DELAY).await;

    let image = assets_dir.join("topo.jpeg");
    if tokio::fs::try_exists(&image).await.unwrap_or(false) {
        bot.send_photo(chat, InputFile::file(image))
            .caption(WELCOME_TEXT)
            .reply_markup(keyboards::access_button())
            .await?;
    } else {
        tracing::warn!(path = %image.display(), "Welcome image not found");
        bot.send_message(chat, WELCOME_TEXT)
            .reply_markup(keyboards::access_button())
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_command_matching() {
        assert!(is_start_command("/start"));
        assert!(is_start_command("/start@paybot"));
        assert!(is_start_command("/start vip"));

        assert!(!is_start_command("/startfoo"));
        assert!(!is_start_command("/starting"));
        assert!(!is_start_command("start"));
        assert!(!is_start_command(""));
    }
}
