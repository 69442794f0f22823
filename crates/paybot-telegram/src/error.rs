//! Bot Error Types

use thiserror::Error;

/// Result type alias for update handlers
pub type Result<T> = std::result::Result<T, BotError>;

/// Errors raised while handling a Telegram update
#[derive(Error, Debug)]
pub enum BotError {
    /// Telegram API request failed
    #[error("Telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Payment core error
    #[error("Payment error: {0}")]
    Payment(#[from] paybot_payments::PaymentError),

    /// Callback needs a plan but the chat has not chosen one
    #[error("No plan selected for chat {0}")]
    NoPlanSelected(i64),

    /// Unknown or malformed callback data
    #[error("Unknown callback data: {0}")]
    UnknownCallback(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BotError {
    /// Text shown to the buyer; never includes internal detail
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::NoPlanSelected(_) => "Please choose a plan first.",
            Self::Payment(e) => e.user_message(),
            _ => "An error occurred. Please try again.",
        }
    }
}
