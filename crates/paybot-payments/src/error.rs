//! Payment Error Types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Provider answered with a non-success status
    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// Connection, DNS or body decoding failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Outbound call exceeded its deadline
    #[error("Provider call timed out: {0}")]
    Timeout(String),

    /// Scannable code could not be rendered or written
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Amount is not a positive value representable in minor units
    #[error("Invalid amount: {0}")]
    InvalidAmount(rust_decimal::Decimal),

    /// No provider is configured for the requested method
    #[error("Payment method unavailable: {0}")]
    Unavailable(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout(_) | Self::Storage(_)
        )
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Provider { .. } | Self::Transport(_) | Self::Timeout(_) => {
                "Payment processing failed. Please try again."
            }
            Self::Config(_) | Self::Unavailable(_) => "This payment method is currently unavailable.",
            _ => "An error occurred processing your request.",
        }
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Category of a failed gateway call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Transport,
    Provider,
    Artifact,
    Invalid,
    Unavailable,
}

/// Failure value returned across the gateway boundary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl PaymentFailure {
    /// Generic text safe to show an end user
    pub const fn user_message(&self) -> &'static str {
        match self.kind {
            FailureKind::Timeout => "The payment provider is taking too long. Please try again.",
            _ => "Sorry, we could not process your payment. Please try again.",
        }
    }
}

impl From<PaymentError> for PaymentFailure {
    fn from(err: PaymentError) -> Self {
        let kind = match &err {
            PaymentError::Timeout(_) => FailureKind::Timeout,
            PaymentError::Transport(_) => FailureKind::Transport,
            PaymentError::Artifact(_) => FailureKind::Artifact,
            PaymentError::InvalidAmount(_) => FailureKind::Invalid,
            PaymentError::Unavailable(_) | PaymentError::Config(_) => FailureKind::Unavailable,
            _ => FailureKind::Provider,
        };

        Self {
            kind,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for PaymentFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}
