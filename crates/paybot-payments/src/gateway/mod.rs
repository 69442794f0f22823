//! Payment Gateway Adapter
//!
//! Wraps the outbound provider APIs behind one entry point. Provider
//! clients implement [`PaymentProvider`] and may fail freely; the
//! [`PaymentGateway`] turns every failure into a [`PaymentFailure`] value so
//! nothing but a result ever crosses this boundary.
//!
//! ```text
//! ┌──────────────┐  create_payment   ┌────────────────┐  POST /pix/cashIn
//! │  chat layer  │──────────────────▶│ PaymentGateway │──▶ PixClient
//! │              │◀──────────────────│                │──▶ CryptoClient
//! └──────────────┘   PaymentResult   └────────────────┘  POST /payment
//! ```

mod crypto;
mod pix;

pub use crypto::{CryptoClient, CryptoConfig};
pub use pix::{PixClient, PixConfig};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::{Deserialize, Serialize};

use crate::artifact::QrArtifact;
use crate::error::{PaymentError, PaymentFailure, Result};

/// Default deadline for provider calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Supported gateway payment methods
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// PIX instant transfer
    Pix,
    /// Cryptocurrency
    Crypto,
}

impl PaymentMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pix => "pix",
            Self::Crypto => "crypto",
        }
    }

    /// Whether a provider status means the payment is settled.
    ///
    /// Shared by status polling and webhooks; the crypto provider reports
    /// settlement in two stages and both count as paid.
    pub fn is_completed(self, status: &str) -> bool {
        match self {
            Self::Pix => status == "COMPLETED",
            Self::Crypto => matches!(status, "finished" | "confirmed"),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One purchase attempt
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,

    /// Amount in BRL, not pre-scaled
    pub amount: Decimal,

    #[serde(default)]
    pub description: Option<String>,
}

impl PaymentRequest {
    pub fn new(method: PaymentMethod, amount: Decimal) -> Self {
        Self {
            method,
            amount,
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Method-specific data the buyer needs to pay
#[derive(Debug)]
pub enum PaymentPayload {
    Pix {
        /// Scannable image, deleted when dropped
        qr_code: QrArtifact,
        /// Copy-and-paste payment code
        copy_paste: String,
    },
    Crypto {
        pay_address: String,
        pay_amount: Decimal,
        pay_currency: String,
    },
}

/// A charge successfully created at a provider
#[derive(Debug)]
pub struct Charge {
    pub transaction_id: String,
    pub payload: PaymentPayload,
    /// Status the provider reported at creation, if any
    pub provider_status: Option<String>,
}

/// Outcome of [`PaymentGateway::create_payment`]
#[derive(Debug)]
pub enum PaymentResult {
    Success(Charge),
    Failure(PaymentFailure),
}

impl PaymentResult {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Current provider-side state of a payment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub paid: bool,
    pub status: String,
}

/// Local record of a created charge
#[derive(Clone, Debug, Serialize)]
pub struct Transaction {
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Provider client trait (Strategy pattern)
///
/// Implement this for each payment provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Method this provider serves
    fn method(&self) -> PaymentMethod;

    /// Create a charge for `request`
    async fn create_charge(&self, request: &PaymentRequest) -> Result<Charge>;

    /// Fetch the raw provider status of a payment
    async fn fetch_status(&self, payment_id: &str) -> Result<String>;
}

/// Dispatches payment requests to the configured providers
#[derive(Default)]
pub struct PaymentGateway {
    pix: Option<Arc<dyn PaymentProvider>>,
    crypto: Option<Arc<dyn PaymentProvider>>,
    transactions: Mutex<HashMap<String, Transaction>>,
}

impl PaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under the method it reports
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn PaymentProvider>) -> Self {
        match provider.method() {
            PaymentMethod::Pix => self.pix = Some(provider),
            PaymentMethod::Crypto => self.crypto = Some(provider),
        }
        self
    }

    /// Build from environment variables; unconfigured providers are skipped
    pub fn from_env() -> Self {
        let mut gateway = Self::new();

        match PixConfig::from_env().and_then(PixClient::new) {
            Ok(client) => gateway = gateway.with_provider(Arc::new(client)),
            Err(e) => tracing::warn!(error = %e, "PIX payments disabled"),
        }

        match CryptoConfig::from_env().and_then(CryptoClient::new) {
            Ok(client) => gateway = gateway.with_provider(Arc::new(client)),
            Err(e) => tracing::warn!(error = %e, "Crypto payments disabled"),
        }

        gateway
    }

    /// Whether a provider is configured for `method`
    pub const fn is_enabled(&self, method: PaymentMethod) -> bool {
        match method {
            PaymentMethod::Pix => self.pix.is_some(),
            PaymentMethod::Crypto => self.crypto.is_some(),
        }
    }

    fn provider(&self, method: PaymentMethod) -> Result<&Arc<dyn PaymentProvider>> {
        let provider = match method {
            PaymentMethod::Pix => self.pix.as_ref(),
            PaymentMethod::Crypto => self.crypto.as_ref(),
        };
        provider.ok_or_else(|| PaymentError::Unavailable(format!("{method} is not configured")))
    }

    /// Create a charge. Never fails: errors come back as [`PaymentResult::Failure`].
    pub async fn create_payment(&self, request: PaymentRequest) -> PaymentResult {
        match self.try_create(&request).await {
            Ok(charge) => {
                self.record(&request, &charge);
                tracing::info!(
                    method = %request.method,
                    transaction_id = %charge.transaction_id,
                    amount = %request.amount,
                    "Created payment"
                );
                PaymentResult::Success(charge)
            }
            Err(e) => {
                tracing::error!(method = %request.method, error = %e, "Error creating payment");
                PaymentResult::Failure(e.into())
            }
        }
    }

    async fn try_create(&self, request: &PaymentRequest) -> Result<Charge> {
        if request.amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount(request.amount));
        }
        self.provider(request.method)?.create_charge(request).await
    }

    /// Poll the provider for the status of `payment_id`
    pub async fn check_status(
        &self,
        method: PaymentMethod,
        payment_id: &str,
    ) -> std::result::Result<PaymentStatus, PaymentFailure> {
        let status = async { self.provider(method)?.fetch_status(payment_id).await }
            .await
            .map_err(|e| {
                tracing::error!(%method, payment_id, error = %e, "Error checking payment status");
                PaymentFailure::from(e)
            })?;

        Ok(PaymentStatus {
            paid: method.is_completed(&status),
            status,
        })
    }

    fn record(&self, request: &PaymentRequest, charge: &Charge) {
        let status = charge
            .provider_status
            .clone()
            .unwrap_or_else(|| "pending".to_string());

        let transaction = Transaction {
            method: request.method,
            amount: request.amount,
            status,
            created_at: Utc::now(),
        };

        match self.transactions.lock() {
            Ok(mut transactions) => {
                transactions.insert(charge.transaction_id.clone(), transaction);
            }
            Err(e) => tracing::warn!(error = %e, "Transaction log unavailable"),
        }
    }

    /// Local record of a created charge
    pub fn transaction(&self, transaction_id: &str) -> Option<Transaction> {
        self.transactions
            .lock()
            .ok()
            .and_then(|t| t.get(transaction_id).cloned())
    }
}

/// Build an HTTP client whose every request carries `timeout`
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PaymentError::Config(format!("HTTP client: {e}")))
}

/// Read `PROVIDER_TIMEOUT_SECS`, falling back to [`DEFAULT_TIMEOUT`]
pub(crate) fn timeout_from_env() -> Duration {
    std::env::var("PROVIDER_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map_or(DEFAULT_TIMEOUT, Duration::from_secs)
}

/// Decode a success response, or turn the status and body into an error
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(PaymentError::Provider {
            status: status.as_u16(),
            message,
        });
    }

    response.json::<T>().await.map_err(|e| {
        if e.is_timeout() {
            PaymentError::Timeout(e.to_string())
        } else {
            PaymentError::Provider {
                status: status.as_u16(),
                message: format!("unexpected response body: {e}"),
            }
        }
    })
}

/// Accept ids sent either as JSON strings or numbers
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
