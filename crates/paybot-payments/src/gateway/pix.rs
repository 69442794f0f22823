//! PIX Provider Client
//!
//! Instant-transfer charges through the PushinPay API.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::{
    Charge, PaymentMethod, PaymentPayload, PaymentProvider, PaymentRequest, http_client, read_json,
    string_or_number, timeout_from_env,
};
use crate::artifact::QrArtifact;
use crate::error::{PaymentError, Result};

const DEFAULT_API_URL: &str = "https://api.pushinpay.com.br/api/v1";
const DEFAULT_DESCRIPTION: &str = "VIP payment";

/// PIX provider configuration
#[derive(Clone, Debug)]
pub struct PixConfig {
    /// API base URL
    pub api_url: String,

    /// Bearer token
    pub token: String,

    /// Directory for rendered QR codes
    pub qr_dir: PathBuf,

    /// Deadline for each request
    pub timeout: Duration,
}

impl PixConfig {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            token: token.into(),
            qr_dir: std::env::temp_dir(),
            timeout: super::DEFAULT_TIMEOUT,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("PUSHINPAY_TOKEN")
            .map_err(|_| PaymentError::Config("PUSHINPAY_TOKEN not set".into()))?;
        let api_url =
            std::env::var("PUSHINPAY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let qr_dir = std::env::var("QR_DIR").map_or_else(|_| std::env::temp_dir(), PathBuf::from);

        Ok(Self {
            api_url,
            token,
            qr_dir,
            timeout: timeout_from_env(),
        })
    }
}

#[derive(Debug, Serialize)]
struct CashInRequest<'a> {
    /// Minor units (centavos)
    value: i64,
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct CashInResponse {
    #[serde(rename = "transactionId", alias = "id", deserialize_with = "string_or_number")]
    transaction_id: String,
    #[serde(rename = "qrCode", alias = "qr_code")]
    qr_code: String,
    #[serde(rename = "pixKey", alias = "pix_key")]
    pix_key: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    status: String,
}

/// Convert a BRL amount to integer centavos, rounding half away from zero
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(PaymentError::InvalidAmount(amount))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .filter(|v| *v > 0)
        .ok_or(PaymentError::InvalidAmount(amount))
}

/// PushinPay API client
pub struct PixClient {
    http: reqwest::Client,
    config: PixConfig,
}

impl PixClient {
    pub fn new(config: PixConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(config.timeout)?,
            config,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl PaymentProvider for PixClient {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Pix
    }

    async fn create_charge(&self, request: &PaymentRequest) -> Result<Charge> {
        let body = CashInRequest {
            value: to_minor_units(request.amount)?,
            description: request.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION),
        };

        let response = self
            .http
            .post(self.url("/pix/cashIn"))
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await?;

        let charge: CashInResponse = read_json(response).await?;

        let qr_dir = self.config.qr_dir.clone();
        let qr_payload = charge.qr_code;
        let qr_code = tokio::task::spawn_blocking(move || QrArtifact::render(&qr_payload, &qr_dir))
            .await
            .map_err(|e| PaymentError::Artifact(format!("render task failed: {e}")))??;

        Ok(Charge {
            transaction_id: charge.transaction_id,
            payload: PaymentPayload::Pix {
                qr_code,
                copy_paste: charge.pix_key,
            },
            provider_status: charge.status,
        })
    }

    async fn fetch_status(&self, payment_id: &str) -> Result<String> {
        let response = self
            .http
            .get(self.url(&format!("/pix/transaction/{payment_id}")))
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        let transaction: TransactionResponse = read_json(response).await?;
        Ok(transaction.status)
    }
}
