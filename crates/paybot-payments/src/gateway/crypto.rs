//! Crypto Provider Client
//!
//! Cryptocurrency charges through the NOWPayments API. The price is quoted
//! in a fiat settlement currency and converted by the provider into the
//! pay currency.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    Charge, PaymentMethod, PaymentPayload, PaymentProvider, PaymentRequest, http_client, read_json,
    string_or_number, timeout_from_env,
};
use crate::error::{PaymentError, Result};

const DEFAULT_API_URL: &str = "https://api.nowpayments.io/v1";
const DEFAULT_DESCRIPTION: &str = "VIP payment";

/// Crypto provider configuration
#[derive(Clone, Debug)]
pub struct CryptoConfig {
    /// API base URL
    pub api_url: String,

    /// `x-api-key` credential
    pub api_key: String,

    /// Fiat currency prices are quoted in
    pub price_currency: String,

    /// Cryptocurrency the buyer pays with
    pub pay_currency: String,

    /// Deadline for each request
    pub timeout: Duration,
}

impl CryptoConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            price_currency: "brl".into(),
            pay_currency: "btc".into(),
            timeout: super::DEFAULT_TIMEOUT,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("NOWPAYMENTS_API_KEY")
            .map_err(|_| PaymentError::Config("NOWPAYMENTS_API_KEY not set".into()))?;
        let api_url =
            std::env::var("NOWPAYMENTS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());

        let mut config = Self::new(api_url, api_key);
        if let Ok(currency) = std::env::var("CRYPTO_PRICE_CURRENCY") {
            config.price_currency = currency.to_lowercase();
        }
        if let Ok(currency) = std::env::var("CRYPTO_PAY_CURRENCY") {
            config.pay_currency = currency.to_lowercase();
        }
        config.timeout = timeout_from_env();

        Ok(config)
    }
}

#[derive(Debug, Serialize)]
struct CreatePaymentRequest<'a> {
    #[serde(with = "rust_decimal::serde::float")]
    price_amount: Decimal,
    price_currency: &'a str,
    pay_currency: &'a str,
    order_description: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatePaymentResponse {
    #[serde(deserialize_with = "string_or_number")]
    payment_id: String,
    pay_address: String,
    pay_amount: Decimal,
    pay_currency: String,
    #[serde(default)]
    payment_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentStatusResponse {
    payment_status: String,
}

/// NOWPayments API client
pub struct CryptoClient {
    http: reqwest::Client,
    config: CryptoConfig,
}

impl CryptoClient {
    pub fn new(config: CryptoConfig) -> Result<Self> {
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
impl PaymentProvider for CryptoClient {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Crypto
    }

    async fn create_charge(&self, request: &PaymentRequest) -> Result<Charge> {
        let body = CreatePaymentRequest {
            price_amount: request.amount,
            price_currency: &self.config.price_currency,
            pay_currency: &self.config.pay_currency,
            order_description: request.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION),
        };

        let response = self
            .http
            .post(self.url("/payment"))
            .header("x-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let payment: CreatePaymentResponse = read_json(response).await?;

        tracing::debug!(
            payment_id = %payment.payment_id,
            status = ?payment.payment_status,
            "Crypto payment created"
        );

        Ok(Charge {
            transaction_id: payment.payment_id,
            payload: PaymentPayload::Crypto {
                pay_address: payment.pay_address,
                pay_amount: payment.pay_amount,
                pay_currency: payment.pay_currency,
            },
            provider_status: payment.payment_status,
        })
    }

    async fn fetch_status(&self, payment_id: &str) -> Result<String> {
        let response = self
            .http
            .get(self.url(&format!("/payment/{payment_id}")))
            .header("x-api-key", &self.config.api_key)
            .send()
            .await?;

        let status: PaymentStatusResponse = read_json(response).await?;
        Ok(status.payment_status)
    }
}
