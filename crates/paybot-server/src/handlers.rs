//! HTTP Handlers

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use paybot_payments::{
    CRYPTO_SIGNATURE_HEADER, PIX_SIGNATURE_HEADER, PaymentError, PaymentMethod, PendingStore,
};
use serde::Serialize;

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub pix_enabled: bool,
    pub crypto_enabled: bool,
    pub pending: usize,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

type WebhookReply = Result<Json<AckResponse>, (StatusCode, Json<ErrorResponse>)>;

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let pending = state.webhooks.pending().len().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Pending store unavailable");
        0
    });

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        pix_enabled: state.gateway.is_enabled(PaymentMethod::Pix),
        crypto_enabled: state.gateway.is_enabled(PaymentMethod::Crypto),
        pending,
    })
}

/// PIX provider callback
pub async fn pix_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookReply {
    receive(&state, PaymentMethod::Pix, &headers, &body).await
}

/// Crypto provider callback
pub async fn crypto_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookReply {
    receive(&state, PaymentMethod::Crypto, &headers, &body).await
}

const fn signature_header(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Pix => PIX_SIGNATURE_HEADER,
        PaymentMethod::Crypto => CRYPTO_SIGNATURE_HEADER,
    }
}

async fn receive(
    state: &AppState,
    method: PaymentMethod,
    headers: &HeaderMap,
    body: &[u8],
) -> WebhookReply {
    let signature = headers
        .get(signature_header(method))
        .and_then(|v| v.to_str().ok());

    let event = state
        .webhooks
        .parse_event(method, body, signature)
        .map_err(|e| match e {
            PaymentError::WebhookSignature(reason) => {
                tracing::warn!(%method, %reason, "Rejected webhook signature");
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse {
                        error: "Invalid signature",
                    }),
                )
            }
            other => internal_error(method, &other),
        })?;

    state
        .webhooks
        .handle(event)
        .await
        .map_err(|e| internal_error(method, &e))?;

    Ok(Json(AckResponse { status: "ok" }))
}

fn internal_error(method: PaymentMethod, error: &PaymentError) -> (StatusCode, Json<ErrorResponse>) {
    tracing::error!(%method, error = %error, "Webhook processing error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error",
        }),
    )
}
