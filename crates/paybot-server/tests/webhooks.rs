//! Webhook endpoint tests driving the router directly

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use paybot_payments::{
    CRYPTO_SIGNATURE_HEADER, ChatNotifier, MemoryPendingStore, NotifyOutcome,
    PIX_SIGNATURE_HEADER, PaymentGateway, PaymentMethod, PendingPayment, PendingStore, QrArtifact,
    SignatureVerifier, WebhookHandler, WebhookSecrets,
};
use paybot_server::{AppState, router, spawn_sweeper};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tower::ServiceExt;

const PIX_SECRET: &str = "pix-secret";
const CRYPTO_SECRET: &str = "ipn-secret";

#[derive(Default)]
struct RecordingNotifier {
    confirmed: Mutex<Vec<(i64, String)>>,
}

impl RecordingNotifier {
    fn confirmed(&self) -> Vec<(i64, String)> {
        self.confirmed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatNotifier for RecordingNotifier {
    async fn notify_payment_confirmed(
        &self,
        chat_id: i64,
        plan_id: &str,
        _method: PaymentMethod,
    ) -> NotifyOutcome {
        self.confirmed
            .lock()
            .unwrap()
            .push((chat_id, plan_id.to_string()));
        NotifyOutcome::Delivered
    }

    async fn present_payment_artifact(
        &self,
        _chat_id: i64,
        _artifact: &QrArtifact,
        _copy_code: &str,
        _amount: Decimal,
    ) -> NotifyOutcome {
        NotifyOutcome::Delivered
    }

    async fn present_crypto_address(
        &self,
        _chat_id: i64,
        _address: &str,
        _amount: Decimal,
        _currency: &str,
    ) -> NotifyOutcome {
        NotifyOutcome::Delivered
    }
}

struct Harness {
    app: Router,
    pending: Arc<MemoryPendingStore>,
    notifier: Arc<RecordingNotifier>,
}

fn harness_with(secrets: WebhookSecrets) -> Harness {
    let pending = Arc::new(MemoryPendingStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let webhooks = WebhookHandler::new(pending.clone(), notifier.clone(), secrets);

    let app = router(AppState {
        gateway: Arc::new(PaymentGateway::new()),
        webhooks: Arc::new(webhooks),
    });

    Harness {
        app,
        pending,
        notifier,
    }
}

fn harness() -> Harness {
    harness_with(WebhookSecrets {
        pix: Some(PIX_SECRET.into()),
        crypto: Some(CRYPTO_SECRET.into()),
    })
}

fn signed(method: PaymentMethod, uri: &str, body: &Value) -> Request<Body> {
    let (secret, header) = match method {
        PaymentMethod::Pix => (PIX_SECRET, PIX_SIGNATURE_HEADER),
        PaymentMethod::Crypto => (CRYPTO_SECRET, CRYPTO_SIGNATURE_HEADER),
    };
    let bytes = serde_json::to_vec(body).unwrap();
    let signature = SignatureVerifier::new(method, secret).sign(&bytes);

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(header, signature)
        .body(Body::from(bytes))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_pix_webhook_confirms_pending_payment() {
    let h = harness();
    h.pending
        .put("tx1", PendingPayment::new(111, dec!(29.90), "basic_29"))
        .unwrap();

    let body = json!({"transactionId": "tx1", "status": "COMPLETED"});
    let (status, reply) = send(&h.app, signed(PaymentMethod::Pix, "/webhook/pix", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, json!({"status": "ok"}));
    assert_eq!(h.notifier.confirmed(), vec![(111, "basic_29".to_string())]);
    assert!(h.pending.is_empty().unwrap());
}

#[tokio::test]
async fn test_repeated_pix_webhook_notifies_once() {
    let h = harness();
    h.pending
        .put("tx1", PendingPayment::new(111, dec!(29.90), "basic_29"))
        .unwrap();

    let body = json!({"transactionId": "tx1", "status": "COMPLETED"});
    for _ in 0..2 {
        let (status, _) = send(&h.app, signed(PaymentMethod::Pix, "/webhook/pix", &body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(h.notifier.confirmed().len(), 1);
}

#[tokio::test]
async fn test_unknown_crypto_payment_acknowledged() {
    let h = harness();

    let body = json!({"payment_id": "pay-unknown", "payment_status": "finished"});
    let (status, reply) =
        send(&h.app, signed(PaymentMethod::Crypto, "/webhook/crypto", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, json!({"status": "ok"}));
    assert!(h.notifier.confirmed().is_empty());
}

#[tokio::test]
async fn test_tampered_crypto_signature_rejected() {
    let h = harness();
    h.pending
        .put("pay1", PendingPayment::new(222, dec!(47.90), "premium_47"))
        .unwrap();

    let body = json!({"payment_id": "pay1", "payment_status": "finished"});
    let mut request = signed(PaymentMethod::Crypto, "/webhook/crypto", &body);
    let tampered = SignatureVerifier::new(PaymentMethod::Crypto, "wrong-secret")
        .sign(&serde_json::to_vec(&body).unwrap());
    request
        .headers_mut()
        .insert(CRYPTO_SIGNATURE_HEADER, tampered.parse().unwrap());

    let (status, reply) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply, json!({"error": "Invalid signature"}));
    assert!(h.notifier.confirmed().is_empty());
    assert_eq!(h.pending.len().unwrap(), 1);
}

#[tokio::test]
async fn test_missing_signature_rejected() {
    let h = harness();

    let request = Request::builder()
        .method("POST")
        .uri("/webhook/pix")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"transactionId":"tx1","status":"COMPLETED"}"#))
        .unwrap();
    let (status, _) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unconfigured_secret_rejects_callbacks() {
    let h = harness_with(WebhookSecrets {
        pix: Some(PIX_SECRET.into()),
        crypto: None,
    });

    let body = json!({"payment_id": "pay1", "payment_status": "finished"});
    let (status, _) = send(&h.app, signed(PaymentMethod::Crypto, "/webhook/crypto", &body)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_final_status_leaves_entry() {
    let h = harness();
    h.pending
        .put("pay1", PendingPayment::new(222, dec!(47.90), "premium_47"))
        .unwrap();

    let body = json!({"payment_id": "pay1", "payment_status": "waiting"});
    let (status, _) = send(&h.app, signed(PaymentMethod::Crypto, "/webhook/crypto", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(h.notifier.confirmed().is_empty());
    assert_eq!(h.pending.len().unwrap(), 1);
}

#[tokio::test]
async fn test_numeric_crypto_id_and_legacy_path() {
    let h = harness();
    h.pending
        .put("5077125051", PendingPayment::new(333, dec!(129.90), "premium_129"))
        .unwrap();

    let body = json!({"payment_id": 5_077_125_051_u64, "payment_status": "confirmed"});
    let (status, _) = send(
        &h.app,
        signed(PaymentMethod::Crypto, "/api/webhook/crypto", &body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.notifier.confirmed(), vec![(333, "premium_129".to_string())]);
}

#[tokio::test]
async fn test_signed_garbage_is_internal_error() {
    let h = harness();

    let body = json!({"unexpected": true});
    let (status, reply) = send(&h.app, signed(PaymentMethod::Pix, "/webhook/pix", &body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply, json!({"error": "Internal server error"}));
}

#[tokio::test]
async fn test_health_reports_configuration() {
    let h = harness();
    h.pending
        .put("tx1", PendingPayment::new(111, dec!(29.90), "basic_29"))
        .unwrap();

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, reply) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["status"], "healthy");
    assert_eq!(reply["pix_enabled"], false);
    assert_eq!(reply["crypto_enabled"], false);
    assert_eq!(reply["pending"], 1);
}

#[tokio::test]
async fn test_sweeper_removes_expired_entries() {
    let pending = Arc::new(MemoryPendingStore::new(Duration::from_millis(10)));
    pending
        .put("old", PendingPayment::new(1, dec!(19.90), "basic_19"))
        .unwrap();

    let sweeper = spawn_sweeper(pending.clone(), Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(150)).await;
    sweeper.abort();

    assert!(pending.is_empty().unwrap());
}
