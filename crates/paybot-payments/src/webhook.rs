//! Provider Webhook Handling
//!
//! Verifies provider callbacks, correlates them with pending payments and
//! notifies the buyer once per payment.

use serde::Deserialize;
use std::sync::Arc;

use crate::error::{PaymentError, Result};
use crate::gateway::{PaymentMethod, string_or_number};
use crate::notifier::{ChatNotifier, NotifyOutcome};
use crate::pending::PendingStore;
use crate::signature::SignatureVerifier;

/// Webhook secrets per provider
#[derive(Clone, Default)]
pub struct WebhookSecrets {
    pub pix: Option<String>,
    pub crypto: Option<String>,
}

impl WebhookSecrets {
    /// Read from environment variables.
    ///
    /// The PIX provider signs with the API token unless a dedicated secret
    /// is configured.
    pub fn from_env() -> Self {
        let pix = std::env::var("PUSHINPAY_WEBHOOK_SECRET")
            .or_else(|_| std::env::var("PUSHINPAY_TOKEN"))
            .ok();
        let crypto = std::env::var("NOWPAYMENTS_IPN_SECRET").ok();

        Self { pix, crypto }
    }
}

#[derive(Debug, Deserialize)]
struct PixNotification {
    #[serde(rename = "transactionId", alias = "id", deserialize_with = "string_or_number")]
    transaction_id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct CryptoNotification {
    #[serde(deserialize_with = "string_or_number")]
    payment_id: String,
    payment_status: String,
}

/// Verified provider notification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookEvent {
    pub method: PaymentMethod,
    pub payment_id: String,
    pub status: String,
}

/// What handling a verified notification did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Pending entry found and removed, buyer notified
    Confirmed {
        payment_id: String,
        chat_id: i64,
        plan_id: String,
        notification: NotifyOutcome,
    },

    /// Completed, but nothing pending under this id
    Unmatched { payment_id: String },

    /// Status is not a completion status
    Ignored { payment_id: String, status: String },
}

/// Webhook handler
pub struct WebhookHandler<S: PendingStore> {
    pending: Arc<S>,
    notifier: Arc<dyn ChatNotifier>,
    pix: Option<SignatureVerifier>,
    crypto: Option<SignatureVerifier>,
}

impl<S: PendingStore> WebhookHandler<S> {
    pub fn new(pending: Arc<S>, notifier: Arc<dyn ChatNotifier>, secrets: WebhookSecrets) -> Self {
        Self {
            pending,
            notifier,
            pix: secrets
                .pix
                .map(|s| SignatureVerifier::new(PaymentMethod::Pix, s)),
            crypto: secrets
                .crypto
                .map(|s| SignatureVerifier::new(PaymentMethod::Crypto, s)),
        }
    }

    /// Pending payment store shared with the chat layer
    pub const fn pending(&self) -> &Arc<S> {
        &self.pending
    }

    /// Verifier for a provider, if its secret is configured
    pub const fn verifier(&self, method: PaymentMethod) -> Option<&SignatureVerifier> {
        match method {
            PaymentMethod::Pix => self.pix.as_ref(),
            PaymentMethod::Crypto => self.crypto.as_ref(),
        }
    }

    /// Verify the signature over the raw body, then parse the event
    pub fn parse_event(
        &self,
        method: PaymentMethod,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookEvent> {
        let verifier = self.verifier(method).ok_or_else(|| {
            PaymentError::WebhookSignature(format!("no {method} webhook secret configured"))
        })?;

        if !verifier.verify(body, signature) {
            return Err(PaymentError::WebhookSignature(match signature {
                Some(_) => "signature mismatch".into(),
                None => format!("missing {} header", verifier.header_name()),
            }));
        }

        let (payment_id, status) = match method {
            PaymentMethod::Pix => {
                let n: PixNotification = serde_json::from_slice(body)
                    .map_err(|e| PaymentError::WebhookParse(e.to_string()))?;
                (n.transaction_id, n.status)
            }
            PaymentMethod::Crypto => {
                let n: CryptoNotification = serde_json::from_slice(body)
                    .map_err(|e| PaymentError::WebhookParse(e.to_string()))?;
                (n.payment_id, n.payment_status)
            }
        };

        Ok(WebhookEvent {
            method,
            payment_id,
            status,
        })
    }

    /// Process a verified event
    pub async fn handle(&self, event: WebhookEvent) -> Result<WebhookOutcome> {
        tracing::info!(
            method = %event.method,
            payment_id = %event.payment_id,
            status = %event.status,
            "Processing payment webhook"
        );

        if !event.method.is_completed(&event.status) {
            tracing::debug!(payment_id = %event.payment_id, status = %event.status, "Ignoring non-final status");
            return Ok(WebhookOutcome::Ignored {
                payment_id: event.payment_id,
                status: event.status,
            });
        }

        self.confirm(event.method, &event.payment_id).await
    }

    /// Settle a payment known to be complete.
    ///
    /// Used by webhooks and by manual status checks; whichever takes the
    /// pending entry first notifies the buyer, later calls are no-ops.
    pub async fn confirm(&self, method: PaymentMethod, payment_id: &str) -> Result<WebhookOutcome> {
        let Some(payment) = self.pending.take(payment_id)? else {
            tracing::debug!(%method, payment_id, "No pending payment for completed id");
            return Ok(WebhookOutcome::Unmatched {
                payment_id: payment_id.to_string(),
            });
        };

        let notification = self
            .notifier
            .notify_payment_confirmed(payment.chat_id, &payment.plan_id, method)
            .await;

        tracing::info!(
            chat_id = payment.chat_id,
            %method,
            plan = %payment.plan_id,
            amount = %payment.amount,
            "Payment confirmed"
        );

        if let NotifyOutcome::Failed(reason) = &notification {
            tracing::warn!(chat_id = payment.chat_id, payment_id, %reason, "Confirmation message not delivered");
        }

        Ok(WebhookOutcome::Confirmed {
            payment_id: payment_id.to_string(),
            chat_id: payment.chat_id,
            plan_id: payment.plan_id,
            notification,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::QrArtifact;
    use crate::pending::{MemoryPendingStore, PendingPayment};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        confirmed: Mutex<Vec<(i64, String)>>,
    }

    impl RecordingNotifier {
        fn count(&self) -> usize {
            self.confirmed.lock().unwrap().len()
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

    fn setup() -> (
        WebhookHandler<MemoryPendingStore>,
        Arc<MemoryPendingStore>,
        Arc<RecordingNotifier>,
    ) {
        let store = Arc::new(MemoryPendingStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let handler = WebhookHandler::new(
            Arc::clone(&store),
            notifier.clone(),
            WebhookSecrets {
                pix: Some("pix-secret".into()),
                crypto: Some("ipn-secret".into()),
            },
        );
        (handler, store, notifier)
    }

    async fn deliver(
        handler: &WebhookHandler<MemoryPendingStore>,
        method: PaymentMethod,
        body: &str,
    ) -> Result<WebhookOutcome> {
        let signature = handler.verifier(method).unwrap().sign(body.as_bytes());
        let event = handler.parse_event(method, body.as_bytes(), Some(&signature))?;
        handler.handle(event).await
    }

    #[tokio::test]
    async fn test_pix_confirmation_then_duplicate() {
        let (handler, store, notifier) = setup();
        store
            .put("tx1", PendingPayment::new(111, dec!(29.90), "basic_29"))
            .unwrap();

        let body = r#"{"transactionId":"tx1","status":"COMPLETED"}"#;

        let outcome = deliver(&handler, PaymentMethod::Pix, body).await.unwrap();
        assert!(matches!(
            outcome,
            WebhookOutcome::Confirmed { chat_id: 111, ref plan_id, .. } if plan_id == "basic_29"
        ));
        assert_eq!(notifier.count(), 1);
        assert!(store.is_empty().unwrap());

        let outcome = deliver(&handler, PaymentMethod::Pix, body).await.unwrap();
        assert!(matches!(outcome, WebhookOutcome::Unmatched { .. }));
        assert_eq!(notifier.count(), 1);
    }

    #[tokio::test]
    async fn test_tampered_crypto_signature_rejected() {
        let (handler, store, notifier) = setup();
        store
            .put("pay1", PendingPayment::new(222, dec!(47.90), "premium_47"))
            .unwrap();

        let body = br#"{"payment_id":"pay1","payment_status":"finished"}"#;
        let mut signature = handler.verifier(PaymentMethod::Crypto).unwrap().sign(body);
        signature.replace_range(0..2, if signature.starts_with("00") { "ff" } else { "00" });

        let err = handler
            .parse_event(PaymentMethod::Crypto, body, Some(&signature))
            .unwrap_err();
        assert!(matches!(err, PaymentError::WebhookSignature(_)));
        assert_eq!(notifier.count(), 0);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_non_final_status_leaves_entry() {
        let (handler, store, notifier) = setup();
        store
            .put("pay1", PendingPayment::new(222, dec!(47.90), "premium_47"))
            .unwrap();

        let body = r#"{"payment_id":"pay1","payment_status":"confirming"}"#;
        let outcome = deliver(&handler, PaymentMethod::Crypto, body).await.unwrap();

        assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));
        assert_eq!(notifier.count(), 0);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_crypto_numeric_id_confirms() {
        let (handler, store, notifier) = setup();
        store
            .put("5077125051", PendingPayment::new(333, dec!(19.90), "basic_19"))
            .unwrap();

        let body = r#"{"payment_id":5077125051,"payment_status":"confirmed"}"#;
        let outcome = deliver(&handler, PaymentMethod::Crypto, body).await.unwrap();

        assert!(matches!(outcome, WebhookOutcome::Confirmed { chat_id: 333, .. }));
        assert_eq!(notifier.count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_id_is_benign() {
        let (handler, _store, notifier) = setup();
        let body = r#"{"transactionId":"nope","status":"COMPLETED"}"#;

        let outcome = deliver(&handler, PaymentMethod::Pix, body).await.unwrap();
        assert!(matches!(outcome, WebhookOutcome::Unmatched { .. }));
        assert_eq!(notifier.count(), 0);
    }

    #[test]
    fn test_missing_secret_fails_closed() {
        let handler = WebhookHandler::new(
            Arc::new(MemoryPendingStore::default()),
            Arc::new(RecordingNotifier::default()),
            WebhookSecrets::default(),
        );

        let err = handler
            .parse_event(PaymentMethod::Pix, b"{}", Some("00"))
            .unwrap_err();
        assert!(matches!(err, PaymentError::WebhookSignature(_)));
    }

    #[test]
    fn test_valid_signature_bad_json_is_parse_error() {
        let (handler, _store, _notifier) = setup();
        let body = b"not json";
        let signature = handler.verifier(PaymentMethod::Pix).unwrap().sign(body);

        let err = handler
            .parse_event(PaymentMethod::Pix, body, Some(&signature))
            .unwrap_err();
        assert!(matches!(err, PaymentError::WebhookParse(_)));
    }
}
