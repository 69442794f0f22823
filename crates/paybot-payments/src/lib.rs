//! # paybot-payments
//!
//! Payment processing for the paybot subscription bot.
//!
//! ## Payment Methods
//!
//! ### 1. PIX (instant transfer)
//!
//! **Flow:** charge created at the provider → buyer scans the QR code or
//! pastes the code → provider calls `/webhook/pix`
//!
//! ### 2. Crypto
//!
//! **Flow:** charge created at the provider → buyer sends coins to the
//! pay-to address → provider calls `/webhook/crypto`
//!
//! ### 3. Card (hosted checkout)
//!
//! The buyer follows a fixed per-plan checkout link; nothing is processed
//! here.
//!
//! ```text
//! ┌──────────┐ create_payment ┌────────────────┐        ┌──────────────┐
//! │   chat   │───────────────▶│ PaymentGateway │───────▶│   provider   │
//! │  layer   │── put ───┐     └────────────────┘        └──────┬───────┘
//! └──────────┘          ▼                                      │ webhook
//!      ▲        ┌──────────────┐  take  ┌────────────────┐     │
//!      └────────│ PendingStore │◀───────│ WebhookHandler │◀────┘
//!     notify    └──────────────┘        └────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use paybot_payments::{PaymentGateway, PaymentMethod, PaymentRequest, PaymentResult};
//!
//! let gateway = PaymentGateway::from_env();
//! let request = PaymentRequest::new(PaymentMethod::Pix, plan.price)
//!     .with_description(plan.description);
//!
//! match gateway.create_payment(request).await {
//!     PaymentResult::Success(charge) => { /* register + present */ }
//!     PaymentResult::Failure(failure) => { /* apologise */ }
//! }
//! ```

mod artifact;
mod checkout;
mod error;
mod gateway;
mod notifier;
mod pending;
mod plan;
mod signature;
mod webhook;

pub use artifact::QrArtifact;
pub use checkout::checkout_url;
pub use error::{FailureKind, PaymentError, PaymentFailure, Result};
pub use gateway::{
    Charge, CryptoClient, CryptoConfig, PaymentGateway, PaymentMethod, PaymentPayload,
    PaymentProvider, PaymentRequest, PaymentResult, PaymentStatus, PixClient, PixConfig,
    Transaction,
};
pub use notifier::{ChatNotifier, NotifyOutcome};
pub use pending::{MemoryPendingStore, PendingPayment, PendingStore};
pub use plan::{Plan, format_brl};
pub use signature::{CRYPTO_SIGNATURE_HEADER, PIX_SIGNATURE_HEADER, SignatureVerifier};
pub use webhook::{WebhookEvent, WebhookHandler, WebhookOutcome, WebhookSecrets};
