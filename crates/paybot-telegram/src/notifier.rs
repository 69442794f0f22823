//! Telegram implementation of the payment core's [`ChatNotifier`].

use async_trait::async_trait;
use paybot_payments::{ChatNotifier, NotifyOutcome, PaymentMethod, QrArtifact, format_brl};
use rust_decimal::Decimal;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, ParseMode};
use teloxide::utils::html;

use crate::keyboards;

const CONFIRMED_TEXT: &str = "✅ Payment confirmed!\n\nYour access will be released shortly.";

/// Sends payment messages through the Bot API
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn outcome(result: Result<(), teloxide::RequestError>, chat_id: i64, what: &str) -> NotifyOutcome {
    match result {
        Ok(()) => NotifyOutcome::Delivered,
        Err(e) => {
            tracing::error!(chat_id, error = %e, "Failed to send {what}");
            NotifyOutcome::Failed(e.to_string())
        }
    }
}

#[async_trait]
impl ChatNotifier for TelegramNotifier {
    async fn notify_payment_confirmed(
        &self,
        chat_id: i64,
        plan_id: &str,
        method: PaymentMethod,
    ) -> NotifyOutcome {
        tracing::debug!(chat_id, plan_id, %method, "Sending payment confirmation");

        let result = self
            .bot
            .send_message(ChatId(chat_id), CONFIRMED_TEXT)
            .await
            .map(|_| ());
        outcome(result, chat_id, "payment confirmation")
    }

    async fn present_payment_artifact(
        &self,
        chat_id: i64,
        artifact: &QrArtifact,
        copy_code: &str,
        amount: Decimal,
    ) -> NotifyOutcome {
        let chat = ChatId(chat_id);

        let result = async {
            self.bot
                .send_photo(chat, InputFile::file(artifact.path()))
                .caption("QR code for payment")
                .await?;

            self.bot
                .send_message(
                    chat,
                    format!(
                        "✅ PIX code generated!\n\n💰 Amount: {}\n\nCopy the PIX key below:",
                        format_brl(amount)
                    ),
                )
                .await?;

            self.bot
                .send_message(chat, html::code_inline(copy_code))
                .parse_mode(ParseMode::Html)
                .await?;

            self.bot
                .send_message(chat, "📌 After paying, tap the button below:")
                .reply_markup(keyboards::pix_check())
                .await?;

            Ok::<(), teloxide::RequestError>(())
        }
        .await;

        outcome(result, chat_id, "PIX payment details")
    }

    async fn present_crypto_address(
        &self,
        chat_id: i64,
        address: &str,
        amount: Decimal,
        currency: &str,
    ) -> NotifyOutcome {
        let currency = currency.to_uppercase();
        let text = format!(
            "💰 Amount in {currency}: {amount} {currency}\n\nPay-to address:\n{}",
            html::code_inline(address)
        );

        let result = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::bitcoin_check())
            .await
            .map(|_| ());
        outcome(result, chat_id, "crypto payment details")
    }
}
