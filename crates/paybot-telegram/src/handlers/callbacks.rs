//! Callback query handlers
//!
//! Every button press lands here. The query is always answered, with an
//! alert when handling failed, so the buyer's client stops spinning.

use std::sync::Arc;

use paybot_payments::{
    Charge, PaymentMethod, PaymentPayload, PaymentRequest, PaymentResult, PendingPayment,
    PendingStore, Plan, WebhookOutcome,
};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, MessageId};

use crate::error::{BotError, Result};
use crate::keyboards::{self, CallbackAction};
use crate::BotContext;

const PLANS_TEXT: &str = "Choose your access plan:";
const METHODS_TEXT: &str = "Choose how you want to pay:";
const GENERATING_PIX_TEXT: &str = "🔄 Generating PIX code, please wait...";
const PAYMENT_ERROR_TEXT: &str = "❌ Error processing payment. Please try again later.";
const CARD_TEXT: &str =
    "Pay by card with 100% security through MundPay ✅, just tap the button below 👇";
const CARD_DONE_TEXT: &str =
    "After paying you will receive an email. Check your inbox and spam folder.";
const UNDER_REVIEW_TEXT: &str = "Payment under review. Please wait for confirmation.";
const CONFIRMED_TEXT: &str = "✅ Your payment has been confirmed.";

/// Entry point for callback query updates
pub async fn on_callback(bot: Bot, q: CallbackQuery, ctx: Arc<BotContext>) -> Result<()> {
    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let chat = message.chat().id;
    let message_id = message.id();

    let key = format!("{}_{}", chat.0, q.id);
    if !ctx.recent_callbacks.first_seen(&key) {
        tracing::debug!(%key, "Skipping duplicate callback");
        return Ok(());
    }

    let data = q.data.as_deref().unwrap_or_default();
    tracing::debug!(chat_id = chat.0, data, "Callback received");

    match dispatch(&bot, &ctx, chat, message_id, data).await {
        Ok(()) => {
            bot.answer_callback_query(q.id.clone()).await?;
        }
        Err(e) => {
            tracing::error!(chat_id = chat.0, data, error = %e, "Error handling callback");
            bot.answer_callback_query(q.id.clone())
                .text(e.user_message())
                .show_alert(true)
                .await?;
        }
    }

    Ok(())
}

async fn dispatch(
    bot: &Bot,
    ctx: &BotContext,
    chat: ChatId,
    message_id: MessageId,
    data: &str,
) -> Result<()> {
    let action =
        CallbackAction::parse(data).ok_or_else(|| BotError::UnknownCallback(data.to_string()))?;

    match action {
        CallbackAction::ShowPlans => {
            replace_text(bot, chat, message_id, PLANS_TEXT, Some(keyboards::plans())).await
        }
        CallbackAction::SelectPlan(plan) => {
            ctx.sessions.select_plan(chat.0, plan);
            replace_text(
                bot,
                chat,
                message_id,
                METHODS_TEXT,
                Some(keyboards::payment_methods()),
            )
            .await
        }
        CallbackAction::PayPix => {
            replace_text(bot, chat, message_id, GENERATING_PIX_TEXT, None).await?;
            start_payment(bot, ctx, chat, message_id, PaymentMethod::Pix).await
        }
        CallbackAction::PayBitcoin => {
            start_payment(bot, ctx, chat, message_id, PaymentMethod::Crypto).await
        }
        CallbackAction::PayCard => {
            let plan = selected_plan(ctx, chat)?;
            let keyboard = keyboards::card_payment(plan).ok_or_else(|| {
                BotError::Config(format!("no checkout link for plan {}", plan.id))
            })?;
            replace_text(bot, chat, message_id, CARD_TEXT, Some(keyboard)).await
        }
        CallbackAction::CardPaymentDone => {
            replace_text(
                bot,
                chat,
                message_id,
                CARD_DONE_TEXT,
                Some(keyboards::card_done()),
            )
            .await
        }
        CallbackAction::CheckPix => {
            check_payment(
                bot,
                ctx,
                chat,
                message_id,
                PaymentMethod::Pix,
                keyboards::pix_check(),
            )
            .await
        }
        CallbackAction::CheckBitcoin => {
            check_payment(
                bot,
                ctx,
                chat,
                message_id,
                PaymentMethod::Crypto,
                keyboards::bitcoin_check(),
            )
            .await
        }
    }
}

fn selected_plan(ctx: &BotContext, chat: ChatId) -> Result<&'static Plan> {
    ctx.sessions
        .selected_plan(chat.0)
        .ok_or(BotError::NoPlanSelected(chat.0))
}

/// Create a charge for the chat's plan and show the buyer how to pay
async fn start_payment(
    bot: &Bot,
    ctx: &BotContext,
    chat: ChatId,
    message_id: MessageId,
    method: PaymentMethod,
) -> Result<()> {
    let plan = selected_plan(ctx, chat)?;
    let request = PaymentRequest::new(method, plan.price).with_description(plan.description);

    let charge = match ctx.gateway.create_payment(request).await {
        PaymentResult::Success(charge) => charge,
        PaymentResult::Failure(failure) => {
            tracing::warn!(chat_id = chat.0, %method, %failure, "Payment could not be created");
            let text = format!("❌ {}", failure.user_message());
            return replace_text(bot, chat, message_id, &text, None).await;
        }
    };

    register_pending(ctx, chat.0, method, plan, &charge)?;

    let outcome = match &charge.payload {
        PaymentPayload::Pix {
            qr_code,
            copy_paste,
        } => {
            ctx.notifier
                .present_payment_artifact(chat.0, qr_code, copy_paste, plan.price)
                .await
        }
        PaymentPayload::Crypto {
            pay_address,
            pay_amount,
            pay_currency,
        } => {
            ctx.notifier
                .present_crypto_address(chat.0, pay_address, *pay_amount, pay_currency)
                .await
        }
    };
    // Dropping the charge here removes the QR image from disk
    drop(charge);

    if !outcome.is_delivered() {
        replace_text(bot, chat, message_id, PAYMENT_ERROR_TEXT, None).await?;
    }
    Ok(())
}

/// Make the charge matchable by webhooks and by manual checks
pub(crate) fn register_pending(
    ctx: &BotContext,
    chat_id: i64,
    method: PaymentMethod,
    plan: &Plan,
    charge: &Charge,
) -> Result<()> {
    ctx.webhooks.pending().put(
        &charge.transaction_id,
        PendingPayment::new(chat_id, plan.price, plan.id),
    )?;
    ctx.sessions
        .record_payment(chat_id, method, &charge.transaction_id);
    Ok(())
}

/// What a manual "I already paid" check found
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CheckResult {
    /// Provider reports the payment complete; settled through the webhook path
    Confirmed,
    /// Not paid yet, unknown, or the provider could not be reached
    UnderReview,
}

/// Ask the provider whether the chat's last charge for `method` was paid,
/// settling it the same way a webhook would
pub(crate) async fn settle_if_paid(
    ctx: &BotContext,
    chat_id: i64,
    method: PaymentMethod,
) -> Result<CheckResult> {
    let Some(payment_id) = ctx.sessions.last_payment(chat_id, method) else {
        return Ok(CheckResult::UnderReview);
    };

    match ctx.gateway.check_status(method, &payment_id).await {
        Ok(status) if status.paid => {
            let outcome = ctx.webhooks.confirm(method, &payment_id).await?;
            if let WebhookOutcome::Unmatched { .. } = outcome {
                tracing::debug!(chat_id, %payment_id, "Payment already settled");
            }
            Ok(CheckResult::Confirmed)
        }
        Ok(status) => {
            tracing::debug!(chat_id, %payment_id, status = %status.status, "Payment not settled yet");
            Ok(CheckResult::UnderReview)
        }
        Err(failure) => {
            tracing::warn!(chat_id, %payment_id, %failure, "Status check failed");
            Ok(CheckResult::UnderReview)
        }
    }
}

async fn check_payment(
    bot: &Bot,
    ctx: &BotContext,
    chat: ChatId,
    message_id: MessageId,
    method: PaymentMethod,
    keyboard: InlineKeyboardMarkup,
) -> Result<()> {
    match settle_if_paid(ctx, chat.0, method).await? {
        CheckResult::Confirmed => replace_text(bot, chat, message_id, CONFIRMED_TEXT, None).await,
        CheckResult::UnderReview => {
            replace_text(bot, chat, message_id, UNDER_REVIEW_TEXT, Some(keyboard)).await
        }
    }
}

/// Edit the pressed message, or send a new one when it cannot be edited
/// (photo messages have no text to edit)
async fn replace_text(
    bot: &Bot,
    chat: ChatId,
    message_id: MessageId,
    text: &str,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<()> {
    let mut edit = bot.edit_message_text(chat, message_id, text);
    if let Some(keyboard) = keyboard.clone() {
        edit = edit.reply_markup(keyboard);
    }

    if let Err(e) = edit.await {
        tracing::debug!(chat_id = chat.0, error = %e, "Cannot edit message, sending a new one");
        let mut send = bot.send_message(chat, text);
        if let Some(keyboard) = keyboard {
            send = send.reply_markup(keyboard);
        }
        send.await?;
    }
    Ok(())
}
