//! Inline Keyboards and Callback Data

use paybot_payments::Plan;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Every callback the bot's buttons can send
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    ShowPlans,
    SelectPlan(&'static Plan),
    PayPix,
    PayCard,
    PayBitcoin,
    CheckPix,
    CheckBitcoin,
    CardPaymentDone,
}

impl CallbackAction {
    /// Parse callback data sent by Telegram
    pub fn parse(data: &str) -> Option<Self> {
        let action = match data {
            "show_plans" => Self::ShowPlans,
            "pay_pix" => Self::PayPix,
            "pay_card" => Self::PayCard,
            "pay_bitcoin" => Self::PayBitcoin,
            "check_pix" => Self::CheckPix,
            "check_btc" => Self::CheckBitcoin,
            "card_payment_done" => Self::CardPaymentDone,
            other => Self::SelectPlan(Plan::find(other.strip_prefix("plan_")?)?),
        };
        Some(action)
    }

    /// Callback data for a button
    pub fn data(self) -> String {
        match self {
            Self::ShowPlans => "show_plans".into(),
            Self::SelectPlan(plan) => format!("plan_{}", plan.id),
            Self::PayPix => "pay_pix".into(),
            Self::PayCard => "pay_card".into(),
            Self::PayBitcoin => "pay_bitcoin".into(),
            Self::CheckPix => "check_pix".into(),
            Self::CheckBitcoin => "check_btc".into(),
            Self::CardPaymentDone => "card_payment_done".into(),
        }
    }

    fn button(self, text: impl Into<String>) -> InlineKeyboardButton {
        InlineKeyboardButton::callback(text, self.data())
    }
}

const PLAN_ICONS: [&str; 4] = ["✨", "💫", "⭐", "🌟"];

pub fn access_button() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[CallbackAction::ShowPlans.button("Access VIP group")]])
}

pub fn plans() -> InlineKeyboardMarkup {
    let rows = Plan::all().zip(PLAN_ICONS.iter().cycle()).map(|(plan, icon)| {
        [CallbackAction::SelectPlan(plan).button(format!(
            "{icon} {} - {}",
            plan.price_label(),
            plan.title
        ))]
    });
    InlineKeyboardMarkup::new(rows)
}

pub fn payment_methods() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        [CallbackAction::PayPix.button("📱 Pay with PIX")],
        [CallbackAction::PayCard.button("💳 Pay with card")],
        [CallbackAction::PayBitcoin.button("₿ Pay with Bitcoin")],
    ])
}

pub fn pix_check() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[CallbackAction::CheckPix.button("✅ I already paid")]])
}

pub fn bitcoin_check() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[CallbackAction::CheckBitcoin.button("✅ I already paid")]])
}

pub fn card_done() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[
        CallbackAction::CardPaymentDone.button("✅ I have completed the payment")
    ]])
}

/// Checkout link plus the "done" button; `None` if the plan has no valid link
pub fn card_payment(plan: &Plan) -> Option<InlineKeyboardMarkup> {
    let url = reqwest::Url::parse(&plan.checkout_url()?).ok()?;

    Some(InlineKeyboardMarkup::new([
        [InlineKeyboardButton::url("💳 Pay now", url)],
        [CallbackAction::CardPaymentDone.button("✅ I have completed the payment")],
    ]))
}
