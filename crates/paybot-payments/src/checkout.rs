//! Hosted Card Checkout
//!
//! Card payments never touch this service: each plan has a fixed link to
//! the card processor's hosted checkout page, and the buyer is redirected
//! there from the chat.

use crate::plan::Plan;

const CHECKOUT_BASE: &str = "https://global.mundpay.com";

/// Hosted checkout URL for a plan id
pub fn checkout_url(plan_id: &str) -> Option<String> {
    let slug = match plan_id.trim_start_matches("plan_") {
        "basic_19" => "kydvf6yudb",
        "basic_29" => "473a1xlo2i",
        "premium_47" => "tkr5discz5",
        "premium_129" => "mn2n5x97oc",
        _ => return None,
    };

    Some(format!("{CHECKOUT_BASE}/{slug}"))
}

impl Plan {
    /// Hosted card checkout link for this plan
    pub fn checkout_url(&self) -> Option<String> {
        checkout_url(self.id)
    }
}
