//! Plan Catalog
//!
//! Static subscription tiers. Plan ids travel through callback data and
//! pending payments, so they must never change.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// A subscription tier
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Stable identifier (e.g. `basic_29`)
    pub id: &'static str,

    /// Button / display title
    pub title: &'static str,

    /// Price in BRL
    pub price: Decimal,

    /// Access period description, also sent as the charge description
    pub description: &'static str,
}

/// All plans, cheapest first
pub static PLANS: [Plan; 4] = [
    Plan {
        id: "basic_19",
        title: "VIP Group 1 Week",
        price: dec!(19.90),
        description: "Weekly access",
    },
    Plan {
        id: "basic_29",
        title: "VIP Group 3 Months",
        price: dec!(29.90),
        description: "3 months access",
    },
    Plan {
        id: "premium_47",
        title: "VIP Group 1 Year",
        price: dec!(47.90),
        description: "1 year access",
    },
    Plan {
        id: "premium_129",
        title: "VIP + Video Call",
        price: dec!(129.90),
        description: "Lifetime access",
    },
];

impl Plan {
    /// Find a plan by id
    pub fn find(id: &str) -> Option<&'static Self> {
        PLANS.iter().find(|p| p.id == id)
    }

    /// Iterate all plans in display order
    pub fn all() -> impl Iterator<Item = &'static Self> {
        PLANS.iter()
    }

    /// Price formatted for chat display
    pub fn price_label(&self) -> String {
        format_brl(self.price)
    }
}

/// Format a BRL amount the Brazilian way (`R$ 29,90`)
pub fn format_brl(amount: Decimal) -> String {
    format!("R$ {:.2}", amount.round_dp(2)).replace('.', ",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_plan_ids_unique() {
        let ids: HashSet<_> = Plan::all().map(|p| p.id).collect();
        assert_eq!(ids.len(), PLANS.len());
    }

    #[test]
    fn test_find_plan() {
        let plan = Plan::find("basic_29").unwrap();
        assert_eq!(plan.price, dec!(29.90));
        assert!(Plan::find("gold_999").is_none());
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(dec!(19.9)), "R$ 19,90");
        assert_eq!(format_brl(dec!(7)), "R$ 7,00");
    }

    #[test]
    fn test_price_label() {
        assert_eq!(Plan::find("premium_129").unwrap().price_label(), "R$ 129,90");
    }
}
