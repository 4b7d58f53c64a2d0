use barberflow_types::models::Plan;

/// Stripe price ids configured for the paid tiers.
#[derive(Debug, Clone)]
pub struct PriceMap {
    pub pro_price_id: String,
    pub business_price_id: String,
}

impl PriceMap {
    pub fn plan_for_price(&self, price_id: &str) -> Option<Plan> {
        if price_id == self.pro_price_id {
            Some(Plan::Pro)
        } else if price_id == self.business_price_id {
            Some(Plan::Business)
        } else {
            None
        }
    }

    /// Unknown prices are billed as `pro`.
    pub fn plan_or_default(&self, price_id: &str) -> Plan {
        self.plan_for_price(price_id).unwrap_or(Plan::Pro)
    }
}

impl Default for PriceMap {
    fn default() -> Self {
        Self {
            pro_price_id: "price_pro_test_id".into(),
            business_price_id: "price_business_test_id".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_configured_prices() {
        let prices = PriceMap::default();
        assert_eq!(prices.plan_for_price("price_pro_test_id"), Some(Plan::Pro));
        assert_eq!(prices.plan_for_price("price_business_test_id"), Some(Plan::Business));
        assert_eq!(prices.plan_for_price("price_other"), None);
        assert_eq!(prices.plan_or_default("price_other"), Plan::Pro);
    }
}
