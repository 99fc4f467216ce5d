//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, TimeZone, Utc};
use ledgerline_types::SubscriptionStatus;
use serde_json::json;
use uuid::Uuid;

use crate::{
    application::helpers::feature_normalizer::normalize_features,
    domain::entities::{
        plan::{Plan, RawPlan},
        subscription::Subscription,
    },
};

/// Create a raw plan row, as the store would return it.
pub fn create_test_raw_plan(overrides: impl FnOnce(&mut RawPlan)) -> RawPlan {
    let mut plan = RawPlan {
        id: Uuid::new_v4(),
        name: "Basic".to_string(),
        price_monthly: 499,
        price_yearly: 4990,
        features: json!({
            "hasGoals": true,
            "hasCsvExport": true,
            "maxTransactions": 500,
            "maxAccounts": 5
        }),
        stripe_product_id: Some("prod_test123".to_string()),
        stripe_price_id_monthly: Some("price_monthly_test123".to_string()),
        stripe_price_id_yearly: Some("price_yearly_test123".to_string()),
        created_at: test_datetime(),
        updated_at: test_datetime(),
    };
    overrides(&mut plan);
    plan
}

/// Create a plan with its feature bag already normalized.
pub fn create_test_plan(overrides: impl FnOnce(&mut RawPlan)) -> Plan {
    let raw = create_test_raw_plan(overrides);
    let features = normalize_features(&raw.features, raw.id);
    Plan::from_raw(raw, features)
}

/// Create an active subscription on `plan_id`. Neither `user_id` nor
/// `household_id` is set; pick one in `overrides`.
pub fn create_test_subscription(
    plan_id: Uuid,
    overrides: impl FnOnce(&mut Subscription),
) -> Subscription {
    let mut subscription = Subscription {
        id: Uuid::new_v4(),
        user_id: None,
        household_id: None,
        plan_id,
        status: SubscriptionStatus::Active,
        trial_end_date: None,
        created_at: test_datetime(),
    };
    overrides(&mut subscription);
    subscription
}

/// Helper to create a consistent test datetime.
pub fn test_datetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}
