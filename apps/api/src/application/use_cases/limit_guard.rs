//! Read-side checks over a resolved [`SubscriptionData`].
//!
//! Every check is a pure snapshot decision; callers re-evaluate on their own cadence.

use chrono::{DateTime, Utc};
use ledgerline_types::{FeatureKey, LimitCheck, SubscriptionStatus};

use crate::domain::entities::subscription_data::SubscriptionData;

/// Writes are allowed on an active subscription, or on a trial that has not ended.
pub fn can_write(data: &SubscriptionData, now: DateTime<Utc>) -> bool {
    let Some(subscription) = &data.subscription else {
        return false;
    };
    match subscription.status {
        SubscriptionStatus::Active => true,
        SubscriptionStatus::Trialing => subscription.trial_end_date.is_none_or(|end| end > now),
        _ => false,
    }
}

pub fn check_feature(data: &SubscriptionData, feature: FeatureKey) -> bool {
    data.limits.has(feature)
}

pub fn check_transaction_limit(data: &SubscriptionData, current_monthly_count: i64) -> LimitCheck {
    LimitCheck::evaluate(data.limits.max_transactions, current_monthly_count)
}

/// `current_account_count` must already include shared accounts.
pub fn check_account_limit(data: &SubscriptionData, current_account_count: i64) -> LimitCheck {
    LimitCheck::evaluate(data.limits.max_accounts, current_account_count)
}
