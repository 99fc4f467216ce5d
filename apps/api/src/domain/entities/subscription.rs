use chrono::{DateTime, Utc};
use ledgerline_types::SubscriptionStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A billing relationship. Legacy rows carry `user_id`; current rows carry `household_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub household_id: Option<Uuid>,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub trial_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// True for a trialing row whose trial ended strictly before `now`.
    pub fn is_expired_trial(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Trialing
            && self.trial_end_date.is_some_and(|end| end < now)
    }

    /// Picks the most relevant row: live before cancelled, then newest first.
    /// Rows outside the candidate statuses are ignored.
    pub fn most_relevant(rows: Vec<Subscription>) -> Option<Subscription> {
        rows.into_iter()
            .filter(|s| s.status.is_effective_candidate())
            .min_by(|a, b| {
                a.status
                    .priority()
                    .cmp(&b.status.priority())
                    .then_with(|| b.created_at.cmp(&a.created_at))
            })
    }
}

/// Subscription fields maintained on the user row by the write side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenormalizedSubscription {
    pub effective_plan_id: Option<Uuid>,
    pub effective_subscription_status: Option<SubscriptionStatus>,
    pub effective_subscription_id: Option<Uuid>,
    pub subscription_updated_at: Option<DateTime<Utc>>,
}
