use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Billing status of a subscription row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    Cancelled,
    PastDue,
    Unpaid,
    Incomplete,
    Paused,
}

impl SubscriptionStatus {
    /// Statuses a row may have to be considered as a user's effective subscription.
    pub const EFFECTIVE_CANDIDATES: [SubscriptionStatus; 3] = [
        SubscriptionStatus::Active,
        SubscriptionStatus::Trialing,
        SubscriptionStatus::Cancelled,
    ];

    /// Statuses that count as a live subscription to a plan.
    pub const LIVE: [SubscriptionStatus; 2] =
        [SubscriptionStatus::Active, SubscriptionStatus::Trialing];

    /// Lenient parse from stored text. Accepts the US spelling of `canceled`;
    /// anything unrecognised becomes `Incomplete`, which is never effective.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "active" => SubscriptionStatus::Active,
            "trialing" => SubscriptionStatus::Trialing,
            "cancelled" | "canceled" => SubscriptionStatus::Cancelled,
            "past_due" => SubscriptionStatus::PastDue,
            "unpaid" => SubscriptionStatus::Unpaid,
            "paused" => SubscriptionStatus::Paused,
            _ => SubscriptionStatus::Incomplete,
        }
    }

    /// Returns true if the subscription is in an active state (active or trialing).
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }

    pub fn is_effective_candidate(&self) -> bool {
        Self::EFFECTIVE_CANDIDATES.contains(self)
    }

    /// Ordering key when picking the effective row: lower wins.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Active | Self::Trialing => 0,
            Self::Cancelled => 1,
            _ => 2,
        }
    }
}
