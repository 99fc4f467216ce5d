use ledgerline_types::FeatureBag;
use serde::{Deserialize, Serialize};

use super::{plan::Plan, subscription::Subscription};

/// The answer to "what plan and limits apply to this user right now?".
///
/// Either all three fields come from one resolution, or this is the
/// no-subscription default. The single exception is a subscription whose
/// plan row is missing, which keeps the subscription but carries default limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionData {
    pub subscription: Option<Subscription>,
    pub plan: Option<Plan>,
    pub limits: FeatureBag,
}

impl SubscriptionData {
    pub fn none() -> Self {
        Self {
            subscription: None,
            plan: None,
            limits: FeatureBag::default(),
        }
    }

    pub fn resolved(subscription: Subscription, plan: Plan) -> Self {
        let limits = plan.features;
        Self {
            subscription: Some(subscription),
            plan: Some(plan),
            limits,
        }
    }

    pub fn missing_plan(subscription: Subscription) -> Self {
        Self {
            subscription: Some(subscription),
            plan: None,
            limits: FeatureBag::default(),
        }
    }

    pub fn has_subscription(&self) -> bool {
        self.subscription.is_some()
    }
}

impl Default for SubscriptionData {
    fn default() -> Self {
        Self::none()
    }
}
