use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use ledgerline_types::SubscriptionStatus;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::{ports::clock::Clock, use_cases::plan_cache::PlanCache},
    domain::entities::{
        subscription::{DenormalizedSubscription, Subscription},
        subscription_data::SubscriptionData,
    },
};

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Subscription fields denormalized onto the user row, `None` if the user is unknown.
    async fn get_denormalized_subscription(
        &self,
        user_id: Uuid,
    ) -> AppResult<Option<DenormalizedSubscription>>;
    /// Ask the store to recompute the denormalized fields. Fire-and-forget.
    async fn request_denormalization_refresh(&self, user_id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait HouseholdRepo: Send + Sync {
    async fn get_active_household_id(&self, user_id: Uuid) -> AppResult<Option<Uuid>>;
    async fn get_default_household_id(&self, user_id: Uuid) -> AppResult<Option<Uuid>>;
    async fn get_household_owner(&self, household_id: Uuid) -> AppResult<Option<Uuid>>;
    async fn find_owned_household_ids(&self, owner_id: Uuid) -> AppResult<Vec<Uuid>>;
    async fn find_active_household_members(&self, household_id: Uuid) -> AppResult<Vec<Uuid>>;
}

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn find_subscriptions_by_household(
        &self,
        household_id: Uuid,
        statuses: &[SubscriptionStatus],
    ) -> AppResult<Vec<Subscription>>;
    async fn find_subscriptions_by_user(
        &self,
        user_id: Uuid,
        statuses: &[SubscriptionStatus],
    ) -> AppResult<Vec<Subscription>>;
    async fn find_subscriptions_by_plan(
        &self,
        plan_id: Uuid,
        statuses: &[SubscriptionStatus],
    ) -> AppResult<Vec<Subscription>>;
}

/// Where the effective subscription came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ResolutionSource {
    UserRow,
    Household,
    HouseholdOwner,
    LegacyUser,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolverSettings {
    /// Denormalized user-row fields younger than this are trusted as-is.
    pub denormalized_freshness: Duration,
    /// Denormalized fields older than this get a background refresh request.
    pub denormalized_refresh_after: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            denormalized_freshness: Duration::from_secs(5 * 60),
            denormalized_refresh_after: Duration::from_secs(60 * 60),
        }
    }
}

/// Produces the [`SubscriptionData`] for a user by walking the fallback chain:
/// user row, then household, household owner and legacy per-user rows.
///
/// Stateless and uncached. Every store failure is logged and treated as
/// "nothing found" for that step, so resolution always yields a value.
pub struct SubscriptionResolver {
    users: Arc<dyn UserRepo>,
    households: Arc<dyn HouseholdRepo>,
    subscriptions: Arc<dyn SubscriptionRepo>,
    plans: Arc<PlanCache>,
    clock: Arc<dyn Clock>,
    freshness: TimeDelta,
    refresh_after: TimeDelta,
}

impl SubscriptionResolver {
    pub fn new(
        users: Arc<dyn UserRepo>,
        households: Arc<dyn HouseholdRepo>,
        subscriptions: Arc<dyn SubscriptionRepo>,
        plans: Arc<PlanCache>,
        clock: Arc<dyn Clock>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            users,
            households,
            subscriptions,
            plans,
            clock,
            freshness: to_delta(settings.denormalized_freshness),
            refresh_after: to_delta(settings.denormalized_refresh_after),
        }
    }

    pub async fn resolve(&self, user_id: Uuid) -> SubscriptionData {
        let now = self.clock.now();

        if let Some(data) = self.resolve_from_user_row(user_id, now).await {
            debug!(user_id = %user_id, source = %ResolutionSource::UserRow, "Resolved subscription");
            return data;
        }

        let Some((subscription, source)) = self.find_effective_subscription(user_id).await else {
            debug!(user_id = %user_id, "No subscription found, using default features");
            return SubscriptionData::none();
        };

        if subscription.is_expired_trial(now) {
            debug!(
                user_id = %user_id,
                subscription_id = %subscription.id,
                trial_end_date = ?subscription.trial_end_date,
                "Trial expired, using default features"
            );
            return SubscriptionData::none();
        }

        debug!(
            user_id = %user_id,
            subscription_id = %subscription.id,
            source = %source,
            "Resolved subscription"
        );
        self.attach_plan(subscription).await
    }

    /// Fast path over the write-side denormalization. Returns `None` to fall
    /// through to the full chain when the fields are missing, stale, or point
    /// at a plan that no longer exists.
    async fn resolve_from_user_row(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Option<SubscriptionData> {
        let fields = match self.users.get_denormalized_subscription(user_id).await {
            Ok(fields) => fields?,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Denormalized subscription lookup failed");
                return None;
            }
        };

        let DenormalizedSubscription {
            effective_plan_id: Some(plan_id),
            effective_subscription_status: Some(status),
            effective_subscription_id: Some(subscription_id),
            subscription_updated_at: Some(updated_at),
        } = fields
        else {
            return None;
        };

        // Negative age means the writer's clock is ahead; treat as fresh.
        let age = now - updated_at;
        if age > self.refresh_after {
            self.spawn_denormalization_refresh(user_id);
        }
        // The row carries no trial end date, so trials always take the full chain.
        if age > self.freshness
            || !status.is_effective_candidate()
            || status == SubscriptionStatus::Trialing
        {
            return None;
        }

        let Some(plan) = self.plans.get_plan_by_id(plan_id).await else {
            warn!(
                user_id = %user_id,
                plan_id = %plan_id,
                "Denormalized plan not found, falling back to full resolution"
            );
            return None;
        };

        let subscription = Subscription {
            id: subscription_id,
            user_id: None,
            household_id: None,
            plan_id,
            status,
            trial_end_date: None,
            created_at: updated_at,
        };
        Some(SubscriptionData::resolved(subscription, (*plan).clone()))
    }

    /// Household, owner-inheritance and legacy lookups run concurrently;
    /// the first hit in that order wins.
    async fn find_effective_subscription(
        &self,
        user_id: Uuid,
    ) -> Option<(Subscription, ResolutionSource)> {
        let household_chain = async {
            let Some(household_id) = self.household_for(user_id).await else {
                return (None, None);
            };
            let household = self.query(
                self.subscriptions.find_subscriptions_by_household(
                    household_id,
                    &SubscriptionStatus::EFFECTIVE_CANDIDATES,
                ),
                user_id,
                ResolutionSource::Household,
            );
            let owner = async {
                let owner_id = match self.households.get_household_owner(household_id).await {
                    Ok(owner) => owner,
                    Err(e) => {
                        warn!(
                            household_id = %household_id,
                            error = %e,
                            "Household owner lookup failed"
                        );
                        None
                    }
                };
                match owner_id {
                    Some(owner_id) if owner_id != user_id => {
                        self.query(
                            self.subscriptions.find_subscriptions_by_user(
                                owner_id,
                                &SubscriptionStatus::EFFECTIVE_CANDIDATES,
                            ),
                            user_id,
                            ResolutionSource::HouseholdOwner,
                        )
                        .await
                    }
                    _ => None,
                }
            };
            tokio::join!(household, owner)
        };

        let legacy = self.query(
            self.subscriptions
                .find_subscriptions_by_user(user_id, &SubscriptionStatus::EFFECTIVE_CANDIDATES),
            user_id,
            ResolutionSource::LegacyUser,
        );

        let ((household, owner), legacy) = tokio::join!(household_chain, legacy);

        household
            .map(|s| (s, ResolutionSource::Household))
            .or_else(|| owner.map(|s| (s, ResolutionSource::HouseholdOwner)))
            .or_else(|| legacy.map(|s| (s, ResolutionSource::LegacyUser)))
    }

    /// Active household, else the one flagged default.
    async fn household_for(&self, user_id: Uuid) -> Option<Uuid> {
        match self.households.get_active_household_id(user_id).await {
            Ok(Some(id)) => return Some(id),
            Ok(None) => {}
            Err(e) => warn!(user_id = %user_id, error = %e, "Active household lookup failed"),
        }
        match self.households.get_default_household_id(user_id).await {
            Ok(id) => id,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Default household lookup failed");
                None
            }
        }
    }

    async fn query(
        &self,
        rows: impl Future<Output = AppResult<Vec<Subscription>>>,
        user_id: Uuid,
        source: ResolutionSource,
    ) -> Option<Subscription> {
        match rows.await {
            Ok(rows) => Subscription::most_relevant(rows),
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    source = %source,
                    error = %e,
                    "Subscription lookup failed, skipping step"
                );
                None
            }
        }
    }

    async fn attach_plan(&self, subscription: Subscription) -> SubscriptionData {
        match self.plans.get_plan_by_id(subscription.plan_id).await {
            Some(plan) => SubscriptionData::resolved(subscription, (*plan).clone()),
            None => {
                warn!(
                    subscription_id = %subscription.id,
                    plan_id = %subscription.plan_id,
                    "Subscription references a missing plan, using default features"
                );
                SubscriptionData::missing_plan(subscription)
            }
        }
    }

    fn spawn_denormalization_refresh(&self, user_id: Uuid) {
        let users = Arc::clone(&self.users);
        tokio::spawn(async move {
            if let Err(e) = users.request_denormalization_refresh(user_id).await {
                debug!(user_id = %user_id, error = %e, "Denormalization refresh request failed");
            }
        });
    }
}

fn to_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}
