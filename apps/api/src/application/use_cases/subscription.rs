use std::sync::Arc;
use std::time::Duration;

use ledgerline_types::{FeatureKey, LimitCheck};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::{
        ports::clock::Clock,
        use_cases::{
            limit_guard,
            plan_cache::{DEFAULT_PLAN_CACHE_TTL, PlanCache, PlanRepo},
            subscription_cache::{CacheSettings, SubscriptionCache},
            subscription_resolver::{
                HouseholdRepo, ResolverSettings, SubscriptionRepo, SubscriptionResolver, UserRepo,
            },
        },
    },
    domain::entities::{plan::Plan, subscription_data::SubscriptionData},
};

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub plan_cache_ttl: Duration,
    pub resolver: ResolverSettings,
    pub cache: CacheSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            plan_cache_ttl: DEFAULT_PLAN_CACHE_TTL,
            resolver: ResolverSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

/// Everything the rest of the app needs to know about a user's plan.
///
/// One instance per process; cloning shares the underlying caches.
/// An absent user id means "not signed in" and always yields the default data.
#[derive(Clone)]
pub struct SubscriptionUseCases {
    plans: Arc<PlanCache>,
    cache: Arc<SubscriptionCache>,
    clock: Arc<dyn Clock>,
}

impl SubscriptionUseCases {
    pub fn new(
        plan_repo: Arc<dyn PlanRepo>,
        users: Arc<dyn UserRepo>,
        households: Arc<dyn HouseholdRepo>,
        subscriptions: Arc<dyn SubscriptionRepo>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        let plans = Arc::new(PlanCache::new(
            plan_repo,
            Arc::clone(&clock),
            settings.plan_cache_ttl,
        ));
        let resolver = Arc::new(SubscriptionResolver::new(
            users,
            Arc::clone(&households),
            Arc::clone(&subscriptions),
            Arc::clone(&plans),
            Arc::clone(&clock),
            settings.resolver,
        ));
        let cache = Arc::new(SubscriptionCache::new(
            resolver,
            subscriptions,
            households,
            Arc::clone(&clock),
            settings.cache,
        ));

        Self {
            plans,
            cache,
            clock,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_user_subscription_data(&self, user_id: Option<Uuid>) -> Arc<SubscriptionData> {
        match user_id {
            Some(user_id) => self.cache.get(user_id).await,
            None => Arc::new(SubscriptionData::none()),
        }
    }

    #[instrument(skip(self))]
    pub fn invalidate_subscription_cache(&self, user_id: Uuid) {
        self.cache.invalidate(user_id);
    }

    #[instrument(skip(self))]
    pub fn invalidate_plans_cache(&self) {
        self.plans.invalidate_plans();
    }

    /// Call after editing or deleting a plan. Drops the plan snapshot, then every
    /// cached subscription that may resolve to the plan.
    #[instrument(skip(self))]
    pub async fn invalidate_subscriptions_for_plan(&self, plan_id: Uuid) -> AppResult<usize> {
        self.plans.invalidate_plans();
        self.cache.invalidate_for_plan(plan_id).await
    }

    #[instrument(skip(self))]
    pub async fn can_user_write(&self, user_id: Option<Uuid>) -> bool {
        let data = self.get_user_subscription_data(user_id).await;
        limit_guard::can_write(&data, self.clock.now())
    }

    #[instrument(skip(self))]
    pub async fn check_feature_access(&self, user_id: Option<Uuid>, feature: FeatureKey) -> bool {
        let data = self.get_user_subscription_data(user_id).await;
        limit_guard::check_feature(&data, feature)
    }

    #[instrument(skip(self))]
    pub async fn check_transaction_limit(
        &self,
        user_id: Option<Uuid>,
        current_monthly_count: i64,
    ) -> LimitCheck {
        let data = self.get_user_subscription_data(user_id).await;
        limit_guard::check_transaction_limit(&data, current_monthly_count)
    }

    #[instrument(skip(self))]
    pub async fn check_account_limit(
        &self,
        user_id: Option<Uuid>,
        current_account_count: i64,
    ) -> LimitCheck {
        let data = self.get_user_subscription_data(user_id).await;
        limit_guard::check_account_limit(&data, current_account_count)
    }

    pub async fn list_plans(&self) -> Vec<Arc<Plan>> {
        self.plans.get_plans().await
    }
}
