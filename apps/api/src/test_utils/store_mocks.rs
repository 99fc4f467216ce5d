//! In-memory implementation of every store trait the subscription engine reads from.
//!
//! One store backs all traits so a test can seed plans, households and
//! subscriptions in one place. Each query is counted, can be forced to fail,
//! and can be slowed down to widen race windows.

use async_trait::async_trait;
use ledgerline_types::SubscriptionStatus;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use strum::IntoEnumIterator;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        plan_cache::PlanRepo,
        subscription_resolver::{HouseholdRepo, SubscriptionRepo, UserRepo},
    },
    domain::entities::{
        plan::RawPlan,
        subscription::{DenormalizedSubscription, Subscription},
    },
};

/// Every query the store answers, for counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum Query {
    GetDenormalizedSubscription,
    RequestDenormalizationRefresh,
    GetActiveHouseholdId,
    GetDefaultHouseholdId,
    GetHouseholdOwner,
    FindOwnedHouseholdIds,
    FindActiveHouseholdMembers,
    FindSubscriptionsByHousehold,
    FindSubscriptionsByUser,
    FindSubscriptionsByPlan,
    FindAllPlans,
    FindPlanById,
}

struct HouseholdRecord {
    owner: Option<Uuid>,
    members: Vec<Uuid>,
}

#[derive(Default)]
struct StoreData {
    plans: HashMap<Uuid, RawPlan>,
    subscriptions: Vec<Subscription>,
    denormalized: HashMap<Uuid, DenormalizedSubscription>,
    households: HashMap<Uuid, HouseholdRecord>,
    active_households: HashMap<Uuid, Uuid>,
    default_households: HashMap<Uuid, Uuid>,
}

#[derive(Default)]
pub struct InMemorySubscriptionStore {
    data: Mutex<StoreData>,
    calls: Mutex<HashMap<Query, usize>>,
    failing: Mutex<HashSet<Query>>,
    latency: Mutex<Option<Duration>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_plan(&self, plan: RawPlan) {
        self.data.lock().unwrap().plans.insert(plan.id, plan);
    }

    pub fn update_plan_features(&self, plan_id: Uuid, features: serde_json::Value) {
        let mut data = self.data.lock().unwrap();
        let plan = data.plans.get_mut(&plan_id).expect("plan must be seeded first");
        plan.features = features;
    }

    pub fn add_subscription(&self, subscription: Subscription) {
        self.data.lock().unwrap().subscriptions.push(subscription);
    }

    pub fn set_denormalized(&self, user_id: Uuid, fields: DenormalizedSubscription) {
        self.data
            .lock()
            .unwrap()
            .denormalized
            .insert(user_id, fields);
    }

    /// Registers a household; every listed member is active.
    pub fn add_household(&self, household_id: Uuid, owner: Option<Uuid>, members: &[Uuid]) {
        self.data.lock().unwrap().households.insert(
            household_id,
            HouseholdRecord {
                owner,
                members: members.to_vec(),
            },
        );
    }

    pub fn set_active_household(&self, user_id: Uuid, household_id: Uuid) {
        self.data
            .lock()
            .unwrap()
            .active_households
            .insert(user_id, household_id);
    }

    pub fn set_default_household(&self, user_id: Uuid, household_id: Uuid) {
        self.data
            .lock()
            .unwrap()
            .default_households
            .insert(user_id, household_id);
    }

    pub fn call_count(&self, query: Query) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&query)
            .copied()
            .unwrap_or(0)
    }

    pub fn fail(&self, query: Query) {
        self.failing.lock().unwrap().insert(query);
    }

    pub fn fail_all(&self) {
        self.failing.lock().unwrap().extend(Query::iter());
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// Counts the call, applies latency, then fails if the query is switched off.
    async fn enter(&self, query: Query) -> AppResult<()> {
        *self.calls.lock().unwrap().entry(query).or_insert(0) += 1;

        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.lock().unwrap().contains(&query) {
            return Err(AppError::Database(format!("{query:?} failed")));
        }
        Ok(())
    }

    fn subscriptions_where(
        &self,
        statuses: &[SubscriptionStatus],
        matches: impl Fn(&Subscription) -> bool,
    ) -> Vec<Subscription> {
        self.data
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .filter(|s| statuses.contains(&s.status) && matches(s))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PlanRepo for InMemorySubscriptionStore {
    async fn find_all_plans(&self) -> AppResult<Vec<RawPlan>> {
        self.enter(Query::FindAllPlans).await?;
        Ok(self.data.lock().unwrap().plans.values().cloned().collect())
    }

    async fn find_plan_by_id(&self, id: Uuid) -> AppResult<Option<RawPlan>> {
        self.enter(Query::FindPlanById).await?;
        Ok(self.data.lock().unwrap().plans.get(&id).cloned())
    }
}

#[async_trait]
impl UserRepo for InMemorySubscriptionStore {
    async fn get_denormalized_subscription(
        &self,
        user_id: Uuid,
    ) -> AppResult<Option<DenormalizedSubscription>> {
        self.enter(Query::GetDenormalizedSubscription).await?;
        Ok(self.data.lock().unwrap().denormalized.get(&user_id).cloned())
    }

    async fn request_denormalization_refresh(&self, _user_id: Uuid) -> AppResult<()> {
        self.enter(Query::RequestDenormalizationRefresh).await
    }
}

#[async_trait]
impl HouseholdRepo for InMemorySubscriptionStore {
    async fn get_active_household_id(&self, user_id: Uuid) -> AppResult<Option<Uuid>> {
        self.enter(Query::GetActiveHouseholdId).await?;
        Ok(self
            .data
            .lock()
            .unwrap()
            .active_households
            .get(&user_id)
            .copied())
    }

    async fn get_default_household_id(&self, user_id: Uuid) -> AppResult<Option<Uuid>> {
        self.enter(Query::GetDefaultHouseholdId).await?;
        Ok(self
            .data
            .lock()
            .unwrap()
            .default_households
            .get(&user_id)
            .copied())
    }

    async fn get_household_owner(&self, household_id: Uuid) -> AppResult<Option<Uuid>> {
        self.enter(Query::GetHouseholdOwner).await?;
        Ok(self
            .data
            .lock()
            .unwrap()
            .households
            .get(&household_id)
            .and_then(|h| h.owner))
    }

    async fn find_owned_household_ids(&self, owner_id: Uuid) -> AppResult<Vec<Uuid>> {
        self.enter(Query::FindOwnedHouseholdIds).await?;
        Ok(self
            .data
            .lock()
            .unwrap()
            .households
            .iter()
            .filter(|(_, h)| h.owner == Some(owner_id))
            .map(|(id, _)| *id)
            .collect())
    }

    async fn find_active_household_members(&self, household_id: Uuid) -> AppResult<Vec<Uuid>> {
        self.enter(Query::FindActiveHouseholdMembers).await?;
        Ok(self
            .data
            .lock()
            .unwrap()
            .households
            .get(&household_id)
            .map(|h| h.members.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl SubscriptionRepo for InMemorySubscriptionStore {
    async fn find_subscriptions_by_household(
        &self,
        household_id: Uuid,
        statuses: &[SubscriptionStatus],
    ) -> AppResult<Vec<Subscription>> {
        self.enter(Query::FindSubscriptionsByHousehold).await?;
        Ok(self.subscriptions_where(statuses, |s| s.household_id == Some(household_id)))
    }

    async fn find_subscriptions_by_user(
        &self,
        user_id: Uuid,
        statuses: &[SubscriptionStatus],
    ) -> AppResult<Vec<Subscription>> {
        self.enter(Query::FindSubscriptionsByUser).await?;
        Ok(self.subscriptions_where(statuses, |s| s.user_id == Some(user_id)))
    }

    async fn find_subscriptions_by_plan(
        &self,
        plan_id: Uuid,
        statuses: &[SubscriptionStatus],
    ) -> AppResult<Vec<Subscription>> {
        self.enter(Query::FindSubscriptionsByPlan).await?;
        Ok(self.subscriptions_where(statuses, |s| s.plan_id == plan_id))
    }
}
