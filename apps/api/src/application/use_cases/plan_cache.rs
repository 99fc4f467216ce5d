use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::{helpers::feature_normalizer::normalize_features, ports::clock::Clock},
    domain::entities::plan::{Plan, RawPlan},
};

/// Plans change rarely; a coarse TTL keeps admin edits visible within half an hour
/// even if nobody calls [`PlanCache::invalidate_plans`].
pub const DEFAULT_PLAN_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

#[async_trait]
pub trait PlanRepo: Send + Sync {
    async fn find_all_plans(&self) -> AppResult<Vec<RawPlan>>;
    async fn find_plan_by_id(&self, id: Uuid) -> AppResult<Option<RawPlan>>;
}

#[derive(Default)]
struct PlanSnapshot {
    plans: HashMap<Uuid, Arc<Plan>>,
    /// `None` until the first successful refresh, and after an invalidation.
    refreshed_at: Option<DateTime<Utc>>,
    /// Bumped on every refresh attempt, successful or not.
    attempts: u64,
}

/// Process-wide cache of every plan definition.
///
/// Reads are served from an in-memory snapshot. A refresh always reloads the
/// full plan list and swaps the snapshot in one step; a failed refresh keeps
/// the previous snapshot.
pub struct PlanCache {
    repo: Arc<dyn PlanRepo>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    snapshot: RwLock<PlanSnapshot>,
    // Serializes refreshes so a burst of misses does one store read
    refresh_gate: Mutex<()>,
}

impl PlanCache {
    pub fn new(repo: Arc<dyn PlanRepo>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            repo,
            clock,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            snapshot: RwLock::new(PlanSnapshot::default()),
            refresh_gate: Mutex::new(()),
        }
    }

    /// All cached plans, cheapest first. Refreshes if empty or expired.
    pub async fn get_plans(&self) -> Vec<Arc<Plan>> {
        let attempts = self.needs_refresh();
        if let Some(seen) = attempts {
            self.refresh(seen).await;
        }

        let snapshot = self.read();
        let mut plans: Vec<Arc<Plan>> = snapshot.plans.values().cloned().collect();
        plans.sort_by(|a, b| {
            a.price_monthly
                .cmp(&b.price_monthly)
                .then_with(|| a.name.cmp(&b.name))
        });
        plans
    }

    /// Looks a plan up in the snapshot. A miss triggers one full refresh,
    /// never a point query, so the snapshot stays internally consistent.
    /// A snapshot reloaded by this same call is not reloaded again.
    pub async fn get_plan_by_id(&self, id: Uuid) -> Option<Arc<Plan>> {
        let just_refreshed = match self.needs_refresh() {
            Some(seen) => {
                self.refresh(seen).await;
                true
            }
            None => false,
        };

        let attempts = {
            let snapshot = self.read();
            if let Some(plan) = snapshot.plans.get(&id) {
                return Some(Arc::clone(plan));
            }
            snapshot.attempts
        };
        if just_refreshed {
            return None;
        }

        debug!(plan_id = %id, "Plan not in cache, refreshing");
        self.refresh(attempts).await;
        self.read().plans.get(&id).cloned()
    }

    /// Marks the snapshot stale. The old plans stay available as a fallback
    /// until the next refresh succeeds.
    pub fn invalidate_plans(&self) {
        let mut snapshot = self.write();
        snapshot.refreshed_at = None;
        info!("Plan cache invalidated");
    }

    /// Returns the attempt counter if the snapshot is empty, invalidated or expired.
    fn needs_refresh(&self) -> Option<u64> {
        let snapshot = self.read();
        let expired = match snapshot.refreshed_at {
            None => true,
            Some(at) => self.clock.now() - at >= self.ttl,
        };
        (expired || snapshot.plans.is_empty()).then_some(snapshot.attempts)
    }

    /// Reloads every plan unless another caller already refreshed since
    /// `seen_attempts` was read.
    async fn refresh(&self, seen_attempts: u64) {
        let _gate = self.refresh_gate.lock().await;
        if self.read().attempts != seen_attempts {
            return;
        }

        let result = self.repo.find_all_plans().await;
        let mut snapshot = self.write();
        snapshot.attempts += 1;

        match result {
            Ok(raw_plans) => {
                let plans: HashMap<Uuid, Arc<Plan>> = raw_plans
                    .into_iter()
                    .map(|raw| {
                        let features = normalize_features(&raw.features, raw.id);
                        (raw.id, Arc::new(Plan::from_raw(raw, features)))
                    })
                    .collect();
                debug!(count = plans.len(), "Plan cache refreshed");
                snapshot.plans = plans;
                snapshot.refreshed_at = Some(self.clock.now());
            }
            Err(e) => {
                error!(
                    error = %e,
                    cached = snapshot.plans.len(),
                    "Failed to refresh plan cache, keeping previous plans"
                );
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, PlanSnapshot> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, PlanSnapshot> {
        self.snapshot.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{InMemorySubscriptionStore, ManualClock, Query, create_test_raw_plan};
    use serde_json::json;

    fn cache(store: &Arc<InMemorySubscriptionStore>, clock: &Arc<ManualClock>) -> PlanCache {
        PlanCache::new(store.clone(), clock.clone(), DEFAULT_PLAN_CACHE_TTL)
    }

    #[tokio::test]
    async fn test_get_plans_loads_once_within_ttl() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        store.add_plan(create_test_raw_plan(|_| {}));
        store.add_plan(create_test_raw_plan(|p| p.name = "Pro".into()));
        let clock = Arc::new(ManualClock::default());
        let plans = cache(&store, &clock);

        assert_eq!(plans.get_plans().await.len(), 2);
        assert_eq!(plans.get_plans().await.len(), 2);
        assert_eq!(store.call_count(Query::FindAllPlans), 1);
    }

    #[tokio::test]
    async fn test_get_plans_refreshes_after_ttl() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        store.add_plan(create_test_raw_plan(|_| {}));
        let clock = Arc::new(ManualClock::default());
        let plans = cache(&store, &clock);

        plans.get_plans().await;
        clock.advance(DEFAULT_PLAN_CACHE_TTL + Duration::from_secs(1));
        plans.get_plans().await;
        assert_eq!(store.call_count(Query::FindAllPlans), 2);
    }

    #[tokio::test]
    async fn test_get_plan_by_id_miss_triggers_full_refresh() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        store.add_plan(create_test_raw_plan(|_| {}));
        let clock = Arc::new(ManualClock::default());
        let plans = cache(&store, &clock);
        plans.get_plans().await;

        let late = create_test_raw_plan(|p| p.name = "Added later".into());
        let late_id = late.id;
        store.add_plan(late);

        let found = plans.get_plan_by_id(late_id).await.unwrap();
        assert_eq!(found.name, "Added later");
        assert_eq!(store.call_count(Query::FindAllPlans), 2);
        assert_eq!(store.call_count(Query::FindPlanById), 0);
    }

    #[tokio::test]
    async fn test_unknown_plan_returns_none() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        store.add_plan(create_test_raw_plan(|_| {}));
        let clock = Arc::new(ManualClock::default());
        let plans = cache(&store, &clock);

        assert!(plans.get_plan_by_id(Uuid::new_v4()).await.is_none());
        assert_eq!(store.call_count(Query::FindAllPlans), 1);

        // Warm snapshot: the miss reloads once
        assert!(plans.get_plan_by_id(Uuid::new_v4()).await.is_none());
        assert_eq!(store.call_count(Query::FindAllPlans), 2);
    }

    #[tokio::test]
    async fn test_miss_after_expiry_reloads_once() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        store.add_plan(create_test_raw_plan(|_| {}));
        let clock = Arc::new(ManualClock::default());
        let plans = cache(&store, &clock);
        plans.get_plans().await;

        clock.advance(DEFAULT_PLAN_CACHE_TTL + Duration::from_secs(1));
        assert!(plans.get_plan_by_id(Uuid::new_v4()).await.is_none());
        assert_eq!(store.call_count(Query::FindAllPlans), 2);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_plans() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let raw = create_test_raw_plan(|_| {});
        let plan_id = raw.id;
        store.add_plan(raw);
        let clock = Arc::new(ManualClock::default());
        let plans = cache(&store, &clock);
        plans.get_plans().await;

        store.fail(Query::FindAllPlans);
        plans.invalidate_plans();

        assert_eq!(plans.get_plans().await.len(), 1);
        assert!(plans.get_plan_by_id(plan_id).await.is_some());
    }

    #[tokio::test]
    async fn test_refresh_failure_on_cold_cache_returns_empty() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        store.add_plan(create_test_raw_plan(|_| {}));
        store.fail(Query::FindAllPlans);
        let clock = Arc::new(ManualClock::default());
        let plans = cache(&store, &clock);

        assert!(plans.get_plans().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_picks_up_edited_features() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let raw = create_test_raw_plan(|p| p.features = json!({ "maxTransactions": 100 }));
        let plan_id = raw.id;
        store.add_plan(raw);
        let clock = Arc::new(ManualClock::default());
        let plans = cache(&store, &clock);

        let before = plans.get_plan_by_id(plan_id).await.unwrap();
        assert_eq!(before.features.max_transactions, 100);

        store.update_plan_features(plan_id, json!({ "maxTransactions": 50 }));
        let cached = plans.get_plan_by_id(plan_id).await.unwrap();
        assert_eq!(cached.features.max_transactions, 100);

        plans.invalidate_plans();
        let after = plans.get_plan_by_id(plan_id).await.unwrap();
        assert_eq!(after.features.max_transactions, 50);
    }

    #[tokio::test]
    async fn test_plans_sorted_by_price() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        store.add_plan(create_test_raw_plan(|p| {
            p.name = "Premium".into();
            p.price_monthly = 1999;
        }));
        store.add_plan(create_test_raw_plan(|p| {
            p.name = "Free".into();
            p.price_monthly = 0;
        }));
        let clock = Arc::new(ManualClock::default());
        let plans = cache(&store, &clock);

        let names: Vec<String> = plans.get_plans().await.iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, vec!["Free", "Premium"]);
    }

    #[tokio::test]
    async fn test_concurrent_cold_reads_share_one_refresh() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        store.add_plan(create_test_raw_plan(|_| {}));
        store.set_latency(Duration::from_millis(20));
        let clock = Arc::new(ManualClock::default());
        let plans = Arc::new(cache(&store, &clock));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let plans = Arc::clone(&plans);
            handles.push(tokio::spawn(async move { plans.get_plans().await.len() }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), 1);
        }
        assert_eq!(store.call_count(Query::FindAllPlans), 1);
    }
}
