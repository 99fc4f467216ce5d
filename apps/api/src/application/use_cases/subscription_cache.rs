use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use ledgerline_types::SubscriptionStatus;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::{
        ports::clock::Clock,
        use_cases::subscription_resolver::{
            HouseholdRepo, SubscriptionRepo, SubscriptionResolver,
        },
    },
    domain::entities::subscription_data::SubscriptionData,
};

/// Anything that can compute a user's subscription data from scratch.
#[async_trait]
pub trait SubscriptionDataSource: Send + Sync {
    async fn resolve(&self, user_id: Uuid) -> SubscriptionData;
}

#[async_trait]
impl SubscriptionDataSource for SubscriptionResolver {
    async fn resolve(&self, user_id: Uuid) -> SubscriptionData {
        SubscriptionResolver::resolve(self, user_id).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub ttl: Duration,
    /// In-flight resolutions older than this are considered abandoned.
    pub in_flight_ceiling: Duration,
    pub resolve_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            in_flight_ceiling: Duration::from_secs(10),
            resolve_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
enum FlightOutcome {
    Resolved(Arc<SubscriptionData>),
    Failed,
}

struct InFlight {
    id: u64,
    started_at: DateTime<Utc>,
    rx: watch::Receiver<Option<FlightOutcome>>,
}

enum CacheEntry {
    Resolved {
        data: Arc<SubscriptionData>,
        /// Completion time of the resolution.
        timestamp: DateTime<Utc>,
    },
    InFlight { flight: Arc<InFlight> },
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<Uuid, CacheEntry>,
    invalidated_at: HashMap<Uuid, DateTime<Utc>>,
    next_flight_id: u64,
}

impl CacheState {
    fn holds_flight(&self, user_id: Uuid, flight_id: u64) -> bool {
        matches!(
            self.entries.get(&user_id),
            Some(CacheEntry::InFlight { flight }) if flight.id == flight_id
        )
    }
}

enum Lookup {
    Hit(Arc<SubscriptionData>),
    Join(Arc<InFlight>),
    Start(Arc<InFlight>, FlightGuard),
}

/// Per-user singleflight cache in front of a [`SubscriptionDataSource`].
///
/// Concurrent misses for one user share a single resolution. Resolved
/// entries live for the TTL unless [`SubscriptionCache::invalidate`] removes
/// them first; after `invalidate` returns, no data resolved before it is
/// served again.
///
/// The state mutex is never held across an `.await`.
pub struct SubscriptionCache {
    source: Arc<dyn SubscriptionDataSource>,
    subscriptions: Arc<dyn SubscriptionRepo>,
    households: Arc<dyn HouseholdRepo>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    in_flight_ceiling: TimeDelta,
    wait_ceiling: Duration,
    resolve_timeout: Duration,
    state: Arc<Mutex<CacheState>>,
}

impl SubscriptionCache {
    pub fn new(
        source: Arc<dyn SubscriptionDataSource>,
        subscriptions: Arc<dyn SubscriptionRepo>,
        households: Arc<dyn HouseholdRepo>,
        clock: Arc<dyn Clock>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            source,
            subscriptions,
            households,
            clock,
            ttl: TimeDelta::from_std(settings.ttl).unwrap_or(TimeDelta::MAX),
            in_flight_ceiling: TimeDelta::from_std(settings.in_flight_ceiling)
                .unwrap_or(TimeDelta::MAX),
            wait_ceiling: settings.in_flight_ceiling,
            resolve_timeout: settings.resolve_timeout,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    pub async fn get(&self, user_id: Uuid) -> Arc<SubscriptionData> {
        let flight = match self.lookup(user_id) {
            Lookup::Hit(data) => {
                debug!(user_id = %user_id, "Subscription cache hit");
                return data;
            }
            Lookup::Join(flight) => {
                debug!(user_id = %user_id, "Joining in-flight subscription resolution");
                flight
            }
            Lookup::Start(flight, guard) => {
                debug!(user_id = %user_id, "Subscription cache miss, resolving");
                self.spawn_resolution(user_id, guard);
                flight
            }
        };

        self.wait(user_id, &flight).await
    }

    /// Drops the user's entry, including any in-flight marker, and records
    /// the invalidation instant.
    pub fn invalidate(&self, user_id: Uuid) {
        self.invalidate_many(std::iter::once(user_id));
        debug!(user_id = %user_id, "Subscription cache invalidated");
    }

    pub fn invalidate_many(&self, user_ids: impl IntoIterator<Item = Uuid>) {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut state = self.lock();
        for user_id in user_ids {
            state.entries.remove(&user_id);
            state.invalidated_at.insert(user_id, now);
        }
        // Anything older than the TTL can no longer shadow a live entry
        state.invalidated_at.retain(|_, at| now - *at < ttl);
    }

    /// Invalidates every user whose effective subscription may be on `plan_id`:
    /// direct subscribers, members of subscribed households, and members of
    /// households owned by a direct subscriber. Returns the number of users.
    pub async fn invalidate_for_plan(&self, plan_id: Uuid) -> AppResult<usize> {
        let subscriptions = self
            .subscriptions
            .find_subscriptions_by_plan(plan_id, &SubscriptionStatus::LIVE)
            .await?;

        let mut users = HashSet::new();
        let mut households = HashSet::new();
        for subscription in &subscriptions {
            if let Some(user_id) = subscription.user_id {
                users.insert(user_id);
            }
            if let Some(household_id) = subscription.household_id {
                households.insert(household_id);
            }
        }

        for owner_id in users.clone() {
            match self.households.find_owned_household_ids(owner_id).await {
                Ok(owned) => households.extend(owned),
                Err(e) => warn!(
                    plan_id = %plan_id,
                    owner_id = %owner_id,
                    error = %e,
                    "Owned household lookup failed during plan fan-out"
                ),
            }
        }

        for household_id in households {
            match self.households.find_active_household_members(household_id).await {
                Ok(members) => users.extend(members),
                Err(e) => warn!(
                    plan_id = %plan_id,
                    household_id = %household_id,
                    error = %e,
                    "Household member lookup failed during plan fan-out"
                ),
            }
        }

        let count = users.len();
        self.invalidate_many(users);
        info!(
            plan_id = %plan_id,
            subscriptions = subscriptions.len(),
            invalidated_users = count,
            "Invalidated subscription cache for plan"
        );
        Ok(count)
    }

    fn lookup(&self, user_id: Uuid) -> Lookup {
        let now = self.clock.now();
        let mut state = self.lock();

        match state.entries.get(&user_id) {
            Some(CacheEntry::Resolved { data, timestamp }) => {
                let invalidated = state
                    .invalidated_at
                    .get(&user_id)
                    .is_some_and(|at| at > timestamp);
                if !invalidated && now - *timestamp < self.ttl {
                    return Lookup::Hit(Arc::clone(data));
                }
            }
            Some(CacheEntry::InFlight { flight }) => {
                if now - flight.started_at < self.in_flight_ceiling {
                    return Lookup::Join(Arc::clone(flight));
                }
                warn!(
                    user_id = %user_id,
                    flight_id = flight.id,
                    "In-flight subscription resolution exceeded ceiling, starting a new one"
                );
            }
            None => {}
        }

        state.next_flight_id += 1;
        let flight_id = state.next_flight_id;
        let (tx, rx) = watch::channel(None);
        let flight = Arc::new(InFlight {
            id: flight_id,
            started_at: now,
            rx,
        });
        state.entries.insert(
            user_id,
            CacheEntry::InFlight {
                flight: Arc::clone(&flight),
            },
        );

        let guard = FlightGuard {
            user_id,
            flight_id,
            tx,
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
            completed: false,
        };
        Lookup::Start(flight, guard)
    }

    /// Runs the resolution detached from the caller so a cancelled request
    /// never strands the other waiters.
    fn spawn_resolution(&self, user_id: Uuid, guard: FlightGuard) {
        let source = Arc::clone(&self.source);
        let timeout = self.resolve_timeout;

        tokio::spawn(async move {
            match tokio::time::timeout(timeout, source.resolve(user_id)).await {
                Ok(data) => guard.complete(Some(Arc::new(data))),
                Err(_) => {
                    error!(
                        user_id = %user_id,
                        timeout_ms = timeout.as_millis() as u64,
                        "Subscription resolution timed out"
                    );
                    guard.complete(None);
                }
            }
        });
    }

    /// Waits at most until the flight reaches the in-flight ceiling,
    /// counted from when the flight started.
    async fn wait(&self, user_id: Uuid, flight: &InFlight) -> Arc<SubscriptionData> {
        let elapsed = (self.clock.now() - flight.started_at)
            .to_std()
            .unwrap_or_default();
        let budget = self.wait_ceiling.saturating_sub(elapsed);

        let mut rx = flight.rx.clone();
        let outcome = match tokio::time::timeout(budget, rx.wait_for(Option::is_some)).await {
            Ok(Ok(outcome)) => (*outcome).clone(),
            Ok(Err(_)) => None,
            Err(_) => {
                warn!(user_id = %user_id, "Gave up waiting for in-flight subscription resolution");
                None
            }
        };

        match outcome {
            Some(FlightOutcome::Resolved(data)) => data,
            Some(FlightOutcome::Failed) | None => Arc::new(SubscriptionData::none()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owned by the task running a resolution. Writes the outcome back only if
/// the entry still holds this flight, then publishes it to every waiter.
/// Dropped without completing (panic or abort), it clears its own marker
/// and publishes a failure.
struct FlightGuard {
    user_id: Uuid,
    flight_id: u64,
    tx: watch::Sender<Option<FlightOutcome>>,
    state: Arc<Mutex<CacheState>>,
    clock: Arc<dyn Clock>,
    completed: bool,
}

impl FlightGuard {
    fn complete(mut self, data: Option<Arc<SubscriptionData>>) {
        self.completed = true;

        let outcome = {
            let mut state = lock_state(&self.state);
            let owns_entry = state.holds_flight(self.user_id, self.flight_id);
            match data {
                Some(data) => {
                    if owns_entry {
                        state.entries.insert(
                            self.user_id,
                            CacheEntry::Resolved {
                                data: Arc::clone(&data),
                                timestamp: self.clock.now(),
                            },
                        );
                    } else {
                        debug!(
                            user_id = %self.user_id,
                            flight_id = self.flight_id,
                            "Resolution superseded, not caching result"
                        );
                    }
                    FlightOutcome::Resolved(data)
                }
                None => {
                    if owns_entry {
                        state.entries.remove(&self.user_id);
                    }
                    FlightOutcome::Failed
                }
            }
        };

        self.tx.send_replace(Some(outcome));
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }

        {
            let mut state = lock_state(&self.state);
            if state.holds_flight(self.user_id, self.flight_id) {
                state.entries.remove(&self.user_id);
            }
        }
        self.tx.send_replace(Some(FlightOutcome::Failed));
        error!(user_id = %self.user_id, "Subscription resolution aborted");
    }
}
