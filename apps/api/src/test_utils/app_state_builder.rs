//! Test app state builder for HTTP-level integration testing.
//!
//! This module provides `TestAppStateBuilder` which creates a minimal `AppState`
//! backed by an in-memory store for testing HTTP endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        jwt,
        use_cases::subscription::{EngineSettings, SubscriptionUseCases},
    },
    domain::entities::{plan::RawPlan, subscription::Subscription},
    infra::{clock::SystemClock, config::AppConfig},
    test_utils::InMemorySubscriptionStore,
};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-0123456789abcdef";
pub const TEST_INTERNAL_TOKEN: &str = "test-internal-token";

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let plan = create_test_raw_plan(|p| p.name = "Plus".to_string());
/// let subscription = create_test_subscription(plan.id, |s| s.user_id = Some(user_id));
///
/// let builder = TestAppStateBuilder::new()
///     .with_plan(plan)
///     .with_subscription(subscription);
/// let token = builder.access_token_for(user_id);
/// let app_state = builder.build();
/// ```
pub struct TestAppStateBuilder {
    store: Arc<InMemorySubscriptionStore>,
    settings: EngineSettings,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemorySubscriptionStore::new()),
            settings: EngineSettings::default(),
        }
    }

    /// Add a plan row to the backing store.
    pub fn with_plan(self, plan: RawPlan) -> Self {
        self.store.add_plan(plan);
        self
    }

    /// Add a subscription row to the backing store.
    pub fn with_subscription(self, subscription: Subscription) -> Self {
        self.store.add_subscription(subscription);
        self
    }

    /// The backing store, for seeding or mutating data after the state is built.
    pub fn store(&self) -> Arc<InMemorySubscriptionStore> {
        Arc::clone(&self.store)
    }

    /// A valid access token for `user_id`, signed with the test secret.
    pub fn access_token_for(&self, user_id: Uuid) -> String {
        jwt::issue(
            user_id,
            &SecretString::new(TEST_JWT_SECRET.into()),
            time::Duration::minutes(15),
        )
        .expect("test token should sign")
    }

    pub fn build(self) -> AppState {
        let use_cases = SubscriptionUseCases::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            Arc::new(SystemClock),
            self.settings,
        );

        AppState {
            config: Arc::new(test_config(self.settings)),
            subscription_use_cases: Arc::new(use_cases),
        }
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn test_config(settings: EngineSettings) -> AppConfig {
    AppConfig {
        database_url: "postgres://localhost/ledgerline_test".to_string(),
        database_max_connections: 1,
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
        internal_api_token: SecretString::new(TEST_INTERNAL_TOKEN.into()),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        plan_cache_ttl: settings.plan_cache_ttl,
        subscription_cache_ttl: settings.cache.ttl,
        subscription_in_flight_ceiling: settings.cache.in_flight_ceiling,
        subscription_resolve_timeout: settings.cache.resolve_timeout,
        denormalized_freshness: settings.resolver.denormalized_freshness,
        denormalized_refresh_after: settings.resolver.denormalized_refresh_after,
        log_file: None,
    }
}

