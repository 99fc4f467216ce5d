use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;

use crate::application::use_cases::{
    subscription::EngineSettings, subscription_cache::CacheSettings,
    subscription_resolver::ResolverSettings,
};

pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub jwt_secret: SecretString,
    /// Shared secret the billing webhook handler and admin tooling send in
    /// `x-internal-token` to trigger invalidations.
    pub internal_api_token: SecretString,
    pub cors_origin: HeaderValue,
    pub plan_cache_ttl: Duration,
    pub subscription_cache_ttl: Duration,
    pub subscription_in_flight_ceiling: Duration,
    pub subscription_resolve_timeout: Duration,
    pub denormalized_freshness: Duration,
    pub denormalized_refresh_after: Duration,
    /// Optional JSON log file, in addition to console output.
    pub log_file: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url: String = get_env("DATABASE_URL");
        let database_max_connections: u32 = get_env_default("DATABASE_MAX_CONNECTIONS", 5);
        let bind_addr: SocketAddr =
            get_env_default("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3001)));
        let jwt_secret = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let internal_api_token = SecretString::new(get_env::<String>("INTERNAL_API_TOKEN").into());
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let plan_cache_ttl_secs: u64 = get_env_default("PLAN_CACHE_TTL_SECS", 1800);
        let subscription_cache_ttl_secs: u64 = get_env_default("SUBSCRIPTION_CACHE_TTL_SECS", 300);
        let in_flight_ceiling_secs: u64 =
            get_env_default("SUBSCRIPTION_IN_FLIGHT_CEILING_SECS", 10);
        let resolve_timeout_secs: u64 = get_env_default("SUBSCRIPTION_RESOLVE_TIMEOUT_SECS", 10);
        let freshness_secs: u64 = get_env_default("DENORMALIZED_FRESHNESS_SECS", 300);
        let refresh_after_secs: u64 = get_env_default("DENORMALIZED_REFRESH_AFTER_SECS", 3600);
        let log_file = std::env::var("LOG_FILE").ok().filter(|s| !s.is_empty());

        Self {
            database_url,
            database_max_connections,
            bind_addr,
            jwt_secret,
            internal_api_token,
            cors_origin,
            plan_cache_ttl: Duration::from_secs(plan_cache_ttl_secs),
            subscription_cache_ttl: Duration::from_secs(subscription_cache_ttl_secs),
            subscription_in_flight_ceiling: Duration::from_secs(in_flight_ceiling_secs),
            subscription_resolve_timeout: Duration::from_secs(resolve_timeout_secs),
            denormalized_freshness: Duration::from_secs(freshness_secs),
            denormalized_refresh_after: Duration::from_secs(refresh_after_secs),
            log_file,
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            plan_cache_ttl: self.plan_cache_ttl,
            resolver: ResolverSettings {
                denormalized_freshness: self.denormalized_freshness,
                denormalized_refresh_after: self.denormalized_refresh_after,
            },
            cache: CacheSettings {
                ttl: self.subscription_cache_ttl,
                in_flight_ceiling: self.subscription_in_flight_ceiling,
                resolve_timeout: self.subscription_resolve_timeout,
            },
        }
    }
}
