pub mod limit_guard;
pub mod plan_cache;
pub mod subscription;
pub mod subscription_cache;
pub mod subscription_resolver;
