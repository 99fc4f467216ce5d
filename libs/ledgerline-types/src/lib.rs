//! Shared value types for Ledgerline plan resolution.
//!
//! This crate provides:
//! - Subscription status enum with effective-subscription priority rules
//! - The canonical plan feature bag and its flag keys
//! - Limit check results returned by admission checks

mod features;
mod limits;
mod subscription;

pub use features::{FeatureBag, FeatureKey, UNLIMITED};
pub use limits::LimitCheck;
pub use subscription::SubscriptionStatus;
