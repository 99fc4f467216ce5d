//! Test utilities for integration testing.
//!
//! This module provides:
//! - Test data factories for creating valid test fixtures
//! - An in-memory store implementing every repository trait, with call
//!   counters and failure injection
//! - A manually advanced clock for TTL tests
//! - A builder for `AppState` used by HTTP route tests

mod app_state_builder;
mod clock;
mod factories;
mod store_mocks;

pub use app_state_builder::*;
pub use clock::*;
pub use factories::*;
pub use store_mocks::*;
