//! Testing utilities for the progressive-capture system.
//!
//! # Philosophy
//!
//! Following sqlx's testing philosophy, integration tests run against a
//! real, explicitly-configured Postgres instance rather than a mock
//! store — `TestDatabase`/`IsolatedTestDb` never fall back to reading
//! `DATABASE_URL` implicitly, only `TEST_DATABASE_URL`, so a developer's
//! production connection string can never be picked up by accident. Unit
//! tests that exercise the Hybrid Forge Client without a network use
//! `MockHttp` instead.

pub mod assertions;
pub mod db;
pub mod mock_http;

pub use assertions::*;
pub use db::{IsolatedTestDb, TestDatabase};
pub use mock_http::{MockHttp, MockHttpBuilder, MockRequest, MockResponse};

use std::time::Duration;

/// Default test timeout.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default job test timeout.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(10);
