//! Shared constants for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared constants under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/test_constants.rs"]
//! mod test_constants;
//! ```

/// User recorded as the terminating actor in scheduler-driven tests.
pub const SCHEDULER_USER: &str = "scheduler";

/// Machines in the static pool used by integration tests.
pub const POOL_HOSTS: [&str; 2] = ["build-1.pool.test", "build-2.pool.test"];
