//! Test support utilities shared across unit and integration tests.

use std::time::{Duration, SystemTime};

use crate::host::Host;
use crate::manager::Manager;

const SECONDS_PER_HOUR: u64 = 3_600;
const SECONDS_PER_MINUTE: u64 = 60;

/// Returns a fixed wall-clock time on 1 January 1970, for reproducible
/// billing intervals.
#[must_use]
pub fn wall_clock(hours: u64, minutes: u64, seconds: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH
        + Duration::from_secs(hours * SECONDS_PER_HOUR + minutes * SECONDS_PER_MINUTE + seconds)
}

/// Spawns a host with the given id and returns it.
///
/// # Panics
///
/// Panics when the backend refuses the spawn; intended for test setup only.
pub async fn spawn_tracked(manager: &dyn Manager, id: &str) -> Host {
    manager
        .spawn_host(Host::new(id))
        .await
        .unwrap_or_else(|err| panic!("spawn {id} should succeed: {err}"))
}
