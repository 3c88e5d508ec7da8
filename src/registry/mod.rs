//! Concurrency-safe store of backend-observed instance state.
//!
//! A single reader/writer lock guards the map. Writers (`set`, `reset`,
//! `update`) take the exclusive lock; readers share it. Snapshots are copied
//! under the shared lock and handed back after the lock is released, so a
//! caller iterating a snapshot never blocks writers and never observes a
//! write that happens mid-iteration.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;

use crate::status::CloudStatus;

/// Point-in-time copy of registry contents. Finite and consumed once.
pub type Snapshot<T> = std::vec::IntoIter<T>;

/// Backend-observed state for one instance.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstanceRecord {
    /// Identifier of the owning host.
    pub id: String,
    /// Last status observed by the backend.
    pub status: CloudStatus,
    /// Whether the backend reports the instance ready for work.
    pub is_up: bool,
    /// Whether SSH connections succeed. Independent of `is_up`.
    pub is_ssh_reachable: bool,
    /// Connection options returned verbatim to callers.
    pub ssh_options: Vec<String>,
    /// Reachable address; empty until assigned.
    pub dns_name: String,
    /// Time remaining in the current billing interval.
    pub time_til_next_payment: Duration,
    /// Whether post-boot initialisation has already run.
    pub on_up_ran: bool,
}

impl InstanceRecord {
    /// Returns the record written for a freshly spawned instance.
    #[must_use]
    pub fn fresh(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: CloudStatus::Initializing,
            ..Self::default()
        }
    }
}

/// Thread-safe map from instance identifier to [`InstanceRecord`].
///
/// Share it between backends with `Arc<InstanceRegistry>`.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    instances: RwLock<HashMap<String, InstanceRecord>>,
}

impl InstanceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every tracked instance.
    pub fn reset(&self) {
        *self.instances.write() = HashMap::new();
    }

    /// Number of tracked instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    /// Returns `true` when nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    /// Returns `true` when `id` is tracked.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.instances.read().contains_key(id)
    }

    /// Returns the record for `id`, or a default record when untracked.
    #[must_use]
    pub fn get(&self, id: &str) -> InstanceRecord {
        self.lookup(id).unwrap_or_default()
    }

    /// Returns the record for `id` when tracked.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<InstanceRecord> {
        self.instances.read().get(id).cloned()
    }

    /// Looks up several ids under one shared lock, preserving input order.
    #[must_use]
    pub fn lookup_many<'a, I>(&self, ids: I) -> Vec<Option<InstanceRecord>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let instances = self.instances.read();
        ids.into_iter()
            .map(|id| instances.get(id).cloned())
            .collect()
    }

    /// Inserts or replaces the record for `id`.
    pub fn set(&self, id: impl Into<String>, record: InstanceRecord) {
        self.instances.write().insert(id.into(), record);
    }

    /// Inserts `record` unless `id` is already tracked. Returns `true` when
    /// the record was inserted.
    pub fn insert_if_absent(&self, id: impl Into<String>, record: InstanceRecord) -> bool {
        let mut instances = self.instances.write();
        let key = id.into();
        if instances.contains_key(&key) {
            return false;
        }
        instances.insert(key, record);
        true
    }

    /// Performs a read-modify-write on the record for `id` under the
    /// exclusive lock.
    ///
    /// `apply` receives a copy of the stored record. The copy is written back
    /// only when `apply` returns `Ok`, so a failed update leaves the stored
    /// record untouched. Returns `None` when `id` is untracked.
    pub fn update<T, E, F>(&self, id: &str, apply: F) -> Option<Result<T, E>>
    where
        F: FnOnce(&mut InstanceRecord) -> Result<T, E>,
    {
        let mut instances = self.instances.write();
        let stored = instances.get_mut(id)?;
        let mut working = stored.clone();
        let outcome = apply(&mut working);
        if outcome.is_ok() {
            *stored = working;
        }
        Some(outcome)
    }

    /// Copies the tracked identifiers.
    #[must_use]
    pub fn snapshot_ids(&self) -> Snapshot<String> {
        let ids: Vec<String> = self.instances.read().keys().cloned().collect();
        ids.into_iter()
    }

    /// Copies the tracked records.
    #[must_use]
    pub fn snapshot_records(&self) -> Snapshot<InstanceRecord> {
        let records: Vec<InstanceRecord> = self.instances.read().values().cloned().collect();
        records.into_iter()
    }
}

#[cfg(test)]
mod tests;
