//! Lifecycle states for provisioned instances and their owning hosts.
//!
//! Two status types exist because two parties track them. [`CloudStatus`] is
//! what a backend observes about an instance; [`HostStatus`] is the durable
//! state owned by the host record itself and is authoritative for the
//! termination guard.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Instance state as observed by a provisioning backend.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudStatus {
    /// The state could not be determined, or the instance is untracked.
    #[default]
    Unknown,
    /// Spawn accepted; the instance is not yet confirmed running.
    Initializing,
    /// The backend confirms the instance is live.
    Running,
    /// The instance has been, or is being, torn down.
    Terminated,
}

impl CloudStatus {
    /// Returns the lower-case name used in logs and serialised payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for CloudStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable host state owned by the host record.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    /// The host record exists but its instance is not confirmed running.
    #[default]
    Initializing,
    /// The host is available for work.
    Running,
    /// The host has been terminated. No further transitions are allowed.
    Terminated,
}

impl HostStatus {
    /// Returns the lower-case name used in logs and serialised payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
