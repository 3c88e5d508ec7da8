//! Host records as seen from the provisioning layer.
//!
//! Hosts are owned and persisted elsewhere. Managers only read a host's `id`
//! and durable `status`, and call [`Host::terminate`] to record the terminal
//! transition.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::HostStatus;

/// A build host tracked by the scheduler.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Host {
    /// Stable identifier; also the registry key for the backing instance.
    pub id: String,
    /// Durable host state. Authoritative for the double-termination guard.
    pub status: HostStatus,
    /// User or subsystem that terminated the host.
    pub terminated_by: Option<String>,
    /// Wall-clock time of termination.
    pub termination_time: Option<SystemTime>,
}

/// Errors raised by host bookkeeping.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum HostError {
    /// Raised when the host already records a termination.
    #[error("host {host_id} is already terminated")]
    AlreadyTerminated {
        /// Identifier of the host.
        host_id: String,
    },
}

impl Host {
    /// Creates a host in the [`HostStatus::Initializing`] state.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: HostStatus::Initializing,
            terminated_by: None,
            termination_time: None,
        }
    }

    /// Returns a copy of the host with the given durable status.
    #[must_use]
    pub const fn with_status(mut self, status: HostStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns `true` when the durable status records a termination.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.status == HostStatus::Terminated
    }

    /// Records that `actor` terminated this host. The actor is stored as
    /// given, even when empty.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::AlreadyTerminated`] when the host is already
    /// terminated.
    pub fn terminate(&mut self, actor: &str) -> Result<(), HostError> {
        if self.is_terminated() {
            return Err(HostError::AlreadyTerminated {
                host_id: self.id.clone(),
            });
        }
        self.status = HostStatus::Terminated;
        self.terminated_by = Some(actor.to_owned());
        self.termination_time = Some(SystemTime::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn terminate_records_actor_and_time() {
        let mut host = Host::new("h-1").with_status(HostStatus::Running);
        host.terminate("alice")
            .unwrap_or_else(|err| panic!("terminate should succeed: {err}"));
        assert_eq!(host.status, HostStatus::Terminated);
        assert_eq!(host.terminated_by.as_deref(), Some("alice"));
        assert!(host.termination_time.is_some());
    }

    #[rstest]
    fn terminate_twice_is_rejected() {
        let mut host = Host::new("h-1");
        host.terminate("alice")
            .unwrap_or_else(|err| panic!("first terminate: {err}"));
        let err = host.terminate("bob").expect_err("second terminate must fail");
        assert_eq!(
            err,
            HostError::AlreadyTerminated {
                host_id: String::from("h-1")
            }
        );
        assert_eq!(host.terminated_by.as_deref(), Some("alice"));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn terminate_records_any_actor_verbatim(#[case] actor: &str) {
        let mut host = Host::new("h-2");
        host.terminate(actor)
            .unwrap_or_else(|err| panic!("terminate should accept {actor:?}: {err}"));
        assert_eq!(host.status, HostStatus::Terminated);
        assert_eq!(host.terminated_by.as_deref(), Some(actor));
    }
}
