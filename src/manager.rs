//! The provisioning manager contract shared by every backend.
//!
//! A scheduler holds an `Arc<dyn Manager>` and never learns which backend
//! sits behind it. Every backend must honour the same result and error
//! semantics: reads on an untracked host fail with
//! [`ManagerError::HostNotFound`], except [`Manager::time_til_next_payment`],
//! which reports a zero duration instead.

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, SystemTime};

use thiserror::Error;

use crate::config::CloudConfig;
use crate::host::{Host, HostError};
use crate::provider::ProviderKind;
use crate::registry::{InstanceRecord, InstanceRegistry};
use crate::settings::ProviderSettings;
use crate::status::CloudStatus;

/// Boxed error carried by [`ManagerError::Backend`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Future returned by manager operations.
pub type ManagerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ManagerError>> + Send + 'a>>;

/// Errors surfaced by manager operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Raised when the backend does not track the host.
    #[error("unable to fetch host: {host_id}")]
    HostNotFound {
        /// Identifier of the host.
        host_id: String,
    },
    /// Raised when termination is requested for a host already terminated.
    #[error("cannot terminate {host_id}; already marked as terminated")]
    AlreadyTerminated {
        /// Identifier of the host.
        host_id: String,
    },
    /// Raised when the call itself is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Raised when provider settings are invalid.
    #[error("invalid provider settings: {0}")]
    Validation(String),
    /// Raised when the host record rejects a bookkeeping update.
    #[error(transparent)]
    Host(#[from] HostError),
    /// Raised when an operation does not finish before its deadline.
    #[error("{operation} exceeded its deadline of {deadline:?}")]
    DeadlineExceeded {
        /// Operation that was abandoned.
        operation: String,
        /// Deadline applied by the caller.
        deadline: Duration,
    },
    /// Opaque backend failure, kept unmodified as the error source.
    #[error("{provider} backend failed to {context}")]
    Backend {
        /// Backend that produced the failure.
        provider: ProviderKind,
        /// What the backend was doing.
        context: String,
        /// Underlying backend error.
        #[source]
        source: BoxError,
    },
}

impl ManagerError {
    /// Wraps a backend-specific error with context.
    #[must_use]
    pub fn backend(
        provider: ProviderKind,
        context: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Backend {
            provider,
            context: context.into(),
            source: source.into(),
        }
    }

    pub(crate) fn not_found(host: &Host) -> Self {
        Self::HostNotFound {
            host_id: host.id.clone(),
        }
    }
}

/// Result of [`Manager::on_up`].
///
/// The post-boot flag is flipped with a compare-and-set under the registry's
/// exclusive lock, so exactly one caller sees [`OnUpOutcome::FirstRun`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OnUpOutcome {
    /// This call set the flag.
    FirstRun,
    /// The flag was already set by an earlier call.
    AlreadyRan,
}

/// Contract implemented by every provisioning backend.
pub trait Manager: Send + Sync {
    /// Identifies the backend.
    fn provider(&self) -> ProviderKind;

    /// Loads backend-wide settings. Backends with nothing to load accept
    /// any configuration.
    fn configure<'a>(&'a self, config: &'a CloudConfig) -> ManagerFuture<'a, ()>;

    /// Returns the settings currently in effect.
    fn settings(&self) -> ProviderSettings;

    /// Checks backend-specific settings.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Validation`] naming the invalid setting.
    fn validate(&self, settings: &ProviderSettings) -> Result<(), ManagerError>;

    /// Starts an instance for `host` and returns the host unchanged.
    fn spawn_host(&self, host: Host) -> ManagerFuture<'_, Host>;

    /// Reports the instance status.
    fn instance_status<'a>(&'a self, host: &'a Host) -> ManagerFuture<'a, CloudStatus>;

    /// Reports statuses for several hosts, in input order. Either every
    /// status is returned or none is.
    fn instance_statuses<'a>(&'a self, hosts: &'a [Host]) -> ManagerFuture<'a, Vec<CloudStatus>>;

    /// Reports the instance DNS name, empty when none is assigned yet.
    fn dns_name<'a>(&'a self, host: &'a Host) -> ManagerFuture<'a, String>;

    /// Terminates the instance and records `user` on the host.
    ///
    /// Rejected with [`ManagerError::AlreadyTerminated`] when the host's
    /// durable status is already terminated. A failed call leaves backend
    /// state unchanged.
    fn terminate_instance<'a>(&'a self, host: &'a mut Host, user: &'a str)
    -> ManagerFuture<'a, ()>;

    /// Reports whether the instance is ready for work.
    fn is_up<'a>(&'a self, host: &'a Host) -> ManagerFuture<'a, bool>;

    /// Marks post-boot initialisation as done. Safe to call repeatedly.
    fn on_up<'a>(&'a self, host: &'a Host) -> ManagerFuture<'a, OnUpOutcome>;

    /// Returns SSH connection options for the instance.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::HostNotFound`] when the host is untracked.
    fn ssh_options(&self, host: &Host, key_path: &str) -> Result<Vec<String>, ManagerError>;

    /// Time left in the current billing interval; zero when untracked.
    fn time_til_next_payment(&self, host: &Host) -> Duration;

    /// Cost of running `host` between `start` and `end`.
    fn cost_for_duration<'a>(
        &'a self,
        host: &'a Host,
        start: SystemTime,
        end: SystemTime,
        config: &'a CloudConfig,
    ) -> ManagerFuture<'a, f64>;
}

/// Runs a manager operation, abandoning it once `deadline` elapses.
///
/// Dropping the future cancels the operation; backends must not leave partial
/// state behind when that happens.
///
/// # Errors
///
/// Returns [`ManagerError::DeadlineExceeded`] when the deadline passes, or
/// the operation's own error.
pub async fn with_deadline<T>(
    operation: &str,
    deadline: Duration,
    future: ManagerFuture<'_, T>,
) -> Result<T, ManagerError> {
    tokio::time::timeout(deadline, future)
        .await
        .map_err(|_| ManagerError::DeadlineExceeded {
            operation: operation.to_owned(),
            deadline,
        })?
}

/// Fetches the record for `host`, failing when it is untracked.
pub(crate) fn tracked(
    registry: &InstanceRegistry,
    host: &Host,
) -> Result<InstanceRecord, ManagerError> {
    registry
        .lookup(&host.id)
        .ok_or_else(|| ManagerError::not_found(host))
}

/// Fetches statuses for `hosts` under one shared lock.
pub(crate) fn tracked_statuses(
    registry: &InstanceRegistry,
    hosts: &[Host],
) -> Result<Vec<CloudStatus>, ManagerError> {
    registry
        .lookup_many(hosts.iter().map(|host| host.id.as_str()))
        .into_iter()
        .zip(hosts)
        .map(|(record, host)| {
            record
                .map(|found| found.status)
                .ok_or_else(|| ManagerError::not_found(host))
        })
        .collect()
}

/// Elapsed time between `start` and `end`.
pub(crate) fn billing_interval(start: SystemTime, end: SystemTime) -> Result<Duration, ManagerError> {
    end.duration_since(start).map_err(|_| {
        ManagerError::InvalidInput(String::from("cost interval ends before it starts"))
    })
}
