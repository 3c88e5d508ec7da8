//! Deterministic in-memory backend.
//!
//! [`MockManager`] implements the full manager contract over an injected
//! [`InstanceRegistry`] and makes no network calls. Tests seed instance
//! fields through [`MockManager::registry`] to script what the backend
//! reports.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::config::CloudConfig;
use crate::host::Host;
use crate::manager::{
    Manager, ManagerError, ManagerFuture, OnUpOutcome, billing_interval, tracked,
    tracked_statuses,
};
use crate::provider::ProviderKind;
use crate::registry::{InstanceRecord, InstanceRegistry};
use crate::settings::ProviderSettings;
use crate::status::CloudStatus;

/// Number of hosts the mock expects in every bulk status query.
pub const MOCK_STATUS_BATCH_SIZE: usize = 2;

const SECONDS_PER_MINUTE: f64 = 60.0;

/// Manager backed purely by an [`InstanceRegistry`].
#[derive(Clone, Debug)]
pub struct MockManager {
    registry: Arc<InstanceRegistry>,
}

impl MockManager {
    /// Creates a mock backend over `registry`.
    #[must_use]
    pub const fn new(registry: Arc<InstanceRegistry>) -> Self {
        Self { registry }
    }

    /// The registry holding this backend's instance state.
    #[must_use]
    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    fn terminate(&self, host: &mut Host, user: &str) -> Result<(), ManagerError> {
        let host_id = host.id.clone();
        self.registry
            .update(&host_id, |record| {
                if host.is_terminated() {
                    return Err(ManagerError::AlreadyTerminated {
                        host_id: host.id.clone(),
                    });
                }
                host.terminate(user)?;
                record.status = CloudStatus::Terminated;
                Ok(())
            })
            .unwrap_or_else(|| Err(ManagerError::not_found(host)))
            .inspect_err(|err| {
                if matches!(err, ManagerError::AlreadyTerminated { .. }) {
                    tracing::warn!(host_id = %host_id, provider = "mock", "rejected double termination");
                }
            })
    }
}

impl Manager for MockManager {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Mock
    }

    fn configure<'a>(&'a self, _config: &'a CloudConfig) -> ManagerFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }

    fn settings(&self) -> ProviderSettings {
        ProviderSettings::Mock
    }

    fn validate(&self, settings: &ProviderSettings) -> Result<(), ManagerError> {
        match settings {
            ProviderSettings::Mock => Ok(()),
            ProviderSettings::Static(_) => Err(ManagerError::Validation(String::from(
                "provider: mock backend cannot use static pool settings",
            ))),
        }
    }

    fn spawn_host(&self, host: Host) -> ManagerFuture<'_, Host> {
        Box::pin(async move {
            self.registry
                .set(host.id.clone(), InstanceRecord::fresh(host.id.clone()));
            tracing::debug!(host_id = %host.id, provider = "mock", "spawned instance");
            Ok(host)
        })
    }

    fn instance_status<'a>(&'a self, host: &'a Host) -> ManagerFuture<'a, CloudStatus> {
        Box::pin(async move { Ok(tracked(&self.registry, host)?.status) })
    }

    fn instance_statuses<'a>(&'a self, hosts: &'a [Host]) -> ManagerFuture<'a, Vec<CloudStatus>> {
        Box::pin(async move {
            if hosts.len() != MOCK_STATUS_BATCH_SIZE {
                return Err(ManagerError::InvalidInput(format!(
                    "expecting {MOCK_STATUS_BATCH_SIZE} hosts, got {}",
                    hosts.len()
                )));
            }
            tracked_statuses(&self.registry, hosts)
        })
    }

    fn dns_name<'a>(&'a self, host: &'a Host) -> ManagerFuture<'a, String> {
        Box::pin(async move { Ok(tracked(&self.registry, host)?.dns_name) })
    }

    fn terminate_instance<'a>(
        &'a self,
        host: &'a mut Host,
        user: &'a str,
    ) -> ManagerFuture<'a, ()> {
        Box::pin(async move {
            self.terminate(host, user)?;
            tracing::debug!(host_id = %host.id, provider = "mock", user, "terminated instance");
            Ok(())
        })
    }

    fn is_up<'a>(&'a self, host: &'a Host) -> ManagerFuture<'a, bool> {
        Box::pin(async move { Ok(tracked(&self.registry, host)?.is_up) })
    }

    fn on_up<'a>(&'a self, host: &'a Host) -> ManagerFuture<'a, OnUpOutcome> {
        Box::pin(async move {
            let outcome = self
                .registry
                .update(&host.id, |record| {
                    let outcome = if record.on_up_ran {
                        OnUpOutcome::AlreadyRan
                    } else {
                        OnUpOutcome::FirstRun
                    };
                    record.on_up_ran = true;
                    Ok::<_, ManagerError>(outcome)
                })
                .unwrap_or_else(|| Err(ManagerError::not_found(host)))?;
            tracing::debug!(host_id = %host.id, provider = "mock", ?outcome, "recorded post-boot hook");
            Ok(outcome)
        })
    }

    fn ssh_options(&self, host: &Host, _key_path: &str) -> Result<Vec<String>, ManagerError> {
        Ok(tracked(&self.registry, host)?.ssh_options)
    }

    fn time_til_next_payment(&self, host: &Host) -> Duration {
        self.registry
            .lookup(&host.id)
            .map_or(Duration::ZERO, |record| record.time_til_next_payment)
    }

    /// One unit of cost per minute of elapsed time.
    fn cost_for_duration<'a>(
        &'a self,
        _host: &'a Host,
        start: SystemTime,
        end: SystemTime,
        _config: &'a CloudConfig,
    ) -> ManagerFuture<'a, f64> {
        Box::pin(async move {
            let elapsed = billing_interval(start, end)?;
            #[expect(clippy::float_arithmetic, reason = "cost is a fractional minute count")]
            let minutes = elapsed.as_secs_f64() / SECONDS_PER_MINUTE;
            Ok(minutes)
        })
    }
}
