//! Backend for a fixed pool of pre-provisioned machines.
//!
//! Pool machines already exist, so the backend cannot spawn new ones. Each
//! configured machine is seeded into the registry as a running, reachable
//! instance whose DNS name is its host name. Termination only records the
//! transition; the machine itself is left alone.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;
use thiserror::Error;

use crate::config::CloudConfig;
use crate::host::Host;
use crate::manager::{
    Manager, ManagerError, ManagerFuture, OnUpOutcome, billing_interval, tracked,
    tracked_statuses,
};
use crate::provider::ProviderKind;
use crate::registry::{InstanceRecord, InstanceRegistry};
use crate::settings::{ProviderSettings, StaticSettings};
use crate::status::CloudStatus;

/// Errors specific to the static pool backend.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum StaticHostsError {
    /// Raised when a caller asks the pool for a new machine.
    #[error("static pools cannot spawn new hosts (requested {host_id})")]
    SpawnUnsupported {
        /// Identifier of the requested host.
        host_id: String,
    },
}

/// Manager for a fixed set of machines.
#[derive(Debug)]
pub struct StaticManager {
    settings: RwLock<StaticSettings>,
    registry: Arc<InstanceRegistry>,
}

impl StaticManager {
    /// Creates a backend for the pool described by `settings` and seeds the
    /// registry with its machines.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Validation`] when the settings are invalid.
    pub fn new(
        settings: StaticSettings,
        registry: Arc<InstanceRegistry>,
    ) -> Result<Self, ManagerError> {
        settings.validate()?;
        seed(&registry, &settings);
        Ok(Self {
            settings: RwLock::new(settings),
            registry,
        })
    }

    /// Creates a backend from the static pool fields of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Validation`] when the derived settings are
    /// invalid.
    pub fn from_config(
        config: &CloudConfig,
        registry: Arc<InstanceRegistry>,
    ) -> Result<Self, ManagerError> {
        Self::new(config.static_settings(), registry)
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
                record.is_up = false;
                Ok(())
            })
            .unwrap_or_else(|| Err(ManagerError::not_found(host)))
            .inspect_err(|err| {
                if matches!(err, ManagerError::AlreadyTerminated { .. }) {
                    tracing::warn!(host_id = %host_id, provider = "static", "rejected double termination");
                }
            })
    }
}

/// Adds a running record for every pool machine not yet tracked.
fn seed(registry: &InstanceRegistry, settings: &StaticSettings) {
    for name in &settings.hosts {
        let record = InstanceRecord {
            status: CloudStatus::Running,
            is_up: true,
            is_ssh_reachable: true,
            ssh_options: vec![String::from("-o"), format!("User={}", settings.ssh_user)],
            dns_name: name.clone(),
            ..InstanceRecord::fresh(name.clone())
        };
        if registry.insert_if_absent(name.clone(), record) {
            tracing::debug!(host_id = %name, provider = "static", "seeded pool machine");
        }
    }
}

impl Manager for StaticManager {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Static
    }

    fn configure<'a>(&'a self, config: &'a CloudConfig) -> ManagerFuture<'a, ()> {
        Box::pin(async move {
            let settings = config.static_settings();
            settings.validate()?;
            seed(&self.registry, &settings);
            *self.settings.write() = settings;
            Ok(())
        })
    }

    fn settings(&self) -> ProviderSettings {
        ProviderSettings::Static(self.settings.read().clone())
    }

    fn validate(&self, settings: &ProviderSettings) -> Result<(), ManagerError> {
        match settings {
            ProviderSettings::Static(pool) => pool.validate(),
            ProviderSettings::Mock => Err(ManagerError::Validation(String::from(
                "provider: static backend requires static pool settings",
            ))),
        }
    }

    fn spawn_host(&self, host: Host) -> ManagerFuture<'_, Host> {
        Box::pin(async move {
            Err(ManagerError::backend(
                ProviderKind::Static,
                format!("spawn host {}", host.id),
                StaticHostsError::SpawnUnsupported {
                    host_id: host.id.clone(),
                },
            ))
        })
    }

    fn instance_status<'a>(&'a self, host: &'a Host) -> ManagerFuture<'a, CloudStatus> {
        Box::pin(async move { Ok(tracked(&self.registry, host)?.status) })
    }

    fn instance_statuses<'a>(&'a self, hosts: &'a [Host]) -> ManagerFuture<'a, Vec<CloudStatus>> {
        Box::pin(async move { tracked_statuses(&self.registry, hosts) })
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
            tracing::debug!(host_id = %host.id, provider = "static", user, "released pool machine");
            Ok(())
        })
    }

    fn is_up<'a>(&'a self, host: &'a Host) -> ManagerFuture<'a, bool> {
        Box::pin(async move { Ok(tracked(&self.registry, host)?.is_up) })
    }

    fn on_up<'a>(&'a self, host: &'a Host) -> ManagerFuture<'a, OnUpOutcome> {
        Box::pin(async move {
            self.registry
                .update(&host.id, |record| {
                    let first = !record.on_up_ran;
                    record.on_up_ran = true;
                    Ok(if first {
                        OnUpOutcome::FirstRun
                    } else {
                        OnUpOutcome::AlreadyRan
                    })
                })
                .unwrap_or_else(|| Err(ManagerError::not_found(host)))
        })
    }

    fn ssh_options(&self, host: &Host, key_path: &str) -> Result<Vec<String>, ManagerError> {
        let record = tracked(&self.registry, host)?;
        let mut options = Vec::with_capacity(record.ssh_options.len() + 2);
        let trimmed_key = key_path.trim();
        if !trimmed_key.is_empty() {
            options.push(String::from("-i"));
            options.push(trimmed_key.to_owned());
        }
        options.extend(record.ssh_options);
        Ok(options)
    }

    // Pool machines are not billed per use.
    fn time_til_next_payment(&self, _host: &Host) -> Duration {
        Duration::ZERO
    }

    fn cost_for_duration<'a>(
        &'a self,
        _host: &'a Host,
        start: SystemTime,
        end: SystemTime,
        _config: &'a CloudConfig,
    ) -> ManagerFuture<'a, f64> {
        Box::pin(async move {
            billing_interval(start, end)?;
            Ok(0.0)
        })
    }
}
