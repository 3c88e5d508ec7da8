//! Backend selection.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{CloudConfig, ConfigError};
use crate::manager::{Manager, ManagerError};
use crate::mock::MockManager;
use crate::registry::InstanceRegistry;
use crate::static_hosts::StaticManager;

/// Known provisioning backends.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Deterministic in-memory backend used by tests.
    Mock,
    /// Fixed pool of pre-provisioned machines.
    Static,
}

impl ProviderKind {
    /// Name used in configuration files and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Static => "static",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "static" => Ok(Self::Static),
            _ => Err(ConfigError::UnknownProvider(value.trim().to_owned())),
        }
    }
}

/// Builds and configures the backend selected by `config`.
///
/// The registry is injected so callers decide whether backends share
/// instance state.
///
/// # Errors
///
/// Returns [`ManagerError::Validation`] when the configuration names an
/// unknown provider or the backend rejects its settings.
pub async fn get_manager(
    config: &CloudConfig,
    registry: Arc<InstanceRegistry>,
) -> Result<Arc<dyn Manager>, ManagerError> {
    let kind = config
        .provider_kind()
        .map_err(|err| ManagerError::Validation(err.to_string()))?;
    let manager: Arc<dyn Manager> = match kind {
        ProviderKind::Mock => Arc::new(MockManager::new(registry)),
        ProviderKind::Static => Arc::new(StaticManager::from_config(config, registry)?),
    };
    manager.configure(config).await?;
    tracing::debug!(provider = %kind, "provisioning manager ready");
    Ok(manager)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("mock", ProviderKind::Mock)]
    #[case(" Static ", ProviderKind::Static)]
    fn parses_known_providers(#[case] raw: &str, #[case] expected: ProviderKind) {
        let parsed: ProviderKind = raw
            .parse()
            .unwrap_or_else(|err| panic!("{raw} should parse: {err}"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn rejects_unknown_providers() {
        let err = "ec2".parse::<ProviderKind>().expect_err("ec2 is not built in");
        assert_eq!(err, ConfigError::UnknownProvider(String::from("ec2")));
    }
}
