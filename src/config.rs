//! Configuration loading via `ortho-config`.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::provider::ProviderKind;
use crate::settings::{DEFAULT_STATIC_SSH_USER, ProviderSettings, StaticSettings};

/// Provisioning configuration derived from environment variables,
/// configuration files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "HOSTPROV")]
pub struct CloudConfig {
    /// Backend used to provision hosts (`mock` or `static`).
    #[ortho_config(default = "mock".to_owned())]
    pub provider: String,
    /// Machines in the static pool, by host name.
    #[ortho_config(default = Vec::new())]
    pub static_hosts: Vec<String>,
    /// SSH user for static pool machines.
    #[ortho_config(default = DEFAULT_STATIC_SSH_USER.to_owned())]
    pub static_ssh_user: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Mock.as_str().to_owned(),
            static_hosts: Vec::new(),
            static_ssh_user: DEFAULT_STATIC_SSH_USER.to_owned(),
        }
    }
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn missing(&self) -> ConfigError {
        ConfigError::MissingField(format!(
            "missing {}: set {} or add {} to hostprov.toml",
            self.description, self.env_var, self.toml_key
        ))
    }
}

const PROVIDER: FieldMetadata = FieldMetadata::new("provider name", "HOSTPROV_PROVIDER", "provider");
const STATIC_HOSTS: FieldMetadata =
    FieldMetadata::new("static pool hosts", "HOSTPROV_STATIC_HOSTS", "static_hosts");
const STATIC_SSH_USER: FieldMetadata = FieldMetadata::new(
    "static pool SSH user",
    "HOSTPROV_STATIC_SSH_USER",
    "static_ssh_user",
);

impl CloudConfig {
    /// Configuration selecting the static pool backend.
    #[must_use]
    pub fn for_static_pool<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            provider: ProviderKind::Static.as_str().to_owned(),
            static_hosts: hosts.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags in
    /// that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("hostprov")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Parses the configured provider name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the name is blank and
    /// [`ConfigError::UnknownProvider`] when it is not a known backend.
    pub fn provider_kind(&self) -> Result<ProviderKind, ConfigError> {
        if self.provider.trim().is_empty() {
            return Err(PROVIDER.missing());
        }
        self.provider.parse()
    }

    /// Builds the backend settings described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn provider_settings(&self) -> Result<ProviderSettings, ConfigError> {
        self.validate()?;
        Ok(match self.provider_kind()? {
            ProviderKind::Mock => ProviderSettings::Mock,
            ProviderKind::Static => ProviderSettings::Static(self.static_settings()),
        })
    }

    /// Static pool settings taken from this configuration, without
    /// validation.
    #[must_use]
    pub fn static_settings(&self) -> StaticSettings {
        StaticSettings::new(&self.static_hosts, self.static_ssh_user.as_str())
    }

    /// Performs semantic validation. Error messages include guidance on how
    /// to provide missing values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::UnknownProvider`] for an unsupported provider.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider_kind()? == ProviderKind::Static {
            if self.static_hosts.iter().all(|host| host.trim().is_empty()) {
                return Err(STATIC_HOSTS.missing());
            }
            if self.static_ssh_user.trim().is_empty() {
                return Err(STATIC_SSH_USER.missing());
            }
        }
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates the configured provider is not a known backend.
    #[error("unknown provider '{0}': expected one of mock, static")]
    UnknownProvider(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
