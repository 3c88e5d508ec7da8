//! Backend-specific settings.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::manager::ManagerError;

/// Default SSH user for static pool machines.
pub const DEFAULT_STATIC_SSH_USER: &str = "root";

/// Settings for one provisioning backend, tagged by provider.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ProviderSettings {
    /// The in-memory test backend takes no settings.
    Mock,
    /// Settings for a fixed pool of pre-provisioned machines.
    Static(StaticSettings),
}

/// Settings for the static pool backend.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StaticSettings {
    /// Host names of the machines in the pool. Each name is also the host id.
    pub hosts: Vec<String>,
    /// User to connect as over SSH.
    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,
}

fn default_ssh_user() -> String {
    DEFAULT_STATIC_SSH_USER.to_owned()
}

impl StaticSettings {
    /// Creates settings for the given hosts, trimming each name.
    #[must_use]
    pub fn new<I, S>(hosts: I, ssh_user: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|host| host.as_ref().trim().to_owned())
                .collect(),
            ssh_user: ssh_user.into().trim().to_owned(),
        }
    }

    /// Checks that the pool is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Validation`] naming the offending setting when
    /// the pool is empty, a host name is blank or repeated, or the SSH user
    /// is blank.
    pub fn validate(&self) -> Result<(), ManagerError> {
        if self.hosts.is_empty() {
            return Err(ManagerError::Validation(String::from(
                "hosts: static pool must list at least one host",
            )));
        }
        let mut seen = BTreeSet::new();
        for host in &self.hosts {
            if host.trim().is_empty() {
                return Err(ManagerError::Validation(String::from(
                    "hosts: host names must not be blank",
                )));
            }
            if !seen.insert(host.as_str()) {
                return Err(ManagerError::Validation(format!(
                    "hosts: duplicate host '{host}'"
                )));
            }
        }
        if self.ssh_user.trim().is_empty() {
            return Err(ManagerError::Validation(String::from(
                "ssh_user: must not be blank",
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StaticSettings::new(Vec::<&str>::new(), "root"), "hosts")]
    #[case(StaticSettings::new(["a", " "], "root"), "hosts")]
    #[case(StaticSettings::new(["a", "a"], "root"), "duplicate host 'a'")]
    #[case(StaticSettings::new(["a"], "  "), "ssh_user")]
    fn validate_names_the_invalid_setting(#[case] settings: StaticSettings, #[case] needle: &str) {
        let err = settings.validate().expect_err("settings should be rejected");
        assert!(
            err.to_string().contains(needle),
            "error should mention {needle}: {err}"
        );
    }

    #[test]
    fn new_trims_host_names() {
        let settings = StaticSettings::new([" build-1 ", "build-2"], " ci ");
        assert_eq!(settings.hosts, vec!["build-1", "build-2"]);
        assert_eq!(settings.ssh_user, "ci");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn settings_are_tagged_by_provider() {
        let parsed: ProviderSettings =
            serde_json::from_str(r#"{"provider":"static","hosts":["build-1"]}"#)
                .unwrap_or_else(|err| panic!("parse static settings: {err}"));
        assert_eq!(
            parsed,
            ProviderSettings::Static(StaticSettings::new(["build-1"], DEFAULT_STATIC_SSH_USER))
        );

        let mock: ProviderSettings = serde_json::from_str(r#"{"provider":"mock"}"#)
            .unwrap_or_else(|err| panic!("parse mock settings: {err}"));
        assert_eq!(mock, ProviderSettings::Mock);
    }
}
