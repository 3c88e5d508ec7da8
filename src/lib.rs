//! Host provisioning for a continuous-integration platform.
//!
//! The crate puts every provisioning backend behind the [`Manager`] contract
//! so a scheduler can spawn, inspect, reach, bill, and terminate build hosts
//! without knowing which backend produced them. Backends track what they
//! observe in an [`InstanceRegistry`], which is injected rather than global so
//! each test or deployment controls its own instance state.

pub mod config;
pub mod host;
pub mod manager;
pub mod mock;
pub mod provider;
pub mod registry;
pub mod settings;
pub mod static_hosts;
pub mod status;
pub mod test_support;

pub use config::{CloudConfig, ConfigError};
pub use host::{Host, HostError};
pub use manager::{Manager, ManagerError, ManagerFuture, OnUpOutcome, with_deadline};
pub use mock::{MOCK_STATUS_BATCH_SIZE, MockManager};
pub use provider::{ProviderKind, get_manager};
pub use registry::{InstanceRecord, InstanceRegistry, Snapshot};
pub use settings::{ProviderSettings, StaticSettings};
pub use static_hosts::{StaticHostsError, StaticManager};
pub use status::{CloudStatus, HostStatus};
