//! Core of the environment manager.
//!
//! Merges system- and user-scoped variables with stored remarks and switches
//! named variable sets (groups) into the live environment. This crate owns
//! every invariant; outer layers only call `EnvService`.

pub mod backend;
pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use backend::{BackendError, BackendResult, FileBackend, MemoryBackend, VariableBackend};
pub use config::{ConfigError, EnvMgrConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::group::{Group, GroupItem};
pub use model::profile::Profile;
pub use model::variable::{Scope, Variable};
pub use model::ValidationError;
pub use repo::group_store::GroupStore;
pub use repo::metadata_store::{
    CommentRecord, CommentStore, MetadataStore, PropertyKey, PropertyRecord, PropertyStore,
    RemarkRecord,
};
pub use repo::profile_store::ProfileStore;
pub use repo::{LoadStatus, StoreError, StoreResult};
pub use service::env_service::EnvService;
pub use service::merge::merge_variables;
pub use service::switch::{plan_switch, SwitchOutcome, SwitchPlan};
pub use service::{EnvServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
