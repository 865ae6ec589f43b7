//! Data directory and file layout resolution.
//!
//! # Responsibility
//! - Decide where stores, backend scope files and logs live.
//! - Read environment overrides in one place.
//!
//! # Invariants
//! - Resolved directories are absolute.

use crate::backend::FileBackend;
use crate::repo::metadata_store::RemarkRecord;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Overrides the data directory.
pub const DATA_DIR_ENV: &str = "ENVMGR_HOME";
/// Overrides the log level.
pub const LOG_LEVEL_ENV: &str = "ENVMGR_LOG";
/// Points the system scope at a different file, e.g. one under `/etc`.
pub const SYSTEM_FILE_ENV: &str = "ENVMGR_SYSTEM_FILE";

pub const GROUP_FILE_NAME: &str = "env_group.json";
pub const PROFILE_FILE_NAME: &str = "envmgr_profiles.json";
pub const SYSTEM_SCOPE_FILE_NAME: &str = "env_system.json";
pub const USER_SCOPE_FILE_NAME: &str = "env_user.json";
pub const CHANGE_STAMP_FILE_NAME: &str = "env_changed.stamp";
pub const LOG_DIR_NAME: &str = "logs";

#[derive(Debug)]
pub enum ConfigError {
    /// Working directory is needed to resolve a relative path but unavailable.
    CurrentDir(std::io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CurrentDir(err) => write!(f, "cannot resolve working directory: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CurrentDir(err) => Some(err),
        }
    }
}

/// Resolved runtime layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvMgrConfig {
    pub data_dir: PathBuf,
    pub system_file: PathBuf,
    pub log_level: Option<String>,
    pub force_system_privilege: bool,
}

impl EnvMgrConfig {
    /// Layout rooted at `data_dir` with no overrides.
    pub fn from_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            system_file: data_dir.join(SYSTEM_SCOPE_FILE_NAME),
            data_dir,
            log_level: None,
            force_system_privilege: false,
        }
    }

    /// Resolves the layout from an explicit directory or the process environment.
    pub fn resolve(explicit_dir: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::resolve_with(explicit_dir, |key| std::env::var(key).ok())
    }

    /// Same as [`EnvMgrConfig::resolve`] with an injectable variable lookup.
    ///
    /// Precedence: explicit dir, then `ENVMGR_HOME`, then the working directory.
    pub fn resolve_with<F>(explicit_dir: Option<PathBuf>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let data_dir = match explicit_dir.or_else(|| non_empty(DATA_DIR_ENV).map(PathBuf::from)) {
            Some(dir) => absolutize(dir)?,
            None => std::env::current_dir().map_err(ConfigError::CurrentDir)?,
        };

        let mut config = Self::from_data_dir(data_dir);
        if let Some(system_file) = non_empty(SYSTEM_FILE_ENV) {
            config.system_file = absolutize(PathBuf::from(system_file))?;
        }
        config.log_level = non_empty(LOG_LEVEL_ENV);
        Ok(config)
    }

    pub fn remark_path<R: RemarkRecord>(&self) -> PathBuf {
        self.data_dir.join(R::FILE_NAME)
    }

    pub fn group_path(&self) -> PathBuf {
        self.data_dir.join(GROUP_FILE_NAME)
    }

    pub fn profile_path(&self) -> PathBuf {
        self.data_dir.join(PROFILE_FILE_NAME)
    }

    pub fn user_scope_path(&self) -> PathBuf {
        self.data_dir.join(USER_SCOPE_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join(LOG_DIR_NAME)
    }

    /// Builds the file backend for this layout.
    pub fn file_backend(&self) -> FileBackend {
        FileBackend::new(
            self.system_file.clone(),
            self.user_scope_path(),
            self.data_dir.join(CHANGE_STAMP_FILE_NAME),
        )
        .with_forced_system_privilege(self.force_system_privilege)
    }
}

fn absolutize(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::{EnvMgrConfig, DATA_DIR_ENV, LOG_LEVEL_ENV, SYSTEM_FILE_ENV};
    use crate::repo::metadata_store::{CommentRecord, PropertyRecord};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(values: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn explicit_dir_wins_over_env() {
        let config = EnvMgrConfig::resolve_with(
            Some(PathBuf::from("/srv/envmgr")),
            lookup(&[(DATA_DIR_ENV, "/tmp/other")]),
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/envmgr"));
        assert_eq!(
            config.system_file,
            PathBuf::from("/srv/envmgr/env_system.json")
        );
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = EnvMgrConfig::resolve_with(
            None,
            lookup(&[
                (DATA_DIR_ENV, "/var/lib/envmgr"),
                (SYSTEM_FILE_ENV, "/etc/envmgr/system.json"),
                (LOG_LEVEL_ENV, "warn"),
            ]),
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/envmgr"));
        assert_eq!(config.system_file, PathBuf::from("/etc/envmgr/system.json"));
        assert_eq!(config.log_level.as_deref(), Some("warn"));
    }

    #[test]
    fn blank_env_falls_back_to_working_directory() {
        let config = EnvMgrConfig::resolve_with(None, lookup(&[(DATA_DIR_ENV, "  ")])).unwrap();
        assert_eq!(config.data_dir, std::env::current_dir().unwrap());
    }

    #[test]
    fn remark_paths_follow_record_type() {
        let config = EnvMgrConfig::from_data_dir("/data");
        assert_eq!(
            config.remark_path::<PropertyRecord>(),
            PathBuf::from("/data/env_property.json")
        );
        assert_eq!(
            config.remark_path::<CommentRecord>(),
            PathBuf::from("/data/envmgr_comments.json")
        );
        assert_eq!(config.log_dir(), PathBuf::from("/data/logs"));
    }
}
