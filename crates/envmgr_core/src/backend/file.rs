//! File-backed variable backend.
//!
//! # Responsibility
//! - Persist each scope as one JSON object (`name -> value`) on disk.
//! - Derive write privilege from file-system permissions.
//! - Record change broadcasts in a stamp file other processes can poll.
//!
//! # Invariants
//! - A scope file is rewritten whole on every write, under one process lock.
//! - Missing scope files read as empty scopes; unparsable ones are failures.

use super::{BackendError, BackendResult, VariableBackend};
use crate::model::variable::Scope;
use log::{info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Variable backend that keeps scopes in JSON files.
pub struct FileBackend {
    system_path: PathBuf,
    user_path: PathBuf,
    stamp_path: PathBuf,
    force_system_privilege: bool,
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Creates a backend over explicit scope files and a broadcast stamp file.
    pub fn new(
        system_path: impl Into<PathBuf>,
        user_path: impl Into<PathBuf>,
        stamp_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            system_path: system_path.into(),
            user_path: user_path.into(),
            stamp_path: stamp_path.into(),
            force_system_privilege: false,
            write_lock: Mutex::new(()),
        }
    }

    /// Treats the system scope as writable regardless of file permissions.
    pub fn with_forced_system_privilege(mut self, forced: bool) -> Self {
        self.force_system_privilege = forced;
        self
    }

    pub fn scope_path(&self, scope: Scope) -> &Path {
        match scope {
            Scope::System => &self.system_path,
            Scope::User => &self.user_path,
        }
    }

    fn read_scope(&self, scope: Scope) -> BackendResult<BTreeMap<String, String>> {
        let path = self.scope_path(scope);
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(io_failure(scope, "", path, err)),
        };
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&data).map_err(|err| {
            BackendError::failure(
                Some(scope),
                format!("unparsable scope file `{}`: {err}", path.display()),
            )
        })
    }

    fn write_scope(
        &self,
        scope: Scope,
        name: &str,
        table: &BTreeMap<String, String>,
    ) -> BackendResult<()> {
        let path = self.scope_path(scope);
        let data = serde_json::to_string_pretty(table)
            .map_err(|err| BackendError::failure(Some(scope), err.to_string()))?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| io_failure(scope, name, path, err))?;
        }
        fs::write(path, data).map_err(|err| io_failure(scope, name, path, err))
    }

    fn mutate_scope(
        &self,
        scope: Scope,
        name: &str,
        mutate: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> BackendResult<()> {
        if !self.has_write_privilege(scope) {
            return Err(BackendError::PermissionDenied {
                scope,
                name: name.to_string(),
            });
        }

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut table = self.read_scope(scope)?;
        if mutate(&mut table) {
            self.write_scope(scope, name, &table)?;
        }
        Ok(())
    }
}

impl VariableBackend for FileBackend {
    fn list_variables(&self, scope: Scope) -> BackendResult<Vec<(String, String)>> {
        Ok(self.read_scope(scope)?.into_iter().collect())
    }

    fn set_variable(&self, scope: Scope, name: &str, value: &str) -> BackendResult<()> {
        self.mutate_scope(scope, name, |table| {
            table.insert(name.to_string(), value.to_string());
            true
        })
    }

    fn delete_variable(&self, scope: Scope, name: &str) -> BackendResult<()> {
        self.mutate_scope(scope, name, |table| table.remove(name).is_some())
    }

    fn notify_changed(&self) -> BackendResult<()> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        fs::write(&self.stamp_path, millis.to_string()).map_err(|err| {
            warn!(
                "event=env_broadcast module=backend status=error path={} error={}",
                self.stamp_path.display(),
                err
            );
            BackendError::failure(None, format!("failed to write change stamp: {err}"))
        })?;
        info!("event=env_broadcast module=backend status=ok stamp={millis}");
        Ok(())
    }

    fn has_write_privilege(&self, scope: Scope) -> bool {
        if scope == Scope::System && self.force_system_privilege {
            return true;
        }
        path_is_writable(self.scope_path(scope))
    }
}

fn path_is_writable(path: &Path) -> bool {
    if let Ok(metadata) = fs::metadata(path) {
        return !metadata.permissions().readonly();
    }
    match path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        Some(parent) => match fs::metadata(parent) {
            Ok(metadata) => !metadata.permissions().readonly(),
            // Parent will be created on first write.
            Err(_) => true,
        },
        None => true,
    }
}

fn io_failure(scope: Scope, name: &str, path: &Path, err: std::io::Error) -> BackendError {
    if err.kind() == ErrorKind::PermissionDenied {
        return BackendError::PermissionDenied {
            scope,
            name: name.to_string(),
        };
    }
    BackendError::failure(Some(scope), format!("`{}`: {err}", path.display()))
}
