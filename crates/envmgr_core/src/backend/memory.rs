//! In-process variable backend.
//!
//! Used for tests and dry runs. Privilege and failures are switchable so
//! permission and partial-failure paths can be exercised without an OS store.

use super::{BackendError, BackendResult, VariableBackend};
use crate::model::variable::Scope;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct MemoryState {
    scopes: BTreeMap<Scope, BTreeMap<String, String>>,
    failing: Vec<(Scope, String)>,
}

/// Thread-safe in-memory backend.
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    system_writable: AtomicBool,
    broadcast_fails: AtomicBool,
    broadcasts: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates an empty backend with system-scope privilege granted.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            system_writable: AtomicBool::new(true),
            broadcast_fails: AtomicBool::new(false),
            broadcasts: AtomicUsize::new(0),
        }
    }

    /// Seeds variables without privilege checks.
    pub fn with_variables<I, K, V>(self, scope: Scope, variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        {
            let mut state = self.lock();
            let table = state.scopes.entry(scope).or_default();
            for (name, value) in variables {
                table.insert(name.into(), value.into());
            }
        }
        self
    }

    /// Grants or revokes system-scope write privilege.
    pub fn set_system_writable(&self, writable: bool) {
        self.system_writable.store(writable, Ordering::SeqCst);
    }

    /// Makes every later write of `name` in `scope` fail with a generic failure.
    pub fn fail_writes_for(&self, scope: Scope, name: impl Into<String>) {
        self.lock().failing.push((scope, name.into()));
    }

    /// Makes `notify_changed` fail.
    pub fn set_broadcast_fails(&self, fails: bool) {
        self.broadcast_fails.store(fails, Ordering::SeqCst);
    }

    /// Number of successful broadcasts so far.
    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }

    /// Reads one variable directly.
    pub fn get(&self, scope: Scope, name: &str) -> Option<String> {
        self.lock()
            .scopes
            .get(&scope)
            .and_then(|table| table.get(name).cloned())
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_writable(&self, state: &MemoryState, scope: Scope, name: &str) -> BackendResult<()> {
        if !self.has_write_privilege(scope) {
            return Err(BackendError::PermissionDenied {
                scope,
                name: name.to_string(),
            });
        }
        if state
            .failing
            .iter()
            .any(|(failing_scope, failing_name)| *failing_scope == scope && failing_name == name)
        {
            return Err(BackendError::failure(
                Some(scope),
                format!("write rejected for `{name}`"),
            ));
        }
        Ok(())
    }
}

impl VariableBackend for MemoryBackend {
    fn list_variables(&self, scope: Scope) -> BackendResult<Vec<(String, String)>> {
        Ok(self
            .lock()
            .scopes
            .get(&scope)
            .map(|table| {
                table
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn set_variable(&self, scope: Scope, name: &str, value: &str) -> BackendResult<()> {
        let mut state = self.lock();
        self.ensure_writable(&state, scope, name)?;
        state
            .scopes
            .entry(scope)
            .or_default()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn delete_variable(&self, scope: Scope, name: &str) -> BackendResult<()> {
        let mut state = self.lock();
        self.ensure_writable(&state, scope, name)?;
        if let Some(table) = state.scopes.get_mut(&scope) {
            table.remove(name);
        }
        Ok(())
    }

    fn notify_changed(&self) -> BackendResult<()> {
        if self.broadcast_fails.load(Ordering::SeqCst) {
            return Err(BackendError::failure(None, "broadcast timed out"));
        }
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn has_write_privilege(&self, scope: Scope) -> bool {
        match scope {
            Scope::System => self.system_writable.load(Ordering::SeqCst),
            Scope::User => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryBackend;
    use crate::backend::VariableBackend;
    use crate::model::variable::Scope;

    #[test]
    fn batch_set_stops_at_first_failure() {
        let backend = MemoryBackend::new();
        backend.fail_writes_for(Scope::User, "B");

        let entries = vec![
            ("A".to_string(), "1".to_string()),
            ("B".to_string(), "2".to_string()),
            ("C".to_string(), "3".to_string()),
        ];
        let err = backend
            .batch_set(Scope::User, &entries)
            .expect_err("B must fail");
        assert!(!err.is_permission_denied());
        assert_eq!(backend.get(Scope::User, "A").as_deref(), Some("1"));
        assert_eq!(backend.get(Scope::User, "C"), None);
    }

    #[test]
    fn system_write_without_privilege_is_permission_denied() {
        let backend = MemoryBackend::new();
        backend.set_system_writable(false);

        let err = backend
            .set_variable(Scope::System, "JAVA_HOME", "/opt/jdk")
            .expect_err("system write must be rejected");
        assert!(err.is_permission_denied());
        assert!(backend.set_variable(Scope::User, "JAVA_HOME", "/opt/jdk").is_ok());
    }

    #[test]
    fn delete_absent_variable_succeeds() {
        let backend = MemoryBackend::new();
        backend
            .delete_variable(Scope::User, "NOPE")
            .expect("absent delete is success");
    }
}
