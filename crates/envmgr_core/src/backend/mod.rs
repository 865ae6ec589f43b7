//! Variable backend contract and implementations.
//!
//! # Responsibility
//! - Define the primitive operations the core needs from the live
//!   environment store (list/set/delete per scope, change broadcast).
//! - Keep permission failures distinguishable from other backend failures.
//!
//! # Invariants
//! - `delete_variable` treats an already-absent variable as success.
//! - `batch_set` is fail-fast and never rolls back earlier writes.
//! - The core is never the sole writer; callers must re-read instead of caching.

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use crate::model::variable::Scope;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type BackendResult<T> = Result<T, BackendError>;

/// Failure reported by a variable backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Write rejected because the caller lacks privilege for `scope`.
    PermissionDenied { scope: Scope, name: String },
    /// Any other rejection. `scope` is `None` for scope-less calls (broadcast).
    Failure {
        scope: Option<Scope>,
        message: String,
    },
}

impl BackendError {
    pub fn failure(scope: Option<Scope>, message: impl Into<String>) -> Self {
        Self::Failure {
            scope,
            message: message.into(),
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied { scope, name } => write!(
                f,
                "permission denied writing {scope} variable `{name}`; elevated privilege required"
            ),
            Self::Failure {
                scope: Some(scope),
                message,
            } => write!(f, "{scope} backend failure: {message}"),
            Self::Failure {
                scope: None,
                message,
            } => write!(f, "backend failure: {message}"),
        }
    }
}

impl Error for BackendError {}

/// Primitive access to the two authoritative variable scopes.
pub trait VariableBackend: Send + Sync {
    /// Lists all `(name, value)` pairs stored in `scope`.
    fn list_variables(&self, scope: Scope) -> BackendResult<Vec<(String, String)>>;

    /// Creates or overwrites one variable.
    fn set_variable(&self, scope: Scope, name: &str, value: &str) -> BackendResult<()>;

    /// Removes one variable; absent variables are not an error.
    fn delete_variable(&self, scope: Scope, name: &str) -> BackendResult<()>;

    /// Applies writes in order, stopping at the first failure.
    fn batch_set(&self, scope: Scope, entries: &[(String, String)]) -> BackendResult<()> {
        for (name, value) in entries {
            self.set_variable(scope, name, value)?;
        }
        Ok(())
    }

    /// Tells running processes that environment state changed.
    fn notify_changed(&self) -> BackendResult<()>;

    /// Returns whether writes to `scope` are expected to succeed.
    fn has_write_privilege(&self, scope: Scope) -> bool;
}
