//! Use-case services over the variable backend and stores.
//!
//! # Responsibility
//! - Merge live backend state with stored remarks into one view.
//! - Run the group switch state machine.
//! - Expose the upward API surface through `EnvService`.
//!
//! # Invariants
//! - Backend permission failures stay distinguishable all the way up.
//! - Load failures never reach callers; save and backend failures always do.

pub mod env_service;
pub mod merge;
pub mod switch;

use crate::backend::BackendError;
use crate::model::variable::Scope;
use crate::model::ValidationError;
use crate::repo::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, EnvServiceError>;

/// Errors returned by engine-level operations.
#[derive(Debug)]
pub enum EnvServiceError {
    /// Named group, item or profile does not exist.
    NotFound { kind: &'static str, name: String },
    /// Write needs elevated privilege; the caller may retry elevated.
    PermissionDenied { scope: Scope, name: String },
    /// Backend rejected a call for any other reason.
    Backend(BackendError),
    /// A store could not persist its table.
    Store(StoreError),
    /// Input failed domain validation.
    Validation(ValidationError),
}

impl EnvServiceError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for EnvServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, name } => write!(f, "{kind} not found: {name}"),
            Self::PermissionDenied { scope, name } => write!(
                f,
                "permission denied writing {scope} variable `{name}`; rerun with elevated privilege"
            ),
            Self::Backend(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EnvServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::NotFound { .. } | Self::PermissionDenied { .. } => None,
        }
    }
}

impl From<BackendError> for EnvServiceError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::PermissionDenied { scope, name } => Self::PermissionDenied { scope, name },
            other => Self::Backend(other),
        }
    }
}

impl From<StoreError> for EnvServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::GroupNotFound(name) => Self::NotFound {
                kind: "group",
                name,
            },
            StoreError::ProfileNotFound(name) => Self::NotFound {
                kind: "profile",
                name,
            },
            StoreError::Validation(err) => Self::Validation(err),
            other => Self::Store(other),
        }
    }
}

impl From<ValidationError> for EnvServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}
