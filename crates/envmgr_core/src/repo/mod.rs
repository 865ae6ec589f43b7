//! Durable stores for metadata, groups and profiles.
//!
//! # Responsibility
//! - Keep one in-memory table per store behind a reader/writer lock.
//! - Rewrite the whole backing JSON array on every mutation.
//! - Recover from missing or corrupt files by degrading to an empty table.
//!
//! # Invariants
//! - Writers hold the exclusive lock across mutation and flush, and publish
//!   the new table only after the flush succeeded.
//! - Readers only ever observe persisted states.
//! - Load failures are never surfaced as errors; they are reported through
//!   `LoadStatus`.

pub mod group_store;
mod json_file;
pub mod metadata_store;
pub mod profile_store;

pub use json_file::LoadStatus;

use crate::model::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level failure.
#[derive(Debug)]
pub enum StoreError {
    /// Backing file could not be written.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Table could not be serialized.
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
    GroupNotFound(String),
    ProfileNotFound(String),
    Validation(ValidationError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::GroupNotFound(_) | Self::ProfileNotFound(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to write store file `{}`: {source}", path.display())
            }
            Self::Encode { path, source } => {
                write!(f, "failed to encode store file `{}`: {source}", path.display())
            }
            Self::GroupNotFound(name) => write!(f, "group not found: {name}"),
            Self::ProfileNotFound(name) => write!(f, "profile not found: {name}"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Encode { source, .. } => Some(source),
            Self::Validation(err) => Some(err),
            Self::GroupNotFound(_) | Self::ProfileNotFound(_) => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}
