//! Whole-file JSON array persistence shared by every store.

use super::{StoreError, StoreResult};
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// How a store's table was initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// File parsed; holds the number of records read.
    Loaded(usize),
    /// File did not exist.
    Missing,
    /// File existed but was empty or whitespace only.
    Empty,
    /// File content was not a valid record array.
    Malformed(String),
    /// File existed but could not be read.
    Unreadable(String),
}

impl LoadStatus {
    /// True when the store started from an empty table instead of file data.
    pub fn is_recovered(&self) -> bool {
        !matches!(self, Self::Loaded(_))
    }

    fn reason(&self) -> &'static str {
        match self {
            Self::Loaded(_) => "loaded",
            Self::Missing => "missing",
            Self::Empty => "empty",
            Self::Malformed(_) => "malformed",
            Self::Unreadable(_) => "unreadable",
        }
    }
}

/// Loads a record array, degrading to an empty table on any failure.
///
/// Missing, empty and malformed files are rewritten as `[]` best-effort so the
/// next start reads a well-formed file. Unreadable files are left alone.
pub(crate) fn load_or_reset<T>(store: &'static str, path: &Path) -> (Vec<T>, LoadStatus)
where
    T: Serialize + DeserializeOwned,
{
    let (records, status) = read_records(path);
    match &status {
        LoadStatus::Loaded(count) => {
            info!(
                "event=store_load module=repo status=ok store={store} path={} records={count}",
                path.display()
            );
        }
        LoadStatus::Unreadable(reason) | LoadStatus::Malformed(reason) => {
            warn!(
                "event=store_load module=repo status=recovered store={store} path={} reason={} error={}",
                path.display(),
                status.reason(),
                reason
            );
        }
        LoadStatus::Missing | LoadStatus::Empty => {
            info!(
                "event=store_load module=repo status=recovered store={store} path={} reason={}",
                path.display(),
                status.reason()
            );
        }
    }

    if matches!(
        status,
        LoadStatus::Missing | LoadStatus::Empty | LoadStatus::Malformed(_)
    ) {
        if let Err(err) = write_records::<T>(path, &[]) {
            warn!(
                "event=store_reset module=repo status=error store={store} path={} error={}",
                path.display(),
                err
            );
        }
    }

    (records, status)
}

fn read_records<T: DeserializeOwned>(path: &Path) -> (Vec<T>, LoadStatus) {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => return (Vec::new(), LoadStatus::Missing),
        Err(err) => return (Vec::new(), LoadStatus::Unreadable(err.to_string())),
    };

    if data.iter().all(u8::is_ascii_whitespace) {
        return (Vec::new(), LoadStatus::Empty);
    }

    match serde_json::from_slice::<Vec<T>>(&data) {
        Ok(records) => {
            let count = records.len();
            (records, LoadStatus::Loaded(count))
        }
        Err(err) => (Vec::new(), LoadStatus::Malformed(err.to_string())),
    }
}

/// Rewrites the whole file as an indented JSON array.
///
/// An empty table is written as `[]`, never `null`.
pub(crate) fn write_records<T: Serialize>(path: &Path, records: &[T]) -> StoreResult<()> {
    let data = serde_json::to_vec_pretty(records).map_err(|source| StoreError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, data).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
