//! Remark metadata stores.
//!
//! # Responsibility
//! - Persist free-text remarks that the variable backend cannot hold.
//! - Support name-only keys (`CommentStore`) and `(name, scope)` keys
//!   (`PropertyStore`) through one generic implementation.
//!
//! # Invariants
//! - An empty remark is never stored; setting one deletes the entry.
//! - `get` never fails; absence reads as an empty string.
//! - `get_all` returns an owned copy of the table.

use super::json_file::{load_or_reset, write_records};
use super::{LoadStatus, StoreResult};
use crate::model::variable::Scope;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One persisted remark record and its lookup key.
pub trait RemarkRecord: Serialize + DeserializeOwned {
    type Key: Ord + Clone + Debug + Send + Sync;

    /// Store label used in log events.
    const STORE: &'static str;

    /// Default file name inside the data directory.
    const FILE_NAME: &'static str;

    /// Key under which a variable's remark is filed.
    fn key_for(name: &str, scope: Scope) -> Self::Key;

    fn into_parts(self) -> (Self::Key, String);

    fn from_parts(key: Self::Key, remark: String) -> Self;
}

/// Name-keyed remark: `{name, remark}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub name: String,
    #[serde(default, alias = "comment")]
    pub remark: String,
}

impl RemarkRecord for CommentRecord {
    type Key = String;

    const STORE: &'static str = "comments";
    const FILE_NAME: &'static str = "envmgr_comments.json";

    fn key_for(name: &str, _scope: Scope) -> String {
        name.to_string()
    }

    fn into_parts(self) -> (String, String) {
        (self.name, self.remark)
    }

    fn from_parts(name: String, remark: String) -> Self {
        Self { name, remark }
    }
}

/// Key of a scoped remark.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyKey {
    pub name: String,
    pub scope: Scope,
}

impl PropertyKey {
    pub fn new(name: impl Into<String>, scope: Scope) -> Self {
        Self {
            name: name.into(),
            scope,
        }
    }
}

/// Scope-keyed remark: `{name, source, remark}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub name: String,
    #[serde(rename = "source")]
    pub scope: Scope,
    #[serde(default)]
    pub remark: String,
}

impl RemarkRecord for PropertyRecord {
    type Key = PropertyKey;

    const STORE: &'static str = "properties";
    const FILE_NAME: &'static str = "env_property.json";

    fn key_for(name: &str, scope: Scope) -> PropertyKey {
        PropertyKey::new(name, scope)
    }

    fn into_parts(self) -> (PropertyKey, String) {
        (PropertyKey::new(self.name, self.scope), self.remark)
    }

    fn from_parts(key: PropertyKey, remark: String) -> Self {
        Self {
            name: key.name,
            scope: key.scope,
            remark,
        }
    }
}

/// Remarks keyed by variable name only.
pub type CommentStore = MetadataStore<CommentRecord>;
/// Remarks keyed by variable name and scope.
pub type PropertyStore = MetadataStore<PropertyRecord>;

/// File-backed remark table guarded by a reader/writer lock.
pub struct MetadataStore<R: RemarkRecord> {
    path: PathBuf,
    table: RwLock<BTreeMap<R::Key, String>>,
    load_status: LoadStatus,
}

impl<R: RemarkRecord> MetadataStore<R> {
    /// Opens the store, recovering to an empty table if the file is unusable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (records, load_status) = load_or_reset::<R>(R::STORE, &path);
        let mut table = BTreeMap::new();
        for record in records {
            let (key, remark) = record.into_parts();
            if !remark.is_empty() {
                table.insert(key, remark);
            }
        }

        Self {
            path,
            table: RwLock::new(table),
            load_status,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reports how the table was initialized.
    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    /// Returns the remark for `key`, or an empty string.
    pub fn get(&self, key: &R::Key) -> String {
        self.read().get(key).cloned().unwrap_or_default()
    }

    /// Returns the remark filed for a variable.
    pub fn remark_for(&self, name: &str, scope: Scope) -> String {
        self.get(&R::key_for(name, scope))
    }

    /// Returns an owned copy of the whole table.
    pub fn get_all(&self) -> BTreeMap<R::Key, String> {
        self.read().clone()
    }

    /// Upserts a remark; an empty remark deletes the entry.
    pub fn set(&self, key: R::Key, remark: impl Into<String>) -> StoreResult<()> {
        self.set_many([(key, remark.into())])
    }

    /// Applies several upserts/deletes with a single flush.
    pub fn set_many<I>(&self, entries: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = (R::Key, String)>,
    {
        let mut table = self.write();
        let mut next = table.clone();
        for (key, remark) in entries {
            if remark.is_empty() {
                next.remove(&key);
            } else {
                next.insert(key, remark);
            }
        }

        if next == *table {
            return Ok(());
        }

        self.flush(&next)?;
        debug!(
            "event=metadata_write module=repo status=ok store={} entries={}",
            R::STORE,
            next.len()
        );
        *table = next;
        Ok(())
    }

    /// Removes the entry for `key`; absent keys are a no-op.
    pub fn delete(&self, key: &R::Key) -> StoreResult<()> {
        self.set(key.clone(), String::new())
    }

    fn flush(&self, table: &BTreeMap<R::Key, String>) -> StoreResult<()> {
        let records: Vec<R> = table
            .iter()
            .map(|(key, remark)| R::from_parts(key.clone(), remark.clone()))
            .collect();
        write_records(&self.path, &records)
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<R::Key, String>> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<R::Key, String>> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{CommentStore, PropertyKey, PropertyStore};
    use crate::model::variable::Scope;
    use std::fs;

    #[test]
    fn comment_store_ignores_scope_in_lookup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CommentStore::open(dir.path().join("comments.json"));
        store.set("PATH".to_string(), "search path").unwrap();

        assert_eq!(store.remark_for("PATH", Scope::System), "search path");
        assert_eq!(store.remark_for("PATH", Scope::User), "search path");
    }

    #[test]
    fn property_store_separates_scopes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PropertyStore::open(dir.path().join("props.json"));
        store
            .set(PropertyKey::new("PATH", Scope::System), "machine path")
            .unwrap();

        assert_eq!(store.remark_for("PATH", Scope::System), "machine path");
        assert_eq!(store.remark_for("PATH", Scope::User), "");
    }

    #[test]
    fn legacy_comment_field_is_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("comments.json");
        fs::write(&path, r#"[{"name":"GOPATH","comment":"go workspace"}]"#).unwrap();

        let store = CommentStore::open(&path);
        assert_eq!(store.get(&"GOPATH".to_string()), "go workspace");
        assert!(!store.load_status().is_recovered());
    }

    #[test]
    fn blank_records_on_disk_are_dropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("props.json");
        fs::write(
            &path,
            r#"[{"name":"A","source":"user","remark":""},{"name":"B","source":"system","remark":"b"}]"#,
        )
        .unwrap();

        let store = PropertyStore::open(&path);
        assert_eq!(store.get_all().len(), 1);
    }
}
