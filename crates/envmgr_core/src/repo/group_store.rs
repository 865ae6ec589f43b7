//! Group persistence.
//!
//! # Responsibility
//! - Keep the ordered group collection and its JSON file in sync.
//! - Provide lookup, whole-group upsert and idempotent delete by name.
//!
//! # Invariants
//! - Group names are unique; `set` replaces an existing group wholesale.
//! - Groups are validated before they are persisted.
//! - Groups loaded from disk may be invalid (hand edits). They are kept so
//!   they stay visible and fixable; callers validate before acting on one.

use super::json_file::{load_or_reset, write_records};
use super::{LoadStatus, StoreError, StoreResult};
use crate::model::group::Group;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

const STORE: &str = "groups";

/// File-backed group collection.
pub struct GroupStore {
    path: PathBuf,
    groups: RwLock<Vec<Group>>,
    load_status: LoadStatus,
}

impl GroupStore {
    /// Opens the store, recovering to an empty collection if the file is unusable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (mut groups, load_status) = load_or_reset::<Group>(STORE, &path);
        dedup_by_name(&mut groups);
        for group in &groups {
            if let Err(err) = group.validate() {
                warn!(
                    "event=store_load module=repo status=invalid_group store={STORE} group={} error={}",
                    group.name, err
                );
            }
        }
        Self {
            path,
            groups: RwLock::new(groups),
            load_status,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    /// Returns a snapshot of all groups in stored order.
    pub fn get_all(&self) -> Vec<Group> {
        self.read().clone()
    }

    /// Returns one group by name.
    pub fn get(&self, name: &str) -> StoreResult<Group> {
        self.read()
            .iter()
            .find(|group| group.name == name)
            .cloned()
            .ok_or_else(|| StoreError::GroupNotFound(name.to_string()))
    }

    /// Replaces the group with the same name, or appends a new one.
    pub fn set(&self, group: Group) -> StoreResult<()> {
        group.validate()?;

        let mut groups = self.write();
        let mut next = groups.clone();
        match next.iter_mut().find(|existing| existing.name == group.name) {
            Some(existing) => *existing = group,
            None => next.push(group),
        }

        write_records(&self.path, &next)?;
        debug!(
            "event=group_write module=repo status=ok groups={}",
            next.len()
        );
        *groups = next;
        Ok(())
    }

    /// Removes the first group named `name`; unknown names are a no-op.
    pub fn delete(&self, name: &str) -> StoreResult<()> {
        let mut groups = self.write();
        let Some(index) = groups.iter().position(|group| group.name == name) else {
            return Ok(());
        };

        let mut next = groups.clone();
        next.remove(index);
        write_records(&self.path, &next)?;
        debug!(
            "event=group_delete module=repo status=ok groups={}",
            next.len()
        );
        *groups = next;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Group>> {
        self.groups.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Group>> {
        self.groups.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// Hand-edited files may repeat a name; the first occurrence wins, matching lookup.
fn dedup_by_name(groups: &mut Vec<Group>) {
    let mut seen = std::collections::HashSet::new();
    groups.retain(|group| seen.insert(group.name.clone()));
}

#[cfg(test)]
mod tests {
    use super::GroupStore;
    use crate::model::group::{Group, GroupItem};
    use crate::repo::StoreError;

    #[test]
    fn set_replaces_existing_group_wholesale() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = GroupStore::open(dir.path().join("groups.json"));

        let mut first = Group::new("dev").with_item(GroupItem::new("a"));
        first.remark = "old".to_string();
        store.set(first).unwrap();
        store
            .set(Group::new("dev").with_item(GroupItem::new("b")))
            .unwrap();

        let loaded = store.get("dev").unwrap();
        assert_eq!(loaded.remark, "");
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].name, "b");
        assert_eq!(store.get_all().len(), 1);
    }

    #[test]
    fn invalid_group_is_not_persisted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = GroupStore::open(dir.path().join("groups.json"));

        let err = store
            .set(
                Group::new("dev")
                    .with_item(GroupItem::new("a"))
                    .with_item(GroupItem::new("a")),
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn duplicate_names_on_disk_keep_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("groups.json");
        std::fs::write(
            &path,
            r#"[{"name":"dev","remark":"first","itemList":[]},{"name":"dev","remark":"second","itemList":[]}]"#,
        )
        .unwrap();

        let store = GroupStore::open(&path);
        assert_eq!(store.get_all().len(), 1);
        assert_eq!(store.get("dev").unwrap().remark, "first");
    }
}
