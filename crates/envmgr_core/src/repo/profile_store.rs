//! Legacy profile persistence.
//!
//! Same load-tolerant, whole-file policy as the group store. Profiles are
//! upserted by name.

use super::json_file::{load_or_reset, write_records};
use super::{LoadStatus, StoreError, StoreResult};
use crate::model::profile::Profile;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

const STORE: &str = "profiles";

/// File-backed profile list.
pub struct ProfileStore {
    path: PathBuf,
    profiles: RwLock<Vec<Profile>>,
    load_status: LoadStatus,
}

impl ProfileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (profiles, load_status) = load_or_reset::<Profile>(STORE, &path);
        Self {
            path,
            profiles: RwLock::new(profiles),
            load_status,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    pub fn get_all(&self) -> Vec<Profile> {
        self.read().clone()
    }

    pub fn get(&self, name: &str) -> StoreResult<Profile> {
        self.read()
            .iter()
            .find(|profile| profile.name == name)
            .cloned()
            .ok_or_else(|| StoreError::ProfileNotFound(name.to_string()))
    }

    /// Replaces the profile with the same name, or appends a new one.
    pub fn save(&self, profile: Profile) -> StoreResult<()> {
        profile.validate()?;

        let mut profiles = self.write();
        let mut next = profiles.clone();
        match next.iter_mut().find(|existing| existing.name == profile.name) {
            Some(existing) => *existing = profile,
            None => next.push(profile),
        }
        write_records(&self.path, &next)?;
        *profiles = next;
        Ok(())
    }

    /// Removes a profile by name; unknown names are a no-op.
    pub fn delete(&self, name: &str) -> StoreResult<()> {
        let mut profiles = self.write();
        if !profiles.iter().any(|profile| profile.name == name) {
            return Ok(());
        }
        let next: Vec<Profile> = profiles
            .iter()
            .filter(|profile| profile.name != name)
            .cloned()
            .collect();
        write_records(&self.path, &next)?;
        *profiles = next;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Profile>> {
        self.profiles.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Profile>> {
        self.profiles.write().unwrap_or_else(PoisonError::into_inner)
    }
}
