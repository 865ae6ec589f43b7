//! Environment manager facade.
//!
//! # Responsibility
//! - Expose the operations consumed by outer layers (CLI, HTTP).
//! - Keep variable writes and their remark metadata consistent.
//!
//! # Invariants
//! - A failed backend write never touches metadata.
//! - System-scope writes are pre-checked against backend privilege.
//! - Broadcast failures after a successful write are logged, not returned.
//! - Every successful backend write is broadcast, even when its remark
//!   update then fails.
//! - Every store is owned by exactly one service instance; share the service
//!   (it is `Sync` when the backend is) instead of reopening stores.

use super::merge::merge_variables;
use super::switch::{self, SwitchOutcome};
use super::{EnvServiceError, ServiceResult};
use crate::backend::VariableBackend;
use crate::config::EnvMgrConfig;
use crate::model::group::Group;
use crate::model::profile::Profile;
use crate::model::variable::{validate_variable_name, Scope, Variable};
use crate::repo::group_store::GroupStore;
use crate::repo::metadata_store::{MetadataStore, PropertyRecord, RemarkRecord};
use crate::repo::profile_store::ProfileStore;
use log::{info, warn};
use std::collections::BTreeMap;

/// Service over one backend, one remark store, groups and profiles.
pub struct EnvService<B: VariableBackend, R: RemarkRecord = PropertyRecord> {
    backend: B,
    remarks: MetadataStore<R>,
    groups: GroupStore,
    profiles: ProfileStore,
}

impl<B: VariableBackend, R: RemarkRecord> EnvService<B, R> {
    /// Creates a service from already opened stores.
    pub fn new(
        backend: B,
        remarks: MetadataStore<R>,
        groups: GroupStore,
        profiles: ProfileStore,
    ) -> Self {
        Self {
            backend,
            remarks,
            groups,
            profiles,
        }
    }

    /// Opens all stores under the configured data directory.
    pub fn open(backend: B, config: &EnvMgrConfig) -> Self {
        Self::new(
            backend,
            MetadataStore::open(config.remark_path::<R>()),
            GroupStore::open(config.group_path()),
            ProfileStore::open(config.profile_path()),
        )
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn remarks(&self) -> &MetadataStore<R> {
        &self.remarks
    }

    pub fn groups(&self) -> &GroupStore {
        &self.groups
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Returns whether system-scope writes are expected to succeed.
    pub fn is_privileged(&self) -> bool {
        self.backend.has_write_privilege(Scope::System)
    }

    /// Returns the merged view of both scopes with remarks attached.
    pub fn merged_variables(&self) -> ServiceResult<Vec<Variable>> {
        let system = self.backend.list_variables(Scope::System)?;
        let user = self.backend.list_variables(Scope::User)?;
        let remarks = self.remarks.get_all();
        Ok(merge_variables(system, user, |name, scope| {
            remarks
                .get(&R::key_for(name, scope))
                .cloned()
                .unwrap_or_default()
        }))
    }

    /// Writes one variable, then files (or clears) its remark.
    pub fn set_variable(
        &self,
        scope: Scope,
        name: &str,
        value: &str,
        remark: &str,
    ) -> ServiceResult<()> {
        validate_variable_name(name)?;
        self.ensure_privilege(scope, name)?;

        self.backend.set_variable(scope, name, value)?;
        info!("event=variable_set module=service status=ok scope={scope} name={name}");
        // The environment already changed; announce it even if the remark fails.
        let synced = self.remarks.set(R::key_for(name, scope), remark);
        self.broadcast();
        Ok(synced?)
    }

    /// Deletes one variable and its remark.
    pub fn delete_variable(&self, scope: Scope, name: &str) -> ServiceResult<()> {
        validate_variable_name(name)?;
        self.ensure_privilege(scope, name)?;

        self.backend.delete_variable(scope, name)?;
        info!("event=variable_delete module=service status=ok scope={scope} name={name}");
        let synced = self.remarks.delete(&R::key_for(name, scope));
        self.broadcast();
        Ok(synced?)
    }

    /// Updates only the remark of a variable.
    pub fn set_remark(&self, scope: Scope, name: &str, remark: &str) -> ServiceResult<()> {
        validate_variable_name(name)?;
        self.remarks.set(R::key_for(name, scope), remark)?;
        Ok(())
    }

    pub fn list_groups(&self) -> Vec<Group> {
        self.groups.get_all()
    }

    pub fn get_group(&self, name: &str) -> ServiceResult<Group> {
        Ok(self.groups.get(name)?)
    }

    /// Inserts or wholesale-replaces a group.
    pub fn upsert_group(&self, group: Group) -> ServiceResult<()> {
        Ok(self.groups.set(group)?)
    }

    /// Deletes a group; unknown names succeed.
    pub fn delete_group(&self, name: &str) -> ServiceResult<()> {
        Ok(self.groups.delete(name)?)
    }

    /// Makes `item_name` the active item of `group_name`.
    pub fn switch_group_item(
        &self,
        group_name: &str,
        item_name: &str,
    ) -> ServiceResult<SwitchOutcome> {
        switch::switch_group_item(
            &self.backend,
            &self.remarks,
            &self.groups,
            group_name,
            item_name,
        )
    }

    pub fn list_profiles(&self) -> Vec<Profile> {
        self.profiles.get_all()
    }

    /// Saves a profile, replacing one with the same name.
    pub fn save_profile(&self, name: &str, vars: BTreeMap<String, String>) -> ServiceResult<()> {
        Ok(self.profiles.save(Profile::new(name, vars))?)
    }

    pub fn delete_profile(&self, name: &str) -> ServiceResult<()> {
        Ok(self.profiles.delete(name)?)
    }

    /// Writes every profile variable to the user scope, fail-fast.
    pub fn apply_profile(&self, name: &str) -> ServiceResult<usize> {
        let profile = self.profiles.get(name)?;
        let entries: Vec<(String, String)> = profile.vars.into_iter().collect();
        self.backend.batch_set(Scope::User, &entries)?;
        info!(
            "event=profile_apply module=service status=ok profile={name} variables={}",
            entries.len()
        );
        self.broadcast();
        Ok(entries.len())
    }

    fn ensure_privilege(&self, scope: Scope, name: &str) -> ServiceResult<()> {
        if scope == Scope::System && !self.backend.has_write_privilege(scope) {
            return Err(EnvServiceError::PermissionDenied {
                scope,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn broadcast(&self) {
        if let Err(err) = self.backend.notify_changed() {
            warn!("event=env_broadcast module=service status=error error={err}");
        }
    }
}
