//! Group switch engine.
//!
//! # Responsibility
//! - Make one item of a group the active one and push its variables and
//!   remarks into the live environment and metadata store.
//!
//! # Invariants
//! - Steps run strictly in order: lookup, match, partition, apply system,
//!   apply user, metadata sync, selection commit, broadcast.
//! - The post-switch group is validated before any variable is written, so
//!   an invalid stored group changes nothing.
//! - A failed variable batch aborts before metadata and selection are
//!   written. Variables already applied by that batch stay applied.
//! - A broadcast failure is reported in the outcome, never as an error.
//! - An unknown item name still commits the group with no active item.

use super::{EnvServiceError, ServiceResult};
use crate::backend::{BackendError, VariableBackend};
use crate::model::group::GroupItem;
use crate::model::variable::Scope;
use crate::repo::group_store::GroupStore;
use crate::repo::metadata_store::{MetadataStore, RemarkRecord};
use log::{info, warn};
use std::time::Instant;

/// Result of a switch that reached the selection commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchOutcome {
    pub group: String,
    /// Name of the item now selected; `None` when no item matched.
    pub selected: Option<String>,
    pub system_applied: usize,
    pub user_applied: usize,
    pub remarks_synced: usize,
    /// Set when the change broadcast failed after everything else succeeded.
    pub broadcast_error: Option<BackendError>,
}

/// Writes planned for one target item, split by scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchPlan<K> {
    pub system: Vec<(String, String)>,
    pub user: Vec<(String, String)>,
    pub remarks: Vec<(K, String)>,
}

impl<K> SwitchPlan<K> {
    pub fn is_empty(&self) -> bool {
        self.system.is_empty() && self.user.is_empty()
    }
}

/// Partitions an item's variables by scope and builds matching remark entries.
pub fn plan_switch<R: RemarkRecord>(item: &GroupItem) -> SwitchPlan<R::Key> {
    let mut plan = SwitchPlan {
        system: Vec::new(),
        user: Vec::new(),
        remarks: Vec::with_capacity(item.variables.len()),
    };
    for variable in &item.variables {
        let entry = (variable.name.clone(), variable.value.clone());
        match variable.scope {
            Scope::System => plan.system.push(entry),
            Scope::User => plan.user.push(entry),
        }
        plan.remarks.push((
            R::key_for(&variable.name, variable.scope),
            variable.remark.clone(),
        ));
    }
    plan
}

/// Switches `group_name` to `item_name`.
///
/// # Errors
/// - `NotFound` when the group does not exist.
/// - `Validation` when the stored group is invalid; nothing is written.
/// - `PermissionDenied` when system-scope writes need elevation.
/// - `Backend` when a variable write fails otherwise.
/// - `Store` when metadata or the group cannot be persisted.
pub fn switch_group_item<B, R>(
    backend: &B,
    remarks: &MetadataStore<R>,
    groups: &GroupStore,
    group_name: &str,
    item_name: &str,
) -> ServiceResult<SwitchOutcome>
where
    B: VariableBackend + ?Sized,
    R: RemarkRecord,
{
    let started_at = Instant::now();
    info!("event=group_switch module=service status=start group={group_name} item={item_name}");

    let result = run_switch(backend, remarks, groups, group_name, item_name);
    match &result {
        Ok(outcome) => info!(
            "event=group_switch module=service status=ok group={} selected={} system={} user={} remarks={} broadcast_ok={} duration_ms={}",
            outcome.group,
            outcome.selected.as_deref().unwrap_or("-"),
            outcome.system_applied,
            outcome.user_applied,
            outcome.remarks_synced,
            outcome.broadcast_error.is_none(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event=group_switch module=service status=error group={group_name} item={item_name} permission_denied={} duration_ms={} error={}",
            err.is_permission_denied(),
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn run_switch<B, R>(
    backend: &B,
    remarks: &MetadataStore<R>,
    groups: &GroupStore,
    group_name: &str,
    item_name: &str,
) -> ServiceResult<SwitchOutcome>
where
    B: VariableBackend + ?Sized,
    R: RemarkRecord,
{
    let group = groups.get(group_name)?;
    // Stored groups are not validated on load; reject before touching the backend.
    let next = group.with_selected(item_name);
    next.validate()?;

    let plan = match group.item(item_name) {
        Some(item) => Some(plan_switch::<R>(item)),
        None => {
            info!(
                "event=group_switch_match module=service status=no_match group={group_name} item={item_name}"
            );
            None
        }
    };

    let mut outcome = SwitchOutcome {
        group: group.name.clone(),
        selected: plan.as_ref().map(|_| item_name.to_string()),
        system_applied: 0,
        user_applied: 0,
        remarks_synced: 0,
        broadcast_error: None,
    };

    if let Some(plan) = plan {
        if !plan.system.is_empty() {
            if !backend.has_write_privilege(Scope::System) {
                let (name, _) = &plan.system[0];
                return Err(EnvServiceError::PermissionDenied {
                    scope: Scope::System,
                    name: name.clone(),
                });
            }
            backend.batch_set(Scope::System, &plan.system)?;
            outcome.system_applied = plan.system.len();
        }
        if !plan.user.is_empty() {
            backend.batch_set(Scope::User, &plan.user)?;
            outcome.user_applied = plan.user.len();
        }

        outcome.remarks_synced = plan.remarks.len();
        remarks.set_many(plan.remarks)?;
    }

    groups.set(next)?;

    if outcome.selected.is_some() {
        if let Err(err) = backend.notify_changed() {
            warn!(
                "event=env_broadcast module=service status=error group={group_name} error={err}"
            );
            outcome.broadcast_error = Some(err);
        }
    }

    Ok(outcome)
}
