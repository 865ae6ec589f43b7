//! Scope merge engine.
//!
//! # Invariants
//! - A name present in both scopes is emitted once, with the user value and
//!   `Scope::User`; the system entry is dropped.
//! - Missing remarks read as empty strings.
//! - Output order carries no meaning; it is sorted by name only for stable
//!   display.

use crate::model::variable::{Scope, Variable};
use std::collections::BTreeMap;

/// Merges raw scope listings and attaches remarks.
///
/// `remark_for` is called once per emitted variable with its final scope, so
/// name-keyed and scope-keyed metadata both plug in unchanged.
pub fn merge_variables<F>(
    system: Vec<(String, String)>,
    user: Vec<(String, String)>,
    remark_for: F,
) -> Vec<Variable>
where
    F: Fn(&str, Scope) -> String,
{
    let user: BTreeMap<String, String> = user.into_iter().collect();
    let mut merged: BTreeMap<String, (String, Scope)> = system
        .into_iter()
        .filter(|(name, _)| !user.contains_key(name))
        .map(|(name, value)| (name, (value, Scope::System)))
        .collect();
    for (name, value) in user {
        merged.insert(name, (value, Scope::User));
    }

    merged
        .into_iter()
        .map(|(name, (value, scope))| {
            let remark = remark_for(&name, scope);
            Variable {
                name,
                value,
                scope,
                remark,
            }
        })
        .collect()
}
