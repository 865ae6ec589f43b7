//! Group and item model.
//!
//! # Responsibility
//! - Define named collections of mutually exclusive variable sets.
//! - Provide the selection transition used by the switch engine.
//!
//! # Invariants
//! - Item names are unique within one group.
//! - At most one item is selected after any selection transition.

use super::variable::Variable;
use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Named collection of switchable variable sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub remark: String,
    #[serde(rename = "itemList", default)]
    pub items: Vec<GroupItem>,
}

/// One option within a group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupItem {
    pub name: String,
    #[serde(default)]
    pub remark: String,
    #[serde(rename = "envList", default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub selected: bool,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends an item, builder style.
    pub fn with_item(mut self, item: GroupItem) -> Self {
        self.items.push(item);
        self
    }

    /// Finds an item by exact name.
    pub fn item(&self, name: &str) -> Option<&GroupItem> {
        self.items.iter().find(|item| item.name == name)
    }

    /// Returns the currently selected item, if any.
    pub fn selected_item(&self) -> Option<&GroupItem> {
        self.items.iter().find(|item| item.selected)
    }

    /// Returns a copy where only `item_name` is selected.
    ///
    /// When no item matches, every item in the copy is unselected.
    pub fn with_selected(&self, item_name: &str) -> Group {
        let items = self
            .items
            .iter()
            .map(|item| GroupItem {
                selected: item.name == item_name,
                ..item.clone()
            })
            .collect();
        Group {
            name: self.name.clone(),
            remark: self.remark.clone(),
            items,
        }
    }

    /// Validates names, item uniqueness and selection exclusivity.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName("group"));
        }

        let mut seen = HashSet::new();
        for item in &self.items {
            if item.name.trim().is_empty() {
                return Err(ValidationError::BlankName("item"));
            }
            if !seen.insert(item.name.as_str()) {
                return Err(ValidationError::DuplicateItem {
                    group: self.name.clone(),
                    item: item.name.clone(),
                });
            }
            for variable in &item.variables {
                variable.validate()?;
            }
        }

        if self.items.iter().filter(|item| item.selected).count() > 1 {
            return Err(ValidationError::MultipleSelected {
                group: self.name.clone(),
            });
        }
        Ok(())
    }
}

impl GroupItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a variable, builder style.
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }
}
