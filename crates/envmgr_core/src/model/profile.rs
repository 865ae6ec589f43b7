//! Legacy profile model.
//!
//! A profile is a flat `name -> value` map with no scope distinction; applying
//! it always targets the user scope.

use super::variable::validate_variable_name;
use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named flat variable set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

impl Profile {
    pub fn new(name: impl Into<String>, vars: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            vars,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName("profile"));
        }
        for name in self.vars.keys() {
            validate_variable_name(name)?;
        }
        Ok(())
    }
}
