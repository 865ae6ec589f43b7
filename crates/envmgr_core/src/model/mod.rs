//! Domain model for environment variables, groups and profiles.
//!
//! # Responsibility
//! - Define the records shared by stores, backends and services.
//! - Own name validation rules applied before persistence.
//!
//! # Invariants
//! - A variable is unique per `(name, scope)`, not globally.
//! - At most one item per group is selected.

pub mod group;
pub mod profile;
pub mod variable;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failures for domain records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Variable name is empty or contains `=` / NUL.
    InvalidVariableName(String),
    /// Group, item or profile name is blank after trim.
    BlankName(&'static str),
    /// Two items in one group share a name.
    DuplicateItem { group: String, item: String },
    /// More than one item in a group is marked selected.
    MultipleSelected { group: String },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidVariableName(name) => write!(f, "invalid variable name: `{name}`"),
            Self::BlankName(kind) => write!(f, "{kind} name must not be blank"),
            Self::DuplicateItem { group, item } => {
                write!(f, "group `{group}` contains duplicate item `{item}`")
            }
            Self::MultipleSelected { group } => {
                write!(f, "group `{group}` has more than one selected item")
            }
        }
    }
}

impl Error for ValidationError {}
