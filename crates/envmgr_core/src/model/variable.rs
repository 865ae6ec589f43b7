//! Variable and scope model.
//!
//! # Responsibility
//! - Define the merged variable view returned to callers.
//! - Define the two authoritative scopes of the variable backend.
//!
//! # Invariants
//! - Variable names never contain `=` or NUL and are never empty.
//! - `remark` is metadata only; it never reaches the variable backend.

use super::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};

static VARIABLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^=\x00]+$").expect("valid variable name regex"));

/// Namespace a variable belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Machine-wide variables. Writes usually need elevation.
    System,
    /// Variables of the current account.
    User,
}

impl Scope {
    /// All scopes in merge order (system first, user overrides).
    pub const ALL: [Scope; 2] = [Scope::System, Scope::User];

    /// Stable string id used in persisted files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }

    /// Parses a scope id, ignoring surrounding whitespace and case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

// Hand-edited files may say "System"; one such record must not fail the whole file.
impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value)
            .ok_or_else(|| D::Error::unknown_variant(&value, &["system", "user"]))
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One environment variable as seen by callers.
///
/// Serialized with `source` for the scope field to match persisted group files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
    #[serde(rename = "source")]
    pub scope: Scope,
    /// Free-text annotation. Empty means "no remark".
    #[serde(default, alias = "comment")]
    pub remark: String,
}

impl Variable {
    /// Creates a variable with an empty remark.
    pub fn new(name: impl Into<String>, value: impl Into<String>, scope: Scope) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            scope,
            remark: String::new(),
        }
    }

    /// Returns a copy carrying the given remark.
    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = remark.into();
        self
    }

    /// Validates the variable name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_variable_name(&self.name)
    }
}

/// Checks that `name` can be stored by a variable backend.
pub fn validate_variable_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() || !VARIABLE_NAME_RE.is_match(name) {
        return Err(ValidationError::InvalidVariableName(name.to_string()));
    }
    Ok(())
}
