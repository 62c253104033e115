//! Violation records produced by validation

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which check a violation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Required, editable field left empty
    Required,
    /// Number field whose value does not coerce to a number
    NotANumber,
    /// Number below the inclusive `min`
    BelowMinimum,
    /// Number above the inclusive `max`
    AboveMaximum,
    /// Date field not in `YYYY-MM-DD` form or not a real calendar date
    InvalidDate,
    /// Business rule spanning several fields
    CrossField,
}

/// One (field path, message) pair explaining a rejected submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn new(kind: ViolationKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}
