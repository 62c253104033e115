//! Crate-level error taxonomy
//!
//! Every failure the route layer can see falls into one of these kinds:
//! - NotFound: study, study-form, record or template absent
//! - InvalidTemplate: a bind request names a template that does not resolve
//! - Validation: a non-empty violation list, always reported as a list
//! - Persistence: durable read/write failure
//! - Export: archive assembly or streaming failure
//!
//! NotFound and Validation are distinguishable by kind, never by message text.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::export::ExportError;
use crate::schema::SchemaError;
use crate::storage::StorageError;
use crate::validation::Violation;

/// Kind of resource a NotFound refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Study,
    StudyForm,
    Record,
    Template,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Study => "study",
            ResourceKind::StudyForm => "study_form",
            ResourceKind::Record => "record",
            ResourceKind::Template => "template",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum EcrfError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: ResourceKind, id: String },

    #[error("Invalid source template: {0}")]
    InvalidTemplate(String),

    #[error("Validation failed with {} violation(s)", .0.len())]
    Validation(Vec<Violation>),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Template registry error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EcrfError {
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            EcrfError::NotFound { .. } => "ECRF_NOT_FOUND",
            EcrfError::InvalidTemplate(_) => "ECRF_INVALID_TEMPLATE",
            EcrfError::Validation(_) => "ECRF_VALIDATION_FAILED",
            EcrfError::Persistence(_) => "ECRF_PERSISTENCE_FAILED",
            EcrfError::Export(_) => "ECRF_EXPORT_FAILED",
            EcrfError::Schema(e) => e.code(),
            EcrfError::Config(_) => "ECRF_CONFIG_ERROR",
        }
    }

    /// HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            EcrfError::NotFound { .. } => 404,
            EcrfError::InvalidTemplate(_) => 400,
            EcrfError::Validation(_) => 400,
            EcrfError::Persistence(_) => 500,
            EcrfError::Export(_) => 500,
            EcrfError::Schema(SchemaError::TemplateNotFound(_)) => 404,
            EcrfError::Schema(_) => 500,
            EcrfError::Config(_) => 500,
        }
    }

    /// Violations carried by a validation failure
    pub fn violations(&self) -> Option<&[Violation]> {
        match self {
            EcrfError::Validation(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EcrfError::NotFound { .. })
    }
}

/// Result type for eCRF operations
pub type EcrfResult<T> = Result<T, EcrfError>;
