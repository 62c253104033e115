//! Schema registry error types

use thiserror::Error;

/// Result type for schema registry operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema registry errors
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Published templates never change; a new version is a new template.
    #[error("Template '{0}' is already published and immutable")]
    TemplateImmutable(String),

    #[error("Malformed template '{source_name}': {reason}")]
    MalformedTemplate { source_name: String, reason: String },

    #[error("I/O error reading templates at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl SchemaError {
    pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedTemplate {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::TemplateNotFound(_) => "ECRF_TEMPLATE_NOT_FOUND",
            SchemaError::TemplateImmutable(_) => "ECRF_TEMPLATE_IMMUTABLE",
            SchemaError::MalformedTemplate { .. } => "ECRF_TEMPLATE_MALFORMED",
            SchemaError::Io { .. } => "ECRF_TEMPLATE_IO",
        }
    }
}
