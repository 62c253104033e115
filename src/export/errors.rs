//! Export error types
//!
//! Any export error aborts the whole archive; a partial archive is never
//! reported as success.

use std::io;

use thiserror::Error;

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    /// Writing an archive entry or the archive stream failed
    #[error("Archive write failed while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The archive format rejected an entry or could not be finalised
    #[error("Archive encoding failed while {context}: {source}")]
    Zip {
        context: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to serialize study definition: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ExportError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn zip(context: impl Into<String>, source: zip::result::ZipError) -> Self {
        Self::Zip {
            context: context.into(),
            source,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ExportError::Io { .. } => "ECRF_EXPORT_IO",
            ExportError::Zip { .. } => "ECRF_EXPORT_ARCHIVE",
            ExportError::Serialize(_) => "ECRF_EXPORT_SERIALIZE",
        }
    }
}
