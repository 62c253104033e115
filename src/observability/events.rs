//! Lifecycle events for the eCRF service
//!
//! Every structured log line carries one of these as its `event` field, so
//! log consumers can key on a stable name instead of message text.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Boot & lifecycle
    EcrfStartupBegin,
    EcrfStartupComplete,
    ConfigLoaded,
    /// Template files registered from disk
    TemplatesLoaded,
    /// Durable snapshot read at startup
    SnapshotLoaded,
    /// HTTP listener bound
    Serving,
    ShutdownStart,
    ShutdownComplete,

    // Persistence
    FlushComplete,
    /// Durable write failed; in-memory state retained
    FlushFailed,

    // Data
    FormBound,
    RecordCreated,
    RecordUpdated,
    RecordDeleted,
    RecordRejected,

    // Export
    ExportComplete,
    ExportFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::EcrfStartupBegin => "ECRF_STARTUP_BEGIN",
            Event::EcrfStartupComplete => "ECRF_STARTUP_COMPLETE",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::TemplatesLoaded => "TEMPLATES_LOADED",
            Event::SnapshotLoaded => "SNAPSHOT_LOADED",
            Event::Serving => "SERVING",
            Event::ShutdownStart => "SHUTDOWN_START",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",
            Event::FlushComplete => "FLUSH_COMPLETE",
            Event::FlushFailed => "FLUSH_FAILED",
            Event::FormBound => "FORM_BOUND",
            Event::RecordCreated => "RECORD_CREATED",
            Event::RecordUpdated => "RECORD_UPDATED",
            Event::RecordDeleted => "RECORD_DELETED",
            Event::RecordRejected => "RECORD_REJECTED",
            Event::ExportComplete => "EXPORT_COMPLETE",
            Event::ExportFailed => "EXPORT_FAILED",
        }
    }

    /// Events that indicate a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Event::FlushFailed | Event::ExportFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
