//! Observability subsystem
//!
//! Structured logging through `tracing`. Every lifecycle log line carries a
//! typed [`Event`] name in its `event` field.
//!
//! ```ignore
//! use ecrf::observability::Event;
//!
//! tracing::info!(event = Event::RecordCreated.as_str(), study_form_id, "record stored");
//! ```

mod events;
mod logging;

pub use events::Event;
pub use logging::init_logging;
