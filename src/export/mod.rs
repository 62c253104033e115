//! Export subsystem
//!
//! Serialises a study into one deflate-compressed ZIP archive:
//!
//! ```text
//! _study_definition.json      study id, visits and form list
//! <code>_v<version>.csv       one per study form, in form order
//! ```
//!
//! CSV files start with a UTF-8 BOM and quote cells containing commas,
//! double quotes or line breaks.

mod archive;
mod errors;
mod pipeline;
mod tabular;

pub use archive::ArchiveWriter;
pub use errors::{ExportError, ExportResult};
pub use pipeline::{
    csv_file_name, CsvEntry, ExportDefinition, ExportPipeline, ExportPlan, ExportSummary, ExportedForm,
    DEFINITION_ENTRY,
};
pub use tabular::{collect_columns, csv_cell, encode_records_csv, format_timestamp, render_value, BOM};
