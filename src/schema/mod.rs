//! Schema registry for eCRF form templates
//!
//! Templates are immutable, versioned definitions owning exactly one form
//! schema. The registry is populated at startup and read-only afterwards; it
//! resolves schemas for validation and export labelling.

mod builtin;
mod errors;
mod registry;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use registry::SchemaRegistry;
pub use types::{
    template_id, FieldDefinition, FieldOption, FieldType, FormSchema, SectionDefinition, Template,
    TemplateSummary,
};
