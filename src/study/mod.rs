//! Studies and the forms bound into them

mod binder;
mod types;

pub use binder::StudyBinder;
pub use types::{BindFormRequest, FormDefinition, Study, StudyDefinition, StudyForm};
