//! Submitted records and their per-form store

mod record;
mod store;

pub use record::{Record, RecordData};
pub use store::RecordStore;
