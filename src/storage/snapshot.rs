//! Durable snapshot document
//!
//! One JSON document with two top-level mappings:
//!
//! ```text
//! {
//!   "studies": { "<studyId>": Study },
//!   "records": { "<studyFormId>": [Record, ...] }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::records::Record;
use crate::study::{Study, StudyForm};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub studies: BTreeMap<String, Study>,
    /// Buckets keyed by study-form id, records in insertion order
    #[serde(default)]
    pub records: BTreeMap<String, Vec<Record>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn study(&self, study_id: &str) -> Option<&Study> {
        self.studies.get(study_id)
    }

    pub fn study_form(&self, study_id: &str, study_form_id: &str) -> Option<&StudyForm> {
        self.study(study_id).and_then(|s| s.form(study_form_id))
    }

    /// Records of a bucket; empty when the bucket was never created
    pub fn bucket(&self, study_form_id: &str) -> &[Record] {
        self.records.get(study_form_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn record_count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }
}
