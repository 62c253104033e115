//! Record store
//!
//! Records are kept per study-form bucket in insertion order. The store does
//! not validate; callers run the validator first. Every successful mutation
//! schedules a debounced flush of the whole state.

use chrono::Utc;
use tracing::info;

use super::record::{Record, RecordData};
use crate::error::{EcrfError, EcrfResult, ResourceKind};
use crate::observability::Event;
use crate::storage::StateStore;

#[derive(Debug, Clone)]
pub struct RecordStore {
    state: StateStore,
}

impl RecordStore {
    pub fn new(state: StateStore) -> Self {
        Self { state }
    }

    /// Records of a bucket in insertion order; empty if the bucket is absent.
    pub fn list(&self, study_form_id: &str) -> Vec<Record> {
        self.state.read(|s| s.bucket(study_form_id).to_vec())
    }

    pub fn get(&self, study_form_id: &str, record_id: &str) -> EcrfResult<Record> {
        self.state
            .read(|s| s.bucket(study_form_id).iter().find(|r| r.id == record_id).cloned())
            .ok_or_else(|| EcrfError::not_found(ResourceKind::Record, record_id))
    }

    /// Appends a new record, creating the bucket if needed.
    pub fn create(&self, study_form_id: &str, data: RecordData) -> Record {
        let record = Record::new(data, Utc::now());

        self.state.mutate(|s| {
            s.records
                .entry(study_form_id.to_string())
                .or_default()
                .push(record.clone());
        });

        info!(
            event = Event::RecordCreated.as_str(),
            study_form_id,
            record_id = %record.id,
        );
        record
    }

    /// Replaces a record's data wholesale.
    pub fn update(&self, study_form_id: &str, record_id: &str, data: RecordData) -> EcrfResult<Record> {
        let updated = self.state.try_mutate(|s| {
            s.records
                .get_mut(study_form_id)
                .and_then(|bucket| bucket.iter_mut().find(|r| r.id == record_id))
                .map(|record| {
                    record.replace_data(data, Utc::now());
                    record.clone()
                })
                .ok_or_else(|| EcrfError::not_found(ResourceKind::Record, record_id))
        })?;

        info!(
            event = Event::RecordUpdated.as_str(),
            study_form_id,
            record_id,
        );
        Ok(updated)
    }

    /// Removes a record. Idempotent; returns whether anything was removed.
    ///
    /// Never creates a bucket, and leaves an emptied bucket in place.
    pub fn delete(&self, study_form_id: &str, record_id: &str) -> bool {
        let removed = self.state.read(|s| s.bucket(study_form_id).iter().any(|r| r.id == record_id));
        if !removed {
            return false;
        }

        self.state.mutate(|s| {
            if let Some(bucket) = s.records.get_mut(study_form_id) {
                bucket.retain(|r| r.id != record_id);
            }
        });

        info!(
            event = Event::RecordDeleted.as_str(),
            study_form_id,
            record_id,
        );
        true
    }
}
