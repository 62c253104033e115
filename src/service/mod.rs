//! Service facade used by the route layer and the CLI
//!
//! Composes the registry, binder, validator, record store and export
//! pipeline over one shared [`StateStore`]. A submission resolves its schema
//! through the study form, is validated, and reaches the record store only
//! when no violation was found.

use std::sync::Arc;

use tracing::warn;

use crate::config::EcrfConfig;
use crate::error::{EcrfError, EcrfResult, ResourceKind};
use crate::export::{ExportPipeline, ExportPlan};
use crate::observability::Event;
use crate::records::{Record, RecordData, RecordStore};
use crate::schema::{FormSchema, SchemaError, SchemaRegistry, Template, TemplateSummary};
use crate::storage::{
    DebouncedScheduler, FileBackend, FlushScheduler, SnapshotBackend, StateStore, StorageResult,
};
use crate::study::{BindFormRequest, Study, StudyBinder, StudyDefinition, StudyForm};
use crate::validation::{FormValidator, Violation};

pub struct EcrfService {
    registry: Arc<SchemaRegistry>,
    state: StateStore,
    binder: StudyBinder,
    records: RecordStore,
    validator: FormValidator,
    export: ExportPipeline,
}

impl EcrfService {
    pub fn new(registry: SchemaRegistry, state: StateStore) -> Self {
        let registry = Arc::new(registry);
        Self {
            binder: StudyBinder::new(registry.clone(), state.clone()),
            records: RecordStore::new(state.clone()),
            export: ExportPipeline::new(state.clone()),
            validator: FormValidator::default(),
            registry,
            state,
        }
    }

    pub fn with_default_visits(mut self, visits: Vec<String>) -> Self {
        self.binder = self.binder.with_default_visits(visits);
        self
    }

    /// Builds the registry described by `config`: builtins plus `templates_dir`.
    pub fn registry_from_config(config: &EcrfConfig) -> EcrfResult<SchemaRegistry> {
        let mut registry = SchemaRegistry::with_builtin();
        if let Some(dir) = &config.templates_dir {
            registry.load_dir(dir)?;
        }
        Ok(registry)
    }

    /// Opens the service over the configured file with the given scheduler.
    pub fn open_with_scheduler(config: &EcrfConfig, scheduler: Arc<dyn FlushScheduler>) -> EcrfResult<Self> {
        let registry = Self::registry_from_config(config)?;
        let backend: Arc<dyn SnapshotBackend> = Arc::new(FileBackend::new(&config.data_file));
        let state = StateStore::open(backend, scheduler)?;

        Ok(Self::new(registry, state).with_default_visits(config.default_study_visits.clone()))
    }

    /// Opens the service with a debounced flush on the current tokio runtime.
    pub fn open(config: &EcrfConfig) -> EcrfResult<Self> {
        let scheduler = DebouncedScheduler::from_current(config.flush_window())?;
        Self::open_with_scheduler(config, Arc::new(scheduler))
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    // ==================
    // Templates
    // ==================

    pub fn list_templates(&self) -> Vec<TemplateSummary> {
        self.registry.list_templates()
    }

    pub fn get_template(&self, template_id: &str) -> EcrfResult<Template> {
        self.registry
            .get_template(template_id)
            .cloned()
            .map_err(|e| template_not_found(e, template_id))
    }

    pub fn get_template_schema(&self, template_id: &str) -> EcrfResult<FormSchema> {
        self.registry
            .get_schema(template_id)
            .cloned()
            .map_err(|e| template_not_found(e, template_id))
    }

    // ==================
    // Studies
    // ==================

    pub fn create_study(&self, study_id: &str, visits: Option<Vec<String>>) -> Study {
        self.binder.create_study(study_id, visits)
    }

    pub fn list_studies(&self) -> Vec<String> {
        self.binder.list_studies()
    }

    pub fn bind_form(&self, study_id: &str, request: BindFormRequest) -> EcrfResult<StudyForm> {
        self.binder.bind_form(study_id, request)
    }

    pub fn get_definition(&self, study_id: &str) -> EcrfResult<StudyDefinition> {
        self.binder.get_definition(study_id)
    }

    pub fn get_study_form(&self, study_id: &str, study_form_id: &str) -> EcrfResult<StudyForm> {
        self.binder.get_study_form(study_id, study_form_id)
    }

    /// Study form and the schema governing its records.
    fn resolve_schema(&self, study_id: &str, study_form_id: &str) -> EcrfResult<(StudyForm, FormSchema)> {
        let form = self.get_study_form(study_id, study_form_id)?;
        let schema = self.get_template_schema(&form.template_form_id)?;
        Ok((form, schema))
    }

    // ==================
    // Records
    // ==================

    pub fn list_records(&self, study_id: &str, study_form_id: &str) -> EcrfResult<Vec<Record>> {
        let form = self.get_study_form(study_id, study_form_id)?;
        Ok(self.records.list(&form.id))
    }

    pub fn get_record(&self, study_id: &str, study_form_id: &str, record_id: &str) -> EcrfResult<Record> {
        let form = self.get_study_form(study_id, study_form_id)?;
        self.records.get(&form.id, record_id)
    }

    /// Validates without storing anything.
    pub fn validate(&self, schema: &FormSchema, data: &RecordData) -> Vec<Violation> {
        self.validator.validate(schema, data)
    }

    /// Validates `data` against a template directly.
    pub fn validate_against_template(&self, template_id: &str, data: &RecordData) -> EcrfResult<Vec<Violation>> {
        let schema = self.get_template_schema(template_id)?;
        Ok(self.validate(&schema, data))
    }

    fn check(&self, form: &StudyForm, schema: &FormSchema, data: &RecordData) -> EcrfResult<()> {
        let violations = self.validate(schema, data);
        if violations.is_empty() {
            return Ok(());
        }

        warn!(
            event = Event::RecordRejected.as_str(),
            study_form_id = %form.id,
            violations = violations.len(),
        );
        Err(EcrfError::Validation(violations))
    }

    /// Validates and stores a new record.
    pub fn submit_record(&self, study_id: &str, study_form_id: &str, data: RecordData) -> EcrfResult<Record> {
        let (form, schema) = self.resolve_schema(study_id, study_form_id)?;
        self.check(&form, &schema, &data)?;
        Ok(self.records.create(&form.id, data))
    }

    /// Validates the replacement data, then replaces the record's data.
    pub fn edit_record(
        &self,
        study_id: &str,
        study_form_id: &str,
        record_id: &str,
        data: RecordData,
    ) -> EcrfResult<Record> {
        let (form, schema) = self.resolve_schema(study_id, study_form_id)?;
        self.check(&form, &schema, &data)?;
        self.records.update(&form.id, record_id, data)
    }

    /// Idempotent; returns whether a record was removed.
    pub fn delete_record(&self, study_id: &str, study_form_id: &str, record_id: &str) -> EcrfResult<bool> {
        let form = self.get_study_form(study_id, study_form_id)?;
        Ok(self.records.delete(&form.id, record_id))
    }

    // ==================
    // Export & durability
    // ==================

    pub fn export_study(&self, study_id: &str) -> EcrfResult<ExportPlan> {
        self.export.prepare(study_id)
    }

    /// Writes the current state now, cancelling any pending flush.
    pub fn flush_now(&self) -> StorageResult<()> {
        self.state.flush_now()
    }
}

fn template_not_found(err: SchemaError, template_id: &str) -> EcrfError {
    match err {
        SchemaError::TemplateNotFound(_) => EcrfError::not_found(ResourceKind::Template, template_id),
        other => EcrfError::Schema(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ManualScheduler, MemoryBackend};
    use serde_json::json;

    fn service() -> (EcrfService, Arc<MemoryBackend>, Arc<ManualScheduler>) {
        let backend = Arc::new(MemoryBackend::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let state = StateStore::open(backend.clone(), scheduler.clone()).unwrap();
        (EcrfService::new(SchemaRegistry::with_builtin(), state), backend, scheduler)
    }

    fn data(value: serde_json::Value) -> RecordData {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_rejected_submission_never_reaches_store() {
        let (svc, _, scheduler) = service();
        let form = svc.bind_form("S1", BindFormRequest::new("AE-1.0.0")).unwrap();
        scheduler.fire();

        let err = svc
            .submit_record("S1", &form.id, data(json!({"TERM": "", "START": "2024-01-10"})))
            .unwrap_err();

        let violations = err.violations().unwrap();
        assert_eq!(violations[0].path, "TERM");
        assert!(svc.list_records("S1", &form.id).unwrap().is_empty());
        assert!(!scheduler.is_armed());
    }

    #[test]
    fn test_valid_submission_is_stored() {
        let (svc, _, _) = service();
        let form = svc.bind_form("S1", BindFormRequest::new("AE-1.0.0")).unwrap();

        let record = svc
            .submit_record("S1", &form.id, data(json!({"TERM": "Nausea", "START": "2024-01-10", "X": 1})))
            .unwrap();

        assert_eq!(svc.get_record("S1", &form.id, &record.id).unwrap().data["X"], 1);
    }

    #[test]
    fn test_edit_validates_before_lookup() {
        let (svc, _, _) = service();
        let form = svc.bind_form("S1", BindFormRequest::new("IC-1.0.0")).unwrap();

        let err = svc
            .edit_record("S1", &form.id, "missing", data(json!({"SIGNED": "Y"})))
            .unwrap_err();
        assert!(matches!(err, EcrfError::Validation(_)));

        let err = svc
            .edit_record("S1", &form.id, "missing", data(json!({"SIGNED": "N", "DATE": "2024-01-01"})))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unknown_study_form_is_not_found() {
        let (svc, _, _) = service();
        svc.create_study("S1", None);
        assert!(matches!(
            svc.list_records("S1", "nope"),
            Err(EcrfError::NotFound { kind: ResourceKind::StudyForm, .. })
        ));
        assert!(svc.delete_record("S1", "nope", "r1").is_err());
    }

    #[test]
    fn test_template_lookup() {
        let (svc, _, _) = service();
        assert_eq!(svc.get_template("VS-1.0.0").unwrap().code, "VS");
        assert!(matches!(
            svc.get_template_schema("ZZ-9"),
            Err(EcrfError::NotFound { kind: ResourceKind::Template, .. })
        ));
        assert_eq!(svc.list_templates().len(), 5);
    }

    #[test]
    fn test_flush_now_writes_through() {
        let (svc, backend, scheduler) = service();
        svc.create_study("S1", None);
        svc.flush_now().unwrap();
        assert_eq!(backend.write_count(), 1);
        assert!(!scheduler.is_armed());
        assert!(backend.stored().unwrap().study("S1").is_some());
    }
}
