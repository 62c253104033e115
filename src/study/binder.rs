//! Study/form binder
//!
//! Binds published templates into studies. Each bind creates a new
//! [`StudyForm`] with its own identity, even when the template is already
//! bound; records are stored under that identity.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::types::{BindFormRequest, FormDefinition, Study, StudyDefinition, StudyForm};
use crate::error::{EcrfError, EcrfResult, ResourceKind};
use crate::observability::Event;
use crate::schema::SchemaRegistry;
use crate::storage::StateStore;

pub struct StudyBinder {
    registry: Arc<SchemaRegistry>,
    state: StateStore,
    /// Visits given to studies created implicitly by a bind
    default_visits: Vec<String>,
}

impl StudyBinder {
    pub fn new(registry: Arc<SchemaRegistry>, state: StateStore) -> Self {
        Self {
            registry,
            state,
            default_visits: Vec::new(),
        }
    }

    pub fn with_default_visits(mut self, visits: Vec<String>) -> Self {
        self.default_visits = visits;
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Creates an empty study. Re-creating an existing study returns it unchanged.
    pub fn create_study(&self, study_id: &str, visits: Option<Vec<String>>) -> Study {
        if let Some(existing) = self.state.read(|s| s.study(study_id).cloned()) {
            return existing;
        }

        let visits = visits.unwrap_or_else(|| self.default_visits.clone());
        self.state.mutate(|s| {
            s.studies
                .entry(study_id.to_string())
                .or_insert_with(|| Study::new(study_id, visits))
                .clone()
        })
    }

    /// Binds a template into `study_id`, creating the study if absent.
    pub fn bind_form(&self, study_id: &str, request: BindFormRequest) -> EcrfResult<StudyForm> {
        let template = self
            .registry
            .get_template(&request.source_template_id)
            .map_err(|_| EcrfError::InvalidTemplate(request.source_template_id.clone()))?;

        let form = StudyForm {
            id: Uuid::new_v4().to_string(),
            template_form_id: template.id.clone(),
            code: request.target_code.unwrap_or_else(|| template.code.clone()),
            version: request.target_version.unwrap_or_else(|| template.version.clone()),
            visits: request.visits,
        };

        let default_visits = &self.default_visits;
        self.state.mutate(|s| {
            s.studies
                .entry(study_id.to_string())
                .or_insert_with(|| Study::new(study_id, default_visits.clone()))
                .forms
                .push(form.clone());
        });

        info!(
            event = Event::FormBound.as_str(),
            study_id,
            study_form_id = %form.id,
            template_id = %form.template_form_id,
        );

        Ok(form)
    }

    pub fn get_study(&self, study_id: &str) -> EcrfResult<Study> {
        self.state
            .read(|s| s.study(study_id).cloned())
            .ok_or_else(|| EcrfError::not_found(ResourceKind::Study, study_id))
    }

    /// Study with each form's schema resolved.
    ///
    /// A form whose template is no longer registered carries no schema.
    pub fn get_definition(&self, study_id: &str) -> EcrfResult<StudyDefinition> {
        let study = self.get_study(study_id)?;

        let forms = study
            .forms
            .into_iter()
            .map(|form| {
                let schema = self.registry.get_schema(&form.template_form_id).ok().cloned();
                FormDefinition { form, schema }
            })
            .collect();

        Ok(StudyDefinition {
            study_id: study.study_id,
            visits: study.visits,
            forms,
        })
    }

    pub fn get_study_form(&self, study_id: &str, study_form_id: &str) -> EcrfResult<StudyForm> {
        self.state.read(|s| {
            if s.study(study_id).is_none() {
                return Err(EcrfError::not_found(ResourceKind::Study, study_id));
            }
            s.study_form(study_id, study_form_id)
                .cloned()
                .ok_or_else(|| EcrfError::not_found(ResourceKind::StudyForm, study_form_id))
        })
    }

    /// Study ids in ascending order
    pub fn list_studies(&self) -> Vec<String> {
        self.state.read(|s| s.studies.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ManualScheduler, MemoryBackend, StateStore};

    fn binder() -> (StudyBinder, Arc<ManualScheduler>) {
        let scheduler = Arc::new(ManualScheduler::new());
        let state = StateStore::open(Arc::new(MemoryBackend::new()), scheduler.clone()).unwrap();
        let binder = StudyBinder::new(Arc::new(SchemaRegistry::with_builtin()), state)
            .with_default_visits(vec!["V1".into(), "V2".into()]);
        (binder, scheduler)
    }

    #[test]
    fn test_bind_creates_study_and_copies_template_identity() {
        let (binder, scheduler) = binder();

        let form = binder
            .bind_form("S1", BindFormRequest::new("AE-1.0.0").with_visits(vec!["V1".into()]))
            .unwrap();

        assert_eq!(form.code, "AE");
        assert_eq!(form.version, "1.0.0");
        assert_eq!(form.template_form_id, "AE-1.0.0");
        assert_eq!(form.visits, vec!["V1".to_string()]);
        assert!(scheduler.is_armed());

        let study = binder.get_study("S1").unwrap();
        assert_eq!(study.visits, vec!["V1".to_string(), "V2".to_string()]);
        assert_eq!(study.forms.len(), 1);
    }

    #[test]
    fn test_bind_with_overrides() {
        let (binder, _) = binder();
        let form = binder
            .bind_form(
                "S1",
                BindFormRequest::new("AE-1.0.0").with_target(Some("AE2".into()), Some("2.0".into())),
            )
            .unwrap();
        assert_eq!(form.code, "AE2");
        assert_eq!(form.version, "2.0");
        assert_eq!(form.template_form_id, "AE-1.0.0");
    }

    #[test]
    fn test_unknown_template_is_invalid_and_creates_nothing() {
        let (binder, scheduler) = binder();
        let err = binder.bind_form("S1", BindFormRequest::new("NOPE-1")).unwrap_err();
        assert!(matches!(err, EcrfError::InvalidTemplate(ref id) if id == "NOPE-1"));
        assert!(binder.list_studies().is_empty());
        assert!(!scheduler.is_armed());
    }

    #[test]
    fn test_same_template_bound_twice_gets_distinct_forms() {
        let (binder, _) = binder();
        let a = binder.bind_form("S1", BindFormRequest::new("VS-1.0.0")).unwrap();
        let b = binder.bind_form("S1", BindFormRequest::new("VS-1.0.0")).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(binder.get_study("S1").unwrap().forms.len(), 2);
    }

    #[test]
    fn test_definition_embeds_schema() {
        let (binder, _) = binder();
        let form = binder.bind_form("S1", BindFormRequest::new("DM-1.0.0")).unwrap();

        let def = binder.get_definition("S1").unwrap();
        assert_eq!(def.forms.len(), 1);
        assert_eq!(def.forms[0].form.id, form.id);
        assert_eq!(def.forms[0].schema.as_ref().unwrap().form_code, "DM");
    }

    #[test]
    fn test_missing_study_and_form_are_not_found() {
        let (binder, _) = binder();
        assert!(matches!(
            binder.get_definition("S9"),
            Err(EcrfError::NotFound { kind: ResourceKind::Study, .. })
        ));

        binder.create_study("S1", None);
        assert!(matches!(
            binder.get_study_form("S1", "missing"),
            Err(EcrfError::NotFound { kind: ResourceKind::StudyForm, .. })
        ));
    }

    #[test]
    fn test_create_study_is_idempotent() {
        let (binder, _) = binder();
        let first = binder.create_study("S1", Some(vec!["Screening".into()]));
        let again = binder.create_study("S1", Some(vec!["Other".into()]));
        assert_eq!(first, again);
        assert_eq!(again.visits, vec!["Screening".to_string()]);
        assert_eq!(binder.list_studies(), vec!["S1".to_string()]);
    }
}
