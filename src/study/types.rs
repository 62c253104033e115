//! Study and study-form types

use serde::{Deserialize, Serialize};

use crate::schema::FormSchema;

/// A study-specific instantiation of a template; the key records are stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyForm {
    pub id: String,
    /// Reference to the template whose schema governs this form
    pub template_form_id: String,
    pub code: String,
    pub version: String,
    #[serde(default)]
    pub visits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Study {
    pub study_id: String,
    #[serde(default)]
    pub visits: Vec<String>,
    #[serde(default)]
    pub forms: Vec<StudyForm>,
}

impl Study {
    pub fn new(study_id: impl Into<String>, visits: Vec<String>) -> Self {
        Self {
            study_id: study_id.into(),
            visits,
            forms: Vec::new(),
        }
    }

    pub fn form(&self, study_form_id: &str) -> Option<&StudyForm> {
        self.forms.iter().find(|f| f.id == study_form_id)
    }
}

/// Study form with its resolved schema embedded
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDefinition {
    #[serde(flatten)]
    pub form: StudyForm,
    /// `None` when the referenced template is no longer registered
    pub schema: Option<FormSchema>,
}

/// Full definition of a study as served to form renderers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyDefinition {
    pub study_id: String,
    pub visits: Vec<String>,
    pub forms: Vec<FormDefinition>,
}

/// Request to bind a template into a study
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindFormRequest {
    #[serde(alias = "sourceFormId")]
    pub source_template_id: String,
    /// Overrides the template code
    #[serde(default)]
    pub target_code: Option<String>,
    /// Overrides the template version
    #[serde(default)]
    pub target_version: Option<String>,
    #[serde(default)]
    pub visits: Vec<String>,
}

impl BindFormRequest {
    pub fn new(source_template_id: impl Into<String>) -> Self {
        Self {
            source_template_id: source_template_id.into(),
            ..Default::default()
        }
    }

    pub fn with_visits(mut self, visits: Vec<String>) -> Self {
        self.visits = visits;
        self
    }

    pub fn with_target(mut self, code: Option<String>, version: Option<String>) -> Self {
        self.target_code = code;
        self.target_version = version;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_study_form_wire_shape() {
        let form = StudyForm {
            id: "f1".into(),
            template_form_id: "AE-1.0.0".into(),
            code: "AE".into(),
            version: "1.0.0".into(),
            visits: vec!["V1".into()],
        };
        let value = serde_json::to_value(&form).unwrap();
        assert_eq!(value["templateFormId"], "AE-1.0.0");
    }

    #[test]
    fn test_study_without_visits_deserializes() {
        let study: Study = serde_json::from_value(json!({"studyId": "S1", "forms": []})).unwrap();
        assert!(study.visits.is_empty());
    }

    #[test]
    fn test_bind_request_accepts_source_form_id_alias() {
        let request: BindFormRequest =
            serde_json::from_value(json!({"sourceFormId": "DM-1.0.0", "visits": ["V1"]})).unwrap();
        assert_eq!(request.source_template_id, "DM-1.0.0");
        assert_eq!(request.target_code, None);
    }

    #[test]
    fn test_form_definition_flattens_form() {
        let def = FormDefinition {
            form: StudyForm {
                id: "f1".into(),
                template_form_id: "gone".into(),
                code: "XX".into(),
                version: "1".into(),
                visits: vec![],
            },
            schema: None,
        };
        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["id"], "f1");
        assert!(value["schema"].is_null());
    }
}
