//! Form schema type definitions
//!
//! A template owns exactly one form schema. Schemas are ordered sections of
//! ordered fields; field paths are unique across the whole schema.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Supported field input types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text
    Text,
    /// Numeric input, optionally bounded by `min`/`max`
    Number,
    /// Calendar date in `YYYY-MM-DD` form
    Date,
    /// Drop-down choice from `options`
    Select,
    /// Radio choice from `options`
    Radio,
}

impl FieldType {
    /// Returns the type name as used in schema documents
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
        }
    }

    /// Whether the type carries an option list
    pub fn has_options(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio)
    }
}

/// One (value, label) choice of a select or radio field.
///
/// Written as a `["value", "label"]` pair. Reading also accepts the
/// `{"value": .., "label": ..}` object form (with `v`/`l` aliases).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOption", into = "(String, String)")]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

impl FieldOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOption {
    Pair(String, String),
    Object {
        #[serde(alias = "v")]
        value: String,
        #[serde(alias = "l")]
        label: String,
    },
}

impl From<RawOption> for FieldOption {
    fn from(raw: RawOption) -> Self {
        match raw {
            RawOption::Pair(value, label) => Self { value, label },
            RawOption::Object { value, label } => Self { value, label },
        }
    }
}

impl From<FieldOption> for (String, String) {
    fn from(option: FieldOption) -> Self {
        (option.value, option.label)
    }
}

/// Field definition within a section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Key of the value in a record's data, unique within the schema
    pub path: String,
    /// Display text
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Computed or locked fields are never demanded from the submitter
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    /// Inclusive lower bound for number fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for number fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl FieldDefinition {
    /// Create an optional field of the given type
    pub fn new(path: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
            field_type,
            required: false,
            read_only: false,
            options: Vec::new(),
            min: None,
            max: None,
        }
    }

    pub fn text(path: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(path, label, FieldType::Text)
    }

    pub fn number(path: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(path, label, FieldType::Number)
    }

    pub fn date(path: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(path, label, FieldType::Date)
    }

    pub fn select(path: impl Into<String>, label: impl Into<String>, options: Vec<FieldOption>) -> Self {
        Self {
            options,
            ..Self::new(path, label, FieldType::Select)
        }
    }

    pub fn radio(path: impl Into<String>, label: impl Into<String>, options: Vec<FieldOption>) -> Self {
        Self {
            options,
            ..Self::new(path, label, FieldType::Radio)
        }
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the field as read-only
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Set inclusive numeric bounds
    pub fn bounded(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

/// Ordered group of fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDefinition {
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl SectionDefinition {
    pub fn new(code: impl Into<String>, title: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            fields,
        }
    }
}

/// Declarative schema of one form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    /// Business code, e.g. "AE" or "DM"; selects cross-field rules
    pub form_code: String,
    pub title: String,
    #[serde(default)]
    pub sections: Vec<SectionDefinition>,
}

impl FormSchema {
    pub fn new(form_code: impl Into<String>, title: impl Into<String>, sections: Vec<SectionDefinition>) -> Self {
        Self {
            form_code: form_code.into(),
            title: title.into(),
            sections,
        }
    }

    /// All fields across all sections, in document order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.sections.iter().flat_map(|section| section.fields.iter())
    }

    /// Looks up a field by path
    pub fn field(&self, path: &str) -> Option<&FieldDefinition> {
        self.fields().find(|field| field.path == path)
    }

    /// Validates the schema structure itself (not a record)
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.form_code.trim().is_empty() {
            return Err("formCode must not be empty".into());
        }

        let mut seen = HashSet::new();
        for field in self.fields() {
            if field.path.is_empty() {
                return Err("field path must not be empty".into());
            }
            if !seen.insert(field.path.as_str()) {
                return Err(format!("duplicate field path '{}'", field.path));
            }
            if let (Some(min), Some(max)) = (field.min, field.max) {
                if min > max {
                    return Err(format!(
                        "field '{}' has min {} greater than max {}",
                        field.path, min, max
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Immutable, versioned form template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub code: String,
    pub name: String,
    pub version: String,
    pub schema: FormSchema,
}

impl Template {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        schema: FormSchema,
    ) -> Self {
        let code = code.into();
        let version = version.into();
        Self {
            id: template_id(&code, &version),
            code,
            name: name.into(),
            version,
            schema,
        }
    }

    /// Metadata view without the schema
    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            id: self.id.clone(),
            code: self.code.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }

    pub fn validate_structure(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("template id must not be empty".into());
        }
        if self.code.trim().is_empty() {
            return Err("template code must not be empty".into());
        }
        self.schema.validate_structure()
    }
}

/// Template metadata as listed by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: String,
    pub code: String,
    pub name: String,
    pub version: String,
}

/// Composite template id `<code>-<version>`
pub fn template_id(code: &str, version: &str) -> String {
    format!("{}-{}", code, version)
}
