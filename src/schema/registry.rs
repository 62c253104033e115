//! Template registry
//!
//! Holds the catalog of published templates. Populated at startup from the
//! builtin catalog and, optionally, a directory of `*.json` template files;
//! read-only once the service is running.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::info;

use super::builtin;
use super::errors::{SchemaError, SchemaResult};
use super::types::{FormSchema, Template, TemplateSummary};
use crate::observability::Event;

/// In-memory template catalog, listed in registration order.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    templates: Vec<Template>,
    index: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry seeded with the builtin template catalog.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for template in builtin::templates() {
            // Builtin ids are distinct and their schemas well-formed.
            if let Err(e) = registry.register(template) {
                tracing::error!(error = %e, "builtin template rejected");
            }
        }
        registry
    }

    /// Registers a template.
    ///
    /// Fails if the id is already taken or the schema is structurally invalid.
    pub fn register(&mut self, template: Template) -> SchemaResult<()> {
        template
            .validate_structure()
            .map_err(|reason| SchemaError::malformed(template.id.clone(), reason))?;

        if self.index.contains_key(&template.id) {
            return Err(SchemaError::TemplateImmutable(template.id));
        }

        self.index.insert(template.id.clone(), self.templates.len());
        self.templates.push(template);
        Ok(())
    }

    /// Loads every `*.json` file in `dir` as a template, in file name order.
    ///
    /// Returns the number of templates loaded.
    pub fn load_dir(&mut self, dir: &Path) -> SchemaResult<usize> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| SchemaError::io(dir, e))? {
            let path = entry.map_err(|e| SchemaError::io(dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            self.load_file(path)?;
        }

        info!(
            event = Event::TemplatesLoaded.as_str(),
            dir = %dir.display(),
            count = paths.len(),
        );
        Ok(paths.len())
    }

    fn load_file(&mut self, path: &Path) -> SchemaResult<()> {
        let content = fs::read_to_string(path).map_err(|e| SchemaError::io(path, e))?;
        let template: Template = serde_json::from_str(&content).map_err(|e| {
            SchemaError::malformed(path.display().to_string(), format!("invalid JSON: {}", e))
        })?;
        self.register(template)
    }

    /// Gets a template by id.
    pub fn get_template(&self, template_id: &str) -> SchemaResult<&Template> {
        self.index
            .get(template_id)
            .map(|&i| &self.templates[i])
            .ok_or_else(|| SchemaError::TemplateNotFound(template_id.to_string()))
    }

    /// Gets only the form schema of a template.
    pub fn get_schema(&self, template_id: &str) -> SchemaResult<&FormSchema> {
        self.get_template(template_id).map(|t| &t.schema)
    }

    /// Checks if a template exists.
    pub fn contains(&self, template_id: &str) -> bool {
        self.index.contains_key(template_id)
    }

    /// Lists template metadata in registration order.
    pub fn list_templates(&self) -> Vec<TemplateSummary> {
        self.templates.iter().map(Template::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
