//! Study export pipeline
//!
//! `prepare` captures a consistent view of a study (definition plus every
//! form's bucket) and encodes it; `write_to` streams the archive into any
//! writer. A write failure anywhere aborts the export with an error.

use std::collections::HashSet;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use super::archive::ArchiveWriter;
use super::errors::ExportResult;
use super::tabular::encode_records_csv;
use crate::error::{EcrfError, EcrfResult, ResourceKind};
use crate::observability::Event;
use crate::storage::StateStore;

/// Name of the definition entry; always first in the archive
pub const DEFINITION_ENTRY: &str = "_study_definition.json";

const DEFAULT_CODE: &str = "FORM";
const DEFAULT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedForm {
    pub id: String,
    pub code: String,
    pub version: String,
    pub visits: Vec<String>,
}

/// Study summary written as the definition entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDefinition {
    pub study_id: String,
    pub visits: Vec<String>,
    pub forms: Vec<ExportedForm>,
}

/// One encoded CSV entry
#[derive(Debug, Clone)]
pub struct CsvEntry {
    pub file_name: String,
    pub study_form_id: String,
    pub rows: usize,
    pub contents: String,
}

/// Result of a completed export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub study_id: String,
    pub entries: usize,
    pub records: usize,
}

/// Replaces anything outside `[A-Za-z0-9._-]` with `_`.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `<code>_v<version>.csv`, with blank parts replaced by defaults
pub fn csv_file_name(code: &str, version: &str) -> String {
    let code = if code.is_empty() { DEFAULT_CODE } else { code };
    let version = if version.is_empty() { DEFAULT_VERSION } else { version };
    format!("{}_v{}.csv", sanitize(code), sanitize(version))
}

/// Appends `-2`, `-3`, ... before the extension until `name` is unused.
fn unique_name(name: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.clone()) {
        return name;
    }
    let stem = name.strip_suffix(".csv").unwrap_or(&name).to_string();
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}.csv", stem, n);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Everything needed to write one study's archive
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub definition: ExportDefinition,
    pub csv_entries: Vec<CsvEntry>,
    pub created_at: DateTime<Utc>,
}

impl ExportPlan {
    /// `<studyId>_export_<YYYYMMDDHHMMSS>.zip`
    pub fn suggested_filename(&self) -> String {
        format!(
            "{}_export_{}.zip",
            sanitize(&self.definition.study_id),
            self.created_at.format("%Y%m%d%H%M%S")
        )
    }

    pub fn record_count(&self) -> usize {
        self.csv_entries.iter().map(|e| e.rows).sum()
    }

    /// Writes the archive into `out`.
    pub fn write_to<W: Write>(&self, out: W) -> ExportResult<ExportSummary> {
        let result = self.write_archive(out);

        match &result {
            Ok(summary) => info!(
                event = Event::ExportComplete.as_str(),
                study_id = %summary.study_id,
                entries = summary.entries,
                records = summary.records,
            ),
            Err(e) => error!(
                event = Event::ExportFailed.as_str(),
                study_id = %self.definition.study_id,
                error = %e,
            ),
        }
        result
    }

    fn write_archive<W: Write>(&self, out: W) -> ExportResult<ExportSummary> {
        let mut archive = ArchiveWriter::new(out, self.created_at);

        let definition = serde_json::to_vec_pretty(&self.definition)?;
        archive.append(DEFINITION_ENTRY, &definition)?;

        for entry in &self.csv_entries {
            archive.append(&entry.file_name, entry.contents.as_bytes())?;
        }

        let entries = archive.entry_count();
        archive.finish()?;

        Ok(ExportSummary {
            study_id: self.definition.study_id.clone(),
            entries,
            records: self.record_count(),
        })
    }

    /// Whole archive in memory
    pub fn to_bytes(&self) -> ExportResult<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(buffer)
    }
}

#[derive(Debug, Clone)]
pub struct ExportPipeline {
    state: StateStore,
}

impl ExportPipeline {
    pub fn new(state: StateStore) -> Self {
        Self { state }
    }

    /// Captures and encodes a study. Fails fast if the study is absent.
    pub fn prepare(&self, study_id: &str) -> EcrfResult<ExportPlan> {
        self.state.read(|s| {
            let study = s
                .study(study_id)
                .ok_or_else(|| EcrfError::not_found(ResourceKind::Study, study_id))?;

            let mut taken = HashSet::new();
            let csv_entries = study
                .forms
                .iter()
                .map(|form| {
                    let bucket = s.bucket(&form.id);
                    CsvEntry {
                        file_name: unique_name(csv_file_name(&form.code, &form.version), &mut taken),
                        study_form_id: form.id.clone(),
                        rows: bucket.len(),
                        contents: encode_records_csv(bucket),
                    }
                })
                .collect();

            let definition = ExportDefinition {
                study_id: study.study_id.clone(),
                visits: study.visits.clone(),
                forms: study
                    .forms
                    .iter()
                    .map(|f| ExportedForm {
                        id: f.id.clone(),
                        code: f.code.clone(),
                        version: f.version.clone(),
                        visits: f.visits.clone(),
                    })
                    .collect(),
            };

            Ok(ExportPlan {
                definition,
                csv_entries,
                created_at: Utc::now(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Record;
    use crate::storage::{ManualScheduler, MemoryBackend, Snapshot};
    use crate::study::{Study, StudyForm};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn form(id: &str, code: &str, version: &str) -> StudyForm {
        StudyForm {
            id: id.into(),
            template_form_id: format!("{}-1.0.0", code),
            code: code.into(),
            version: version.into(),
            visits: vec!["V1".into()],
        }
    }

    fn pipeline_with(study: Study, records: Vec<(&str, Vec<Record>)>) -> ExportPipeline {
        let mut snapshot = Snapshot::new();
        snapshot.studies.insert(study.study_id.clone(), study);
        for (id, bucket) in records {
            snapshot.records.insert(id.to_string(), bucket);
        }
        let state = StateStore::new(
            snapshot,
            Arc::new(MemoryBackend::new()),
            Arc::new(ManualScheduler::new()),
        );
        ExportPipeline::new(state)
    }

    #[test]
    fn test_csv_file_name() {
        assert_eq!(csv_file_name("AE", "1.0.0"), "AE_v1.0.0.csv");
        assert_eq!(csv_file_name("AE", "1.0 beta/2"), "AE_v1.0_beta_2.csv");
        assert_eq!(csv_file_name("", ""), "FORM_v1.0.0.csv");
        assert_eq!(csv_file_name("A/B", "1"), "A_B_v1.csv");
    }

    #[test]
    fn test_colliding_names_get_suffixes() {
        let mut taken = HashSet::new();
        assert_eq!(unique_name("AE_v1.csv".into(), &mut taken), "AE_v1.csv");
        assert_eq!(unique_name("AE_v1.csv".into(), &mut taken), "AE_v1-2.csv");
        assert_eq!(unique_name("AE_v1.csv".into(), &mut taken), "AE_v1-3.csv");
    }

    #[test]
    fn test_missing_study_fails_fast() {
        let pipeline = pipeline_with(Study::new("S1", vec![]), vec![]);
        assert!(matches!(
            pipeline.prepare("S2"),
            Err(EcrfError::NotFound { kind: ResourceKind::Study, .. })
        ));
    }

    #[test]
    fn test_plan_covers_every_form() {
        let mut study = Study::new("S1", vec!["V1".into()]);
        study.forms.push(form("f1", "AE", "1.0.0"));
        study.forms.push(form("f2", "AE", "1.0.0"));
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let rec = Record::new(Default::default(), now);

        let plan = pipeline_with(study, vec![("f1", vec![rec])]).prepare("S1").unwrap();

        assert_eq!(plan.csv_entries.len(), 2);
        assert_eq!(plan.csv_entries[0].file_name, "AE_v1.0.0.csv");
        assert_eq!(plan.csv_entries[1].file_name, "AE_v1.0.0-2.csv");
        assert_eq!(plan.record_count(), 1);
        assert_eq!(plan.definition.forms[1].id, "f2");
        assert!(plan.suggested_filename().starts_with("S1_export_"));
        assert!(plan.suggested_filename().ends_with(".zip"));
    }

    #[test]
    fn test_suggested_filename_stamp() {
        let mut plan = pipeline_with(Study::new("S1", vec![]), vec![]).prepare("S1").unwrap();
        plan.created_at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(plan.suggested_filename(), "S1_export_20240506070809.zip");
    }
}
