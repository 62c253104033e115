//! CLI command implementations
//!
//! Every command loads the configuration first, installs logging, then does
//! its work. Only `serve` runs the debounced flush; the one-shot commands
//! never mutate state.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use crate::config::EcrfConfig;
use crate::error::{EcrfError, EcrfResult};
use crate::http_server::HttpServer;
use crate::observability::{init_logging, Event};
use crate::records::RecordData;
use crate::service::EcrfService;
use crate::storage::{ManualScheduler, MemoryBackend, Snapshot, StateStore};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_json};

/// Loads configuration and logging, then dispatches.
pub fn run_command(command: Command) -> CliResult<()> {
    let config = EcrfConfig::load(command.config_path().map(PathBuf::as_path))?;
    init_logging(config.log_format).map_err(CliError::boot_failed)?;
    info!(event = Event::ConfigLoaded.as_str(), data_file = %config.data_file.display());

    match command {
        Command::Serve { .. } => serve(&config),
        Command::Export { study, out, .. } => export(&config, &study, &out),
        Command::Templates { .. } => templates(&config),
        Command::Validate { template, .. } => validate(&config, &template),
    }
}

/// Runs the HTTP API until ctrl-c.
pub fn serve(config: &EcrfConfig) -> CliResult<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::boot_failed(format!("failed to start runtime: {}", e)))?;

    runtime.block_on(async {
        info!(event = Event::EcrfStartupBegin.as_str());
        let service = EcrfService::open(config).map_err(|e| CliError::boot_failed(e.to_string()))?;
        info!(
            event = Event::EcrfStartupComplete.as_str(),
            templates = service.registry().len(),
            studies = service.list_studies().len(),
        );

        HttpServer::new(config.http.clone(), Arc::new(service))
            .start()
            .await
            .map_err(CliError::from)
    })
}

/// Writes a study's archive to `out`, via a temporary file renamed on success.
pub fn export(config: &EcrfConfig, study_id: &str, out: &Path) -> CliResult<()> {
    let service = EcrfService::open_with_scheduler(config, Arc::new(ManualScheduler::new()))?;
    let plan = service.export_study(study_id)?;

    let mut partial = out.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let written = fs::File::create(&partial)
        .map_err(CliError::from)
        .and_then(|file| {
            let mut writer = std::io::BufWriter::new(file);
            let summary = plan.write_to(&mut writer).map_err(EcrfError::from)?;
            let file = writer.into_inner().map_err(|e| CliError::io_error(e.to_string()))?;
            file.sync_all()?;
            Ok(summary)
        });

    let summary = match written {
        Ok(summary) => summary,
        Err(e) => {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
    };
    fs::rename(&partial, out)?;

    write_json(&json!({
        "studyId": summary.study_id,
        "path": out.display().to_string(),
        "entries": summary.entries,
        "records": summary.records,
        "suggestedFilename": plan.suggested_filename(),
    }))
}

/// Prints template metadata.
pub fn templates(config: &EcrfConfig) -> CliResult<()> {
    let registry = EcrfService::registry_from_config(config)?;
    write_json(&registry.list_templates())
}

/// Validates one record read from stdin and prints the violations.
pub fn validate(config: &EcrfConfig, template_id: &str) -> CliResult<()> {
    let service = detached_service(config)?;
    service.get_template(template_id)?;

    let data = read_request()?;
    write_json(&validation_report(&service, template_id, &data)?)
}

/// Service over the configured templates and an empty in-memory state.
fn detached_service(config: &EcrfConfig) -> EcrfResult<EcrfService> {
    let registry = EcrfService::registry_from_config(config)?;
    let state = StateStore::new(
        Snapshot::new(),
        Arc::new(MemoryBackend::new()),
        Arc::new(ManualScheduler::new()),
    );
    Ok(EcrfService::new(registry, state))
}

fn validation_report(service: &EcrfService, template_id: &str, data: &RecordData) -> EcrfResult<Value> {
    let violations = service.validate_against_template(template_id, data)?;
    Ok(json!({
        "template": template_id,
        "valid": violations.is_empty(),
        "errors": violations,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use tempfile::TempDir;
    use zip::ZipArchive;

    use crate::error::ResourceKind;
    use crate::storage::{FileBackend, SnapshotBackend};
    use crate::study::{Study, StudyForm};

    #[test]
    fn test_export_writes_archive_and_leaves_no_partial() {
        let tmp = TempDir::new().unwrap();
        let config = EcrfConfig {
            data_file: tmp.path().join("data.json"),
            ..Default::default()
        };

        let mut snapshot = Snapshot::new();
        let mut study = Study::new("S1", vec!["V1".into()]);
        study.forms.push(StudyForm {
            id: "f1".into(),
            template_form_id: "VS-1.0.0".into(),
            code: "VS".into(),
            version: "1.0.0".into(),
            visits: vec![],
        });
        snapshot.studies.insert("S1".into(), study);
        FileBackend::new(&config.data_file).save(&snapshot).unwrap();

        let out = tmp.path().join("s1.zip");
        export(&config, "S1", &out).unwrap();

        assert!(!tmp.path().join("s1.zip.part").exists());
        let mut archive = ZipArchive::new(Cursor::new(fs::read(&out).unwrap())).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["_study_definition.json", "VS_v1.0.0.csv"]);
    }

    #[test]
    fn test_export_of_missing_study_creates_nothing() {
        let tmp = TempDir::new().unwrap();
        let config = EcrfConfig {
            data_file: tmp.path().join("data.json"),
            ..Default::default()
        };
        let out = tmp.path().join("none.zip");

        assert!(export(&config, "S404", &out).is_err());
        assert!(!out.exists());
        assert!(!tmp.path().join("none.zip.part").exists());
    }

    #[test]
    fn test_validation_report_goes_through_service() {
        let service = detached_service(&EcrfConfig::default()).unwrap();
        let data = json!({"TERM": "Rash", "START": "2024-01-10", "END": "2024-01-01"})
            .as_object()
            .cloned()
            .unwrap();

        let report = validation_report(&service, "AE-1.0.0", &data).unwrap();
        assert_eq!(report["template"], "AE-1.0.0");
        assert_eq!(report["valid"], false);
        assert_eq!(report["errors"][0]["path"], "END");

        let data = json!({"TERM": "Rash", "START": "2024-01-10"}).as_object().cloned().unwrap();
        let clean = validation_report(&service, "AE-1.0.0", &data).unwrap();
        assert_eq!(clean["valid"], true);
        assert_eq!(clean["errors"], json!([]));
    }

    #[test]
    fn test_validation_report_unknown_template() {
        let service = detached_service(&EcrfConfig::default()).unwrap();
        let err = validation_report(&service, "ZZ-9", &RecordData::new()).unwrap_err();
        assert!(matches!(err, EcrfError::NotFound { kind: ResourceKind::Template, .. }));
    }
}
