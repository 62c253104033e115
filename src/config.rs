//! Service configuration
//!
//! Loaded from a JSON file. Every field has a default, so an empty object
//! (or a missing file at the default location) is a valid configuration.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EcrfError, EcrfResult};
use crate::http_server::HttpServerConfig;

pub const DEFAULT_CONFIG_PATH: &str = "./ecrf.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcrfConfig {
    /// Durable snapshot file
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Extra `*.json` template files
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,

    #[serde(default = "default_flush_debounce_ms")]
    pub flush_debounce_ms: u64,

    /// Visits for studies created implicitly by binding a form
    #[serde(default = "default_study_visits")]
    pub default_study_visits: Vec<String>,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default)]
    pub http: HttpServerConfig,
}

fn default_data_file() -> PathBuf {
    PathBuf::from("ecrf-data.json")
}

fn default_flush_debounce_ms() -> u64 {
    200
}

fn default_study_visits() -> Vec<String> {
    vec!["V1".to_string(), "V2".to_string(), "V3".to_string()]
}

impl Default for EcrfConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            templates_dir: None,
            flush_debounce_ms: default_flush_debounce_ms(),
            default_study_visits: default_study_visits(),
            log_format: LogFormat::default(),
            http: HttpServerConfig::default(),
        }
    }
}

impl EcrfConfig {
    /// Loads a configuration file.
    ///
    /// With `path == None` the default location is tried and a missing file
    /// yields defaults; an explicitly named file must exist. `PORT` from the
    /// environment overrides `http.port` either way.
    pub fn load(path: Option<&Path>) -> EcrfResult<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.http.apply_port_override(std::env::var("PORT").ok().as_deref());
        config.validate()?;
        Ok(config)
    }

    /// Parses one file without applying environment overrides.
    pub fn from_file(path: &Path) -> EcrfResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => EcrfError::Config(format!("config file not found: {}", path.display())),
            _ => EcrfError::Config(format!("cannot read {}: {}", path.display(), e)),
        })?;
        Self::from_json(&content).map_err(|e| match e {
            EcrfError::Config(msg) => EcrfError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn from_json(content: &str) -> EcrfResult<Self> {
        serde_json::from_str(content).map_err(|e| EcrfError::Config(e.to_string()))
    }

    pub fn validate(&self) -> EcrfResult<()> {
        if self.flush_debounce_ms == 0 {
            return Err(EcrfError::Config("flush_debounce_ms must be greater than 0".into()));
        }
        if self.data_file.as_os_str().is_empty() {
            return Err(EcrfError::Config("data_file must not be empty".into()));
        }
        Ok(())
    }

    pub fn flush_window(&self) -> Duration {
        Duration::from_millis(self.flush_debounce_ms)
    }
}
