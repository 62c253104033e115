//! CLI argument definitions using clap
//!
//! Commands:
//! - ecrf serve [--config <path>]
//! - ecrf export --study <id> --out <file> [--config <path>]
//! - ecrf templates [--config <path>]
//! - ecrf validate --template <id> [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// eCRF - case report form capture, validation and export
#[derive(Parser, Debug)]
#[command(name = "ecrf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API
    Serve {
        /// Path to configuration file (default: ./ecrf.json if present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write a study's export archive to a file
    Export {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Study to export
        #[arg(long)]
        study: String,

        /// Output archive path
        #[arg(long)]
        out: PathBuf,
    },

    /// Print the template catalog as JSON
    Templates {
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate one JSON record from stdin against a template
    Validate {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Template id, e.g. AE-1.0.0
        #[arg(long)]
        template: String,
    },
}

impl Command {
    pub fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Command::Serve { config }
            | Command::Export { config, .. }
            | Command::Templates { config }
            | Command::Validate { config, .. } => config.as_ref(),
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_args() {
        let cli = Cli::try_parse_from(["ecrf", "export", "--study", "S1", "--out", "/tmp/s1.zip"]).unwrap();
        match cli.command {
            Command::Export { study, out, config } => {
                assert_eq!(study, "S1");
                assert_eq!(out, PathBuf::from("/tmp/s1.zip"));
                assert!(config.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_validate_requires_template() {
        assert!(Cli::try_parse_from(["ecrf", "validate"]).is_err());
        let cli = Cli::try_parse_from(["ecrf", "validate", "--template", "AE-1.0.0", "--config", "x.json"]).unwrap();
        assert_eq!(cli.command.config_path(), Some(&PathBuf::from("x.json")));
    }
}
