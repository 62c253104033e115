//! CLI module for eCRF
//!
//! Provides command-line interface for:
//! - serve: run the HTTP API
//! - export: write a study archive to a file
//! - templates: print the template catalog
//! - validate: check one record from stdin against a template

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{export, run_command, serve, templates, validate};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_object, read_request, write_json};

/// Parses arguments and runs the selected command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}
