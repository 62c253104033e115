//! JSON I/O for the CLI
//!
//! - Input: one JSON object on stdin
//! - Output: one JSON document on stdout

use std::io::{self, Read, Write};

use serde::Serialize;
use serde_json::{Map, Value};

use super::errors::{CliError, CliResult};

/// Parses one JSON object from `reader`.
pub fn read_object<R: Read>(mut reader: R) -> CliResult<Map<String, Value>> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;

    if input.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }

    match serde_json::from_str::<Value>(&input)? {
        Value::Object(map) => Ok(map),
        _ => Err(CliError::io_error("Expected a JSON object")),
    }
}

/// Reads the record to validate from stdin.
pub fn read_request() -> CliResult<Map<String, Value>> {
    read_object(io::stdin().lock())
}

/// Writes `value` as pretty JSON followed by a newline.
pub fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
