//! Tabular (CSV) encoding of a record bucket
//!
//! Columns are `RecordID`, `UpdatedAt`, then every data key in the order it is
//! first seen across the bucket. Rows are joined with CRLF, the text starts
//! with a UTF-8 byte-order mark and carries no trailing line break.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::records::Record;

/// UTF-8 byte-order mark
pub const BOM: &str = "\u{FEFF}";

const LINE_BREAK: &str = "\r\n";

/// Quotes a cell if it contains a comma, a double quote or a line break.
pub fn csv_cell(raw: &str) -> String {
    if raw.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

/// Text form of a submitted value before quoting.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => {
                // Plain digits, no `.0` or exponent; negative zero prints as 0
                if f == 0.0 {
                    "0".to_string()
                } else {
                    format!("{:.0}", f)
                }
            }
            _ => n.to_string(),
        },
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// RFC 3339, UTC, millisecond precision, `Z` suffix
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Data keys across `records` in first-seen order
pub fn collect_columns(records: &[Record]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for record in records {
        for key in record.data.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn join_row(cells: impl IntoIterator<Item = String>) -> String {
    cells.into_iter().map(|c| csv_cell(&c)).collect::<Vec<_>>().join(",")
}

/// Encodes one bucket as CSV text, BOM included.
pub fn encode_records_csv(records: &[Record]) -> String {
    let columns = collect_columns(records);

    let header = join_row(
        ["RecordID", "UpdatedAt"]
            .into_iter()
            .map(String::from)
            .chain(columns.iter().cloned()),
    );

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(header);

    for record in records {
        let mut cells = Vec::with_capacity(columns.len() + 2);
        cells.push(record.id.clone());
        cells.push(format_timestamp(&record.last_modified()));
        for column in &columns {
            cells.push(record.data.get(column).map(render_value).unwrap_or_default());
        }
        lines.push(join_row(cells));
    }

    format!("{}{}", BOM, lines.join(LINE_BREAK))
}
