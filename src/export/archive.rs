//! ZIP writer for export bundles
//!
//! Entries are deflated at the highest level and kept in the order given.
//! The central directory needs seeking, so the archive is assembled in
//! memory and copied into the sink by `finish`.

use std::io::{Cursor, Write};

use chrono::{DateTime, Datelike, Timelike, Utc};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::errors::{ExportError, ExportResult};

const DEFLATE_LEVEL: i64 = 9;

pub struct ArchiveWriter<W: Write> {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    out: W,
    modified: zip::DateTime,
    entries: usize,
}

/// ZIP timestamps start in 1980; anything outside the range falls back to it.
fn zip_timestamp(at: DateTime<Utc>) -> zip::DateTime {
    let (Ok(year), Ok(month), Ok(day)) = (u16::try_from(at.year()), u8::try_from(at.month()), u8::try_from(at.day()))
    else {
        return zip::DateTime::default();
    };
    zip::DateTime::from_date_and_time(year, month, day, at.hour() as u8, at.minute() as u8, at.second() as u8)
        .unwrap_or_default()
}

impl<W: Write> ArchiveWriter<W> {
    /// Starts an archive; every entry is stamped with `created_at`.
    pub fn new(out: W, created_at: DateTime<Utc>) -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            out,
            modified: zip_timestamp(created_at),
            entries: 0,
        }
    }

    fn entry_options(&self) -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(DEFLATE_LEVEL))
            .last_modified_time(self.modified)
            .unix_permissions(0o644)
    }

    /// Appends one regular file.
    pub fn append(&mut self, name: &str, contents: &[u8]) -> ExportResult<()> {
        let options = self.entry_options();
        self.zip
            .start_file(name, options)
            .map_err(|e| ExportError::zip(format!("adding {}", name), e))?;
        self.zip
            .write_all(contents)
            .map_err(|e| ExportError::io(format!("adding {}", name), e))?;
        self.entries += 1;
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Writes the central directory and copies the archive into the sink.
    pub fn finish(self) -> ExportResult<W> {
        let Self { zip, mut out, .. } = self;
        let bytes = zip
            .finish()
            .map_err(|e| ExportError::zip("finishing archive", e))?
            .into_inner();

        out.write_all(&bytes)
            .map_err(|e| ExportError::io("writing archive", e))?;
        out.flush().map_err(|e| ExportError::io("flushing archive", e))?;
        Ok(out)
    }
}
