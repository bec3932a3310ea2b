//! Backup stream fixtures.
//!
//! A backup stream is a gzip file of concatenated JSON records, one per line,
//! shaped as `{"Path": ..., "Meta": ...}`.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Value, json};
use tempfile::NamedTempFile;

/// Build a single backup record.
#[must_use]
pub fn record(path: &str, meta: Value) -> Value {
    json!({ "Path": path, "Meta": meta })
}

/// Temporary backup stream on disk, removed when dropped.
pub struct BackupFixture {
    file: NamedTempFile,
}

impl BackupFixture {
    /// Write the records as a well-formed gzip backup stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created or written.
    pub fn from_records(records: &[Value]) -> Result<Self> {
        let mut body = Vec::new();
        for value in records {
            serde_json::to_writer(&mut body, value).context("failed to encode record")?;
            body.push(b'\n');
        }
        Self::from_uncompressed(&body)
    }

    /// Compress arbitrary bytes into a gzip stream, used for malformed payloads.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created or written.
    pub fn from_uncompressed(body: &[u8]) -> Result<Self> {
        let file = NamedTempFile::new().context("failed to create fixture file")?;
        let handle = file.reopen().context("failed to reopen fixture file")?;
        let mut encoder = GzEncoder::new(handle, Compression::default());
        encoder.write_all(body).context("failed to compress fixture")?;
        encoder.finish().context("failed to finish gzip stream")?;
        Ok(Self { file })
    }

    /// Write bytes verbatim with no compression applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created or written.
    pub fn raw(bytes: &[u8]) -> Result<Self> {
        let file = NamedTempFile::new().context("failed to create fixture file")?;
        let mut handle: File = file.reopen().context("failed to reopen fixture file")?;
        handle.write_all(bytes).context("failed to write fixture")?;
        handle.flush().context("failed to flush fixture")?;
        Ok(Self { file })
    }

    /// Location of the fixture on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
