//! # Design
//!
//! - Fatal conditions of a restore run, one variant per failure site.
//! - Keep the offending input (path, pattern, URL) alongside the source error.
//! - Per-item HTTP failures are not errors here; they travel as `RestoreOutcome::Failed`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for restore operations.
pub type RestoreResult<T> = Result<T, RestoreError>;

/// Errors that abort a restore run.
#[derive(Debug, Error)]
pub enum RestoreError {
    /// Configuration validation failures.
    #[error("invalid {field}: {reason}")]
    InvalidConfig {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// The path match pattern did not compile.
    #[error("error parsing match pattern '{pattern}'")]
    InvalidPattern {
        /// Pattern as supplied by the operator.
        pattern: String,
        /// Underlying regex error.
        source: regex::Error,
    },
    /// The backup stream could not be opened.
    #[error("error opening restore file {}", .path.display())]
    OpenSource {
        /// Backup stream location.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The backup stream is not a readable gzip stream.
    #[error("error uncompressing restore file {}", .path.display())]
    Decompress {
        /// Backup stream location.
        path: PathBuf,
        /// Underlying IO error raised by the decompressor.
        source: io::Error,
    },
    /// A record in the backup stream could not be decoded.
    #[error("error reading backup file at record {record}")]
    Decode {
        /// One-based index of the offending record.
        record: u64,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// A record decoded without a path.
    #[error("backup record {record} has an empty path")]
    EmptyPath {
        /// One-based index of the offending record.
        record: u64,
    },
    /// The shared HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    ClientBuild {
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The target server could not be reached.
    #[error("error executing POST to {url}")]
    Transport {
        /// Restore endpoint that was being called.
        url: String,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// A worker or the decode loop panicked or was cancelled.
    #[error("{task} task failed to complete")]
    TaskJoin {
        /// Task that failed.
        task: &'static str,
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

impl RestoreError {
    /// Whether the error stems from operator input rather than the environment.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. } | Self::InvalidPattern { .. })
    }
}
