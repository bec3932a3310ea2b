//! Immutable run configuration shared by the filter, client, and coordinator.

use std::path::PathBuf;

use url::Url;

use crate::error::{RestoreError, RestoreResult};

/// Pattern that admits every path.
pub const DEFAULT_MATCH: &str = ".*";
/// Default size of the restore worker pool.
pub const DEFAULT_WORKERS: usize = 4;
/// Expiration sentinel meaning "let the server decide".
pub const NO_EXPIRE_OVERRIDE: i64 = -1;
/// Default store address, the cbfs listener on localhost.
pub const DEFAULT_STORE_URL: &str = "http://127.0.0.1:8484/";

/// Settings captured once at startup for a single restore run.
#[derive(Debug, Clone)]
pub struct RestoreConfig {
    /// Base address of the target store.
    pub base_url: Url,
    /// Location of the compressed backup stream.
    pub source: PathBuf,
    /// Regular expression a record path must match to be restored.
    pub pattern: String,
    /// Treat conflicts as failures instead of silent skips.
    pub force: bool,
    /// Log what would be restored without calling the server.
    pub noop: bool,
    /// Log every dispatched item.
    pub verbose: bool,
    /// Number of concurrent restore workers.
    pub workers: usize,
    /// Expiration override forwarded to the server, `-1` for none.
    pub expire: i64,
}

impl RestoreConfig {
    /// Configuration with defaults for everything but the target and the source.
    #[must_use]
    pub fn new(base_url: Url, source: impl Into<PathBuf>) -> Self {
        Self {
            base_url,
            source: source.into(),
            pattern: DEFAULT_MATCH.to_string(),
            force: false,
            noop: false,
            verbose: false,
            workers: DEFAULT_WORKERS,
            expire: NO_EXPIRE_OVERRIDE,
        }
    }

    /// Check the invariants the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns [`RestoreError::InvalidConfig`] when the worker count is zero or
    /// the source path is empty.
    pub fn validate(&self) -> RestoreResult<()> {
        if self.workers == 0 {
            return Err(RestoreError::InvalidConfig {
                field: "workers",
                reason: "must be at least 1",
                value: Some(self.workers.to_string()),
            });
        }
        if self.source.as_os_str().is_empty() {
            return Err(RestoreError::InvalidConfig {
                field: "source",
                reason: "a backup file is required",
                value: None,
            });
        }
        if self.base_url.cannot_be_a_base() {
            return Err(RestoreError::InvalidConfig {
                field: "url",
                reason: "must be an absolute http(s) address",
                value: Some(self.base_url.to_string()),
            });
        }
        Ok(())
    }
}
