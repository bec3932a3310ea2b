//! Fixed-size pool of restore workers draining one shared channel.
//!
//! # Design
//!
//! - Every worker is spawned before the first item is sent.
//! - A worker handles one item at a time and exits once the channel is closed
//!   and empty.
//! - A transport failure closes the channel so the producer stops; items
//!   already buffered are still received and processed.

use std::sync::Arc;

use async_channel::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::client::{RestoreClient, RestoreOutcome};
use crate::decoder::WorkItem;
use crate::error::{RestoreError, RestoreResult};

/// Outcome counts gathered by one worker.
#[derive(Debug, Default)]
pub struct WorkerTally {
    /// Items the server created.
    pub restored: u64,
    /// Items logged in noop mode.
    pub simulated: u64,
    /// Items skipped because they already existed.
    pub skipped: u64,
    /// Items that failed, including the one that hit a transport failure.
    pub failed: u64,
    /// First transport failure seen by this worker.
    pub fatal: Option<RestoreError>,
}

impl WorkerTally {
    fn record(&mut self, item: &WorkItem, outcome: RestoreOutcome, receiver: &Receiver<WorkItem>) {
        match outcome {
            RestoreOutcome::Restored => self.restored += 1,
            RestoreOutcome::Simulated => self.simulated += 1,
            RestoreOutcome::SkippedConflict => self.skipped += 1,
            RestoreOutcome::Failed(failure) => {
                self.failed += 1;
                warn!(error = %failure, "Error restoring {}", item.path);
            }
            RestoreOutcome::Fatal(err) => {
                self.failed += 1;
                error!(error = %err, "Error restoring {}", item.path);
                if receiver.close() {
                    warn!("target unreachable; no further records will be dispatched");
                }
                if self.fatal.is_none() {
                    self.fatal = Some(err);
                }
            }
        }
    }
}

/// Aggregate of every worker's tally, available once the pool has joined.
#[derive(Debug, Default)]
pub struct PoolReport {
    /// Items the server created.
    pub restored: u64,
    /// Items logged in noop mode.
    pub simulated: u64,
    /// Items skipped because they already existed.
    pub skipped: u64,
    /// Items that failed.
    pub failed: u64,
    /// First transport failure across the pool.
    pub fatal: Option<RestoreError>,
}

impl PoolReport {
    fn absorb(&mut self, tally: WorkerTally) {
        self.restored += tally.restored;
        self.simulated += tally.simulated;
        self.skipped += tally.skipped;
        self.failed += tally.failed;
        if self.fatal.is_none() {
            self.fatal = tally.fatal;
        }
    }

    /// Items that reached a worker.
    #[must_use]
    pub const fn processed(&self) -> u64 {
        self.restored + self.simulated + self.skipped + self.failed
    }
}

/// Handles of the running workers.
pub struct WorkerPool {
    workers: Vec<JoinHandle<WorkerTally>>,
}

impl WorkerPool {
    /// Start `count` workers reading from `receiver`.
    #[must_use]
    pub fn spawn(count: usize, receiver: &Receiver<WorkItem>, client: &Arc<RestoreClient>) -> Self {
        let workers = (0..count)
            .map(|id| {
                tokio::spawn(restore_worker(
                    id,
                    receiver.clone(),
                    Arc::clone(client),
                ))
            })
            .collect();
        Self { workers }
    }

    /// Number of workers started.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Wait for every worker to finish and fold their tallies.
    ///
    /// # Errors
    ///
    /// Returns [`RestoreError::TaskJoin`] if a worker panicked. The remaining
    /// workers are still awaited first.
    pub async fn join(self) -> RestoreResult<PoolReport> {
        let mut report = PoolReport::default();
        let mut join_error = None;
        for handle in self.workers {
            match handle.await {
                Ok(tally) => report.absorb(tally),
                Err(source) if join_error.is_none() => {
                    join_error = Some(RestoreError::TaskJoin {
                        task: "restore worker",
                        source,
                    });
                }
                Err(_) => {}
            }
        }
        join_error.map_or(Ok(report), Err)
    }
}

async fn restore_worker(
    id: usize,
    receiver: Receiver<WorkItem>,
    client: Arc<RestoreClient>,
) -> WorkerTally {
    debug!(worker = id, "restore worker started");
    let mut tally = WorkerTally::default();
    while let Ok(item) = receiver.recv().await {
        let outcome = client.restore(&item).await;
        tally.record(&item, outcome, &receiver);
    }
    debug!(worker = id, "restore worker drained");
    tally
}
