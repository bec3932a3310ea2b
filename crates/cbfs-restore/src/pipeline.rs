//! Restore run coordination: decode, filter, dispatch, drain, report.
//!
//! # Design
//!
//! - The decode loop is the only producer. It runs on a blocking thread and
//!   owns the only `Sender`, so the channel closes exactly when the loop returns.
//! - The channel holds at most one item per worker; sends block beyond that.
//! - The summary is produced only after every worker has joined, including on
//!   the abort paths.

use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_channel::Sender;
use tracing::{Span, debug, error, info};

use crate::client::RestoreClient;
use crate::config::RestoreConfig;
use crate::decoder::{FileDecoder, RecordDecoder, WorkItem};
use crate::error::{RestoreError, RestoreResult};
use crate::filter::PathFilter;
use crate::pool::WorkerPool;

/// Counts reported by a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Records that matched the filter and were handed to a worker.
    pub accepted: u64,
    /// Items the server created.
    pub restored: u64,
    /// Items logged in noop mode.
    pub simulated: u64,
    /// Items that already existed on the server.
    pub skipped: u64,
    /// Items the server rejected.
    pub failed: u64,
    /// Wall-clock time from the first dispatch to the last worker exit.
    pub elapsed: Duration,
}

/// What the decode loop achieved before it stopped.
#[derive(Debug, Default)]
struct Dispatch {
    read: u64,
    accepted: u64,
    halted: bool,
    error: Option<RestoreError>,
}

/// Replay the backup stream named by `config` against the target store.
///
/// # Errors
///
/// Fails before any request on invalid configuration, an invalid pattern, or an
/// unreadable source. Fails after draining on a corrupt record, an unreachable
/// server, or a panicked task.
pub async fn run_restore(
    config: Arc<RestoreConfig>,
    client: RestoreClient,
) -> RestoreResult<RestoreSummary> {
    config.validate()?;
    let filter = PathFilter::compile(&config.pattern)?;
    let decoder = FileDecoder::open(&config.source)?;

    let start = Instant::now();
    let (sender, receiver) = async_channel::bounded(config.workers);
    let pool = WorkerPool::spawn(config.workers, &receiver, &Arc::new(client));
    drop(receiver);
    debug!(
        workers = pool.worker_count(),
        source = %config.source.display(),
        "restore workers started"
    );

    let verbose = config.verbose;
    let span = Span::current();
    let producer = tokio::task::spawn_blocking(move || {
        span.in_scope(|| dispatch(decoder, &filter, sender, verbose))
    });

    let dispatched = producer
        .await
        .map_err(|source| RestoreError::TaskJoin {
            task: "record decoder",
            source,
        });
    let report = pool.join().await;
    let elapsed = start.elapsed();

    let dispatched = dispatched?;
    let report = report?;
    debug!(
        read = dispatched.read,
        accepted = dispatched.accepted,
        processed = report.processed(),
        halted = dispatched.halted,
        "restore workers joined"
    );

    if let Some(err) = dispatched.error.or(report.fatal) {
        error!(
            error = %err,
            read = dispatched.read,
            accepted = dispatched.accepted,
            "restore aborted after draining in-flight items"
        );
        return Err(err);
    }

    info!("Restored {} files in {:?}", dispatched.accepted, elapsed);
    Ok(RestoreSummary {
        accepted: dispatched.accepted,
        restored: report.restored,
        simulated: report.simulated,
        skipped: report.skipped,
        failed: report.failed,
        elapsed,
    })
}

fn dispatch<R: Read>(
    mut decoder: RecordDecoder<R>,
    filter: &PathFilter,
    sender: Sender<WorkItem>,
    verbose: bool,
) -> Dispatch {
    let mut progress = Dispatch::default();
    for record in decoder.by_ref() {
        let item = match record {
            Ok(item) => item,
            Err(err) => {
                progress.error = Some(err);
                break;
            }
        };
        if !filter.matches(&item.path) {
            continue;
        }
        if verbose {
            info!("Queued {}", item.path);
        }
        if sender.send_blocking(item).is_err() {
            progress.halted = true;
            break;
        }
        progress.accepted += 1;
    }
    progress.read = decoder.position();
    progress
}
