//! Span helpers for restore runs.

use tracing::Span;

/// Build the top-level span every log line of a run is recorded under.
#[must_use]
pub fn run_span(command: &str, run_id: &str) -> Span {
    tracing::info_span!("run", command = %command, run_id = %run_id)
}
