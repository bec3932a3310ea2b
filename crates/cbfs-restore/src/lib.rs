#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::redundant_pub_crate)]
#![allow(clippy::module_name_repetitions)]

//! Replays a cbfs backup stream against a live store.
//!
//! Layout:
//! - `decoder.rs`: lazy gzip + JSON record stream
//! - `filter.rs`: path predicate
//! - `client.rs`: restore requests and outcome classification
//! - `pool.rs`: fixed-size worker pool over a shared bounded channel
//! - `pipeline.rs`: run coordination and summary
//! - `config.rs` / `error.rs`: run settings and fatal errors
//! - `cli.rs`: argument parsing, logging bootstrap, exit codes
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod pool;

pub use cli::run;
pub use client::{RestoreClient, RestoreFailure, RestoreOutcome, build_http_client};
pub use config::RestoreConfig;
pub use decoder::{RecordDecoder, WorkItem};
pub use error::{RestoreError, RestoreResult};
pub use filter::PathFilter;
pub use pipeline::{RestoreSummary, run_restore};
