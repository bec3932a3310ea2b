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

//! Logging primitives shared by the cbfs tools.
//!
//! Layout:
//! - `init.rs`: subscriber installation and output format selection
//! - `context.rs`: run-scoped spans carrying the run identifier

pub mod context;
pub mod init;

pub use context::run_span;
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
