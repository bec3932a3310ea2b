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

//! Shared test helpers used across the restore suites.
//! Layout: fixtures.rs (gzip backup-stream builders).

pub mod fixtures;

pub use fixtures::{BackupFixture, record};
