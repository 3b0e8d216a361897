#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scraping of the county's active calls page.
//!
//! Provides the [`SnapshotSource`] trait the pipeline pulls from and the
//! [`active_calls::ActiveCallsScraper`] implementation that reads the
//! public HTML table. Scraped incidents carry no coordinates; enrichment
//! is the pipeline's job.

pub mod active_calls;

use hpd_alerts_incident_models::Snapshot;

/// Errors that can occur during scraping operations.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// An HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Parsing the response body failed.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A source of point-in-time incident snapshots.
///
/// Failures are reported as [`ScrapeError`]; an `Ok` with an empty
/// snapshot means the source answered but listed no calls.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetches the current set of active incidents.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if the source could not be fetched or parsed.
    async fn fetch(&self) -> Result<Snapshot, ScrapeError>;

    /// Human-readable name for log messages.
    fn name(&self) -> &str;
}
