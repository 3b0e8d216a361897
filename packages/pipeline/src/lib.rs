#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The incident pipeline: scrape, reconcile, enrich, merge.
//!
//! Each cycle pulls a fresh [`Snapshot`](hpd_alerts_incident_models::Snapshot)
//! from a [`SnapshotSource`](hpd_alerts_scraper::SnapshotSource), works out
//! which calls are new and which have gone away ([`reconcile`]), geocodes
//! only the new ones ([`enrich`]), then publishes the result through the
//! [`IncidentStore`](store::IncidentStore) in one atomic swap.
//!
//! The [`Scheduler`](scheduler::Scheduler) drives cycles on a fixed
//! interval, one at a time. Failures stay local to the cycle (or to the
//! single record) that hit them, except for provider misconfiguration,
//! which halts the loop.

pub mod config;
pub mod enrich;
pub mod reconcile;
pub mod scheduler;
pub mod store;

use hpd_alerts_geocoder::GeocodeError;
use thiserror::Error;

pub use config::{DEFAULT_INTERVAL_SECS, MIN_INTERVAL_SECS, PipelineConfig};
pub use reconcile::{Reconciliation, reconcile};
pub use scheduler::{CycleReport, Scheduler, SkipReason};
pub use store::{CyclePhase, CycleSummary, IncidentStore, StoreStatus, Unavailable};

/// Errors raised while validating pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The poll interval is shorter than the source can tolerate.
    #[error(
        "poll interval of {interval_secs}s is below the {}s minimum",
        MIN_INTERVAL_SECS
    )]
    IntervalBelowFloor {
        /// The rejected interval, in seconds.
        interval_secs: u64,
    },

    /// The geocoding provider selection is invalid.
    #[error(transparent)]
    Provider(#[from] GeocodeError),
}

/// Errors that stop the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration was rejected before the loop started.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The geocoding provider failed in a way no retry will fix.
    #[error("Pipeline halted: {0}")]
    Halted(#[from] GeocodeError),
}
