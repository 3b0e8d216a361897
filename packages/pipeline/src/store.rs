//! Shared incident state.
//!
//! [`IncidentStore`] is the only owner of the published snapshot. The
//! scheduler writes to it through [`IncidentStore::apply`]; HTTP handlers
//! read through [`IncidentStore::snapshot`]. Published snapshots are
//! immutable `Arc`s: a merge builds the next map off to the side and swaps
//! the pointer under the write lock, so readers hold either the old map or
//! the new one, never something in between.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use hpd_alerts_incident_models::Snapshot;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// Why the incident list cannot be served.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unavailable {
    /// Scraping is paused.
    #[error("scraper is paused")]
    Paused,
    /// No cycle has completed since startup.
    #[error("no data yet, waiting for the first scrape")]
    NotReady,
    /// The pipeline stopped on an unrecoverable error.
    #[error("pipeline halted: {reason}")]
    Halted {
        /// The error that stopped the pipeline.
        reason: String,
    },
}

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum CyclePhase {
    /// Waiting for the next tick.
    #[default]
    Idle,
    /// Fetching the source.
    Scraping,
    /// Resolving new incidents.
    Geocoding,
    /// Publishing the result.
    Merging,
    /// Stopped for good.
    Halted,
}

/// Counts from the last completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    /// When the merge was published.
    pub finished_at: DateTime<Utc>,
    /// Incidents seen for the first time.
    pub new: usize,
    /// Incidents carried over unchanged.
    pub continuing: usize,
    /// Incidents removed.
    pub stale: usize,
    /// New incidents merged with coordinates.
    pub located: usize,
    /// New incidents merged without coordinates.
    pub unresolved: usize,
    /// New incidents held back for retry.
    pub withheld: usize,
    /// Incidents published after the merge.
    pub incidents: usize,
}

/// Point-in-time view of the store for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatus {
    /// Whether a cycle has completed.
    pub ready: bool,
    /// Whether scraping is paused.
    pub paused: bool,
    /// Why the pipeline halted, if it has.
    pub halted: Option<String>,
    /// Current scheduler phase.
    pub phase: CyclePhase,
    /// Number of published incidents.
    pub incidents: usize,
    /// Counts from the last completed cycle.
    pub last_cycle: Option<CycleSummary>,
}

/// Owner of the published incident snapshot and the pipeline's run flags.
#[derive(Debug, Default)]
pub struct IncidentStore {
    /// `None` until the first merge.
    published: RwLock<Option<Arc<Snapshot>>>,
    paused: AtomicBool,
    halted: RwLock<Option<String>>,
    phase: RwLock<CyclePhase>,
    last_cycle: RwLock<Option<CycleSummary>>,
}

impl IncidentStore {
    /// Creates an empty store that has not completed a cycle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the published snapshot for readers.
    ///
    /// # Errors
    ///
    /// Returns [`Unavailable`] while halted, paused, or before the first
    /// merge, so an unavailable list is never confused with an empty one.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>, Unavailable> {
        if let Some(reason) = self.halt_reason() {
            return Err(Unavailable::Halted { reason });
        }
        if self.is_paused() {
            return Err(Unavailable::Paused);
        }
        read(&self.published).clone().ok_or(Unavailable::NotReady)
    }

    /// Returns the published snapshot regardless of run state.
    ///
    /// Empty before the first merge.
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        read(&self.published).clone().unwrap_or_default()
    }

    /// Publishes a merge: drops `stale_keys`, then inserts `enriched`.
    ///
    /// Returns the number of incidents published.
    pub fn apply(&self, enriched: Snapshot, stale_keys: &BTreeSet<String>) -> usize {
        let mut published = write(&self.published);

        let mut next = published.as_deref().cloned().unwrap_or_default();
        for key in stale_keys {
            next.remove(key);
        }
        next.extend(enriched);

        let len = next.len();
        *published = Some(Arc::new(next));
        len
    }

    /// Whether scraping is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Sets the pause flag.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Flips the pause flag and returns the new value.
    pub fn toggle_paused(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::SeqCst)
    }

    /// Stops the pipeline for good.
    pub fn halt(&self, reason: impl Into<String>) {
        *write(&self.halted) = Some(reason.into());
        self.set_phase(CyclePhase::Halted);
    }

    /// Whether the pipeline has halted.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        read(&self.halted).is_some()
    }

    /// Why the pipeline halted, if it has.
    #[must_use]
    pub fn halt_reason(&self) -> Option<String> {
        read(&self.halted).clone()
    }

    /// Current scheduler phase.
    #[must_use]
    pub fn phase(&self) -> CyclePhase {
        *read(&self.phase)
    }

    /// Records a scheduler phase change. Ignored once halted.
    pub fn set_phase(&self, phase: CyclePhase) {
        let mut current = write(&self.phase);
        if *current != CyclePhase::Halted {
            *current = phase;
        }
    }

    /// Records the counts of a completed cycle.
    pub fn record_cycle(&self, summary: CycleSummary) {
        *write(&self.last_cycle) = Some(summary);
    }

    /// Counts from the last completed cycle.
    #[must_use]
    pub fn last_cycle(&self) -> Option<CycleSummary> {
        read(&self.last_cycle).clone()
    }

    /// Status for reporting.
    #[must_use]
    pub fn status(&self) -> StoreStatus {
        let published = read(&self.published).clone();
        StoreStatus {
            ready: published.is_some(),
            paused: self.is_paused(),
            halted: self.halt_reason(),
            phase: self.phase(),
            incidents: published.map_or(0, |snapshot| snapshot.len()),
            last_cycle: self.last_cycle(),
        }
    }
}

// Writers replace values wholesale, so a poisoned lock still holds a
// complete value.
fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
