//! The polling loop.
//!
//! One cycle runs per tick, inline, so cycles never overlap. Ticks missed
//! while a cycle runs collapse into at most one late tick, fired as soon as
//! the cycle ends; there is never a backlog. Paused ticks do nothing.

use std::sync::Arc;

use chrono::Utc;
use hpd_alerts_geocoder::Geocoder;
use hpd_alerts_scraper::SnapshotSource;
use strum_macros::{AsRefStr, Display};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::PipelineError;
use crate::config::PipelineConfig;
use crate::enrich::{Enrichment, enrich};
use crate::reconcile::{Reconciliation, reconcile};
use crate::store::{CyclePhase, CycleSummary, IncidentStore};

/// Why a cycle did not merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// Scraping is paused.
    Paused,
    /// The source could not be fetched or parsed.
    ScrapeFailed,
    /// The source listed no calls while calls were published.
    SuspectEmptyScrape,
}

/// What a cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport {
    /// The cycle merged into the store.
    Applied(CycleSummary),
    /// The cycle left the store unchanged.
    Skipped(SkipReason),
}

/// Drives scrape, reconcile, enrich, and merge on a fixed interval.
pub struct Scheduler {
    config: PipelineConfig,
    source: Arc<dyn SnapshotSource>,
    geocoder: Arc<dyn Geocoder>,
    store: Arc<IncidentStore>,
}

impl Scheduler {
    /// Creates a scheduler. Nothing runs until [`run`](Self::run) or
    /// [`spawn`](Self::spawn).
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        source: Arc<dyn SnapshotSource>,
        geocoder: Arc<dyn Geocoder>,
        store: Arc<IncidentStore>,
    ) -> Self {
        Self {
            config,
            source,
            geocoder,
            store,
        }
    }

    /// Runs the loop on the current tokio runtime.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<PipelineError> {
        tokio::spawn(self.run())
    }

    /// Runs cycles until one fails fatally, then returns that error.
    ///
    /// The first cycle starts immediately.
    pub async fn run(self) -> PipelineError {
        log::info!(
            "Incident pipeline started: source={}, provider={}, interval={}s",
            self.source.name(),
            self.geocoder.kind(),
            self.config.interval().as_secs()
        );

        let mut ticker = time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            match self.run_cycle().await {
                Ok(CycleReport::Applied(summary)) => log::info!(
                    "Cycle complete: {} new ({} located, {} unresolved, {} withheld), \
                     {} continuing, {} stale, {} published",
                    summary.new,
                    summary.located,
                    summary.unresolved,
                    summary.withheld,
                    summary.continuing,
                    summary.stale,
                    summary.incidents
                ),
                Ok(CycleReport::Skipped(SkipReason::Paused)) => {
                    log::debug!("Scraper paused, skipping tick");
                }
                Ok(CycleReport::Skipped(reason)) => log::info!("Cycle skipped: {reason}"),
                Err(e) => {
                    log::error!("Incident pipeline stopped: {e}");
                    return e;
                }
            }
        }
    }

    /// Runs a single cycle.
    ///
    /// A failed scrape or a suspect empty scrape leaves the store untouched
    /// and is reported as [`CycleReport::Skipped`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Halted`] if the geocoder fails fatally. The
    /// store is halted and nothing from the cycle is merged.
    pub async fn run_cycle(&self) -> Result<CycleReport, PipelineError> {
        if self.store.is_paused() {
            return Ok(CycleReport::Skipped(SkipReason::Paused));
        }

        let result = self.scrape_and_merge().await;
        match &result {
            Ok(_) => self.store.set_phase(CyclePhase::Idle),
            Err(e) => self.store.halt(e.to_string()),
        }
        result
    }

    async fn scrape_and_merge(&self) -> Result<CycleReport, PipelineError> {
        self.store.set_phase(CyclePhase::Scraping);
        let scraped = match self.source.fetch().await {
            Ok(scraped) => scraped,
            Err(e) => {
                log::warn!(
                    "Scrape of {} failed, keeping previous incidents: {e}",
                    self.source.name()
                );
                return Ok(CycleReport::Skipped(SkipReason::ScrapeFailed));
            }
        };

        let previous = self.store.current();
        if scraped.is_empty() && !previous.is_empty() {
            log::warn!(
                "Scrape of {} returned no calls while {} are published, keeping previous incidents",
                self.source.name(),
                previous.len()
            );
            return Ok(CycleReport::Skipped(SkipReason::SuspectEmptyScrape));
        }

        let Reconciliation {
            new_records,
            stale_keys,
            continuing,
        } = reconcile(&previous, &scraped);
        drop(previous);
        let new = new_records.len();
        log::debug!(
            "Reconciled {} scraped calls: {new} new, {continuing} continuing, {} stale",
            scraped.len(),
            stale_keys.len()
        );

        self.store.set_phase(CyclePhase::Geocoding);
        let Enrichment {
            enriched,
            withheld,
            located,
            unresolved,
        } = enrich(self.geocoder.as_ref(), new_records).await?;

        self.store.set_phase(CyclePhase::Merging);
        let incidents = self.store.apply(enriched, &stale_keys);

        let summary = CycleSummary {
            finished_at: Utc::now(),
            new,
            continuing,
            stale: stale_keys.len(),
            located,
            unresolved,
            withheld: withheld.len(),
            incidents,
        };
        self.store.record_cycle(summary.clone());

        Ok(CycleReport::Applied(summary))
    }
}
