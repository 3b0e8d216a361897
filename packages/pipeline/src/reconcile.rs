//! Snapshot reconciliation.
//!
//! Partitions a fresh scrape against the previously published state:
//!
//! - **new**: in the scrape, not in the previous state. Needs geocoding.
//! - **continuing**: in both. Already enriched, carried forward as-is.
//! - **stale**: in the previous state, gone from the scrape. Removed.
//!
//! Both snapshots are ordered maps, so the partition is a single merge
//! walk over the two key sequences.

use std::collections::BTreeSet;

use hpd_alerts_incident_models::Snapshot;

/// The outcome of reconciling a scrape against the previous state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Incidents in the scrape that were not in the previous state, as
    /// scraped (not yet geocoded).
    pub new_records: Snapshot,
    /// IDs in the previous state that the scrape no longer lists.
    pub stale_keys: BTreeSet<String>,
    /// Number of incidents present in both.
    pub continuing: usize,
}

/// Reconciles `current` against `previous`.
///
/// Runs in `O(|previous| + |current|)`. Incidents present in both inputs
/// are only counted; their scraped contents are ignored so that the
/// enriched copy in `previous` stays authoritative.
#[must_use]
pub fn reconcile(previous: &Snapshot, current: &Snapshot) -> Reconciliation {
    let mut previous_keys = previous.keys().peekable();

    let mut new_records = Vec::new();
    let mut stale_keys = Vec::new();
    let mut continuing = 0;

    for (id, incident) in current {
        while let Some(stale) = previous_keys.next_if(|key| *key < id) {
            stale_keys.push(stale.clone());
        }

        if previous_keys.next_if_eq(&id).is_some() {
            continuing += 1;
        } else {
            new_records.push((id.clone(), incident.clone()));
        }
    }

    stale_keys.extend(previous_keys.cloned());

    // Both vectors are already in key order, so these collects bulk-build.
    Reconciliation {
        new_records: new_records.into_iter().collect(),
        stale_keys: stale_keys.into_iter().collect(),
        continuing,
    }
}
