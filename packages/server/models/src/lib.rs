#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API response types for the HPD alerts server.
//!
//! These types are serialized to JSON for the HTTP API. They are separate
//! from the pipeline types so the wire contract can stay fixed while the
//! pipeline evolves.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hpd_alerts_geocoder::ProviderKind;
use hpd_alerts_incident_models::{Coordinate, Incident, Snapshot};
use hpd_alerts_pipeline::{CycleSummary, StoreStatus};
use serde::Serialize;

/// A coordinate pair as returned by the API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ApiCoordinate {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

impl From<Coordinate> for ApiCoordinate {
    fn from(c: Coordinate) -> Self {
        Self {
            lat: c.lat,
            lng: c.lng,
        }
    }
}

/// An active call as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiIncident {
    /// Call ID.
    pub id: String,
    /// Location text as reported.
    pub block: String,
    /// Coordinates, or `null` if the location could not be resolved.
    pub location: Option<ApiCoordinate>,
    /// Whether the location names two crossing roads.
    pub intersection: bool,
    /// When the call was received.
    pub received: String,
    /// Call type.
    #[serde(rename = "type")]
    pub call_type: String,
    /// Call status.
    pub status: String,
    /// Police district.
    pub district: String,
}

impl From<&Incident> for ApiIncident {
    fn from(incident: &Incident) -> Self {
        Self {
            id: incident.id.clone(),
            block: incident.block.clone(),
            location: incident.location.map(ApiCoordinate::from),
            intersection: incident.intersection,
            received: incident.received.clone(),
            call_type: incident.call_type.clone(),
            status: incident.status.clone(),
            district: incident.district.clone(),
        }
    }
}

/// Converts a snapshot to the `id -> incident` map the API returns.
#[must_use]
pub fn api_incidents(snapshot: &Snapshot) -> BTreeMap<String, ApiIncident> {
    snapshot
        .iter()
        .map(|(id, incident)| (id.clone(), ApiIncident::from(incident)))
        .collect()
}

/// Error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// What went wrong.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Which geocoding provider is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApiProvider {
    /// `true` when locations come from `OpenStreetMap`, which requires
    /// attribution.
    pub nominatim: bool,
    /// Provider name.
    pub provider: ProviderKind,
}

impl From<ProviderKind> for ApiProvider {
    fn from(provider: ProviderKind) -> Self {
        Self {
            nominatim: provider == ProviderKind::Nominatim,
            provider,
        }
    }
}

/// Pause state after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApiToggle {
    /// Whether scraping is now paused.
    pub paused: bool,
}

/// Health check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Counts from the last completed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCycle {
    /// When the cycle's merge was published.
    pub finished_at: DateTime<Utc>,
    /// Calls seen for the first time.
    pub new: usize,
    /// Calls carried over.
    pub continuing: usize,
    /// Calls removed.
    pub stale: usize,
    /// New calls merged with coordinates.
    pub located: usize,
    /// New calls merged without coordinates.
    pub unresolved: usize,
    /// New calls held back for retry.
    pub withheld: usize,
}

impl From<CycleSummary> for ApiCycle {
    fn from(summary: CycleSummary) -> Self {
        Self {
            finished_at: summary.finished_at,
            new: summary.new,
            continuing: summary.continuing,
            stale: summary.stale,
            located: summary.located,
            unresolved: summary.unresolved,
            withheld: summary.withheld,
        }
    }
}

/// Pipeline status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatus {
    /// Whether a cycle has completed.
    pub ready: bool,
    /// Whether scraping is paused.
    pub paused: bool,
    /// Why the pipeline halted, if it has.
    pub halted: Option<String>,
    /// Current scheduler phase.
    pub phase: String,
    /// Number of published calls.
    pub incidents: usize,
    /// Provider in use.
    pub provider: ProviderKind,
    /// Counts from the last completed cycle.
    pub last_cycle: Option<ApiCycle>,
}

impl ApiStatus {
    /// Builds the status body from the store's status and the provider.
    #[must_use]
    pub fn new(status: StoreStatus, provider: ProviderKind) -> Self {
        Self {
            ready: status.ready,
            paused: status.paused,
            halted: status.halted,
            phase: status.phase.to_string(),
            incidents: status.incidents,
            provider,
            last_cycle: status.last_cycle.map(ApiCycle::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use hpd_alerts_pipeline::CyclePhase;

    use super::*;

    #[test]
    fn incident_serializes_with_type_field_and_null_location() {
        let incident = Incident::new(
            "24-101",
            "Main St / Oak Ave",
            "08:01",
            "ACCIDENT",
            "ENROUTE",
            "D3",
        )
        .with_location(None, true);

        let json = serde_json::to_value(ApiIncident::from(&incident)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "id": "24-101",
                "block": "Main St / Oak Ave",
                "location": null,
                "intersection": true,
                "received": "08:01",
                "type": "ACCIDENT",
                "status": "ENROUTE",
                "district": "D3",
            })
        );
    }

    #[test]
    fn located_incident_has_lat_lng() {
        let incident = Incident::new("1", "1 Main St", "", "", "", "")
            .with_location(Some(Coordinate::new(37.6, -77.5)), false);

        let json = serde_json::to_value(ApiIncident::from(&incident)).unwrap();

        assert_eq!(json["location"], serde_json::json!({ "lat": 37.6, "lng": -77.5 }));
    }

    #[test]
    fn provider_flags_nominatim() {
        let json = serde_json::to_value(ApiProvider::from(ProviderKind::Nominatim)).unwrap();
        assert_eq!(json, serde_json::json!({ "nominatim": true, "provider": "nominatim" }));

        let json = serde_json::to_value(ApiProvider::from(ProviderKind::Google)).unwrap();
        assert_eq!(json, serde_json::json!({ "nominatim": false, "provider": "google" }));
    }

    #[test]
    fn status_before_first_cycle() {
        let status = StoreStatus {
            ready: false,
            paused: false,
            halted: None,
            phase: CyclePhase::Scraping,
            incidents: 0,
            last_cycle: None,
        };

        let json = serde_json::to_value(ApiStatus::new(status, ProviderKind::Google)).unwrap();

        assert_eq!(json["phase"], "scraping");
        assert_eq!(json["lastCycle"], serde_json::Value::Null);
        assert_eq!(json["provider"], "google");
    }
}
