#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident data model shared across the alerts pipeline.
//!
//! An [`Incident`] is one row of the county's active calls table. Rows
//! arrive from the scraper without coordinates; the pipeline attaches a
//! [`Coordinate`] during enrichment. A [`Snapshot`] is the point-in-time
//! set of incidents keyed by their source-assigned identifier.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A point-in-time view of active incidents, keyed by incident ID.
///
/// Ordered so that two snapshots can be walked side by side in a single
/// pass and so that serialized output is stable between requests.
pub type Snapshot = BTreeMap<String, Incident>;

/// A WGS84 latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

impl Coordinate {
    /// Creates a coordinate from a latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A single active call as reported by the county.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Identifier assigned by the source, unique per active call.
    pub id: String,
    /// Free-text location (e.g., `"100 Block Main St"` or
    /// `"Main St / Oak Ave"`).
    pub block: String,
    /// Coordinates attached during enrichment. `None` until geocoded, or
    /// when the provider had no match for the location.
    pub location: Option<Coordinate>,
    /// Whether the location names two crossing roads.
    pub intersection: bool,
    /// When the call was received, as displayed by the source.
    pub received: String,
    /// Call type (e.g., `"LARCENY"`).
    #[serde(rename = "type")]
    pub call_type: String,
    /// Call status (e.g., `"DISPATCHED"`).
    pub status: String,
    /// Police district.
    pub district: String,
}

impl Incident {
    /// Creates an unenriched incident from the scraped table columns.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        block: impl Into<String>,
        received: impl Into<String>,
        call_type: impl Into<String>,
        status: impl Into<String>,
        district: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            block: block.into(),
            location: None,
            intersection: false,
            received: received.into(),
            call_type: call_type.into(),
            status: status.into(),
            district: district.into(),
        }
    }

    /// Returns this incident with enrichment results attached.
    #[must_use]
    pub fn with_location(mut self, location: Option<Coordinate>, intersection: bool) -> Self {
        self.location = location;
        self.intersection = intersection;
        self
    }

    /// Whether enrichment produced coordinates for this incident.
    #[must_use]
    pub const fn is_located(&self) -> bool {
        self.location.is_some()
    }
}

/// Builds a [`Snapshot`] from incidents, keying each by its ID.
///
/// Later entries win when two incidents share an ID.
#[must_use]
pub fn snapshot_from(incidents: impl IntoIterator<Item = Incident>) -> Snapshot {
    incidents
        .into_iter()
        .map(|incident| (incident.id.clone(), incident))
        .collect()
}
