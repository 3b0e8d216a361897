//! Provider settings, one TOML file per provider under `services/`.
//!
//! Endpoints, qualifiers, pacing, and timeouts live in data rather than
//! code. The files are baked into the binary with `include_str!`; look one
//! up with [`service`].

use serde::Deserialize;

use crate::ProviderKind;

/// Floor on Nominatim request spacing, per the public instance's usage
/// policy. Configured values below this are raised to it.
pub const MIN_NOMINATIM_RATE_LIMIT_MS: u64 = 1000;

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier matching a [`ProviderKind`] (e.g., `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Nominatim / `OpenStreetMap` geocoder.
    Nominatim(NominatimConfig),
    /// Google Maps Geocoding API.
    Google(GoogleConfig),
}

/// Settings for the Nominatim provider.
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimConfig {
    /// Search endpoint (e.g., `"https://nominatim.openstreetmap.org/search"`).
    pub base_url: String,
    /// County qualifier attached to every structured query.
    pub county: String,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
    /// Minimum delay between requests in milliseconds.
    pub rate_limit_ms: u64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl NominatimConfig {
    /// Request spacing to enforce, never below
    /// [`MIN_NOMINATIM_RATE_LIMIT_MS`].
    #[must_use]
    pub fn effective_rate_limit_ms(&self) -> u64 {
        self.rate_limit_ms.max(MIN_NOMINATIM_RATE_LIMIT_MS)
    }
}

/// Settings for the Google Maps provider.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    /// Geocoding endpoint (e.g.,
    /// `"https://maps.googleapis.com/maps/api/geocode/json"`).
    pub base_url: String,
    /// Appended verbatim to every address (e.g., `", Henrico County, VA"`).
    pub region_suffix: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    10
}

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("nominatim", include_str!("../services/nominatim.toml")),
    ("google", include_str!("../services/google.toml")),
];

/// Parses every embedded provider file.
///
/// # Panics
///
/// Panics if an embedded file is malformed.
#[must_use]
pub fn all_services() -> Vec<GeocodingService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("services/{name}.toml is invalid: {e}"))
        })
        .collect()
}

/// Returns the service configuration for a provider.
#[must_use]
pub fn service(kind: ProviderKind) -> Option<GeocodingService> {
    all_services()
        .into_iter()
        .find(|svc| svc.id == kind.as_ref())
}
