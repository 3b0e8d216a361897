#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding for active call locations.
//!
//! Converts the county's free-text block descriptions into coordinates
//! through one of two interchangeable providers, both configured via TOML
//! files in `services/`:
//!
//! 1. **Nominatim / OpenStreetMap**: free, 1 req/sec hard limit,
//!    structured street search qualified by county. Cannot resolve true
//!    intersections, so they are approximated by their first road.
//! 2. **Google Maps Geocoding API**: paid, one request per lookup, raw
//!    block text with a region suffix. Its fuzzy matching handles
//!    intersections without pre-processing.
//!
//! Both implement [`Geocoder`]. A provider is chosen once at startup via
//! [`ProviderSelection`] and built with [`create_geocoder`]; nothing
//! downstream branches on which provider is in use.

pub mod address;
pub mod google;
pub mod nominatim;
pub mod pacing;
pub mod service_registry;

use std::time::Duration;

use hpd_alerts_incident_models::Coordinate;
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::service_registry::ProviderConfig;

/// Which geocoding provider resolves locations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ProviderKind {
    /// Nominatim / `OpenStreetMap`.
    Nominatim,
    /// Google Maps Geocoding API.
    Google,
}

/// The provider chosen at startup, with whatever credentials it needs.
#[derive(Clone, PartialEq, Eq)]
pub enum ProviderSelection {
    /// Public Nominatim instance; no credentials.
    Nominatim,
    /// Google Maps with an API key.
    Google {
        /// Google Maps API key.
        api_key: String,
    },
}

impl ProviderSelection {
    /// Builds a selection from a provider kind and an optional API key.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Config`] if Google is selected without a
    /// non-empty API key.
    pub fn from_kind(kind: ProviderKind, api_key: Option<String>) -> Result<Self, GeocodeError> {
        match kind {
            ProviderKind::Nominatim => Ok(Self::Nominatim),
            ProviderKind::Google => {
                let api_key = api_key
                    .map(|key| key.trim().to_string())
                    .filter(|key| !key.is_empty())
                    .ok_or_else(|| GeocodeError::Config {
                        message: "missing Google Maps API token".to_string(),
                    })?;
                Ok(Self::Google { api_key })
            }
        }
    }

    /// Returns the kind of provider selected.
    #[must_use]
    pub const fn kind(&self) -> ProviderKind {
        match self {
            Self::Nominatim => ProviderKind::Nominatim,
            Self::Google { .. } => ProviderKind::Google,
        }
    }
}

// Keeps the API key out of logs.
impl std::fmt::Debug for ProviderSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nominatim => f.write_str("Nominatim"),
            Self::Google { .. } => f
                .debug_struct("Google")
                .field("api_key", &"<redacted>")
                .finish(),
        }
    }
}

/// The result of a lookup that reached the provider and got an answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeocodeOutcome {
    /// The provider resolved the location.
    Located {
        /// Resolved coordinates.
        coordinate: Coordinate,
        /// Whether the input named two crossing roads.
        intersection: bool,
    },
    /// The provider had no match. Expected for many intersections; not an
    /// error.
    NoResult {
        /// Whether the input named two crossing roads.
        intersection: bool,
    },
}

impl GeocodeOutcome {
    /// Returns the resolved coordinates, if any.
    #[must_use]
    pub const fn coordinate(&self) -> Option<Coordinate> {
        match self {
            Self::Located { coordinate, .. } => Some(*coordinate),
            Self::NoResult { .. } => None,
        }
    }

    /// Whether the input named two crossing roads.
    #[must_use]
    pub const fn is_intersection(&self) -> bool {
        match self {
            Self::Located { intersection, .. } | Self::NoResult { intersection } => *intersection,
        }
    }
}

/// Errors from geocoding operations.
///
/// Use [`GeocodeError::is_fatal`] to tell configuration-class failures,
/// which must stop the pipeline, from failures local to one lookup.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed (connection, timeout, body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The provider answered with an unexpected HTTP status.
    #[error("Provider returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The provider refused to serve this client at all.
    #[error("Provider refused the request with HTTP {status}")]
    Forbidden {
        /// HTTP status code.
        status: u16,
    },

    /// The provider rejected the lookup (e.g., invalid key, quota, billing).
    #[error("Provider rejected the request ({status}): {message}")]
    Rejected {
        /// Provider status string or HTTP status.
        status: String,
        /// Provider-supplied detail, if any.
        message: String,
    },

    /// The provider is misconfigured.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },
}

impl GeocodeError {
    /// Whether this failure means the provider cannot be used at all.
    ///
    /// Fatal errors halt the pipeline; everything else is confined to the
    /// lookup that produced it.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Forbidden { .. } | Self::Rejected { .. } | Self::Config { .. }
        )
    }
}

/// A geocoding provider.
///
/// Implementations own their pacing and input normalization, so callers
/// only ever hand over the raw block text from the source.
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Which provider this is.
    fn kind(&self) -> ProviderKind;

    /// Resolves a block description to coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the lookup could not be completed.
    /// A location the provider simply cannot find is
    /// [`GeocodeOutcome::NoResult`], not an error.
    async fn geocode(&self, block: &str) -> Result<GeocodeOutcome, GeocodeError>;
}

/// Builds the selected provider from its embedded service configuration.
///
/// # Errors
///
/// Returns [`GeocodeError::Config`] if the service configuration is
/// missing or does not match the selection, or [`GeocodeError::Http`] if
/// the HTTP client cannot be built.
pub fn create_geocoder(selection: &ProviderSelection) -> Result<Box<dyn Geocoder>, GeocodeError> {
    let kind = selection.kind();
    let service = service_registry::service(kind).ok_or_else(|| GeocodeError::Config {
        message: format!("no service configuration for provider '{kind}'"),
    })?;

    log::info!("Using geocoding provider: {}", service.name);

    match (selection, &service.provider) {
        (ProviderSelection::Nominatim, ProviderConfig::Nominatim(config)) => {
            let client = build_client(Some(&config.user_agent), config.timeout_secs)?;
            Ok(Box::new(nominatim::NominatimGeocoder::new(client, config)))
        }
        (ProviderSelection::Google { api_key }, ProviderConfig::Google(config)) => {
            let client = build_client(None, config.timeout_secs)?;
            Ok(Box::new(google::GoogleGeocoder::new(
                client,
                config,
                api_key.clone(),
            )))
        }
        _ => Err(GeocodeError::Config {
            message: format!(
                "service '{}' is not configured as a {kind} provider",
                service.id
            ),
        }),
    }
}

/// Builds a [`reqwest::Client`] with a per-request timeout.
fn build_client(
    user_agent: Option<&str>,
    timeout_secs: u64,
) -> Result<reqwest::Client, GeocodeError> {
    let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(timeout_secs));
    if let Some(user_agent) = user_agent {
        builder = builder.user_agent(user_agent);
    }
    Ok(builder.build()?)
}
