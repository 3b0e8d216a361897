//! Nominatim / OpenStreetMap geocoder client.
//!
//! Nominatim has strict rate limits: **1 request per second** maximum on
//! the public instance, and clients that ignore the limit or omit a
//! `User-Agent` get blocked. Every lookup goes through a [`Pacer`] so the
//! limit holds no matter how the caller schedules requests.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::time::Duration;

use async_trait::async_trait;
use hpd_alerts_incident_models::Coordinate;

use crate::address::clean_block;
use crate::pacing::Pacer;
use crate::service_registry::NominatimConfig;
use crate::{GeocodeError, GeocodeOutcome, Geocoder, ProviderKind};

/// Geocoder backed by Nominatim's structured street search.
#[derive(Debug)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    county: String,
    pacer: Pacer,
}

impl NominatimGeocoder {
    /// Creates a geocoder from its service configuration.
    ///
    /// The client should already carry the configured `User-Agent` and
    /// timeout.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &NominatimConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            county: config.county.clone(),
            pacer: Pacer::new(Duration::from_millis(config.effective_rate_limit_ms())),
        }
    }

    /// Looks up a single cleaned street, qualified by county.
    async fn lookup_street(&self, street: &str) -> Result<Option<Coordinate>, GeocodeError> {
        self.pacer.wait().await;

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("street", street),
                ("county", self.county.as_str()),
                ("format", "json"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }
        if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GeocodeError::Forbidden {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(GeocodeError::Status {
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Nominatim
    }

    async fn geocode(&self, block: &str) -> Result<GeocodeOutcome, GeocodeError> {
        let cleaned = clean_block(block);
        let intersection = cleaned.is_intersection();

        let Some(query) = cleaned.query() else {
            log::debug!("Nominatim: nothing geocodable in '{block}'");
            return Ok(GeocodeOutcome::NoResult { intersection });
        };

        match self.lookup_street(query).await? {
            Some(coordinate) => Ok(GeocodeOutcome::Located {
                coordinate,
                intersection,
            }),
            None => {
                // Usually an intersection Nominatim cannot place.
                log::debug!("Nominatim: no match for '{query}' (from '{block}')");
                Ok(GeocodeOutcome::NoResult { intersection })
            }
        }
    }
}

/// Parses Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<Coordinate>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    Ok(Some(Coordinate::new(lat, lon)))
}
