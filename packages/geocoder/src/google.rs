//! Google Maps Geocoding API client.
//!
//! Google's matching is forgiving enough to take the county's block text
//! as-is (including intersections), so the only pre-processing is the
//! region suffix. One request per lookup; no client-side pacing.
//!
//! Any response that is neither a match nor `ZERO_RESULTS` is treated as a
//! rejected request. Those statuses (`REQUEST_DENIED`, `OVER_DAILY_LIMIT`,
//! ...) point at the key or billing account, which no retry will fix.
//!
//! See <https://developers.google.com/maps/documentation/geocoding/requests-geocoding>

use async_trait::async_trait;
use hpd_alerts_incident_models::Coordinate;
use serde::Deserialize;

use crate::address::clean_block;
use crate::service_registry::GoogleConfig;
use crate::{GeocodeError, GeocodeOutcome, Geocoder, ProviderKind};

/// Geocoder backed by the Google Maps Geocoding API.
pub struct GoogleGeocoder {
    client: reqwest::Client,
    base_url: String,
    region_suffix: String,
    api_key: String,
}

impl GoogleGeocoder {
    /// Creates a geocoder from its service configuration and API key.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &GoogleConfig, api_key: String) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            region_suffix: config.region_suffix.clone(),
            api_key,
        }
    }

    /// Sends one lookup for a full address string.
    ///
    /// Transport errors drop their URL, which carries the API key.
    async fn lookup(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| GeocodeError::Http(e.without_url()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GeocodeError::Rejected {
                status: format!("HTTP {}", status.as_u16()),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let text = resp
            .text()
            .await
            .map_err(|e| GeocodeError::Http(e.without_url()))?;
        let body: GoogleResponse = serde_json::from_str(&text).map_err(|e| GeocodeError::Parse {
            message: format!("Google response: {e}"),
        })?;
        body.into_coordinate()
    }
}

impl std::fmt::Debug for GoogleGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleGeocoder")
            .field("base_url", &self.base_url)
            .field("region_suffix", &self.region_suffix)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn geocode(&self, block: &str) -> Result<GeocodeOutcome, GeocodeError> {
        let intersection = clean_block(block).is_intersection();
        let block = block.trim();
        if block.is_empty() {
            return Ok(GeocodeOutcome::NoResult { intersection });
        }

        let address = format!("{block}{}", self.region_suffix);
        log::debug!("Google geocode request for '{address}'");

        Ok(match self.lookup(&address).await? {
            Some(coordinate) => GeocodeOutcome::Located {
                coordinate,
                intersection,
            },
            None => {
                log::debug!("Google: no match for '{address}'");
                GeocodeOutcome::NoResult { intersection }
            }
        })
    }
}

/// Body of a geocoding response.
#[derive(Debug, Deserialize)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleResult {
    geometry: GoogleGeometry,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: GoogleLocation,
}

#[derive(Debug, Deserialize)]
struct GoogleLocation {
    lat: f64,
    lng: f64,
}

impl GoogleResponse {
    fn into_coordinate(self) -> Result<Option<Coordinate>, GeocodeError> {
        match self.status.as_str() {
            "OK" => Ok(self
                .results
                .first()
                .map(|r| Coordinate::new(r.geometry.location.lat, r.geometry.location.lng))),
            "ZERO_RESULTS" => Ok(None),
            _ => Err(GeocodeError::Rejected {
                status: self.status.clone(),
                message: self.error_message.unwrap_or_default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn geocoder(server: &MockServer) -> GoogleGeocoder {
        let config = GoogleConfig {
            base_url: format!("{}/maps/api/geocode/json", server.uri()),
            region_suffix: ", Henrico County, VA".to_string(),
            timeout_secs: 5,
        };
        GoogleGeocoder::new(reqwest::Client::new(), &config, "test-key".to_string())
    }

    fn ok_body(lat: f64, lng: f64) -> serde_json::Value {
        serde_json::json!({
            "status": "OK",
            "results": [{
                "formatted_address": "Main St & Oak Ave, Henrico, VA 23228, USA",
                "geometry": { "location": { "lat": lat, "lng": lng } }
            }]
        })
    }

    #[tokio::test]
    async fn sends_raw_block_with_region_suffix() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param(
                "address",
                "100 Block Main St / Oak Ave, Henrico County, VA",
            ))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(37.61, -77.52)))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = geocoder(&server)
            .geocode("100 Block Main St / Oak Ave")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            GeocodeOutcome::Located {
                coordinate: Coordinate::new(37.61, -77.52),
                intersection: true,
            }
        );
    }

    #[tokio::test]
    async fn zero_results_is_no_result() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "status": "ZERO_RESULTS", "results": [] })),
            )
            .mount(&server)
            .await;

        let outcome = geocoder(&server).geocode("1 Nowhere Rd").await.unwrap();

        assert_eq!(outcome, GeocodeOutcome::NoResult { intersection: false });
    }

    #[tokio::test]
    async fn request_denied_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid.",
                "results": []
            })))
            .mount(&server)
            .await;

        let err = geocoder(&server).geocode("1 Main St").await.unwrap_err();

        assert!(err.is_fatal());
        assert!(err.to_string().contains("REQUEST_DENIED"));
    }

    #[tokio::test]
    async fn http_error_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = geocoder(&server).geocode("1 Main St").await.unwrap_err();

        assert!(matches!(err, GeocodeError::Rejected { .. }));
        assert!(err.is_fatal());
    }

    /// A local address nothing listens on.
    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/maps/api/geocode/json")
    }

    fn unreachable_geocoder(api_key: &str) -> GoogleGeocoder {
        let config = GoogleConfig {
            base_url: closed_port_url(),
            region_suffix: ", Henrico County, VA".to_string(),
            timeout_secs: 5,
        };
        GoogleGeocoder::new(reqwest::Client::new(), &config, api_key.to_string())
    }

    #[tokio::test]
    async fn unreachable_provider_is_transient() {
        let err = unreachable_geocoder("test-key")
            .geocode("1 Main St")
            .await
            .unwrap_err();

        assert!(matches!(err, GeocodeError::Http(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn transport_error_does_not_leak_api_key() {
        let err = unreachable_geocoder("SECRET-KEY-123")
            .geocode("1 Main St")
            .await
            .unwrap_err();

        assert!(matches!(err, GeocodeError::Http(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"));
        assert!(!format!("{err:?}").contains("SECRET-KEY-123"));
    }

    #[test]
    fn debug_omits_api_key() {
        let config = GoogleConfig {
            base_url: "http://localhost".to_string(),
            region_suffix: String::new(),
            timeout_secs: 1,
        };
        let geocoder = GoogleGeocoder::new(reqwest::Client::new(), &config, "hunter2".to_string());
        assert!(!format!("{geocoder:?}").contains("hunter2"));
    }
}
