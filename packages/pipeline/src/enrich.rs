//! Geocoding of newly observed incidents.
//!
//! Per-record failures are contained:
//!
//! | Geocoder answer | Record |
//! |---|---|
//! | `Located` | merged with coordinates |
//! | `NoResult` | merged without coordinates, never retried |
//! | transient error | withheld; seen as new again next cycle |
//! | fatal error | whole batch abandoned, error returned |

use std::collections::BTreeSet;

use hpd_alerts_geocoder::{GeocodeError, Geocoder};
use hpd_alerts_incident_models::Snapshot;

/// Result of geocoding a batch of new incidents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    /// Incidents ready to merge, located or not.
    pub enriched: Snapshot,
    /// IDs held back by transient failures.
    pub withheld: BTreeSet<String>,
    /// How many enriched incidents got coordinates.
    pub located: usize,
    /// How many enriched incidents the provider could not place.
    pub unresolved: usize,
}

/// Geocodes each new incident once, in key order.
///
/// # Errors
///
/// Returns the first [`GeocodeError`] for which
/// [`is_fatal`](GeocodeError::is_fatal) holds. Nothing from the batch
/// should be merged in that case.
pub async fn enrich(
    geocoder: &dyn Geocoder,
    new_records: Snapshot,
) -> Result<Enrichment, GeocodeError> {
    let mut result = Enrichment::default();

    for (id, incident) in new_records {
        match geocoder.geocode(&incident.block).await {
            Ok(outcome) => {
                if outcome.coordinate().is_some() {
                    result.located += 1;
                } else {
                    result.unresolved += 1;
                }
                let incident =
                    incident.with_location(outcome.coordinate(), outcome.is_intersection());
                result.enriched.insert(id, incident);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::warn!(
                    "Geocoding incident {id} ('{}') failed, will retry next cycle: {e}",
                    incident.block
                );
                result.withheld.insert(id);
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use hpd_alerts_geocoder::{GeocodeOutcome, ProviderKind};
    use hpd_alerts_incident_models::{Coordinate, Incident, snapshot_from};

    use super::*;

    /// Answers by block text: `"nowhere"` has no match, `"flaky"` fails
    /// transiently, `"denied"` fails fatally, anything else is located.
    #[derive(Default)]
    struct ScriptedGeocoder {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Geocoder for ScriptedGeocoder {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Nominatim
        }

        async fn geocode(&self, block: &str) -> Result<GeocodeOutcome, GeocodeError> {
            self.calls.lock().unwrap().push(block.to_string());
            match block {
                "nowhere" => Ok(GeocodeOutcome::NoResult {
                    intersection: false,
                }),
                "flaky" => Err(GeocodeError::Status { status: 503 }),
                "denied" => Err(GeocodeError::Forbidden { status: 403 }),
                _ => Ok(GeocodeOutcome::Located {
                    coordinate: Coordinate::new(37.6, -77.5),
                    intersection: block.contains('/'),
                }),
            }
        }
    }

    fn incident(id: &str, block: &str) -> Incident {
        Incident::new(id, block, "10/19 08:00", "ACCIDENT", "ENROUTE", "D2")
    }

    #[tokio::test]
    async fn located_records_get_coordinates() {
        let geocoder = ScriptedGeocoder::default();
        let batch = snapshot_from([incident("A", "Main St / Oak Ave")]);

        let result = enrich(&geocoder, batch).await.unwrap();

        let a = &result.enriched["A"];
        assert_eq!(a.location, Some(Coordinate::new(37.6, -77.5)));
        assert!(a.intersection);
        assert_eq!(result.located, 1);
    }

    #[tokio::test]
    async fn no_result_is_merged_without_location() {
        let geocoder = ScriptedGeocoder::default();
        let batch = snapshot_from([incident("A", "nowhere")]);

        let result = enrich(&geocoder, batch).await.unwrap();

        assert!(result.enriched["A"].location.is_none());
        assert_eq!(result.unresolved, 1);
        assert!(result.withheld.is_empty());
    }

    #[tokio::test]
    async fn transient_failure_withholds_only_that_record() {
        let geocoder = ScriptedGeocoder::default();
        let batch = snapshot_from([
            incident("A", "1 Main St"),
            incident("B", "flaky"),
            incident("C", "3 Elm Ct"),
        ]);

        let result = enrich(&geocoder, batch).await.unwrap();

        assert_eq!(result.enriched.len(), 2);
        assert!(!result.enriched.contains_key("B"));
        assert_eq!(result.withheld, BTreeSet::from(["B".to_string()]));
        assert_eq!(geocoder.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn fatal_failure_abandons_batch() {
        let geocoder = ScriptedGeocoder::default();
        let batch = snapshot_from([
            incident("A", "1 Main St"),
            incident("B", "denied"),
            incident("C", "3 Elm Ct"),
        ]);

        let err = enrich(&geocoder, batch).await.unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(*geocoder.calls.lock().unwrap(), ["1 Main St", "denied"]);
    }
}
