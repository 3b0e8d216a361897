//! Pipeline configuration.

use std::time::Duration;

use hpd_alerts_geocoder::ProviderSelection;

use crate::ConfigError;

/// Shortest poll interval the pipeline accepts, in seconds.
pub const MIN_INTERVAL_SECS: u64 = 10;

/// Poll interval used when none is given, in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Validated settings for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    provider: ProviderSelection,
    interval: Duration,
}

impl PipelineConfig {
    /// Validates and builds a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IntervalBelowFloor`] if `interval_secs` is
    /// below [`MIN_INTERVAL_SECS`].
    pub fn new(provider: ProviderSelection, interval_secs: u64) -> Result<Self, ConfigError> {
        if interval_secs < MIN_INTERVAL_SECS {
            return Err(ConfigError::IntervalBelowFloor { interval_secs });
        }
        Ok(Self {
            provider,
            interval: Duration::from_secs(interval_secs),
        })
    }

    /// The geocoding provider to use.
    #[must_use]
    pub const fn provider(&self) -> &ProviderSelection {
        &self.provider
    }

    /// Time between cycle starts.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_interval_at_floor() {
        let config = PipelineConfig::new(ProviderSelection::Nominatim, MIN_INTERVAL_SECS).unwrap();
        assert_eq!(config.interval(), Duration::from_secs(10));
    }

    #[test]
    fn rejects_interval_below_floor() {
        let err = PipelineConfig::new(ProviderSelection::Nominatim, 9).unwrap_err();
        assert!(matches!(err, ConfigError::IntervalBelowFloor { interval_secs: 9 }));
        assert_eq!(err.to_string(), "poll interval of 9s is below the 10s minimum");
    }

    #[test]
    fn keeps_provider_selection() {
        let provider = ProviderSelection::Google {
            api_key: "key".to_string(),
        };
        let config = PipelineConfig::new(provider.clone(), DEFAULT_INTERVAL_SECS).unwrap();
        assert_eq!(config.provider(), &provider);
    }
}
