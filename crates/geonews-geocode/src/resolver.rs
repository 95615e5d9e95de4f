//! Coordinate resolution
//!
//! Builds a disambiguated query per location and asks the geocoder for
//! coordinates, pausing a fixed interval before every request. Missing
//! results and unavailable service are recorded as the "unknown" sentinel
//! pair; any other geocoder error is returned to the caller.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use geonews_core::{GeoContext, GeocodeOutcome, Geocoder, GeocoderConfig, ResolvedLocation, Result};
use geonews_extractor::PatternLibrary;

/// Rate-limited resolver over a geocoding oracle
pub struct CoordinateResolver {
    geocoder: Arc<dyn Geocoder>,
    library: Arc<PatternLibrary>,
    /// Country appended to every query
    country: String,
    /// City assumed for bare street addresses
    default_city: String,
    /// Pause before each request
    min_interval: Duration,
}

impl CoordinateResolver {
    /// Create a resolver from geocoder config
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        library: Arc<PatternLibrary>,
        config: &GeocoderConfig,
    ) -> Self {
        Self {
            geocoder,
            library,
            country: config.country.clone(),
            default_city: config.default_city.clone(),
            min_interval: Duration::from_millis(config.min_interval_ms),
        }
    }

    /// Override the pause before each request
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn geocoder_name(&self) -> &str {
        self.geocoder.name()
    }

    /// Build the query string for a location
    ///
    /// - with context: `"{location}, {context}, {country}"`
    /// - street address without context: `"{location}, {default_city}, {country}"`
    /// - otherwise: `"{location}, {country}"`
    pub fn build_query(&self, location: &str, context: Option<&GeoContext>) -> String {
        match context {
            Some(context) => format!("{location}, {context}, {}", self.country),
            None if self.library.is_street_address(location) => {
                format!("{location}, {}, {}", self.default_city, self.country)
            }
            None => format!("{location}, {}", self.country),
        }
    }

    /// Resolve a location to coordinates or the unknown sentinel
    pub async fn resolve(
        &self,
        location: &str,
        context: Option<&GeoContext>,
    ) -> Result<ResolvedLocation> {
        let query = self.build_query(location, context);
        debug!(%query, "Geocoding");

        if !self.min_interval.is_zero() {
            tokio::time::sleep(self.min_interval).await;
        }

        let resolved = match self.geocoder.geocode(&query).await? {
            GeocodeOutcome::Found {
                latitude,
                longitude,
            } => ResolvedLocation::found(location, latitude, longitude),
            GeocodeOutcome::NoMatch => {
                debug!(%query, "No geocoding result");
                ResolvedLocation::unknown(location)
            }
            GeocodeOutcome::Unavailable(reason) => {
                warn!(%query, %reason, "Geocoder unavailable, recording unknown coordinates");
                ResolvedLocation::unknown(location)
            }
        };

        Ok(resolved)
    }
}
