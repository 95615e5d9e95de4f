//! Nominatim geocoding client
//!
//! Free-text search against an OpenStreetMap Nominatim instance, keeping
//! only the best match. Timeouts (while connecting or while reading the
//! body) and HTTP error statuses are reported as
//! [`GeocodeOutcome::Unavailable`]; connection-level failures and
//! undecodable bodies are returned as errors.
//!
//! Author: hephaex@gmail.com

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use geonews_core::{GeoNewsError, GeocodeOutcome, Geocoder, GeocoderConfig, Result};

/// Nominatim search client
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

/// One search result; coordinates are decimal strings
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    /// Create a new client
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| GeoNewsError::GeocodingError(format!("Failed to build client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create from config
    pub fn from_config(config: &GeocoderConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            &config.user_agent,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<GeocodeOutcome> {
        let response = match self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Ok(GeocodeOutcome::Unavailable(format!("timeout: {e}")))
            }
            Err(e) => {
                return Err(GeoNewsError::GeocodingError(format!("Request failed: {e}")))
            }
        };

        if let Some(outcome) = outcome_for_status(response.status()) {
            return Ok(outcome);
        }

        // The client timeout also covers reading the body
        let places: Vec<NominatimPlace> = match response.json().await {
            Ok(places) => places,
            Err(e) if e.is_timeout() => {
                return Ok(GeocodeOutcome::Unavailable(format!("timeout: {e}")))
            }
            Err(e) => {
                return Err(GeoNewsError::GeocodingError(format!(
                    "Failed to parse response: {e}"
                )))
            }
        };

        best_match(&places)
    }

    fn name(&self) -> &str {
        "nominatim"
    }
}

/// Outcome decided by the status line alone
fn outcome_for_status(status: StatusCode) -> Option<GeocodeOutcome> {
    if status.is_success() {
        None
    } else {
        Some(GeocodeOutcome::Unavailable(format!("service error: {status}")))
    }
}

fn best_match(places: &[NominatimPlace]) -> Result<GeocodeOutcome> {
    let Some(place) = places.first() else {
        return Ok(GeocodeOutcome::NoMatch);
    };

    let parse = |value: &str| {
        value.trim().parse::<f64>().map_err(|_| {
            GeoNewsError::GeocodingError(format!("Invalid coordinate in response: {value}"))
        })
    };

    Ok(GeocodeOutcome::Found {
        latitude: parse(&place.lat)?,
        longitude: parse(&place.lon)?,
    })
}
