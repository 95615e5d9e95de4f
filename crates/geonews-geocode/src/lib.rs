//! Geonews Geocode - Coordinate resolution
//!
//! Wraps a geocoding oracle with query disambiguation, a fixed pause
//! before every request and the "unknown" sentinel policy.
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;

use geonews_core::{Geocoder, GeocoderConfig, Result};

pub mod nominatim;
pub mod resolver;

pub use nominatim::NominatimGeocoder;
pub use resolver::CoordinateResolver;

/// Create the configured geocoding oracle
pub fn create_geocoder(config: &GeocoderConfig) -> Result<Arc<dyn Geocoder>> {
    Ok(Arc::new(NominatimGeocoder::from_config(config)?))
}
