//! GeoJSON export
//!
//! Converts the output dataset into a FeatureCollection of points for the
//! map front-end. Every column becomes a string property; rows whose
//! coordinates are the unknown sentinel (or otherwise unparseable) are
//! left out.

use std::io::Read;
use std::path::Path;

use serde_json::{json, Map, Value};
use tracing::info;

use geonews_core::Coordinate;

use crate::{DatasetError, Result};

const LATITUDE_COLUMN: &str = "latitud";
const LONGITUDE_COLUMN: &str = "longitud";

/// Counts reported by an export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub features: usize,
    pub skipped: usize,
}

/// Export the output CSV at `csv_path` to `geojson_path`
pub fn export_geojson(
    csv_path: impl AsRef<Path>,
    geojson_path: impl AsRef<Path>,
) -> Result<ExportSummary> {
    let csv_path = csv_path.as_ref();
    let geojson_path = geojson_path.as_ref();

    let file = std::fs::File::open(csv_path).map_err(|e| DatasetError::io(csv_path, e))?;
    let (collection, summary) = feature_collection(file)?;

    let body = serde_json::to_string_pretty(&collection)?;
    std::fs::write(geojson_path, body).map_err(|e| DatasetError::io(geojson_path, e))?;

    info!(
        output = %geojson_path.display(),
        features = summary.features,
        skipped = summary.skipped,
        "Exported GeoJSON"
    );
    Ok(summary)
}

/// Build a FeatureCollection from output CSV content
pub fn feature_collection<R: Read>(source: R) -> Result<(Value, ExportSummary)> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);
    let headers = reader.headers()?.clone();

    let lat_idx = position(&headers, LATITUDE_COLUMN)?;
    let lon_idx = position(&headers, LONGITUDE_COLUMN)?;

    let mut features = Vec::new();
    let mut summary = ExportSummary::default();

    for row in reader.records() {
        let row = row?;
        let coordinate = |idx: usize| {
            row.get(idx)
                .and_then(Coordinate::parse)
                .and_then(|c| c.value())
        };

        let (Some(latitude), Some(longitude)) = (coordinate(lat_idx), coordinate(lon_idx)) else {
            summary.skipped += 1;
            continue;
        };

        let properties: Map<String, Value> = headers
            .iter()
            .zip(row.iter())
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect();

        features.push(json!({
            "type": "Feature",
            "geometry": {
                "type": "Point",
                "coordinates": [longitude, latitude],
            },
            "properties": properties,
        }));
        summary.features += 1;
    }

    let collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    Ok((collection, summary))
}

fn position(headers: &csv::StringRecord, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| DatasetError::MissingColumn {
            column: column.to_string(),
            found: headers.iter().map(str::to_string).collect(),
        })
}
