//! Normalized input records and their CSV loaders.
//!
//! # CSV formats
//!
//! Three tables, canonical column names (renaming from vendor spreadsheets
//! happens upstream):
//!
//! | Table    | Columns                                        |
//! |----------|------------------------------------------------|
//! | visits   | `service_point, material, visit_date, load_kg` |
//! | capacity | `service_point, capacity_kg`                   |
//! | geo      | `service_point, lat, lon`                      |
//!
//! Visit rows are kept *raw* (date and load as strings): the material filter
//! runs before type coercion, so a malformed value on a row the filter would
//! discard anyway must not fail the run.  Capacity and geo tables have no
//! such pre-filter and are parsed to their final types here.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use ww_core::{GeoPoint, SpId};

use crate::error::{FeatureError, FeatureResult};

// ── Record types ──────────────────────────────────────────────────────────────

/// One raw collection event, prior to material filtering and coercion.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVisitRecord {
    pub service_point: String,
    pub material:      String,
    pub visit_date:    String,
    pub load_kg:       String,
}

/// Rated capacity of one physical asset.  Several assets may share a
/// service point; the builder sums them.
#[derive(Debug, Clone, Deserialize)]
pub struct CapacityRecord {
    pub service_point: SpId,
    pub capacity_kg:   f64,
}

/// Coordinates of one service point.
#[derive(Debug, Clone)]
pub struct GeoRecord {
    pub service_point: SpId,
    pub geo:           GeoPoint,
}

#[derive(Deserialize)]
struct GeoCsvRecord {
    service_point: SpId,
    lat:           f64,
    lon:           f64,
}

// ── Loaders ───────────────────────────────────────────────────────────────────

/// Load the raw visit table from a CSV file.
pub fn load_visits_csv(path: &Path) -> FeatureResult<Vec<RawVisitRecord>> {
    load_visits_reader(std::fs::File::open(path)?)
}

/// Like [`load_visits_csv`] but accepts any `Read` source (e.g. a `Cursor`
/// in tests).
pub fn load_visits_reader<R: Read>(reader: R) -> FeatureResult<Vec<RawVisitRecord>> {
    read_table(reader, "visits")
}

/// Load the per-asset capacity table from a CSV file.
pub fn load_capacity_csv(path: &Path) -> FeatureResult<Vec<CapacityRecord>> {
    load_capacity_reader(std::fs::File::open(path)?)
}

/// Like [`load_capacity_csv`] but accepts any `Read` source.
pub fn load_capacity_reader<R: Read>(reader: R) -> FeatureResult<Vec<CapacityRecord>> {
    read_table(reader, "capacity")
}

/// Load the service-point coordinate table from a CSV file.
pub fn load_geo_csv(path: &Path) -> FeatureResult<Vec<GeoRecord>> {
    load_geo_reader(std::fs::File::open(path)?)
}

/// Like [`load_geo_csv`] but accepts any `Read` source.
pub fn load_geo_reader<R: Read>(reader: R) -> FeatureResult<Vec<GeoRecord>> {
    let rows: Vec<GeoCsvRecord> = read_table(reader, "geo")?;
    Ok(rows
        .into_iter()
        .map(|r| GeoRecord {
            service_point: r.service_point,
            geo:           GeoPoint::new(r.lat, r.lon),
        })
        .collect())
}

fn read_table<R: Read, T: for<'de> Deserialize<'de>>(
    reader: R,
    table: &'static str,
) -> FeatureResult<Vec<T>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    csv_reader
        .deserialize::<T>()
        .map(|row| row.map_err(|source| FeatureError::Csv { table, source }))
        .collect()
}
