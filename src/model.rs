use std::collections::BTreeMap;
use std::fmt;

use geo::Point;

use crate::codes::CodeLabel;

/// Column names of the position table.
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const TIMESTAMP: &str = "timestamp";
pub const MMSI: &str = "mmsi";
pub const SHIP_AND_CARGO_TYPE: &str = "ship_and_cargo_type";
pub const STATUS: &str = "status";

/// Columns every point table needs, whatever else is retained.
pub const REQUIRED_COLUMNS: [&str; 3] = [LATITUDE, LONGITUDE, TIMESTAMP];

pub const DEFAULT_COLUMNS: [&str; 6] = [
    LATITUDE,
    LONGITUDE,
    TIMESTAMP,
    MMSI,
    SHIP_AND_CARGO_TYPE,
    STATUS,
];

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
//latitude		decimal degrees, empty when the report had no fix
//longitude		decimal degrees, empty when the report had no fix
//timestamp		e.g. 2020-01-01T13:45:10, the first 10 characters are the day
//mmsi			vessel identifier
//ship_and_cargo_type	integer AIS type code (0-99)
//status		integer navigational status code (0-15)
// example: 52.3741,4.8897,2020-01-01T00:00:12,244660000,70,0
pub struct Record {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub timestamp: String,
    #[serde(default)]
    pub mmsi: Option<String>,
    #[serde(default)]
    pub ship_and_cargo_type: Option<i32>,
    #[serde(default)]
    pub status: Option<i32>,
}

impl Record {
    pub fn has_latitude(&self) -> bool {
        matches!(self.latitude, Some(lat) if !lat.is_nan())
    }

    pub fn has_longitude(&self) -> bool {
        matches!(self.longitude, Some(lon) if !lon.is_nan())
    }

    /// Longitude/latitude pair, in that order, when both are present.
    pub fn lon_lat(&self) -> Option<(f64, f64)> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) if !lon.is_nan() && !lat.is_nan() => Some((lon, lat)),
            _ => None,
        }
    }

    /// Calendar day of the report: the first 10 characters of the timestamp.
    pub fn day(&self) -> &str {
        match self.timestamp.char_indices().nth(10) {
            Some((idx, _)) => &self.timestamp[..idx],
            None => &self.timestamp,
        }
    }
}

/// A position report with its point geometry and decoded labels.
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub record: Record,
    pub geometry: Option<Point<f64>>,
    pub ship_type: Option<CodeLabel>,
    pub status_name: Option<CodeLabel>,
    /// Retained columns outside the typed record.
    pub attributes: BTreeMap<String, String>,
}

impl PointFeature {
    pub fn new(record: Record) -> Self {
        let geometry = record.lon_lat().map(|(lon, lat)| Point::new(lon, lat));
        PointFeature {
            record,
            geometry,
            ship_type: None,
            status_name: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn day(&self) -> &str {
        self.record.day()
    }
}

/// Coordinate reference declaration carried by point and track tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Crs(String);

impl Crs {
    pub const WGS84_CODE: &'static str = "EPSG:4326";

    pub fn new(code: impl Into<String>) -> Self {
        Crs(code.into())
    }

    pub fn wgs84() -> Self {
        Crs(Self::WGS84_CODE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Crs {
    fn default() -> Self {
        Crs::wgs84()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointTable {
    pub crs: Crs,
    pub features: Vec<PointFeature>,
}

impl PointTable {
    pub fn new(crs: Crs, features: Vec<PointFeature>) -> Self {
        PointTable { crs, features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointFeature> {
        self.features.iter()
    }
}
