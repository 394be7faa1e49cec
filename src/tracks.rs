//! Daily vessel tracks built from point features.
//!
//! Points are grouped by calendar day, ordered by timestamp and cleaned, then
//! joined into a simplified line per day. A day whose longitudes jump by more
//! than [`ANTIMERIDIAN_JUMP_DEGREES`] between consecutive reports is taken to
//! cross the antimeridian and is split into one line per side of each jump.

use std::collections::{BTreeMap, HashSet};

use geo::{Coord, LineString, Simplify};
use log::debug;

use crate::error::{Error, Result};
use crate::model::{Crs, PointFeature, PointTable};

pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 0.001;

/// Longitude change, in degrees, that only a wrap from +180 to -180 (or back)
/// can produce between two reports of the same day.
pub const ANTIMERIDIAN_JUMP_DEGREES: f64 = 300.0;

const UNKNOWN_VESSEL: &str = "unknown";

/// A simplified line covering one day, or one side of an antimeridian
/// crossing within that day.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSegment {
    /// `day` for an unsplit day, `{day}_{part}` for a split one.
    pub key: String,
    pub day: String,
    pub part: Option<usize>,
    pub geometry: LineString<f64>,
}

impl TrackSegment {
    pub fn vertex_count(&self) -> usize {
        self.geometry.0.len()
    }

    pub fn to_wkt(&self) -> String {
        let coords = self
            .geometry
            .coords()
            .map(|c| format!("{} {}", c.x, c.y))
            .collect::<Vec<_>>()
            .join(", ");
        format!("LINESTRING ({coords})")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackTable {
    pub crs: Crs,
    pub segments: Vec<TrackSegment>,
}

impl TrackTable {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&TrackSegment> {
        self.segments.iter().find(|s| s.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackSegment> {
        self.segments.iter()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.key.as_str()).collect()
    }
}

/// Convert a point table into daily line features.
///
/// Days are emitted in ascending order. Days left with fewer than two points
/// after cleaning produce nothing, as do split parts with a single point.
///
/// # Errors
///
/// Returns [`Error::InvalidTolerance`] if `tolerance` is negative or not finite.
pub fn generate_linear_features(points: &PointTable, tolerance: f64) -> Result<TrackTable> {
    check_tolerance(tolerance)?;
    Ok(build_tracks(points.iter(), &points.crs, tolerance))
}

/// Like [`generate_linear_features`], but grouped by vessel first so that
/// reports from different vessels on the same day are never joined.
pub fn generate_vessel_tracks(
    points: &PointTable,
    tolerance: f64,
) -> Result<BTreeMap<String, TrackTable>> {
    check_tolerance(tolerance)?;

    let mut vessels: BTreeMap<&str, Vec<&PointFeature>> = BTreeMap::new();
    for feature in points.iter() {
        let mmsi = feature.record.mmsi.as_deref().unwrap_or(UNKNOWN_VESSEL);
        vessels.entry(mmsi).or_default().push(feature);
    }

    Ok(vessels
        .into_iter()
        .map(|(mmsi, features)| {
            debug!("vessel {}: {} reports", mmsi, features.len());
            let tracks = build_tracks(features, &points.crs, tolerance);
            (mmsi.to_string(), tracks)
        })
        .collect())
}

fn check_tolerance(tolerance: f64) -> Result<()> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(Error::InvalidTolerance { tolerance });
    }
    Ok(())
}

fn build_tracks<'a, I>(features: I, crs: &Crs, tolerance: f64) -> TrackTable
where
    I: IntoIterator<Item = &'a PointFeature>,
{
    let mut days: BTreeMap<&str, Vec<&PointFeature>> = BTreeMap::new();
    for feature in features {
        days.entry(feature.day()).or_default().push(feature);
    }

    let mut segments = Vec::new();
    for (day, group) in days {
        segments.extend(day_segments(day, group, tolerance));
    }

    TrackTable {
        crs: crs.clone(),
        segments,
    }
}

fn day_segments(day: &str, group: Vec<&PointFeature>, tolerance: f64) -> Vec<TrackSegment> {
    let reports = group.len();
    let group = clean_day(group);
    if group.len() < 2 {
        debug!("{}: {} of {} reports usable, skipped", day, group.len(), reports);
        return Vec::new();
    }

    let coords: Vec<Coord<f64>> = group.iter().filter_map(|f| f.geometry).map(|p| p.0).collect();

    let (min, max) = coords
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.x), hi.max(c.x))
        });

    if max - min <= ANTIMERIDIAN_JUMP_DEGREES {
        return vec![TrackSegment {
            key: day.to_string(),
            day: day.to_string(),
            part: None,
            geometry: simplified(coords, tolerance),
        }];
    }

    let parts = split_at_jumps(coords);
    debug!("{}: longitude span {:.3}, {} parts", day, max - min, parts.len());

    parts
        .into_iter()
        .enumerate()
        .filter_map(|(idx, part)| {
            if part.len() < 2 {
                debug!("{}_{}: single report, skipped", day, idx);
                return None;
            }
            Some(TrackSegment {
                key: format!("{day}_{idx}"),
                day: day.to_string(),
                part: Some(idx),
                geometry: simplified(part, tolerance),
            })
        })
        .collect()
}

/// Sort by timestamp, drop reports without a position and drop exact
/// duplicates, keeping the first.
fn clean_day(mut group: Vec<&PointFeature>) -> Vec<&PointFeature> {
    group.sort_by(|a, b| a.record.timestamp.cmp(&b.record.timestamp));
    group.retain(|f| {
        if !f.record.has_latitude() {
            return false;
        }
        if f.geometry.is_none() {
            debug!(
                "{}: report at {} has no longitude, dropped",
                f.day(),
                f.record.timestamp
            );
            return false;
        }
        true
    });

    let mut seen = HashSet::with_capacity(group.len());
    group.retain(|f| seen.insert(RowKey::of(*f)));
    group
}

/// Start a new part wherever consecutive longitudes differ by more than
/// [`ANTIMERIDIAN_JUMP_DEGREES`]. Part `n` follows the `n`th jump.
fn split_at_jumps(coords: Vec<Coord<f64>>) -> Vec<Vec<Coord<f64>>> {
    let mut parts = Vec::new();
    let mut current: Vec<Coord<f64>> = Vec::new();
    let mut prev_lon: Option<f64> = None;

    for coord in coords {
        if let Some(prev) = prev_lon {
            if (coord.x - prev).abs() > ANTIMERIDIAN_JUMP_DEGREES {
                parts.push(std::mem::take(&mut current));
            }
        }
        prev_lon = Some(coord.x);
        current.push(coord);
    }
    parts.push(current);
    parts
}

fn simplified(coords: Vec<Coord<f64>>, tolerance: f64) -> LineString<f64> {
    LineString::new(coords).simplify(&tolerance)
}

/// Identity of a report across every retained column.
#[derive(PartialEq, Eq, Hash)]
struct RowKey<'a> {
    timestamp: &'a str,
    mmsi: Option<&'a str>,
    latitude: Option<u64>,
    longitude: Option<u64>,
    ship_and_cargo_type: Option<i32>,
    status: Option<i32>,
    attributes: &'a BTreeMap<String, String>,
}

impl<'a> RowKey<'a> {
    fn of(feature: &'a PointFeature) -> Self {
        let record = &feature.record;
        RowKey {
            timestamp: &record.timestamp,
            mmsi: record.mmsi.as_deref(),
            latitude: record.latitude.map(coord_bits),
            longitude: record.longitude.map(coord_bits),
            ship_and_cargo_type: record.ship_and_cargo_type,
            status: record.status,
            attributes: &feature.attributes,
        }
    }
}

// -0.0 and 0.0 compare equal as values, so they must hash the same.
fn coord_bits(value: f64) -> u64 {
    (value + 0.0).to_bits()
}
