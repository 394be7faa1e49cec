//! Reading AIS position tables into point features.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::codes::CodeTables;
use crate::error::{Error, Result};
use crate::model::{Crs, PointFeature, PointTable, Record, DEFAULT_COLUMNS, REQUIRED_COLUMNS};

/// The position table as read, before any column selection or cleaning.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: csv::StringRecord,
    pub rows: Vec<csv::StringRecord>,
}

impl RawTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let rows = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(RawTable { headers, rows })
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::ColumnNotFound {
                column: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Columns to keep. Latitude, longitude and timestamp are always kept.
    pub columns: Vec<String>,
    /// Drop rows with a missing latitude or longitude.
    pub drop_missing_coordinates: bool,
    /// Decode ship type and status codes into labels.
    pub decode_labels: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            drop_missing_coordinates: false,
            decode_labels: true,
        }
    }
}

impl ReadOptions {
    fn retained_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::with_capacity(self.columns.len() + REQUIRED_COLUMNS.len());
        for column in self.columns.iter().map(String::as_str).chain(REQUIRED_COLUMNS) {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        columns
    }
}

/// One AIS input file together with the lookup tables used to label it.
pub struct AisFile<'a> {
    source: Option<PathBuf>,
    raw: RawTable,
    codes: &'a CodeTables,
    points: Option<PointTable>,
}

impl<'a> AisFile<'a> {
    pub fn open(path: &Path, codes: &'a CodeTables) -> Result<Self> {
        let file = File::open(path)?;
        let mut ais = Self::from_reader(file, codes)?;
        ais.source = Some(path.to_path_buf());
        Ok(ais)
    }

    pub fn from_reader<R: Read>(reader: R, codes: &'a CodeTables) -> Result<Self> {
        Ok(AisFile {
            source: None,
            raw: RawTable::from_reader(reader)?,
            codes,
            points: None,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The input exactly as read.
    pub fn raw(&self) -> &RawTable {
        &self.raw
    }

    /// The table produced by the last successful [`AisFile::read_simple_geom`].
    pub fn points(&self) -> Option<&PointTable> {
        self.points.as_ref()
    }

    /// Hand over the last point table, dropping the raw copy.
    pub fn into_points(self) -> Option<PointTable> {
        self.points
    }

    /// Select the retained columns, clean and label the rows, and build a
    /// point per row under EPSG:4326.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] if a retained column is missing from
    /// the header, or a CSV error if a typed cell cannot be parsed.
    pub fn read_simple_geom(&mut self, options: &ReadOptions) -> Result<&PointTable> {
        let table = self.build_points(options)?;
        let points: &PointTable = self.points.insert(table);
        Ok(points)
    }

    fn build_points(&self, options: &ReadOptions) -> Result<PointTable> {
        let retained = options.retained_columns();

        let mut typed_headers = csv::StringRecord::new();
        let mut typed_idx = Vec::new();
        let mut extra = Vec::new();
        for column in retained {
            let idx = self.raw.column_index(column)?;
            if DEFAULT_COLUMNS.contains(&column) {
                typed_headers.push_field(column);
                typed_idx.push(idx);
            } else {
                extra.push((column.to_string(), idx));
            }
        }

        let mut features = Vec::with_capacity(self.raw.len());
        let mut dropped = 0usize;
        for row in &self.raw.rows {
            let typed: csv::StringRecord = typed_idx
                .iter()
                .map(|&i| row.get(i).unwrap_or(""))
                .collect();
            let record: Record = typed.deserialize(Some(&typed_headers))?;

            if options.drop_missing_coordinates && (!record.has_latitude() || !record.has_longitude()) {
                dropped += 1;
                continue;
            }

            let mut feature = PointFeature::new(record);
            if options.decode_labels {
                feature.ship_type = feature
                    .record
                    .ship_and_cargo_type
                    .map(|code| self.codes.ship_type_label(code));
                feature.status_name = feature
                    .record
                    .status
                    .map(|code| self.codes.status_label(code));
            }
            feature.attributes = extra
                .iter()
                .map(|(name, i)| (name.clone(), row.get(*i).unwrap_or("").to_string()))
                .collect::<BTreeMap<_, _>>();

            features.push(feature);
        }

        if dropped > 0 {
            warn!("dropped {} rows with missing coordinates", dropped);
        }
        debug!(
            "built {} point features from {} rows",
            features.len(),
            self.raw.len()
        );

        Ok(PointTable::new(Crs::wgs84(), features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::CodeLabel;

    const SAMPLE: &str = "\
mmsi,timestamp,latitude,longitude,ship_and_cargo_type,status,speed
244660000,2020-01-01T00:00:00,52.37,4.89,70,0,12.1
244660000,2020-01-01T01:00:00,,4.95,70,5,0.0
244660000,2020-01-01T02:00:00,52.40,5.01,999,42,11.7
";

    fn ais(text: &str) -> AisFile<'static> {
        AisFile::from_reader(text.as_bytes(), CodeTables::builtin().unwrap()).unwrap()
    }

    #[test]
    fn test_raw_copy_is_kept() {
        let mut file = ais(SAMPLE);
        let options = ReadOptions {
            drop_missing_coordinates: true,
            ..ReadOptions::default()
        };
        let points = file.read_simple_geom(&options).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(file.raw().len(), 3);
        assert_eq!(file.raw().headers.len(), 7);
        assert_eq!(file.points().map(PointTable::len), Some(2));
    }

    #[test]
    fn test_into_points_returns_last_table() {
        let file = ais(SAMPLE);
        assert!(file.into_points().is_none());

        let mut file = ais(SAMPLE);
        let options = ReadOptions {
            drop_missing_coordinates: true,
            ..ReadOptions::default()
        };
        file.read_simple_geom(&options).unwrap();
        let points = file.into_points().unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points.features[1].record.timestamp, "2020-01-01T02:00:00");
    }

    #[test]
    fn test_default_keeps_missing_coordinates() {
        let mut file = ais(SAMPLE);
        let points = file.read_simple_geom(&ReadOptions::default()).unwrap();
        assert_eq!(points.len(), 3);
        assert!(points.features[1].geometry.is_none());
        assert_eq!(points.features[1].record.latitude, None);
        assert_eq!(points.crs.as_str(), "EPSG:4326");
    }

    #[test]
    fn test_labels_decoded_with_fallback() {
        let mut file = ais(SAMPLE);
        let points = file.read_simple_geom(&ReadOptions::default()).unwrap();

        let first = &points.features[0];
        assert_eq!(first.ship_type, Some(CodeLabel::Known("Cargo".to_string())));
        assert_eq!(
            first.status_name,
            Some(CodeLabel::Known("Under way using engine".to_string()))
        );

        let last = &points.features[2];
        assert_eq!(last.ship_type, Some(CodeLabel::Unmapped(999)));
        assert_eq!(last.status_name, Some(CodeLabel::Unmapped(42)));
    }

    #[test]
    fn test_raw_codes_leave_labels_empty() {
        let mut file = ais(SAMPLE);
        let options = ReadOptions {
            decode_labels: false,
            ..ReadOptions::default()
        };
        let points = file.read_simple_geom(&options).unwrap();
        assert!(points.iter().all(|p| p.ship_type.is_none() && p.status_name.is_none()));
        assert_eq!(points.features[0].record.status, Some(0));
    }

    #[test]
    fn test_extra_columns_become_attributes() {
        let mut file = ais(SAMPLE);
        let mut options = ReadOptions::default();
        options.columns.push("speed".to_string());
        let points = file.read_simple_geom(&options).unwrap();
        assert_eq!(
            points.features[0].attributes.get("speed").map(String::as_str),
            Some("12.1")
        );
    }

    #[test]
    fn test_missing_column_fails() {
        let mut file = ais("latitude,longitude,timestamp\n1.0,2.0,2020-01-01\n");
        let err = file.read_simple_geom(&ReadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { column } if column == "mmsi"));
        assert!(file.points().is_none());
    }

    #[test]
    fn test_geometry_columns_always_required() {
        let mut file = ais("mmsi,timestamp,latitude\n1,2020-01-01,1.0\n");
        let options = ReadOptions {
            columns: vec!["mmsi".to_string()],
            ..ReadOptions::default()
        };
        let err = file.read_simple_geom(&options).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { column } if column == "longitude"));
    }

    #[test]
    fn test_malformed_code_is_fatal() {
        let text = "latitude,longitude,timestamp,mmsi,ship_and_cargo_type,status\n\
                    1.0,2.0,2020-01-01,1,cargo,0\n";
        let mut file = ais(text);
        let err = file.read_simple_geom(&ReadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Csv(_)));
    }
}
