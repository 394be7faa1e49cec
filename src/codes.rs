//! Lookup tables that turn AIS navigational status and ship-and-cargo type
//! codes into readable labels.
//!
//! Both tables are JSON objects. The status table maps a code (as a string
//! key) to its label; the ship type table maps a label to the list of codes
//! that fall under it and is inverted on load.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::OnceLock;

use log::{debug, warn};

use crate::error::{Error, Result};

pub const STATUS_FILE_NAME: &str = "ship_statuses.json";
pub const SHIP_TYPE_FILE_NAME: &str = "ship_types.json";

static BUILTIN_STATUSES: &str = include_str!("../data/ship_statuses.json");
static BUILTIN_SHIP_TYPES: &str = include_str!("../data/ship_types.json");

static BUILTIN: OnceLock<CodeTables> = OnceLock::new();

/// A decoded code: either the table label or the raw code when the table
/// has no entry for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CodeLabel {
    Known(String),
    Unmapped(i32),
}

impl CodeLabel {
    pub fn is_known(&self) -> bool {
        matches!(self, CodeLabel::Known(_))
    }
}

impl fmt::Display for CodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeLabel::Known(label) => f.write_str(label),
            CodeLabel::Unmapped(code) => write!(f, "{code}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CodeTables {
    status: HashMap<i32, String>,
    ship_types: HashMap<i32, String>,
}

impl CodeTables {
    /// Parse both tables from their JSON text.
    pub fn from_json(status_json: &str, ship_types_json: &str) -> Result<Self> {
        let raw_status: HashMap<String, String> = serde_json::from_str(status_json)?;
        let mut status = HashMap::with_capacity(raw_status.len());
        for (key, label) in raw_status {
            let code = key
                .trim()
                .parse::<i32>()
                .map_err(|_| Error::InvalidStatusCode { key: key.clone() })?;
            status.insert(code, label);
        }

        // Document order matters: a code listed under several labels takes the last one.
        let raw_types: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(ship_types_json)?;
        let mut ship_types: HashMap<i32, String> = HashMap::new();
        for (label, codes) in raw_types {
            let codes: Vec<i32> = serde_json::from_value(codes)?;
            for code in codes {
                if let Some(previous) = ship_types.insert(code, label.clone()) {
                    if previous != label {
                        warn!(
                            "ship type code {} relabelled from {:?} to {:?}",
                            code, previous, label
                        );
                    }
                }
            }
        }

        debug!(
            "loaded {} status codes and {} ship type codes",
            status.len(),
            ship_types.len()
        );

        Ok(CodeTables { status, ship_types })
    }

    pub fn from_files(status_path: &Path, ship_types_path: &Path) -> Result<Self> {
        let status = read_table(status_path)?;
        let ship_types = read_table(ship_types_path)?;
        Self::from_json(&status, &ship_types)
    }

    /// Load `ship_statuses.json` and `ship_types.json` from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        Self::from_files(&dir.join(STATUS_FILE_NAME), &dir.join(SHIP_TYPE_FILE_NAME))
    }

    /// Process-wide tables built from the ITU-R M.1371 codes shipped with the
    /// crate. Parsed on first use and shared afterwards.
    pub fn builtin() -> Result<&'static CodeTables> {
        if let Some(tables) = BUILTIN.get() {
            return Ok(tables);
        }
        let tables = Self::from_json(BUILTIN_STATUSES, BUILTIN_SHIP_TYPES)?;
        Ok(BUILTIN.get_or_init(|| tables))
    }

    pub fn status_label(&self, code: i32) -> CodeLabel {
        lookup(&self.status, code)
    }

    pub fn ship_type_label(&self, code: i32) -> CodeLabel {
        lookup(&self.ship_types, code)
    }
}

fn lookup(table: &HashMap<i32, String>, code: i32) -> CodeLabel {
    match table.get(&code) {
        Some(label) => CodeLabel::Known(label.clone()),
        None => CodeLabel::Unmapped(code),
    }
}

fn read_table(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::LookupTableNotFound {
            path: path.to_path_buf(),
        },
        _ => Error::Io(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_status_labels() {
        let tables = CodeTables::builtin().unwrap();
        assert_eq!(
            tables.status_label(0),
            CodeLabel::Known("Under way using engine".to_string())
        );
        assert_eq!(tables.status_label(5).to_string(), "Moored");
    }

    #[test]
    fn test_builtin_is_shared() {
        let a = CodeTables::builtin().unwrap() as *const CodeTables;
        let b = CodeTables::builtin().unwrap() as *const CodeTables;
        assert_eq!(a, b);
    }

    #[test]
    fn test_ship_types_are_inverted() {
        let tables = CodeTables::builtin().unwrap();
        for code in 70..80 {
            assert_eq!(tables.ship_type_label(code).to_string(), "Cargo");
        }
        assert_eq!(tables.ship_type_label(38).to_string(), "Reserved");
    }

    #[test]
    fn test_unmapped_code_passes_through() {
        let tables = CodeTables::builtin().unwrap();
        let label = tables.status_label(42);
        assert_eq!(label, CodeLabel::Unmapped(42));
        assert!(!label.is_known());
        assert_eq!(label.to_string(), "42");
        assert_eq!(tables.ship_type_label(-1).to_string(), "-1");
    }

    #[test]
    fn test_non_integer_status_key() {
        let err = CodeTables::from_json(r#"{"zero": "Moored"}"#, "{}").unwrap_err();
        assert!(matches!(err, Error::InvalidStatusCode { key } if key == "zero"));
    }

    #[test]
    fn test_later_ship_type_label_wins() {
        let tables =
            CodeTables::from_json("{}", r#"{"Tanker": [70, 80], "Cargo": [70]}"#).unwrap();
        assert_eq!(tables.ship_type_label(70).to_string(), "Cargo");
        assert_eq!(tables.ship_type_label(80).to_string(), "Tanker");

        let tables =
            CodeTables::from_json("{}", r#"{"Cargo": [70], "Tanker": [70]}"#).unwrap();
        assert_eq!(tables.ship_type_label(70).to_string(), "Tanker");
    }

    #[test]
    fn test_ship_type_codes_must_be_integers() {
        let err = CodeTables::from_json("{}", r#"{"Cargo": ["seventy"]}"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_repeated_code_under_same_label() {
        let tables = CodeTables::from_json("{}", r#"{"Cargo": [70, 70]}"#).unwrap();
        assert_eq!(tables.ship_type_label(70).to_string(), "Cargo");
    }

    #[test]
    fn test_missing_lookup_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CodeTables::from_dir(dir.path()).unwrap_err();
        match err {
            Error::LookupTableNotFound { path } => {
                assert_eq!(path, dir.path().join(STATUS_FILE_NAME));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STATUS_FILE_NAME), r#"{"1": "At anchor"}"#).unwrap();
        fs::write(dir.path().join(SHIP_TYPE_FILE_NAME), r#"{"Tug": [52]}"#).unwrap();

        let tables = CodeTables::from_dir(dir.path()).unwrap();
        assert_eq!(tables.status_label(1).to_string(), "At anchor");
        assert_eq!(tables.ship_type_label(52).to_string(), "Tug");
        assert_eq!(tables.ship_type_label(70), CodeLabel::Unmapped(70));
    }
}
