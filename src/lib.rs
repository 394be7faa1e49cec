pub mod codes;
pub mod error;
pub mod loader;
pub mod model;
pub mod tracks;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{value_parser, Arg, ArgAction, Command};
use log::info;
use rayon::prelude::*;

pub use codes::{CodeLabel, CodeTables};
pub use error::Error;
pub use loader::{AisFile, RawTable, ReadOptions};
pub use model::{Crs, PointFeature, PointTable, Record};
pub use tracks::{
    generate_linear_features, generate_vessel_tracks, TrackSegment, TrackTable,
    DEFAULT_SIMPLIFY_TOLERANCE,
};

#[derive(Debug)]
pub struct Config {
    paths: Vec<PathBuf>,
    tolerance: f64,
    lookup_dir: Option<PathBuf>,
    drop_missing: bool,
    raw_codes: bool,
    by_vessel: bool,
    day: Option<NaiveDate>,
}

pub fn get_arg() -> Result<Config> {
    let matches = command().get_matches();
    config_from(&matches)
}

fn command() -> Command {
    Command::new("ais-tracks")
        .version("0.1")
        .about("build daily vessel tracks from AIS position files [csv]")
        .arg(
            Arg::new("paths")
                .short('f')
                .long("file-path")
                .action(ArgAction::Append)
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("AIS position file to read"),
        )
        .arg(
            Arg::new("tolerance")
                .short('t')
                .long("tolerance")
                .value_parser(value_parser!(f64))
                .default_value("0.001")
                .help("line simplification tolerance in decimal degrees"),
        )
        .arg(
            Arg::new("lookup-dir")
                .long("lookup-dir")
                .value_parser(value_parser!(PathBuf))
                .help("directory holding ship_statuses.json and ship_types.json"),
        )
        .arg(
            Arg::new("drop-missing")
                .long("drop-missing")
                .action(ArgAction::SetTrue)
                .help("drop rows without latitude or longitude"),
        )
        .arg(
            Arg::new("raw-codes")
                .long("raw-codes")
                .action(ArgAction::SetTrue)
                .help("keep ship type and status as raw codes"),
        )
        .arg(
            Arg::new("by-vessel")
                .long("by-vessel")
                .action(ArgAction::SetTrue)
                .help("build tracks per vessel (mmsi) instead of per file"),
        )
        .arg(
            Arg::new("day")
                .long("day")
                .value_parser(|s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
                .help("only keep reports from this day (YYYY-MM-DD)"),
        )
}

fn config_from(matches: &clap::ArgMatches) -> Result<Config> {
    let paths = matches
        .get_many::<PathBuf>("paths")
        .unwrap_or_default()
        .cloned()
        .collect::<Vec<PathBuf>>();

    let tolerance = matches
        .get_one::<f64>("tolerance")
        .copied()
        .unwrap_or(DEFAULT_SIMPLIFY_TOLERANCE);

    Ok(Config {
        paths,
        tolerance,
        lookup_dir: matches.get_one::<PathBuf>("lookup-dir").cloned(),
        drop_missing: matches.get_flag("drop-missing"),
        raw_codes: matches.get_flag("raw-codes"),
        by_vessel: matches.get_flag("by-vessel"),
        day: matches.get_one::<NaiveDate>("day").copied(),
    })
}

pub fn run(config: Config) -> Result<()> {
    info!("config is {:?}", config);

    let owned;
    let codes: &CodeTables = match &config.lookup_dir {
        Some(dir) => {
            owned = CodeTables::from_dir(dir)
                .with_context(|| format!("failed to load lookup tables from {}", dir.display()))?;
            &owned
        }
        None => CodeTables::builtin()?,
    };

    let reports = config
        .paths
        .par_iter()
        .map(|path| process_file(path, &config, codes))
        .collect::<Result<Vec<String>>>()?;

    for report in reports {
        print!("{report}");
    }

    Ok(())
}

/// Build the tracks of one file and render one `file key vertices` line per
/// segment.
pub fn process_file(path: &Path, config: &Config, codes: &CodeTables) -> Result<String> {
    let mut ais = AisFile::open(path, codes)
        .with_context(|| format!("failed to open file {}", path.display()))?;

    let options = ReadOptions {
        drop_missing_coordinates: config.drop_missing,
        decode_labels: !config.raw_codes,
        ..ReadOptions::default()
    };
    ais.read_simple_geom(&options)
        .with_context(|| format!("failed to read points from {}", path.display()))?;
    let raw_rows = ais.raw().len();
    let mut points = ais.into_points().unwrap_or_default();

    if let Some(day) = config.day {
        let wanted = day.format("%Y-%m-%d").to_string();
        points.features.retain(|p| p.day() == wanted);
    }

    let tracks: Vec<(Option<String>, TrackTable)> = if config.by_vessel {
        generate_vessel_tracks(&points, config.tolerance)?
            .into_iter()
            .map(|(mmsi, table)| (Some(mmsi), table))
            .collect()
    } else {
        vec![(None, generate_linear_features(&points, config.tolerance)?)]
    };

    let mut out = String::new();
    let mut count = 0;
    for (mmsi, table) in &tracks {
        for segment in table.iter() {
            let key = match mmsi {
                Some(mmsi) => format!("{}/{}", mmsi, segment.key),
                None => segment.key.clone(),
            };
            out.push_str(&format!(
                "{} {} {}\n",
                path.display(),
                key,
                segment.vertex_count()
            ));
            count += 1;
        }
    }

    info!(
        "{} has {} of {} records as points, {} track segments.",
        path.display(),
        points.len(),
        raw_rows,
        count
    );

    Ok(out)
}
