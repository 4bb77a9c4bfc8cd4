//! Run configuration
//!
//! Every setting can come from a flag or a `GRIDZONAL_*` environment
//! variable; `main` loads an optional `.env` file before parsing.

use crate::sink::{CsvSink, JsonLinesSink, ResultSink, StdoutSink};
use crate::source::{LatestInDirectory, LocalFile, RasterSource};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use gridzonal_algorithms::alignment::OrientationMode;
use gridzonal_algorithms::pipeline::ZonalParams;
use gridzonal_algorithms::statistics::InclusionRule;
use std::path::PathBuf;

/// Serialization of the result records
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Jsonl,
}

/// Arguments of the `zonal` subcommand
#[derive(Args, Debug, Clone)]
pub struct ZonalArgs {
    /// Raster file to aggregate
    #[arg(short, long, env = "GRIDZONAL_RASTER")]
    pub raster: Option<PathBuf>,

    /// Directory holding dated rasters; the newest one is used
    #[arg(long, env = "GRIDZONAL_RASTER_DIR", conflicts_with = "raster")]
    pub raster_dir: Option<PathBuf>,

    /// Raster file extension looked for in --raster-dir
    #[arg(long, env = "GRIDZONAL_RASTER_EXT", default_value = "tif")]
    pub raster_ext: String,

    /// Polygon grid (GeoJSON FeatureCollection)
    #[arg(short, long, env = "GRIDZONAL_POLYGONS")]
    pub polygons: PathBuf,

    /// Polygon attribute holding the zone identifier
    #[arg(long, env = "GRIDZONAL_ID_FIELD", default_value = "indice_gre")]
    pub id_field: String,

    /// Cell inclusion rule: all-touched, cell-center
    #[arg(long, env = "GRIDZONAL_RULE", default_value = "all-touched")]
    pub rule: InclusionRule,

    /// Raster row order handling: detect, always, never
    #[arg(long, env = "GRIDZONAL_ORIENTATION", default_value = "detect")]
    pub orientation: OrientationMode,

    /// Output file; results go to stdout as CSV when omitted
    #[arg(short, long, env = "GRIDZONAL_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Output file format
    #[arg(long, env = "GRIDZONAL_FORMAT", value_enum, default_value = "csv")]
    pub format: OutputFormat,

    /// Category tag written in the `type` column
    #[arg(long = "type", env = "GRIDZONAL_TYPE", default_value = "temperatura_samet")]
    pub category: String,

    /// Timestamp for the `date` column (RFC 3339); defaults to the run start
    #[arg(long, env = "GRIDZONAL_DATE")]
    pub date: Option<DateTime<Utc>>,

    /// Write the raster used for aggregation, after orientation handling, to this GeoTIFF
    #[arg(long)]
    pub dump_normalized: Option<PathBuf>,

    /// Delete the raster file after a successful run
    #[arg(long)]
    pub cleanup: bool,
}

/// How the raster is located
#[derive(Debug, Clone, PartialEq)]
pub enum RasterLocation {
    File(PathBuf),
    Latest { dir: PathBuf, extension: String },
}

/// Resolved settings of one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub raster: RasterLocation,
    pub polygons: PathBuf,
    pub id_field: String,
    pub params: ZonalParams,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub category: String,
    /// Stamped on every record of the run
    pub run_date: DateTime<Utc>,
    pub dump_normalized: Option<PathBuf>,
    pub cleanup: bool,
}

impl RunConfig {
    /// Validate parsed arguments, taking `now` when no date was given
    pub fn from_args(args: ZonalArgs, now: DateTime<Utc>) -> Result<Self> {
        let raster = match (args.raster, args.raster_dir) {
            (Some(path), None) => RasterLocation::File(path),
            (None, Some(dir)) => RasterLocation::Latest {
                dir,
                extension: args.raster_ext,
            },
            (Some(_), Some(_)) => bail!("--raster and --raster-dir are mutually exclusive"),
            (None, None) => bail!("no raster given: pass --raster or --raster-dir"),
        };

        if args.id_field.trim().is_empty() {
            bail!("--id-field must not be empty");
        }

        Ok(Self {
            raster,
            polygons: args.polygons,
            id_field: args.id_field,
            params: ZonalParams {
                rule: args.rule,
                orientation: args.orientation,
            },
            output: args.output,
            format: args.format,
            category: args.category,
            run_date: args.date.unwrap_or(now),
            dump_normalized: args.dump_normalized,
            cleanup: args.cleanup,
        })
    }

    pub fn raster_source(&self) -> Box<dyn RasterSource> {
        match &self.raster {
            RasterLocation::File(path) => Box::new(LocalFile::new(path.clone())),
            RasterLocation::Latest { dir, extension } => {
                Box::new(LatestInDirectory::new(dir.clone(), extension.clone()))
            }
        }
    }

    pub fn sink(&self) -> Box<dyn ResultSink> {
        match (&self.output, self.format) {
            (None, _) => Box::new(StdoutSink),
            (Some(path), OutputFormat::Csv) => Box::new(CsvSink::new(path.clone())),
            (Some(path), OutputFormat::Jsonl) => Box::new(JsonLinesSink::new(path.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ZonalArgs,
    }

    fn parse(argv: &[&str]) -> Result<RunConfig> {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let cli = TestCli::try_parse_from(std::iter::once("gridzonal").chain(argv.iter().copied()))?;
        RunConfig::from_args(cli.args, now)
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--raster", "tmax.tif", "--polygons", "grid.geojson"]).unwrap();
        assert_eq!(config.raster, RasterLocation::File(PathBuf::from("tmax.tif")));
        assert_eq!(config.id_field, "indice_gre");
        assert_eq!(config.params, ZonalParams::default());
        assert_eq!(config.category, "temperatura_samet");
        assert_eq!(config.format, OutputFormat::Csv);
        assert_eq!(config.run_date, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert!(config.output.is_none());
        assert!(!config.cleanup);
    }

    #[test]
    fn test_all_options() {
        let config = parse(&[
            "--raster-dir",
            "incoming",
            "--raster-ext",
            "tiff",
            "-p",
            "grid.geojson",
            "--id-field",
            "codigo",
            "--rule",
            "cell-center",
            "--orientation",
            "always",
            "-o",
            "out.jsonl",
            "--format",
            "jsonl",
            "--type",
            "tmin",
            "--date",
            "2024-01-10T12:00:00Z",
            "--cleanup",
        ])
        .unwrap();

        assert_eq!(
            config.raster,
            RasterLocation::Latest {
                dir: PathBuf::from("incoming"),
                extension: "tiff".into()
            }
        );
        assert_eq!(config.params.rule, InclusionRule::CellCenter);
        assert_eq!(config.params.orientation, OrientationMode::Always);
        assert_eq!(config.format, OutputFormat::Jsonl);
        assert_eq!(config.category, "tmin");
        assert_eq!(config.run_date, Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap());
        assert!(config.cleanup);
    }

    #[test]
    fn test_raster_is_required() {
        assert!(parse(&["--polygons", "grid.geojson"]).is_err());
    }

    #[test]
    fn test_conflicting_raster_options() {
        assert!(parse(&["--raster", "a.tif", "--raster-dir", "in", "--polygons", "g.geojson"]).is_err());
    }

    #[test]
    fn test_invalid_rule_is_rejected() {
        assert!(parse(&["--raster", "a.tif", "--polygons", "g.geojson", "--rule", "majority"]).is_err());
    }
}
