//! gridzonal CLI - per-polygon means of gridded fields

mod config;
mod sink;
mod source;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{RunConfig, ZonalArgs};
use gridzonal_algorithms::alignment::{normalize_orientation, OrientationMode};
use gridzonal_algorithms::pipeline::{ZonalParams, ZonalPipeline};
use gridzonal_core::io::{read_geotiff, read_polygons_geojson, write_geotiff, GeoTiffOptions};
use gridzonal_core::{Algorithm, PolygonLayer, Raster};
use sink::ResultRecord;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "gridzonal")]
#[command(author, version, about = "Per-polygon means of gridded fields", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Mean raster value per polygon, gap-filled, written as records
    Zonal(ZonalArgs),
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path, None)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Raster: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn read_layer(path: &Path, id_field: &str) -> Result<PolygonLayer> {
    let pb = spinner("Reading polygons...");
    let layer = read_polygons_geojson(path, id_field)
        .with_context(|| format!("Failed to read polygons {}", path.display()))?;
    pb.finish_and_clear();
    info!("Polygons: {} ({})", layer.len(), layer.crs());
    Ok(layer)
}

fn write_result(raster: &Raster<f64>, path: &Path) -> Result<()> {
    let pb = spinner("Writing normalized raster...");
    write_geotiff(raster, path, Some(GeoTiffOptions::default()))
        .context("Failed to write normalized raster")?;
    pb.finish_and_clear();
    info!("Normalized raster saved to: {}", path.display());
    Ok(())
}

// ─── Commands ───────────────────────────────────────────────────────────

fn show_info(input: &Path) -> Result<()> {
    let raster = read_raster(input)?;
    let (rows, cols) = raster.shape();
    let bounds = raster.bounds();
    let stats = raster.statistics();

    println!("File: {}", input.display());
    println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
    println!("Cell size: {}", raster.cell_size());
    println!(
        "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
        bounds.0, bounds.1, bounds.2, bounds.3
    );
    println!(
        "Row order: {}",
        if raster.transform().is_south_up() { "south-up" } else { "north-up" }
    );
    match raster.crs() {
        Some(crs) => println!("CRS: {}", crs),
        None => println!("CRS: none"),
    }
    if let Some(nodata) = raster.nodata() {
        println!("NoData: {}", nodata);
    }
    println!("\nStatistics:");
    if let Some(min) = stats.min {
        println!("  Min: {:.4}", min);
    }
    if let Some(max) = stats.max {
        println!("  Max: {:.4}", max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.4}", mean);
    }
    if !raster.is_empty() {
        println!(
            "  Valid cells: {} ({:.1}%)",
            stats.valid_count,
            100.0 * stats.valid_count as f64 / raster.len() as f64
        );
    }
    Ok(())
}

fn run_zonal(config: RunConfig) -> Result<()> {
    let start = Instant::now();

    let raster_path = config
        .raster_source()
        .resolve()
        .context("Failed to locate raster")?;
    let raster = read_raster(&raster_path)?;
    let layer = read_layer(&config.polygons, &config.id_field)?;

    let (raster, flipped) = normalize_orientation(raster, config.params.orientation);
    if flipped {
        info!("Raster rows reversed to north-up");
    }
    if let Some(path) = &config.dump_normalized {
        write_result(&raster, path)?;
    }

    // Orientation is already applied above
    let params = ZonalParams {
        orientation: OrientationMode::Never,
        ..config.params
    };
    let pb = spinner("Aggregating...");
    let table = ZonalPipeline
        .execute((raster, layer), params)
        .context("Zonal aggregation failed")?;
    pb.finish_and_clear();

    let records = ResultRecord::from_table(&table, config.run_date, &config.category);
    config
        .sink()
        .write(&records)
        .context("Failed to write results")?;
    if let Some(path) = &config.output {
        info!("{} records saved to: {}", records.len(), path.display());
    }

    if config.cleanup {
        std::fs::remove_file(&raster_path)
            .with_context(|| format!("Failed to remove {}", raster_path.display()))?;
        info!("Removed {}", raster_path.display());
    }

    info!(
        "Processing time: {:.2?} ({} polygons, {} filled)",
        start.elapsed(),
        table.len(),
        table.filled_count()
    );
    Ok(())
}

fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("Failed to load .env");
        }
    }

    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Info { input } => show_info(&input),
        Commands::Zonal(args) => run_zonal(RunConfig::from_args(args, Utc::now())?),
    }
}
