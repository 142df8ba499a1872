#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the dispensary site suitability toolchain.
//!
//! Runs the suitability engine offline against exported `GeoJSON` layer
//! snapshots: place candidate pins from a coordinate file and print the
//! analysis report, draw standalone facility buffers, inspect the layer
//! registry, and search the address points.

use std::path::{Path, PathBuf};
use std::str::FromStr as _;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dispensary_map_dataset::local::GeoJsonSource;
use dispensary_map_dataset::{Datasets, FeatureQuery, filter, registry, search};
use dispensary_map_dataset_models::LayerId;
use dispensary_map_dataset_models::records::AddressPoint;
use dispensary_map_spatial::buildings::BuildingIndex;
use dispensary_map_suitability::BufferDistance;
use dispensary_map_suitability::buffers::{BufferBoard, BufferState, FacilityKind};
use dispensary_map_suitability::session::Session;
use geo::Point;

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// Evaluate candidate dispensary sites against the fixed zoning,
/// neighborhood, and proximity rules.
#[derive(Parser)]
#[command(name = "dispensary_map_cli")]
#[command(about = "Dispensary site suitability analysis over offline layer snapshots")]
struct Cli {
    /// Directory of `<layer_id>.geojson` snapshot files.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List the registered feature layers.
    Layers,

    /// Place pins from a coordinate file and run the suitability analysis.
    Analyze {
        /// JSON file holding an array of `[lon, lat]` pairs, one per pin.
        #[arg(long)]
        pins: PathBuf,
    },

    /// Show the distinct facility types and license statuses available
    /// for filtering the retail marijuana layer.
    Filters,

    /// Buffer every feature of a facility layer and print the result as
    /// `GeoJSON`.
    Buffer {
        /// Facility kind: marijuana, childcare, drug_treatment,
        /// public_schools, or non_public_schools.
        #[arg(long)]
        facility: String,

        /// Buffer distance in feet.
        #[arg(long)]
        distance: i64,

        /// Restrict marijuana buffers to these facility types.
        #[arg(long)]
        facility_type: Vec<String>,

        /// Restrict marijuana buffers to these license statuses.
        #[arg(long)]
        license_status: Vec<String>,
    },

    /// Search the address points.
    Search {
        /// Address text to match.
        #[arg(long)]
        query: String,

        /// Print autocomplete suggestions instead of full matches.
        #[arg(long)]
        suggest: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Layers => cmd_layers(),
        Commands::Analyze { pins } => cmd_analyze(&cli.data_dir, &pins).await,
        Commands::Filters => cmd_filters(&cli.data_dir).await,
        Commands::Buffer {
            facility,
            distance,
            facility_type,
            license_status,
        } => cmd_buffer(&cli.data_dir, &facility, distance, facility_type, license_status).await,
        Commands::Search { query, suggest } => cmd_search(&cli.data_dir, &query, suggest).await,
    }
}

/// Opens the snapshot directory as the dataset context. Every layer with
/// a snapshot present counts as shown; the rest stay hidden.
fn open_datasets(data_dir: &Path) -> Result<Arc<Datasets>, Box<dyn std::error::Error>> {
    let source = GeoJsonSource::load_dir(data_dir)?;
    let loaded = source.loaded_layers();

    let datasets = Datasets::new(Arc::new(source));
    for layer in loaded {
        datasets.set_visible(layer, true);
    }
    Ok(Arc::new(datasets))
}

// ---------------------------------------------------------------------------
// Layers command
// ---------------------------------------------------------------------------

/// Prints the layer registry.
fn cmd_layers() -> Result<(), Box<dyn std::error::Error>> {
    let layers = registry::all_layers();

    println!("{:<26} {:<36} {:<8}", "ID", "TITLE", "GEOMETRY");
    println!("{}", "-".repeat(72));
    for def in &layers {
        println!("{:<26} {:<36} {:<8?}", def.id.to_string(), def.title, def.geometry);
    }
    println!();
    println!("{} layer(s)", layers.len());

    Ok(())
}

// ---------------------------------------------------------------------------
// Analyze command
// ---------------------------------------------------------------------------

/// Places pins from the coordinate file, runs the analysis, and prints
/// the text report.
async fn cmd_analyze(data_dir: &Path, pins: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let datasets = open_datasets(data_dir)?;

    let buildings = datasets
        .query(LayerId::Buildings, &FeatureQuery::all())
        .await?;
    let index = Arc::new(BuildingIndex::from_features(&buildings));

    let coordinates: Vec<[f64; 2]> = serde_json::from_str(&std::fs::read_to_string(pins)?)?;
    if coordinates.is_empty() {
        println!("No pin coordinates in {}", pins.display());
        return Ok(());
    }

    let mut session = Session::new(datasets, index);
    session.set_placement_mode(true);

    let mut placed = 0usize;
    for &[lon, lat] in &coordinates {
        match session.place_pin(Point::new(lon, lat)) {
            Ok(pin) => {
                log::info!("Pin {} placed at ({lon}, {lat})", pin.id);
                placed += 1;
            }
            Err(rejected) => {
                // A rejected placement is a notice, not a failure; the
                // rest of the coordinate list still gets its pins.
                println!("Skipped ({lon}, {lat}): {rejected}");
            }
        }
    }

    if placed == 0 {
        println!("No pins placed; nothing to analyze.");
        return Ok(());
    }

    session.analyze().await?;
    match session.export_text() {
        Some(text) => print!("{text}"),
        None => println!("Analysis produced no report."),
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Filters command
// ---------------------------------------------------------------------------

/// Prints the distinct filter options of the retail marijuana layer.
async fn cmd_filters(data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let datasets = open_datasets(data_dir)?;
    let options = filter::load_filter_options(&datasets).await?;

    println!("Facility types:");
    for value in &options.facility_types {
        println!("  {value}");
    }
    println!();
    println!("License statuses:");
    for value in &options.license_statuses {
        println!("  {value}");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Buffer command
// ---------------------------------------------------------------------------

/// Buffers every feature of one facility layer and prints a `GeoJSON`
/// `FeatureCollection` of the buffer polygons.
async fn cmd_buffer(
    data_dir: &Path,
    facility: &str,
    distance: i64,
    facility_types: Vec<String>,
    license_statuses: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = FacilityKind::from_str(facility)
        .map_err(|_| format!("Unknown facility kind: {facility}"))?;
    let distance = BufferDistance::new(distance)?;

    let datasets = open_datasets(data_dir)?;
    let mut board = BufferBoard::new(datasets);
    board.set_filter(filter::FacilityFilter {
        facility_types,
        license_statuses,
    });

    let count = board.apply(kind, distance).await?;
    log::info!("Buffered {count} {} feature(s)", kind.label());

    let BufferState::Shown { polygons, .. } = board.state(kind) else {
        unreachable!("apply succeeded, state must be shown");
    };

    let features = polygons
        .iter()
        .map(|polygon| geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(polygon))),
            id: None,
            properties: Some(
                [
                    ("facility".to_string(), serde_json::json!(kind.to_string())),
                    (
                        "distance_feet".to_string(),
                        serde_json::json!(distance.feet()),
                    ),
                ]
                .into_iter()
                .collect(),
            ),
            foreign_members: None,
        })
        .collect();

    let collection = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    println!("{collection}");

    Ok(())
}

// ---------------------------------------------------------------------------
// Search command
// ---------------------------------------------------------------------------

/// Searches (or suggests from) the address points.
async fn cmd_search(
    data_dir: &Path,
    query: &str,
    suggest: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let datasets = open_datasets(data_dir)?;

    if suggest {
        let suggestions = search::suggest(&datasets, query).await?;
        if suggestions.is_empty() {
            println!("No suggestions for \"{query}\"");
            return Ok(());
        }
        for address in suggestions {
            println!("{address}");
        }
        return Ok(());
    }

    let matches = search::search(&datasets, query).await?;
    if matches.is_empty() {
        println!("No addresses match \"{query}\"");
        return Ok(());
    }
    for feature in &matches {
        let record = AddressPoint::from_feature(feature);
        match &feature.geometry {
            Some(geo::Geometry::Point(point)) => {
                println!("{} ({}, {})", record.full_address, point.x(), point.y());
            }
            _ => println!("{}", record.full_address),
        }
    }
    println!();
    println!("{} match(es)", matches.len());

    Ok(())
}
