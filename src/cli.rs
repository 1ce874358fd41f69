use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ndvi-pipeline")]
#[command(about = "Batch NDVI derivation and time-series querying for Landsat band archives")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Derive normalized NDVI rasters for every scene directory under a root
    Batch {
        /// Root directory of dated scene directories with raw band files
        input: PathBuf,

        /// Mirrored output root for normalized NDVI rasters
        output: PathBuf,

        /// Worker threads (defaults to the number of CPUs)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// JPEG compression quality for output rasters
        #[arg(short, long)]
        quality: Option<u8>,

        /// Optional JSON pipeline configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Sample the normalized NDVI pixel under a point across a date range
    QueryPoint {
        /// Root directory of dated NDVI output directories
        dir: PathBuf,

        /// Latitude in EPSG:4326
        #[arg(long)]
        lat: f64,

        /// Longitude in EPSG:4326
        #[arg(long)]
        lon: f64,

        /// Inclusive start date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Inclusive end date (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Write the CSV result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Aggregate NDVI statistics over a WKT polygon across a date range
    QueryRange {
        /// Root directory of dated NDVI output directories
        dir: PathBuf,

        /// Query polygon as a WKT string (EPSG:4326)
        #[arg(long, conflicts_with = "wkt_file")]
        wkt: Option<String>,

        /// File containing the query polygon as WKT
        #[arg(long)]
        wkt_file: Option<PathBuf>,

        /// Inclusive start date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Inclusive end date (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Write the CSV result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export per-pixel center coordinates and values of a raster band as CSV
    PixelCoords {
        /// Input raster
        input: PathBuf,

        /// Output CSV path
        #[arg(short, long, default_value = "pixel_coords.csv")]
        output: PathBuf,

        /// Band to export (1-based)
        #[arg(short, long, default_value = "1")]
        band: usize,
    },
}
