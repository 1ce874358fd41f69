// src/main.rs
use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::PathBuf;

use ndvi_pipeline::cli::{Cli, Commands};
use ndvi_pipeline::config::PipelineConfig;
use ndvi_pipeline::io::pixels;
use ndvi_pipeline::pipeline::BatchPipeline;
use ndvi_pipeline::query::{point_time_series, range_time_series};

fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Batch {
            input,
            output,
            threads,
            quality,
            config,
        } => {
            let mut config = match config {
                Some(path) => PipelineConfig::from_file(&path)?,
                None => PipelineConfig::default(),
            };
            if let Some(threads) = threads {
                config.workers = threads;
            }
            if let Some(quality) = quality {
                config.jpeg_quality = quality;
            }

            let summary = BatchPipeline::new(config).run(&input, &output)?;
            println!(
                "Processing complete: {} scenes written, {} skipped, {} failed across {} directories",
                summary.scenes_written,
                summary.scenes_skipped,
                summary.scenes_failed,
                summary.directories
            );
        }

        Commands::QueryPoint {
            dir,
            lat,
            lon,
            start,
            end,
            output,
        } => {
            let samples = point_time_series(&dir, lat, lon, start, end)?;
            write_rows(&samples, output.as_ref())?;
        }

        Commands::QueryRange {
            dir,
            wkt,
            wkt_file,
            start,
            end,
            output,
        } => {
            let wkt = match (wkt, wkt_file) {
                (Some(wkt), _) => wkt,
                (None, Some(path)) => fs::read_to_string(&path)
                    .with_context(|| format!("cannot read WKT file {}", path.display()))?,
                (None, None) => bail!("provide the query region via --wkt or --wkt-file"),
            };
            let series = range_time_series(&dir, &wkt, start, end)?;
            write_rows(&series, output.as_ref())?;
        }

        Commands::PixelCoords {
            input,
            output,
            band,
        } => {
            let rows = pixels::export_pixel_coords(&input, &output, band)?;
            println!("Wrote {} pixel rows to {}", rows, output.display());
        }
    }

    Ok(())
}

fn write_rows<T: Serialize>(rows: &[T], output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            let mut writer = csv::Writer::from_path(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        None => {
            let mut writer = csv::Writer::from_writer(io::stdout());
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}
