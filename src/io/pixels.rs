// src/io/pixels.rs
use anyhow::{Context, Result};
use gdal::Dataset;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct PixelRow {
    longitude: f64,
    latitude: f64,
    value: f32,
}

/// Streams every pixel of one band as `longitude,latitude,value` CSV rows,
/// with coordinates at pixel centers in the raster's own CRS. Returns the
/// number of rows written.
pub fn export_pixel_coords(raster_path: &Path, csv_path: &Path, band_index: usize) -> Result<u64> {
    let dataset = Dataset::open(raster_path)
        .with_context(|| format!("cannot open raster {}", raster_path.display()))?;
    let gt: [f64; 6] = dataset.geo_transform()?.try_into().unwrap();
    let (width, height) = dataset.raster_size();

    let band = dataset.rasterband(band_index)?;
    let buffer = band.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
    let data = buffer.data();

    let mut writer = csv::Writer::from_path(csv_path)
        .with_context(|| format!("cannot create {}", csv_path.display()))?;

    let mut rows = 0u64;
    for row in 0..height {
        for col in 0..width {
            let (x, y) = pixel_center(&gt, col, row);
            writer.serialize(PixelRow {
                longitude: x,
                latitude: y,
                value: data[row * width + col],
            })?;
            rows += 1;
        }
    }
    writer.flush()?;
    Ok(rows)
}

fn pixel_center(gt: &[f64; 6], col: usize, row: usize) -> (f64, f64) {
    let c = col as f64 + 0.5;
    let r = row as f64 + 0.5;
    (
        gt[0] + c * gt[1] + r * gt[2],
        gt[3] + c * gt[4] + r * gt[5],
    )
}
