// src/query/point.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use gdal::Dataset;
use log::{debug, warn};
use serde::Serialize;
use std::path::Path;

use super::geometry::{self, PixelMapper};

/// One matching raster pixel in a point time series. The value is the
/// normalized byte, exactly as stored; zero-valued (no-data) pixels never
/// appear here.
#[derive(Serialize, Debug, Clone)]
pub struct PointSample {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "File")]
    pub file: String,
    #[serde(rename = "PixelValue")]
    pub value: u8,
}

/// Samples the normalized NDVI pixel under an EPSG:4326 coordinate.
///
/// Returns `Ok(None)` when the point falls outside the raster; an absent
/// value is not an error and not a zero.
pub fn sample_normalized_ndvi(path: &Path, lon: f64, lat: f64) -> Result<Option<u8>> {
    let dataset =
        Dataset::open(path).with_context(|| format!("cannot open raster {}", path.display()))?;

    let (x, y) = match geometry::raster_srs(&dataset.projection())? {
        Some(srs) => geometry::transform_point(&geometry::wgs84()?, &srs, lon, lat)?,
        None => (lon, lat),
    };

    let gt: [f64; 6] = dataset.geo_transform()?.try_into().unwrap();
    let (width, height) = dataset.raster_size();
    let mapper = PixelMapper::new(gt, width, height)?;

    let Some((row, col)) = mapper.world_to_pixel(x, y) else {
        return Ok(None);
    };

    let band = dataset.rasterband(1)?;
    let buffer = band.read_as::<u8>((col as isize, row as isize), (1, 1), (1, 1), None)?;
    Ok(Some(buffer.data()[0]))
}

/// Scans date-named directories under `search_dir` and returns the pixel
/// value under (lat, lon) for every raster acquired in the inclusive date
/// range. Out-of-range pixels and no-data pixels are excluded; unreadable
/// rasters are logged and contribute nothing.
pub fn point_time_series(
    search_dir: &Path,
    lat: f64,
    lon: f64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<PointSample>> {
    let mut samples = Vec::new();

    for (date, dir) in super::range::scene_directories(search_dir, start, end)? {
        for raster in super::range::list_rasters(&dir)? {
            let file = raster
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            match sample_normalized_ndvi(&raster, lon, lat) {
                Ok(Some(value)) if value > 0 => {
                    debug!("{date}: {file} -> {value}");
                    samples.push(PointSample { date, file, value });
                }
                Ok(_) => {}
                Err(e) => warn!("skipping {}: {e:#}", raster.display()),
            }
        }
    }

    Ok(samples)
}
