// src/query/range.rs
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use gdal::raster::GdalDataType;
use gdal::Dataset;
use geo::{BoundingRect, Contains, Intersects, Point, Polygon, Rect};
use log::{debug, error, info};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::geometry::{self, PixelMapper};
use crate::index;
use crate::io::reader::GeoInfo;
use crate::processing::normalize;
use crate::utils::{dates, stats};

/// Per-date NDVI aggregate over the query region. A date whose region
/// contains no surviving pixels reports NaN across all four statistics.
#[derive(Serialize, Debug, Clone)]
pub struct DateStats {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "NDVI_MIN")]
    pub min: f32,
    #[serde(rename = "NDVI_MAX")]
    pub max: f32,
    #[serde(rename = "NDVI_MEDIAN")]
    pub median: f32,
    #[serde(rename = "NDVI_MEAN")]
    pub mean: f32,
}

/// Date-named subdirectories of `search_dir` whose date falls in the
/// inclusive range, sorted by date. Directories that do not parse as dates
/// are ignored.
pub fn scene_directories(
    search_dir: &Path,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<(NaiveDate, PathBuf)>> {
    let mut directories = Vec::new();
    let entries = std::fs::read_dir(search_dir)
        .with_context(|| format!("cannot list {}", search_dir.display()))?;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        match dates::parse_scene_date(&name) {
            Some(date) if dates::in_range(date, start, end) => {
                directories.push((date, entry.path()));
            }
            Some(_) => {}
            None => debug!("ignoring non-date directory {name}"),
        }
    }
    directories.sort_by_key(|(date, _)| *date);
    Ok(directories)
}

/// TIFF rasters directly inside a directory, sorted by name.
pub fn list_rasters(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut rasters = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("cannot list {}", dir.display()))? {
        let path = entry?.path();
        let is_tif = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("tif"))
            .unwrap_or(false);
        if is_tif {
            rasters.push(path);
        }
    }
    rasters.sort();
    Ok(rasters)
}

/// Normalized byte values of all pixels inside the polygon (EPSG:4326).
/// No-data pixels (value 0) are discarded. Only the window under the
/// polygon's bounding rectangle is read.
pub fn clip_polygon_values(path: &Path, polygon: &Polygon<f64>) -> Result<Vec<u8>> {
    let dataset =
        Dataset::open(path).with_context(|| format!("cannot open raster {}", path.display()))?;

    let band = dataset.rasterband(1)?;
    if band.band_type() != GdalDataType::UInt8 {
        bail!("not a normalized NDVI raster (band type {:?})", band.band_type());
    }

    let (width, height) = dataset.raster_size();
    let geo = GeoInfo {
        projection: dataset.projection(),
        geo_transform: dataset.geo_transform()?.try_into().unwrap(),
        width,
        height,
    };

    // Bring the query geometry into the raster's CRS.
    let polygon = match geometry::raster_srs(&geo.projection)? {
        Some(srs) => geometry::reproject_polygon(polygon, &geometry::wgs84()?, &srs)?,
        None => polygon.clone(),
    };

    let Some(bbox) = polygon.bounding_rect() else {
        return Ok(Vec::new());
    };
    if !bbox.intersects(&geometry::raster_extent(&geo)) {
        return Ok(Vec::new());
    }

    let mapper = PixelMapper::new(geo.geo_transform, width, height)?;

    // Pixel window covering the polygon's bounding rectangle, clamped to the
    // raster. Taking min/max over all four corners keeps this valid for
    // rotated geotransforms.
    let corners = [
        (bbox.min().x, bbox.min().y),
        (bbox.min().x, bbox.max().y),
        (bbox.max().x, bbox.min().y),
        (bbox.max().x, bbox.max().y),
    ];
    let (mut row_min, mut col_min) = (f64::INFINITY, f64::INFINITY);
    let (mut row_max, mut col_max) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (x, y) in corners {
        let (row, col) = mapper.world_to_pixel_f(x, y);
        row_min = row_min.min(row);
        col_min = col_min.min(col);
        row_max = row_max.max(row);
        col_max = col_max.max(col);
    }
    let row_start = row_min.floor().max(0.0) as usize;
    let col_start = col_min.floor().max(0.0) as usize;
    let row_end = (row_max.ceil() as usize).min(height.saturating_sub(1));
    let col_end = (col_max.ceil() as usize).min(width.saturating_sub(1));
    if row_start > row_end || col_start > col_end {
        return Ok(Vec::new());
    }

    let window_width = col_end - col_start + 1;
    let window_height = row_end - row_start + 1;
    let buffer = band.read_as::<u8>(
        (col_start as isize, row_start as isize),
        (window_width, window_height),
        (window_width, window_height),
        None,
    )?;
    let data = buffer.data();

    let mut values = Vec::new();
    for row in 0..window_height {
        for col in 0..window_width {
            let value = data[row * window_width + col];
            if value == 0 {
                continue;
            }
            let (x, y) = mapper.pixel_center(row_start + row, col_start + col);
            if polygon.contains(&Point::new(x, y)) {
                values.push(value);
            }
        }
    }
    Ok(values)
}

/// Aggregates NDVI statistics per date over a WKT polygon region.
///
/// The per-directory raster index prunes rasters whose bounding rectangle
/// cannot intersect the query; a raster missing from the index is always
/// checked, so the pre-filter can never drop a true match. Byte values are
/// converted back to float NDVI with the fixed-range inverse before
/// aggregation, matching the original behavior (see
/// [`normalize::denormalize`]).
pub fn range_time_series(
    search_dir: &Path,
    wkt_string: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DateStats>> {
    let polygon = geometry::parse_wkt_polygon(wkt_string)?;
    let query_bbox = polygon.bounding_rect();

    let mut series = Vec::new();
    for (date, dir) in scene_directories(search_dir, start, end)? {
        let index = load_index(&dir);

        let mut values: Vec<u8> = Vec::new();
        for raster in list_rasters(&dir)? {
            if pruned_by_index(&raster, &index, query_bbox.as_ref()) {
                continue;
            }
            match clip_polygon_values(&raster, &polygon) {
                Ok(clipped) => {
                    debug!("{}: {} pixels in region", raster.display(), clipped.len());
                    values.extend(clipped);
                }
                Err(e) => error!("{}: {e:#}, contributes nothing", raster.display()),
            }
        }

        let ndvi: Vec<f32> = values.into_iter().map(normalize::denormalize).collect();
        let summary = stats::summarize(&ndvi);
        series.push(DateStats {
            date,
            min: summary.min,
            max: summary.max,
            median: summary.median,
            mean: summary.mean,
        });
    }

    info!("aggregated {} dates", series.len());
    Ok(series)
}

fn load_index(dir: &Path) -> HashMap<String, Rect<f64>> {
    let path = dir.join(index::INDEX_FILE_NAME);
    if !path.is_file() {
        debug!("no raster index in {}", dir.display());
        return HashMap::new();
    }
    match index::read_index(&path) {
        Ok(rects) => rects,
        Err(e) => {
            error!("unreadable index {}: {e:#}", path.display());
            HashMap::new()
        }
    }
}

fn pruned_by_index(
    raster: &Path,
    index: &HashMap<String, Rect<f64>>,
    query_bbox: Option<&Rect<f64>>,
) -> bool {
    let Some(query_bbox) = query_bbox else {
        return false;
    };
    let Some(stem) = raster.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
        return false;
    };
    match index.get(&stem) {
        Some(mbr) if !mbr.intersects(query_bbox) => {
            debug!("{}: outside query bounds, skipped", raster.display());
            true
        }
        _ => false,
    }
}
