// src/index.rs
use anyhow::{Context, Result};
use geo::BoundingRect;
use geo::Rect;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use wkt::ToWkt;

use crate::io::reader::GeoInfo;
use crate::query::geometry;

/// Default file name of the per-directory raster index.
pub const INDEX_FILE_NAME: &str = "raster_index.csv";

/// One row of a per-directory raster index: output base name plus the
/// raster's minimum bounding rectangle in EPSG:4326, serialized as WKT.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IndexRecord {
    #[serde(rename = "FileName")]
    pub file_name: String,
    #[serde(rename = "MBR")]
    pub mbr: String,
}

impl IndexRecord {
    pub fn new(file_name: String, mbr: &Rect<f64>) -> Self {
        Self {
            file_name,
            mbr: mbr.to_polygon().wkt_string(),
        }
    }
}

/// Minimum bounding rectangle of a scene in EPSG:4326, from the
/// geotransformed corners with edge densification. A raster without a
/// projection keeps its native extent.
pub fn scene_mbr(geo: &GeoInfo) -> Result<Rect<f64>> {
    let extent = geometry::raster_extent(geo);
    match geometry::raster_srs(&geo.projection)? {
        Some(srs) => geometry::reproject_rect(&extent, &srs, &geometry::wgs84()?, 24),
        None => {
            warn!("raster has no projection, indexing its native extent");
            Ok(extent)
        }
    }
}

pub fn write_index(path: &Path, records: &[IndexRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("cannot create index {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Loads an index as a name-to-rectangle map. Records whose MBR fails to
/// parse are dropped with a warning; queries treat the missing entry as
/// "must check", so a damaged index only costs speed, not correctness.
pub fn read_index(path: &Path) -> Result<HashMap<String, Rect<f64>>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("cannot read index {}", path.display()))?;
    let mut rects = HashMap::new();
    for record in reader.deserialize::<IndexRecord>() {
        let record = record?;
        match geometry::parse_wkt_polygon(&record.mbr)
            .ok()
            .and_then(|polygon| polygon.bounding_rect())
        {
            Some(rect) => {
                rects.insert(record.file_name, rect);
            }
            None => warn!(
                "dropping unparsable MBR for {} in {}",
                record.file_name,
                path.display()
            ),
        }
    }
    Ok(rects)
}
