// src/io/writer.rs
use anyhow::Result;
use gdal::raster::{Buffer, RasterCreationOptions};
use gdal::{DriverManager, Metadata};
use std::path::Path;

use super::reader::GeoInfo;
use crate::processing::normalize::NdviRange;

/// Writes a normalized NDVI array as a single-band byte GeoTIFF with lossy
/// JPEG compression, carrying over projection and geotransform. The scene's
/// own normalization bounds are stored as band metadata so the exact inverse
/// stays recoverable from the file.
pub fn write_ndvi_raster(
    data: &[u8],
    geo_info: &GeoInfo,
    range: &NdviRange,
    output_path: &Path,
    jpeg_quality: u8,
) -> Result<()> {
    let driver = DriverManager::get_driver_by_name("GTiff")?;

    let creation_options = RasterCreationOptions::from_iter([
        "COMPRESS=JPEG".to_string(),
        format!("JPEG_QUALITY={}", jpeg_quality),
        "NUM_THREADS=ALL_CPUS".to_string(),
    ]);

    let mut out_ds = driver.create_with_band_type_with_options::<u8, _>(
        output_path,
        geo_info.width,
        geo_info.height,
        1,
        &creation_options,
    )?;

    out_ds.set_projection(&geo_info.projection)?;
    out_ds.set_geo_transform(&geo_info.geo_transform)?;

    let mut band = out_ds.rasterband(1)?;
    band.set_no_data_value(Some(0.0))?;
    band.set_description("NDVI (normalized)")?;
    band.set_metadata_item("NDVI_MIN", &format!("{}", range.min), "")?;
    band.set_metadata_item("NDVI_MAX", &format!("{}", range.max), "")?;

    let mut buffer = Buffer::new((geo_info.width, geo_info.height), data.to_vec());
    band.write(
        (0, 0),
        (geo_info.width, geo_info.height),
        &mut buffer,
    )?;

    out_ds.flush_cache()?;
    Ok(())
}
