// src/io/reader.rs
use gdal::Dataset;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Geospatial metadata shared by a co-registered band pair.
#[derive(Debug, Clone)]
pub struct GeoInfo {
    pub projection: String,
    pub geo_transform: [f64; 6],
    pub width: usize,
    pub height: usize,
}

/// A loaded red/near-infrared pair in reflectance units.
pub struct SceneBands {
    pub red: Vec<f32>,
    pub nir: Vec<f32>,
    pub geo: GeoInfo,
}

/// Precondition failures that make a single scene unusable. Callers log the
/// error and skip the scene; none of these abort the surrounding run.
#[derive(Debug, Error)]
pub enum BandError {
    #[error("cannot open band {path}: {source}")]
    Open {
        path: PathBuf,
        source: gdal::errors::GdalError,
    },
    #[error("band sizes differ: red {red:?}, nir {nir:?}")]
    SizeMismatch {
        red: (usize, usize),
        nir: (usize, usize),
    },
    #[error("geotransform of the bands does not match")]
    GeoTransformMismatch,
    #[error("projection of the bands does not match")]
    ProjectionMismatch,
    #[error("failed to read band data: {0}")]
    Read(#[from] gdal::errors::GdalError),
}

/// Opens a co-registered red/nir pair, validates that geotransform and
/// projection are identical, and scales raw digital numbers to reflectance.
pub fn read_scene_bands(
    red_path: &Path,
    nir_path: &Path,
    reflectance_scale: f32,
) -> Result<SceneBands, BandError> {
    let red_ds = Dataset::open(red_path).map_err(|source| BandError::Open {
        path: red_path.to_path_buf(),
        source,
    })?;
    let nir_ds = Dataset::open(nir_path).map_err(|source| BandError::Open {
        path: nir_path.to_path_buf(),
        source,
    })?;

    let red_size = red_ds.raster_size();
    let nir_size = nir_ds.raster_size();
    if red_size != nir_size {
        return Err(BandError::SizeMismatch {
            red: red_size,
            nir: nir_size,
        });
    }

    let red_gt: [f64; 6] = red_ds.geo_transform()?.try_into().unwrap();
    let nir_gt: [f64; 6] = nir_ds.geo_transform()?.try_into().unwrap();
    if red_gt != nir_gt {
        return Err(BandError::GeoTransformMismatch);
    }

    let projection = red_ds.projection();
    if projection != nir_ds.projection() {
        return Err(BandError::ProjectionMismatch);
    }

    let (width, height) = red_size;
    let red = read_reflectance(&red_ds, width, height, reflectance_scale)?;
    let nir = read_reflectance(&nir_ds, width, height, reflectance_scale)?;

    Ok(SceneBands {
        red,
        nir,
        geo: GeoInfo {
            projection,
            geo_transform: red_gt,
            width,
            height,
        },
    })
}

fn read_reflectance(
    dataset: &Dataset,
    width: usize,
    height: usize,
    reflectance_scale: f32,
) -> Result<Vec<f32>, gdal::errors::GdalError> {
    let band = dataset.rasterband(1)?;
    let buffer = band.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
    let mut data = buffer.data().to_vec();
    data.par_iter_mut().for_each(|value| {
        *value /= reflectance_scale;
    });
    Ok(data)
}
