// src/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings shared by the batch pipeline, loadable from a JSON file.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PipelineConfig {
    /// File-name suffix of the red band, e.g. "LC08_..._B4" in "..._B4.TIF"
    #[serde(default = "default_red_suffix")]
    pub red_suffix: String,

    /// File-name suffix of the near-infrared band
    #[serde(default = "default_nir_suffix")]
    pub nir_suffix: String,

    /// Divisor converting raw digital numbers to reflectance
    #[serde(default = "default_reflectance_scale")]
    pub reflectance_scale: f32,

    /// JPEG quality for the compressed output rasters (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Worker threads consuming the directory queue
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Name of the per-directory raster index file
    #[serde(default = "default_index_file_name")]
    pub index_file_name: String,
}

fn default_red_suffix() -> String {
    "_B4".to_string()
}

fn default_nir_suffix() -> String {
    "_B5".to_string()
}

fn default_reflectance_scale() -> f32 {
    10000.0
}

fn default_jpeg_quality() -> u8 {
    60
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_index_file_name() -> String {
    crate::index::INDEX_FILE_NAME.to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            red_suffix: default_red_suffix(),
            nir_suffix: default_nir_suffix(),
            reflectance_scale: default_reflectance_scale(),
            jpeg_quality: default_jpeg_quality(),
            workers: default_workers(),
            index_file_name: default_index_file_name(),
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Quality clamped to the range GDAL's JPEG codec accepts.
    pub fn clamped_quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }
}
