// src/io/mod.rs
pub mod pixels;
pub mod reader;
pub mod writer;

pub use reader::{read_scene_bands, GeoInfo, SceneBands};
pub use writer::write_ndvi_raster;
