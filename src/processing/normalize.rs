// src/processing/normalize.rs
use rayon::prelude::*;

/// The value range an NDVI array was normalized from. Needed to invert the
/// normalization exactly, since the bounds are per-scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NdviRange {
    pub min: f32,
    pub max: f32,
}

impl NdviRange {
    /// The fixed unit range the original denormalization helper assumes.
    pub const UNIT: NdviRange = NdviRange { min: 0.0, max: 1.0 };
}

/// Rescales a float NDVI array linearly from its own [min, max] to [1, 255],
/// rounding to nearest. NaNs map to the no-data sentinel 0.
///
/// A degenerate range (every finite value equal) maps all finite values to
/// 255, so a constant scene still exports a single distinct non-zero byte.
/// Returns the byte array together with the range it was scaled from.
pub fn normalize_ndvi(ndvi: &[f32]) -> (Vec<u8>, NdviRange) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &value in ndvi {
        if value.is_nan() {
            continue;
        }
        min = min.min(value);
        max = max.max(value);
    }

    if !min.is_finite() {
        // All NaN: nothing to scale, every pixel is no-data.
        return (vec![0u8; ndvi.len()], NdviRange {
            min: f32::NAN,
            max: f32::NAN,
        });
    }

    let range = NdviRange { min, max };
    let span = max - min;

    let data = ndvi
        .par_iter()
        .map(|&value| {
            if value.is_nan() {
                return 0u8;
            }
            let scaled = if span == 0.0 {
                255.0
            } else {
                1.0 + (value - min) * 254.0 / span
            };
            let rounded = scaled.round();
            if rounded <= 0.0 {
                0
            } else {
                rounded.min(255.0) as u8
            }
        })
        .collect();

    (data, range)
}

/// Exact inverse of [`normalize_ndvi`] for a non-zero byte, given the range
/// the scene was actually normalized from.
pub fn denormalize_with(value: u8, range: &NdviRange) -> f32 {
    range.min + (f32::from(value) - 1.0) / 254.0 * (range.max - range.min)
}

/// Inverse assuming the fixed unit range [0, 1].
///
/// The exporter normalizes from each scene's own [min, max], so this is only
/// correct for a scene whose range happened to be exactly [0, 1]. The
/// time-series aggregation uses it anyway, matching the original behavior;
/// the discrepancy is asserted by tests rather than silently repaired.
pub fn denormalize(value: u8) -> f32 {
    denormalize_with(value, &NdviRange::UNIT)
}
