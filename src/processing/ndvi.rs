// src/processing/ndvi.rs
use rayon::prelude::*;

/// Elementwise (NIR - RED) / (NIR + RED).
///
/// A zero denominator yields NaN for that pixel; with reflectance inputs this
/// happens exactly where both bands are zero. Pure function, no side effects.
pub fn calculate_ndvi(red: &[f32], nir: &[f32]) -> Vec<f32> {
    assert_eq!(red.len(), nir.len(), "band arrays must have the same shape");

    let mut result = vec![0.0f32; red.len()];
    result
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, value)| {
            let sum = nir[i] + red[i];
            *value = if sum == 0.0 {
                f32::NAN
            } else {
                (nir[i] - red[i]) / sum
            };
        });
    result
}
