// src/utils/stats.rs

/// NaN-aware summary of a value collection. A collection with no finite
/// values summarizes to NaN across the board instead of erroring.
#[derive(Debug, Clone, Copy)]
pub struct Summary {
    pub min: f32,
    pub max: f32,
    pub median: f32,
    pub mean: f32,
}

impl Summary {
    pub fn nan() -> Self {
        Self {
            min: f32::NAN,
            max: f32::NAN,
            median: f32::NAN,
            mean: f32::NAN,
        }
    }
}

pub fn summarize(values: &[f32]) -> Summary {
    let mut finite: Vec<f32> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if finite.is_empty() {
        return Summary::nan();
    }

    finite.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let n = finite.len();
    let median = if n % 2 == 1 {
        finite[n / 2]
    } else {
        (finite[n / 2 - 1] + finite[n / 2]) / 2.0
    };
    let mean = finite.iter().map(|&v| v as f64).sum::<f64>() / n as f64;

    Summary {
        min: finite[0],
        max: finite[n - 1],
        median,
        mean: mean as f32,
    }
}
