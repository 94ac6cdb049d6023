use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::reproject::ReprojectedPlane;

use super::median;

/// Per-pixel rule for merging the frames that cover it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineMethod {
    /// Footprint-weighted mean.
    #[default]
    Mean,
    /// Footprint-weighted sum.
    Sum,
    Median,
    Min,
    Max,
}

impl std::fmt::Display for CombineMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mean => write!(f, "mean"),
            Self::Sum => write!(f, "sum"),
            Self::Median => write!(f, "median"),
            Self::Min => write!(f, "min"),
            Self::Max => write!(f, "max"),
        }
    }
}

/// Merge aligned planes into `(data, coverage)`.
///
/// Only contributions with positive footprint and a finite value count.
/// Uncovered pixels are 0 with coverage 0; a pixel with a single contributor
/// takes that contributor's value unchanged.
pub fn combine_planes(
    planes: &[ReprojectedPlane],
    shape: (usize, usize),
    method: CombineMethod,
) -> (Array2<f32>, Array2<f32>) {
    let (h, w) = shape;
    let n = planes.len();

    let combine_row = |row: usize| -> (Vec<f32>, Vec<f32>) {
        let mut values = Vec::with_capacity(n);
        let mut weights = Vec::with_capacity(n);
        let mut out = vec![0.0f32; w];
        let mut cov = vec![0.0f32; w];
        for col in 0..w {
            values.clear();
            weights.clear();
            for plane in planes {
                let wt = plane.footprint[[row, col]];
                let v = plane.data[[row, col]];
                if wt > 0.0 && v.is_finite() {
                    values.push(v);
                    weights.push(wt);
                }
            }
            cov[col] = weights.iter().sum();
            out[col] = combine_pixel(&mut values, &weights, method);
        }
        (out, cov)
    };

    let rows: Vec<(Vec<f32>, Vec<f32>)> = if h * w >= PARALLEL_PIXEL_THRESHOLD && n > 1 {
        (0..h).into_par_iter().map(combine_row).collect()
    } else {
        (0..h).map(combine_row).collect()
    };

    let mut data = Array2::<f32>::zeros((h, w));
    let mut coverage = Array2::<f32>::zeros((h, w));
    for (row, (out, cov)) in rows.into_iter().enumerate() {
        for col in 0..w {
            data[[row, col]] = out[col];
            coverage[[row, col]] = cov[col];
        }
    }
    (data, coverage)
}

/// `sum` weights every contributor, a lone one included; the other methods
/// return a lone contributor's value as is.
fn combine_pixel(values: &mut [f32], weights: &[f32], method: CombineMethod) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    match method {
        CombineMethod::Sum => values
            .iter()
            .zip(weights)
            .map(|(&v, &w)| v as f64 * w as f64)
            .sum::<f64>() as f32,
        _ if values.len() == 1 => values[0],
        CombineMethod::Mean => {
            let total: f64 = weights.iter().map(|&w| w as f64).sum();
            let sum: f64 = values
                .iter()
                .zip(weights)
                .map(|(&v, &w)| v as f64 * w as f64)
                .sum();
            (sum / total) as f32
        }
        CombineMethod::Median => median(values),
        CombineMethod::Min => values.iter().copied().fold(f32::INFINITY, f32::min),
        CombineMethod::Max => values.iter().copied().fold(f32::NEG_INFINITY, f32::max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_mean_favours_full_coverage() {
        let mut v = [2.0f32, 4.0];
        let w = [1.0f32, 0.5];
        let m = combine_pixel(&mut v, &w, CombineMethod::Mean);
        assert!((m - 8.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn single_contributor_is_exact() {
        for method in [
            CombineMethod::Mean,
            CombineMethod::Median,
            CombineMethod::Min,
            CombineMethod::Max,
        ] {
            let mut v = [7.25f32];
            assert_eq!(combine_pixel(&mut v, &[0.3], method), 7.25);
        }
    }

    #[test]
    fn sum_weights_a_lone_contributor() {
        let s = combine_pixel(&mut [7.25], &[0.5], CombineMethod::Sum);
        assert_eq!(s, 3.625);
        let full = combine_pixel(&mut [7.25], &[1.0], CombineMethod::Sum);
        assert_eq!(full, 7.25);
    }

    #[test]
    fn order_statistics() {
        let w = [1.0f32; 3];
        assert_eq!(combine_pixel(&mut [5.0, 1.0, 3.0], &w, CombineMethod::Median), 3.0);
        assert_eq!(combine_pixel(&mut [5.0, 1.0, 3.0], &w, CombineMethod::Min), 1.0);
        assert_eq!(combine_pixel(&mut [5.0, 1.0, 3.0], &w, CombineMethod::Max), 5.0);
    }
}
