pub mod interp;

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{PARALLEL_FRAME_THRESHOLD, PARALLEL_PIXEL_THRESHOLD};
use crate::error::Result;
use crate::frame::ChannelInput;
use crate::grid::CommonGrid;
use crate::wcs::Wcs;

pub use interp::{BilinearResampler, NearestResampler};

/// One input plane resampled onto the common grid.
#[derive(Clone, Debug)]
pub struct ReprojectedPlane {
    pub data: Array2<f32>,
    /// Per-pixel coverage weight in [0, 1]; 0 where the input does not reach.
    pub footprint: Array2<f32>,
}

impl ReprojectedPlane {
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Number of output pixels with non-zero weight.
    pub fn covered_pixels(&self) -> usize {
        self.footprint.iter().filter(|&&w| w > 0.0).count()
    }
}

/// Interpolation kernel used to sample an input plane at fractional positions.
///
/// Implementors only provide [`Resampler::sample`]; the coordinate mapping
/// from the grid back into the input is shared.
pub trait Resampler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sample `plane` at 0-based `(x, y)` = `(col, row)`.
    ///
    /// Returns `(value, weight)`; weight is 0 where nothing valid is in reach.
    fn sample(&self, plane: &Array2<f32>, x: f64, y: f64) -> (f32, f32);

    /// Resample `plane` (described by `wcs`) onto `grid`.
    fn resample(&self, plane: &Array2<f32>, wcs: &Wcs, grid: &CommonGrid) -> Result<ReprojectedPlane> {
        let (h, w) = grid.shape;
        let mut data = Array2::<f32>::zeros((h, w));
        let mut footprint = Array2::<f32>::zeros((h, w));

        let resample_row = |row: usize| -> (Vec<f32>, Vec<f32>) {
            let mut values = vec![0.0f32; w];
            let mut weights = vec![0.0f32; w];
            for col in 0..w {
                let Some(sky) = grid.wcs.pixel_to_world(col as f64, row as f64) else {
                    continue;
                };
                let Some((x, y)) = wcs.world_to_pixel(&sky) else {
                    continue;
                };
                let (v, weight) = self.sample(plane, x, y);
                if weight > 0.0 {
                    values[col] = v;
                    weights[col] = weight;
                }
            }
            (values, weights)
        };

        let rows: Vec<(Vec<f32>, Vec<f32>)> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
            (0..h).into_par_iter().map(resample_row).collect()
        } else {
            (0..h).map(resample_row).collect()
        };

        for (row, (values, weights)) in rows.into_iter().enumerate() {
            for col in 0..w {
                data[[row, col]] = values[col];
                footprint[[row, col]] = weights[col];
            }
        }

        Ok(ReprojectedPlane { data, footprint })
    }
}

/// Selectable resampling kernels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    #[default]
    Bilinear,
    Nearest,
}

impl Kernel {
    pub fn resampler(self) -> Box<dyn Resampler> {
        match self {
            Self::Bilinear => Box::new(BilinearResampler),
            Self::Nearest => Box::new(NearestResampler),
        }
    }
}

impl std::fmt::Display for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bilinear => write!(f, "bilinear"),
            Self::Nearest => write!(f, "nearest"),
        }
    }
}

/// Reproject every input of one channel onto `grid`, preserving input order.
pub fn reproject_channel(
    inputs: &[ChannelInput],
    grid: &CommonGrid,
    resampler: &dyn Resampler,
) -> Result<Vec<ReprojectedPlane>> {
    let reproject_one = |input: &ChannelInput| -> Result<ReprojectedPlane> {
        let plane = resampler.resample(&input.data, &input.wcs, grid)?;
        debug!(
            kernel = resampler.name(),
            covered = plane.covered_pixels(),
            "Reprojected plane"
        );
        Ok(plane)
    };

    if inputs.len() >= PARALLEL_FRAME_THRESHOLD {
        inputs.par_iter().map(reproject_one).collect()
    } else {
        inputs.iter().map(reproject_one).collect()
    }
}
