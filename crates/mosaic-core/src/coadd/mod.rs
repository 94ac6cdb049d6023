pub mod background;
pub mod combine;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consts::DEFAULT_MIN_OVERLAP_PIXELS;
use crate::error::{MosaicError, Result};
use crate::frame::{Channel, ChannelMosaic};
use crate::reproject::ReprojectedPlane;

pub use background::{apply_corrections, pairwise_offsets, solve_corrections, OverlapOffset};
pub use combine::{combine_planes, CombineMethod};

/// Parameters for merging the reprojected planes of one channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoaddConfig {
    /// Equalise additive background levels between overlapping frames.
    pub match_background: bool,
    pub combine: CombineMethod,
    /// Overlaps smaller than this are ignored when matching backgrounds.
    pub min_overlap_pixels: usize,
}

impl Default for CoaddConfig {
    fn default() -> Self {
        Self {
            match_background: true,
            combine: CombineMethod::Mean,
            min_overlap_pixels: DEFAULT_MIN_OVERLAP_PIXELS,
        }
    }
}

/// Coadd one channel's reprojected planes into a single mosaic of `shape`.
pub fn coadd(
    mut planes: Vec<ReprojectedPlane>,
    shape: (usize, usize),
    channel: Channel,
    config: &CoaddConfig,
) -> Result<ChannelMosaic> {
    for plane in &planes {
        if plane.shape() != shape || plane.footprint.dim() != shape {
            return Err(MosaicError::ShapeMismatch {
                expected: shape,
                actual: plane.shape(),
            });
        }
    }

    if config.match_background && planes.len() > 1 {
        let offsets = pairwise_offsets(&planes, config.min_overlap_pixels.max(1));
        let corrections = solve_corrections(planes.len(), &offsets)?;
        apply_corrections(&mut planes, &corrections);
        info!(
            %channel,
            overlaps = offsets.len(),
            max_correction = corrections.iter().fold(0.0f64, |m, c| m.max(c.abs())),
            "Matched backgrounds"
        );
    }

    let (data, coverage) = combine_planes(&planes, shape, config.combine);
    let covered = coverage.iter().filter(|&&c| c > 0.0).count();
    info!(
        %channel,
        frames = planes.len(),
        method = %config.combine,
        covered,
        total = shape.0 * shape.1,
        "Coadded channel"
    );

    Ok(ChannelMosaic {
        channel,
        data,
        coverage,
    })
}

/// Median via `select_nth_unstable`; averages the two middle values for even lengths.
pub(crate) fn median(values: &mut [f32]) -> f32 {
    let n = values.len();
    match n {
        0 => 0.0,
        1 => values[0],
        _ if n % 2 == 1 => *values.select_nth_unstable_by(n / 2, |a, b| a.total_cmp(b)).1,
        _ => {
            let mid = n / 2;
            values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
            let upper = values[mid];
            let lower = values[..mid]
                .iter()
                .copied()
                .fold(f32::NEG_INFINITY, f32::max);
            (lower + upper) / 2.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::median;

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&mut Vec::new()), 0.0);
    }
}
