use ndarray::{Array3, Axis};
use tracing::info;

use crate::error::{MosaicError, Result};
use crate::frame::{ChannelMosaic, RgbMosaic};

/// Stack three channel mosaics into a `(3, height, width)` cube, bands ordered red, green, blue.
pub fn compose_rgb(
    red: &ChannelMosaic,
    green: &ChannelMosaic,
    blue: &ChannelMosaic,
) -> Result<RgbMosaic> {
    let (h, w) = red.shape();
    for mosaic in [green, blue] {
        if mosaic.shape() != (h, w) {
            return Err(MosaicError::ShapeMismatch {
                expected: (h, w),
                actual: mosaic.shape(),
            });
        }
    }

    let mut data = Array3::<f32>::zeros((3, h, w));
    for (band, mosaic) in [red, green, blue].into_iter().enumerate() {
        data.index_axis_mut(Axis(0), band).assign(&mosaic.data);
    }
    info!(height = h, width = w, "Composited RGB mosaic");
    Ok(RgbMosaic { data })
}
