use std::path::{Path, PathBuf};

use ndarray::{Axis, Ix3};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::consts::{COLOR_CHANNEL_COUNT, PARALLEL_FRAME_THRESHOLD};
use crate::error::{MosaicError, Result};
use crate::frame::{Channel, Frame};
use crate::io::fits::read_fits;
use crate::wcs::Wcs;

/// Every non-directory entry of `dir`, sorted by name.
pub fn list_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Load every input in `dir`. Any unreadable or malformed file aborts the whole load.
pub fn load_frames(dir: &Path) -> Result<Vec<Frame>> {
    let paths = list_inputs(dir)?;
    if paths.is_empty() {
        return Err(MosaicError::EmptyFrameSet);
    }
    info!(count = paths.len(), dir = %dir.display(), "Loading frames");

    let load = |path: &PathBuf| {
        load_frame(path).map_err(|e| MosaicError::Load {
            path: path.clone(),
            source: Box::new(e),
        })
    };

    if paths.len() >= PARALLEL_FRAME_THRESHOLD {
        paths.par_iter().map(load).collect()
    } else {
        paths.iter().map(load).collect()
    }
}

/// Load one multi-band FITS cube: bands 0, 1, 2 become red, green, blue.
pub fn load_frame(path: &Path) -> Result<Frame> {
    let image = read_fits(path)?;
    let wcs = Wcs::from_header(&image.header)?;

    let bands = match image.data.ndim() {
        3 => image.data.shape()[0],
        2 => 1,
        _ => 0,
    };
    if image.data.ndim() != 3 || bands < COLOR_CHANNEL_COUNT {
        return Err(MosaicError::InsufficientBands {
            path: path.to_path_buf(),
            bands,
        });
    }

    let cube = image
        .data
        .into_dimensionality::<Ix3>()
        .map_err(|e| MosaicError::InvalidFits(e.to_string()))?;
    let plane = |channel: Channel| cube.index_axis(Axis(0), channel.band_index()).to_owned();

    let frame = Frame::new(
        path.to_path_buf(),
        wcs,
        plane(Channel::Red),
        plane(Channel::Green),
        plane(Channel::Blue),
    )?;
    debug!(
        path = %path.display(),
        width = frame.width(),
        height = frame.height(),
        bands,
        frame = %frame.wcs.frame(),
        projection = %frame.wcs.projection(),
        "Loaded frame"
    );
    Ok(frame)
}
