use std::path::Path;

use image::{ImageFormat, Rgb};

use crate::consts::EPSILON;
use crate::error::{MosaicError, Result};
use crate::frame::{Channel, RgbMosaic};

/// Common black/white points over all finite samples, so channel ratios are preserved.
fn value_range(mosaic: &RgbMosaic) -> (f32, f32) {
    let mut lo = f32::MAX;
    let mut hi = f32::MIN;
    for &v in mosaic.data.iter().filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo > hi {
        (0.0, 1.0)
    } else if hi - lo < EPSILON {
        (lo, lo + 1.0)
    } else {
        (lo, hi)
    }
}

/// Linearly map every sample into [0, 1]; row 0 of the mosaic ends up at the bottom.
fn normalized_pixels(mosaic: &RgbMosaic) -> (u32, u32, Vec<[f32; 3]>) {
    let (h, w) = mosaic.shape();
    let (lo, hi) = value_range(mosaic);
    let scale = 1.0 / (hi - lo);
    let bands = Channel::ALL.map(|c| mosaic.band(c));

    let mut pixels = Vec::with_capacity(h * w);
    for row in (0..h).rev() {
        for col in 0..w {
            let px = bands.each_ref().map(|b| {
                let v = b[[row, col]];
                if v.is_finite() {
                    ((v - lo) * scale).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            });
            pixels.push(px);
        }
    }
    (w as u32, h as u32, pixels)
}

fn buffer_error(w: u32, h: u32) -> MosaicError {
    MosaicError::Preview(format!("pixel buffer does not match {w}x{h}"))
}

/// Save the mosaic as 16-bit RGB TIFF.
pub fn save_preview_tiff(mosaic: &RgbMosaic, path: &Path) -> Result<()> {
    let (w, h, pixels) = normalized_pixels(mosaic);
    let raw: Vec<u16> = pixels
        .iter()
        .flat_map(|px| px.map(|v| (v * 65535.0) as u16))
        .collect();
    let img = image::ImageBuffer::<Rgb<u16>, Vec<u16>>::from_raw(w, h, raw)
        .ok_or_else(|| buffer_error(w, h))?;
    img.save(path)?;
    Ok(())
}

/// Save the mosaic as 8-bit RGB PNG.
pub fn save_preview_png(mosaic: &RgbMosaic, path: &Path) -> Result<()> {
    let (w, h, pixels) = normalized_pixels(mosaic);
    let raw: Vec<u8> = pixels
        .iter()
        .flat_map(|px| px.map(|v| (v * 255.0) as u8))
        .collect();
    let img = image::RgbImage::from_raw(w, h, raw).ok_or_else(|| buffer_error(w, h))?;
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save a display preview, choosing format from file extension.
pub fn save_preview(mosaic: &RgbMosaic, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => save_preview_png(mosaic, path),
        _ => save_preview_tiff(mosaic, path),
    }
}
