#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3, Axis};

use mosaic_core::consts::FITS_BLOCK_SIZE;
use mosaic_core::frame::ChannelInput;
use mosaic_core::io::fits::Card;
use mosaic_core::io::fits_writer::write_fits;
use mosaic_core::wcs::{CelestialFrame, Projection, Wcs};

/// One arcsecond in degrees.
pub const ARCSEC: f64 = 1.0 / 3600.0;

/// North-up, east-left TAN solution with square pixels of `scale_deg`.
pub fn tan_wcs(frame: CelestialFrame, crpix: [f64; 2], crval: [f64; 2], scale_deg: f64) -> Wcs {
    Wcs::new(
        frame,
        Projection::Tan,
        crpix,
        crval,
        [[-scale_deg, 0.0], [0.0, scale_deg]],
    )
    .unwrap()
}

/// Same as [`tan_wcs`] but rotated by `degrees` on the sky.
pub fn rotated_wcs(
    frame: CelestialFrame,
    crpix: [f64; 2],
    crval: [f64; 2],
    scale_deg: f64,
    degrees: f64,
) -> Wcs {
    let (s, c) = degrees.to_radians().sin_cos();
    Wcs::new(
        frame,
        Projection::Tan,
        crpix,
        crval,
        [[-scale_deg * c, -scale_deg * s], [-scale_deg * s, scale_deg * c]],
    )
    .unwrap()
}

/// (3, h, w) cube with each band constant.
pub fn constant_cube(h: usize, w: usize, values: [f32; 3]) -> Array3<f32> {
    let mut cube = Array3::<f32>::zeros((3, h, w));
    for (band, v) in values.iter().enumerate() {
        cube.index_axis_mut(Axis(0), band).fill(*v);
    }
    cube
}

/// Plane whose value encodes its position: `row * 100 + col`.
pub fn ramp_plane(h: usize, w: usize) -> Array2<f32> {
    Array2::from_shape_fn((h, w), |(r, c)| (r * 100 + c) as f32)
}

pub fn channel_input(data: Array2<f32>, wcs: &Wcs) -> ChannelInput {
    ChannelInput {
        data,
        wcs: wcs.clone(),
    }
}

/// Write a cube as `dir/name` carrying `wcs` in its header.
pub fn write_cube(dir: &Path, name: &str, cube: &Array3<f32>, wcs: &Wcs) -> PathBuf {
    let path = dir.join(name);
    let mut cards = wcs.to_cards();
    cards.push(Card::new("OBJECT", "synthetic"));
    write_fits(&path, cube, &cards).unwrap();
    path
}

/// Raw FITS bytes from header cards and an already-encoded data unit.
pub fn fits_bytes(cards: &[Card], data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    for card in cards {
        buf.extend_from_slice(&card.to_record());
    }
    let mut end = [b' '; 80];
    end[..3].copy_from_slice(b"END");
    buf.extend_from_slice(&end);
    while buf.len() % FITS_BLOCK_SIZE != 0 {
        buf.push(b' ');
    }
    buf.extend_from_slice(data);
    while buf.len() % FITS_BLOCK_SIZE != 0 {
        buf.push(0);
    }
    buf
}
