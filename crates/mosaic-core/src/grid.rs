use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::{FOOTPRINT_EDGE_SAMPLES, GRID_EDGE_TOLERANCE};
use crate::error::{MosaicError, Result};
use crate::frame::Frame;
use crate::wcs::{CelestialFrame, Projection, SkyCoord, Wcs};

/// How the common output grid is chosen.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Canonical celestial frame of the output.
    pub frame: CelestialFrame,
    pub projection: Projection,
    /// Output pixel scale in arcseconds. `None` keeps the finest input scale.
    pub resolution_arcsec: Option<f64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            frame: CelestialFrame::Galactic,
            projection: Projection::Tan,
            resolution_arcsec: None,
        }
    }
}

/// Pixel-grid extent and coordinate solution of one input, as seen by the grid resolver.
#[derive(Clone, Copy, Debug)]
pub struct FrameFootprint<'a> {
    /// (height, width)
    pub shape: (usize, usize),
    pub wcs: &'a Wcs,
}

impl Frame {
    pub fn footprint(&self) -> FrameFootprint<'_> {
        FrameFootprint {
            shape: self.shape(),
            wcs: &self.wcs,
        }
    }
}

/// Output projection plus pixel-grid shape shared by all three channels.
#[derive(Clone, Debug, PartialEq)]
pub struct CommonGrid {
    pub wcs: Wcs,
    /// (height, width)
    pub shape: (usize, usize),
}

impl CommonGrid {
    pub fn height(&self) -> usize {
        self.shape.0
    }

    pub fn width(&self) -> usize {
        self.shape.1
    }

    pub fn pixel_count(&self) -> usize {
        self.shape.0 * self.shape.1
    }

    /// Whether every sampled edge point of `footprint` falls inside the grid's pixel-edge bounds.
    pub fn covers(&self, footprint: &FrameFootprint<'_>) -> bool {
        let Ok(samples) = edge_samples(footprint, self.wcs.frame()) else {
            return false;
        };
        let (h, w) = self.shape;
        let x_max = w as f64 - 0.5 + GRID_EDGE_TOLERANCE;
        let y_max = h as f64 - 0.5 + GRID_EDGE_TOLERANCE;
        let lo = -0.5 - GRID_EDGE_TOLERANCE;
        samples.iter().all(|coord| {
            self.wcs
                .world_to_pixel(coord)
                .is_some_and(|(x, y)| x >= lo && x <= x_max && y >= lo && y <= y_max)
        })
    }
}

/// Sky positions along the pixel-edge outline of a frame, expressed in `frame`.
///
/// Corners sit at -0.5 and n-0.5 (outer pixel edges); each side also gets
/// `FOOTPRINT_EDGE_SAMPLES` evenly spaced interior points.
pub fn edge_samples(footprint: &FrameFootprint<'_>, frame: CelestialFrame) -> Result<Vec<SkyCoord>> {
    let (h, w) = footprint.shape;
    if h == 0 || w == 0 {
        return Err(MosaicError::Grid("input frame has an empty pixel grid".into()));
    }

    let (x0, x1) = (-0.5, w as f64 - 0.5);
    let (y0, y1) = (-0.5, h as f64 - 0.5);
    let steps = FOOTPRINT_EDGE_SAMPLES + 1;

    let mut pixels = Vec::with_capacity(4 * steps);
    for k in 0..steps {
        let t = k as f64 / steps as f64;
        pixels.push((x0 + t * (x1 - x0), y0));
        pixels.push((x1, y0 + t * (y1 - y0)));
        pixels.push((x1 - t * (x1 - x0), y1));
        pixels.push((x0, y1 - t * (y1 - y0)));
    }

    pixels
        .into_iter()
        .map(|(x, y)| {
            footprint
                .wcs
                .pixel_to_world(x, y)
                .map(|c| c.to_frame(frame))
                .ok_or_else(|| {
                    MosaicError::Grid(format!(
                        "pixel ({x:.1}, {y:.1}) lies outside its frame's projection domain"
                    ))
                })
        })
        .collect()
}

/// Compute the smallest grid, in the configured frame and projection, that
/// contains every input footprint.
///
/// Deterministic: identical inputs always give an identical grid.
pub fn resolve_common_grid(inputs: &[FrameFootprint<'_>], config: &GridConfig) -> Result<CommonGrid> {
    if inputs.is_empty() {
        return Err(MosaicError::Grid("no input frames".into()));
    }

    let mut samples = Vec::new();
    for footprint in inputs {
        samples.extend(edge_samples(footprint, config.frame)?);
    }

    let crval = mean_direction(&samples, config.frame)?;
    let resolution = pixel_scale(inputs, config)?;
    debug!(
        samples = samples.len(),
        lon = crval.lon,
        lat = crval.lat,
        resolution_arcsec = resolution * 3600.0,
        "Grid reference chosen"
    );

    let cd = [[-resolution, 0.0], [0.0, resolution]];
    let provisional = Wcs::new(
        config.frame,
        config.projection,
        [1.0, 1.0],
        [crval.lon, crval.lat],
        cd,
    )?;

    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for coord in &samples {
        let (x, y) = provisional.world_to_pixel(coord).ok_or_else(|| {
            MosaicError::Grid(format!(
                "({:.4}, {:.4}) cannot be represented in a {} projection centred on ({:.4}, {:.4})",
                coord.lon, coord.lat, config.projection, crval.lon, crval.lat
            ))
        })?;
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }

    let width = grid_extent(x_max - x_min)?;
    let height = grid_extent(y_max - y_min)?;

    // Move the lowest sampled edge onto the outer edge of pixel 0.
    let crpix = [0.5 - x_min, 0.5 - y_min];
    let wcs = Wcs::new(
        config.frame,
        config.projection,
        crpix,
        [crval.lon, crval.lat],
        cd,
    )?;

    let grid = CommonGrid {
        wcs,
        shape: (height, width),
    };
    info!(
        frames = inputs.len(),
        width,
        height,
        frame = %config.frame,
        projection = %config.projection,
        resolution_arcsec = resolution * 3600.0,
        "Common grid resolved"
    );
    Ok(grid)
}

fn mean_direction(samples: &[SkyCoord], frame: CelestialFrame) -> Result<SkyCoord> {
    let mut sum = [0.0f64; 3];
    for coord in samples {
        let v = coord.to_unit_vector();
        sum[0] += v[0];
        sum[1] += v[1];
        sum[2] += v[2];
    }
    let norm = (sum[0] * sum[0] + sum[1] * sum[1] + sum[2] * sum[2]).sqrt();
    if norm < 1e-12 {
        return Err(MosaicError::Grid(
            "footprints are spread over the whole sky; no reference direction".into(),
        ));
    }
    Ok(SkyCoord::from_unit_vector(
        [sum[0] / norm, sum[1] / norm, sum[2] / norm],
        frame,
    ))
}

/// Output scale in degrees per pixel.
fn pixel_scale(inputs: &[FrameFootprint<'_>], config: &GridConfig) -> Result<f64> {
    if let Some(arcsec) = config.resolution_arcsec {
        if !(arcsec.is_finite() && arcsec > 0.0) {
            return Err(MosaicError::Grid(format!(
                "resolution must be positive, got {arcsec} arcsec"
            )));
        }
        return Ok(arcsec / 3600.0);
    }

    let finest = inputs
        .iter()
        .map(|f| {
            let (sx, sy) = f.wcs.pixel_scales();
            sx.min(sy)
        })
        .fold(f64::INFINITY, f64::min);
    if !(finest.is_finite() && finest > 0.0) {
        return Err(MosaicError::Grid("inputs carry no usable pixel scale".into()));
    }
    Ok(finest)
}

fn grid_extent(span: f64) -> Result<usize> {
    if !span.is_finite() || span < 0.0 {
        return Err(MosaicError::Grid(format!("invalid footprint extent {span}")));
    }
    Ok(((span - 1e-9).ceil() as usize).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_rounds_up_but_absorbs_noise() {
        assert_eq!(grid_extent(10.0).unwrap(), 10);
        assert_eq!(grid_extent(10.0 + 1e-12).unwrap(), 10);
        assert_eq!(grid_extent(10.2).unwrap(), 11);
        assert_eq!(grid_extent(0.0).unwrap(), 1);
        assert!(grid_extent(f64::NAN).is_err());
    }

    #[test]
    fn mean_direction_of_symmetric_points() {
        let pts = [
            SkyCoord::new(10.0, 1.0, CelestialFrame::Galactic),
            SkyCoord::new(10.0, -1.0, CelestialFrame::Galactic),
        ];
        let c = mean_direction(&pts, CelestialFrame::Galactic).unwrap();
        assert!((c.lon - 10.0).abs() < 1e-9);
        assert!(c.lat.abs() < 1e-9);
    }

    #[test]
    fn antipodal_points_have_no_centre() {
        let pts = [
            SkyCoord::new(0.0, 0.0, CelestialFrame::Galactic),
            SkyCoord::new(180.0, 0.0, CelestialFrame::Galactic),
        ];
        assert!(mean_direction(&pts, CelestialFrame::Galactic).is_err());
    }
}
