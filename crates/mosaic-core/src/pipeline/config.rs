use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::coadd::CoaddConfig;
use crate::consts::DEFAULT_CHANNEL_TIMEOUT_SECS;
use crate::error::{MosaicError, Result};
use crate::grid::GridConfig;
use crate::reproject::Kernel;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MosaicConfig {
    /// Directory holding the input FITS cubes.
    pub input_dir: PathBuf,
    /// Where `red.fits`, `grn.fits`, `blu.fits` and `rgb.fits` are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Deadline for all three channel pipelines, measured from dispatch.
    #[serde(default = "default_channel_timeout_secs")]
    pub channel_timeout_secs: u64,
    /// Optional PNG/TIFF preview of the RGB mosaic.
    #[serde(default)]
    pub preview: Option<PathBuf>,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub reprojection: ReprojectionConfig,
    #[serde(default)]
    pub coadd: CoaddConfig,
}

impl MosaicConfig {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            ..Self::default()
        }
    }

    pub fn channel_timeout(&self) -> Duration {
        Duration::from_secs(self.channel_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel_timeout_secs == 0 {
            return Err(MosaicError::Config(
                "channel_timeout_secs must be at least 1".into(),
            ));
        }
        if let Some(res) = self.grid.resolution_arcsec {
            if !(res.is_finite() && res > 0.0) {
                return Err(MosaicError::Config(format!(
                    "grid.resolution_arcsec must be positive, got {res}"
                )));
            }
        }
        if self.coadd.min_overlap_pixels == 0 {
            return Err(MosaicError::Config(
                "coadd.min_overlap_pixels must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: default_output_dir(),
            channel_timeout_secs: DEFAULT_CHANNEL_TIMEOUT_SECS,
            preview: None,
            grid: GridConfig::default(),
            reprojection: ReprojectionConfig::default(),
            coadd: CoaddConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReprojectionConfig {
    #[serde(default)]
    pub kernel: Kernel,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_channel_timeout_secs() -> u64 {
    DEFAULT_CHANNEL_TIMEOUT_SECS
}
