use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use mosaic_core::coadd::CombineMethod;
use mosaic_core::reproject::Kernel;
use mosaic_core::wcs::{CelestialFrame, Projection};

#[derive(Parser)]
#[command(name = "mosaic", about = "Build an RGB sky mosaic from WCS-solved FITS cubes")]
#[command(version)]
pub struct Cli {
    /// Directory of input FITS files (one 3-band cube per file)
    #[arg(required_unless_present = "dump_config")]
    pub image_dir: Option<PathBuf>,

    /// Mosaic config file (TOML); flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for red.fits, grn.fits, blu.fits and rgb.fits
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Celestial frame of the output grid
    #[arg(long, value_enum)]
    pub frame: Option<FrameArg>,

    /// Projection of the output grid
    #[arg(long, value_enum)]
    pub projection: Option<ProjectionArg>,

    /// Output pixel scale in arcseconds (default: finest input scale)
    #[arg(long)]
    pub resolution: Option<f64>,

    /// Resampling kernel
    #[arg(long, value_enum)]
    pub kernel: Option<KernelArg>,

    /// How overlapping pixels are combined
    #[arg(long, value_enum)]
    pub combine: Option<CombineArg>,

    /// Skip background-level matching between overlapping frames
    #[arg(long)]
    pub no_match_background: bool,

    /// Minimum shared pixels before two frames are background-matched
    #[arg(long)]
    pub min_overlap: Option<usize>,

    /// Deadline in seconds for the three channel pipelines
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Also save a linear preview image (.png or .tiff)
    #[arg(long)]
    pub preview: Option<PathBuf>,

    /// Only load the inputs and report the common grid
    #[arg(long)]
    pub grid_only: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub dump_config: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FrameArg {
    Galactic,
    Equatorial,
}

impl From<FrameArg> for CelestialFrame {
    fn from(arg: FrameArg) -> Self {
        match arg {
            FrameArg::Galactic => CelestialFrame::Galactic,
            FrameArg::Equatorial => CelestialFrame::Equatorial,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ProjectionArg {
    Tan,
    Sin,
    Arc,
    Zea,
    Stg,
}

impl From<ProjectionArg> for Projection {
    fn from(arg: ProjectionArg) -> Self {
        match arg {
            ProjectionArg::Tan => Projection::Tan,
            ProjectionArg::Sin => Projection::Sin,
            ProjectionArg::Arc => Projection::Arc,
            ProjectionArg::Zea => Projection::Zea,
            ProjectionArg::Stg => Projection::Stg,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KernelArg {
    Bilinear,
    Nearest,
}

impl From<KernelArg> for Kernel {
    fn from(arg: KernelArg) -> Self {
        match arg {
            KernelArg::Bilinear => Kernel::Bilinear,
            KernelArg::Nearest => Kernel::Nearest,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CombineArg {
    Mean,
    Sum,
    Median,
    Min,
    Max,
}

impl From<CombineArg> for CombineMethod {
    fn from(arg: CombineArg) -> Self {
        match arg {
            CombineArg::Mean => CombineMethod::Mean,
            CombineArg::Sum => CombineMethod::Sum,
            CombineArg::Median => CombineMethod::Median,
            CombineArg::Min => CombineMethod::Min,
            CombineArg::Max => CombineMethod::Max,
        }
    }
}
