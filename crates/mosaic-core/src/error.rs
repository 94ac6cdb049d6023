use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::frame::Channel;

#[derive(Error, Debug)]
pub enum MosaicError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid FITS file: {0}")]
    InvalidFits(String),

    #[error("Missing FITS keyword: {0}")]
    MissingKeyword(String),

    #[error("{path}: expected at least 3 bands, found {bands}")]
    InsufficientBands { path: PathBuf, bands: usize },

    #[error("Failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: Box<MosaicError>,
    },

    #[error("WCS error: {0}")]
    Wcs(String),

    #[error("Grid resolution error: {0}")]
    Grid(String),

    #[error("Background matching failed: {0}")]
    Background(String),

    #[error("No input frames found")]
    EmptyFrameSet,

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Channel {channel} did not finish within {timeout:?}")]
    ChannelTimeout { channel: Channel, timeout: Duration },

    #[error("Channel {channel} failed: {reason}")]
    ChannelFailed { channel: Channel, reason: String },

    #[error("Channel {channel} failed: {source}")]
    ChannelError {
        channel: Channel,
        #[source]
        source: Box<MosaicError>,
    },

    #[error("Preview export failed: {0}")]
    Preview(String),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MosaicError>;
