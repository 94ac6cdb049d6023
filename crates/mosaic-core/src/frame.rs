use std::path::PathBuf;

use ndarray::{Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{MosaicError, Result};
use crate::wcs::Wcs;

/// One of the three color channels of an exposure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// All channels in band order.
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    /// Index of the band holding this channel in an input cube and in the RGB mosaic.
    pub fn band_index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
        }
    }

    /// Output file stem for this channel's mosaic.
    pub fn stem(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "grn",
            Self::Blue => "blu",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.stem())
    }
}

/// A single input exposure: three equally shaped planes sharing one WCS.
#[derive(Clone, Debug)]
pub struct Frame {
    /// File the frame was loaded from.
    pub source: PathBuf,
    pub wcs: Wcs,
    /// Pixel data, row-major, shape = (height, width)
    pub red: Array2<f32>,
    pub green: Array2<f32>,
    pub blue: Array2<f32>,
}

impl Frame {
    pub fn new(
        source: PathBuf,
        wcs: Wcs,
        red: Array2<f32>,
        green: Array2<f32>,
        blue: Array2<f32>,
    ) -> Result<Self> {
        let shape = red.dim();
        for plane in [&green, &blue] {
            if plane.dim() != shape {
                return Err(MosaicError::ShapeMismatch {
                    expected: shape,
                    actual: plane.dim(),
                });
            }
        }
        Ok(Self {
            source,
            wcs,
            red,
            green,
            blue,
        })
    }

    /// (height, width) shared by all three planes.
    pub fn shape(&self) -> (usize, usize) {
        self.red.dim()
    }

    pub fn width(&self) -> usize {
        self.red.ncols()
    }

    pub fn height(&self) -> usize {
        self.red.nrows()
    }

    /// Consume the frame, handing each plane its own copy of the WCS.
    pub fn into_channels(self) -> [ChannelInput; 3] {
        let Frame {
            wcs,
            red,
            green,
            blue,
            ..
        } = self;
        [
            ChannelInput {
                data: red,
                wcs: wcs.clone(),
            },
            ChannelInput {
                data: green,
                wcs: wcs.clone(),
            },
            ChannelInput { data: blue, wcs },
        ]
    }
}

/// One frame's plane for a single channel, paired with the frame's WCS.
#[derive(Clone, Debug)]
pub struct ChannelInput {
    pub data: Array2<f32>,
    pub wcs: Wcs,
}

/// Per-channel input sets produced by splitting the loaded frames.
#[derive(Clone, Debug, Default)]
pub struct ChannelSplit {
    pub red: Vec<ChannelInput>,
    pub green: Vec<ChannelInput>,
    pub blue: Vec<ChannelInput>,
}

impl ChannelSplit {
    /// Split frames into three per-channel lists without copying pixel data.
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        let mut split = Self::default();
        for frame in frames {
            let [r, g, b] = frame.into_channels();
            split.red.push(r);
            split.green.push(g);
            split.blue.push(b);
        }
        split
    }

    pub fn take(&mut self, channel: Channel) -> Vec<ChannelInput> {
        match channel {
            Channel::Red => std::mem::take(&mut self.red),
            Channel::Green => std::mem::take(&mut self.green),
            Channel::Blue => std::mem::take(&mut self.blue),
        }
    }
}

/// Coadded result for one channel on the common grid.
#[derive(Clone, Debug)]
pub struct ChannelMosaic {
    pub channel: Channel,
    pub data: Array2<f32>,
    /// Summed footprint weight per output pixel (0 where no frame contributes).
    pub coverage: Array2<f32>,
}

impl ChannelMosaic {
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }
}

/// Three channel mosaics stacked along a leading band axis: shape = (3, height, width).
#[derive(Clone, Debug)]
pub struct RgbMosaic {
    pub data: Array3<f32>,
}

impl RgbMosaic {
    pub fn band(&self, channel: Channel) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), channel.band_index())
    }

    /// Spatial shape (height, width).
    pub fn shape(&self) -> (usize, usize) {
        let (_, h, w) = self.data.dim();
        (h, w)
    }
}
