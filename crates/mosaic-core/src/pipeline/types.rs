use std::path::PathBuf;

use crate::error::{MosaicError, Result};
use crate::frame::{Channel, ChannelMosaic, RgbMosaic};
use crate::grid::CommonGrid;

/// Pipeline processing stage, used for progress reporting.
///
/// Per-channel stages carry their channel because the three channel
/// pipelines run concurrently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Loading,
    ResolvingGrid,
    SplittingChannels,
    Reprojecting(Channel),
    Coadding(Channel),
    SavingChannel(Channel),
    Compositing,
    Writing,
}

impl PipelineStage {
    /// Channel this stage belongs to, if any.
    pub fn channel(&self) -> Option<Channel> {
        match self {
            Self::Reprojecting(c) | Self::Coadding(c) | Self::SavingChannel(c) => Some(*c),
            _ => None,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading frames"),
            Self::ResolvingGrid => write!(f, "Resolving common grid"),
            Self::SplittingChannels => write!(f, "Splitting channels"),
            Self::Reprojecting(c) => write!(f, "Reprojecting {c}"),
            Self::Coadding(c) => write!(f, "Coadding {c}"),
            Self::SavingChannel(c) => write!(f, "Saving {c}"),
            Self::Compositing => write!(f, "Compositing RGB"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. Channel workers call it from their own threads, so several
/// stages may be active at once. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A stage has started. `total_items` is the number of work items in it
    /// (e.g., frame count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// `items_done` work items of `stage` have completed.
    fn advance(&self, _stage: PipelineStage, _items_done: usize) {}

    /// `stage` is finished.
    fn finish_stage(&self, _stage: PipelineStage) {}
}

/// No-op progress reporter.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// The three single-channel mosaics, in band order.
#[derive(Clone, Debug)]
pub struct ChannelResults {
    pub red: ChannelMosaic,
    pub green: ChannelMosaic,
    pub blue: ChannelMosaic,
}

impl ChannelResults {
    /// Assemble from per-band slots; every slot must be filled.
    pub fn from_slots(slots: [Option<ChannelMosaic>; 3]) -> Result<Self> {
        match slots {
            [Some(red), Some(green), Some(blue)] => Ok(Self { red, green, blue }),
            slots => {
                let channel = Channel::ALL
                    .into_iter()
                    .find(|c| slots[c.band_index()].is_none())
                    .unwrap_or(Channel::Red);
                Err(MosaicError::ChannelFailed {
                    channel,
                    reason: "no result was produced".into(),
                })
            }
        }
    }

    pub fn get(&self, channel: Channel) -> &ChannelMosaic {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
        }
    }
}

/// Everything a mosaic run produced.
#[derive(Clone, Debug)]
pub struct MosaicOutput {
    pub frame_count: usize,
    pub grid: CommonGrid,
    pub channels: ChannelResults,
    pub rgb: RgbMosaic,
    /// Files written after the channel stage (composite, then preview).
    pub written: Vec<PathBuf>,
}
