use std::path::{Path, PathBuf};

use tracing::info;

use crate::coadd::{coadd, CoaddConfig};
use crate::error::Result;
use crate::frame::{Channel, ChannelInput, ChannelMosaic};
use crate::grid::CommonGrid;
use crate::io::fits::Card;
use crate::io::fits_writer::write_fits;
use crate::reproject::{reproject_channel, Kernel};

use super::config::MosaicConfig;
use super::types::{PipelineStage, ProgressReporter};

/// The unit of work run once per channel by the coordinator.
pub trait ChannelWorker: Send + Sync {
    /// Build and persist the mosaic for `channel` from its inputs.
    fn run(
        &self,
        channel: Channel,
        inputs: Vec<ChannelInput>,
        grid: &CommonGrid,
        reporter: &dyn ProgressReporter,
    ) -> Result<ChannelMosaic>;
}

/// Reproject, coadd, then save `<stem>.fits` into the output directory.
#[derive(Clone, Debug)]
pub struct ReprojectCoaddWorker {
    pub kernel: Kernel,
    pub coadd: CoaddConfig,
    pub output_dir: PathBuf,
}

impl ReprojectCoaddWorker {
    pub fn from_config(config: &MosaicConfig) -> Self {
        Self {
            kernel: config.reprojection.kernel,
            coadd: config.coadd.clone(),
            output_dir: config.output_dir.clone(),
        }
    }
}

impl ChannelWorker for ReprojectCoaddWorker {
    fn run(
        &self,
        channel: Channel,
        inputs: Vec<ChannelInput>,
        grid: &CommonGrid,
        reporter: &dyn ProgressReporter,
    ) -> Result<ChannelMosaic> {
        let frames = inputs.len();

        reporter.begin_stage(PipelineStage::Reprojecting(channel), Some(frames));
        let resampler = self.kernel.resampler();
        let planes = reproject_channel(&inputs, grid, resampler.as_ref())?;
        drop(inputs);
        reporter.advance(PipelineStage::Reprojecting(channel), frames);
        reporter.finish_stage(PipelineStage::Reprojecting(channel));

        reporter.begin_stage(PipelineStage::Coadding(channel), None);
        let mosaic = coadd(planes, grid.shape, channel, &self.coadd)?;
        reporter.finish_stage(PipelineStage::Coadding(channel));

        reporter.begin_stage(PipelineStage::SavingChannel(channel), None);
        let path = save_channel_mosaic(&mosaic, grid, &self.output_dir, frames)?;
        reporter.finish_stage(PipelineStage::SavingChannel(channel));

        info!(%channel, path = %path.display(), "Channel mosaic saved");
        Ok(mosaic)
    }
}

/// Write a single-channel mosaic as `<stem>.fits` with the grid's WCS.
pub fn save_channel_mosaic(
    mosaic: &ChannelMosaic,
    grid: &CommonGrid,
    dir: &Path,
    frames: usize,
) -> Result<PathBuf> {
    let path = dir.join(format!("{}.fits", mosaic.channel.stem()));
    let mut cards = grid.wcs.to_cards();
    cards.push(Card::new("CHANNEL", mosaic.channel.stem()).with_comment("color channel"));
    cards.push(Card::new("NCOMBINE", frames).with_comment("input frames"));
    write_fits(&path, &mosaic.data, &cards)?;
    Ok(path)
}
