use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::composite::compose_rgb;
use crate::consts::RGB_OUTPUT_STEM;
use crate::error::Result;
use crate::frame::{ChannelSplit, Frame, RgbMosaic};
use crate::grid::{resolve_common_grid, CommonGrid, FrameFootprint};
use crate::io::fits::Card;
use crate::io::fits_writer::write_fits;
use crate::io::loader::load_frames;
use crate::io::preview::save_preview;

use super::channel::{ChannelWorker, ReprojectCoaddWorker};
use super::config::MosaicConfig;
use super::coordinator::dispatch_channels;
use super::types::{MosaicOutput, NoOpReporter, PipelineStage, ProgressReporter};

/// Load the inputs and resolve the grid without reprojecting anything.
pub fn plan_grid(config: &MosaicConfig) -> Result<(Vec<Frame>, CommonGrid)> {
    let frames = load_frames(&config.input_dir)?;
    let footprints: Vec<FrameFootprint<'_>> = frames.iter().map(Frame::footprint).collect();
    let grid = resolve_common_grid(&footprints, &config.grid)?;
    Ok((frames, grid))
}

/// Run the full mosaic pipeline with a thread-safe progress reporter.
pub fn run_mosaic_reported(
    config: &MosaicConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<MosaicOutput> {
    let worker = Arc::new(ReprojectCoaddWorker::from_config(config));
    run_mosaic_with_worker(config, worker, reporter)
}

/// Run the full mosaic pipeline.
pub fn run_mosaic(config: &MosaicConfig) -> Result<MosaicOutput> {
    run_mosaic_reported(config, Arc::new(NoOpReporter))
}

/// Run the pipeline with a custom per-channel worker.
pub fn run_mosaic_with_worker(
    config: &MosaicConfig,
    worker: Arc<dyn ChannelWorker>,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<MosaicOutput> {
    config.validate()?;

    reporter.begin_stage(PipelineStage::Loading, None);
    let frames = load_frames(&config.input_dir)?;
    let frame_count = frames.len();
    reporter.advance(PipelineStage::Loading, frame_count);
    reporter.finish_stage(PipelineStage::Loading);

    reporter.begin_stage(PipelineStage::ResolvingGrid, Some(frame_count));
    let footprints: Vec<FrameFootprint<'_>> = frames.iter().map(Frame::footprint).collect();
    let grid = resolve_common_grid(&footprints, &config.grid)?;
    reporter.finish_stage(PipelineStage::ResolvingGrid);

    reporter.begin_stage(PipelineStage::SplittingChannels, None);
    let split = ChannelSplit::from_frames(frames);
    reporter.finish_stage(PipelineStage::SplittingChannels);

    // Created only once the inputs have produced a grid; channel workers write into it.
    std::fs::create_dir_all(&config.output_dir)?;
    let grid = Arc::new(grid);
    let channels = dispatch_channels(
        split,
        Arc::clone(&grid),
        worker,
        config.channel_timeout(),
        Arc::clone(&reporter),
    )?;

    let mut written = Vec::new();

    reporter.begin_stage(PipelineStage::Compositing, None);
    let rgb = compose_rgb(&channels.red, &channels.green, &channels.blue)?;
    reporter.finish_stage(PipelineStage::Compositing);

    reporter.begin_stage(PipelineStage::Writing, None);
    let rgb_path = save_rgb_mosaic(&rgb, &grid, config, frame_count)?;
    written.push(rgb_path);
    if let Some(preview) = &config.preview {
        save_preview(&rgb, preview)?;
        written.push(preview.clone());
    }
    reporter.finish_stage(PipelineStage::Writing);

    info!(
        frames = frame_count,
        width = grid.width(),
        height = grid.height(),
        output = %config.output_dir.display(),
        "Mosaic complete"
    );

    let grid = Arc::unwrap_or_clone(grid);
    Ok(MosaicOutput {
        frame_count,
        grid,
        channels,
        rgb,
        written,
    })
}

fn save_rgb_mosaic(
    rgb: &RgbMosaic,
    grid: &CommonGrid,
    config: &MosaicConfig,
    frames: usize,
) -> Result<PathBuf> {
    let path = config.output_dir.join(format!("{RGB_OUTPUT_STEM}.fits"));
    let mut cards = grid.wcs.to_cards();
    cards.push(Card::new("NCOMBINE", frames).with_comment("input frames"));
    cards.push(Card::commentary("COMMENT", "Axis 3 holds bands red, green, blue"));
    write_fits(&path, &rgb.data, &cards)?;
    info!(path = %path.display(), "RGB mosaic saved");
    Ok(path)
}
