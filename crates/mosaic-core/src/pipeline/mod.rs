pub mod config;
mod channel;
mod coordinator;
mod orchestrator;
mod types;

pub use channel::{save_channel_mosaic, ChannelWorker, ReprojectCoaddWorker};
pub use config::{MosaicConfig, ReprojectionConfig};
pub use coordinator::dispatch_channels;
pub use orchestrator::{plan_grid, run_mosaic, run_mosaic_reported, run_mosaic_with_worker};
pub use types::{ChannelResults, MosaicOutput, NoOpReporter, PipelineStage, ProgressReporter};
