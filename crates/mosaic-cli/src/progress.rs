use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use mosaic_core::pipeline::{PipelineStage, ProgressReporter};

/// One spinner per active stage; the three channel pipelines show side by side.
pub struct SpinnerReporter {
    multi: MultiProgress,
    style: ProgressStyle,
    done_style: ProgressStyle,
    bars: Mutex<HashMap<PipelineStage, ProgressBar>>,
}

impl SpinnerReporter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            multi: MultiProgress::new(),
            style: ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg:28} {pos:>3} {elapsed:.dim}")?,
            done_style: ProgressStyle::default_spinner().template("  {prefix:.green} {msg:28} {elapsed:.dim}")?,
            bars: Mutex::new(HashMap::new()),
        })
    }
}

impl ProgressReporter for SpinnerReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.style.clone());
        pb.set_message(stage.to_string());
        if let Some(total) = total_items {
            pb.set_length(total as u64);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut bars) = self.bars.lock() {
            bars.insert(stage, pb);
        }
    }

    fn advance(&self, stage: PipelineStage, items_done: usize) {
        if let Ok(bars) = self.bars.lock() {
            if let Some(pb) = bars.get(&stage) {
                pb.set_position(items_done as u64);
            }
        }
    }

    fn finish_stage(&self, stage: PipelineStage) {
        let pb = self.bars.lock().ok().and_then(|mut bars| bars.remove(&stage));
        if let Some(pb) = pb {
            pb.set_style(self.done_style.clone());
            pb.set_prefix("\u{2713}");
            pb.finish();
        }
    }
}
