use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use mosaic_core::pipeline::{plan_grid, run_mosaic_reported, MosaicConfig};
use tracing::debug;

use crate::args::Cli;
use crate::progress::SpinnerReporter;
use crate::summary::{print_grid, print_mosaic_summary, print_result};

pub fn run(cli: &Cli) -> Result<()> {
    let config = build_config(cli)?;

    if cli.dump_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    if !config.input_dir.is_dir() {
        println!("{} doesn't exist!", config.input_dir.display());
        return Ok(());
    }

    config.validate().context("Invalid mosaic config")?;
    print_mosaic_summary(&config);

    if cli.grid_only {
        let (frames, grid) = plan_grid(&config)
            .with_context(|| format!("Failed to plan grid for {}", config.input_dir.display()))?;
        print_grid(&grid, frames.len());
        return Ok(());
    }

    let started = Instant::now();
    let reporter = Arc::new(SpinnerReporter::new()?);
    let output = run_mosaic_reported(&config, reporter)
        .with_context(|| format!("Mosaic of {} failed", config.input_dir.display()))?;
    print_result(&config, &output, started.elapsed());

    Ok(())
}

/// Start from the config file (or defaults) and apply command-line overrides.
fn build_config(cli: &Cli) -> Result<MosaicConfig> {
    let mut config = match cli.config {
        Some(ref path) => load_config(path)?,
        None => MosaicConfig::default(),
    };

    if let Some(ref dir) = cli.image_dir {
        config.input_dir = dir.clone();
    }
    if let Some(ref dir) = cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(frame) = cli.frame {
        config.grid.frame = frame.into();
    }
    if let Some(projection) = cli.projection {
        config.grid.projection = projection.into();
    }
    if let Some(res) = cli.resolution {
        config.grid.resolution_arcsec = Some(res);
    }
    if let Some(kernel) = cli.kernel {
        config.reprojection.kernel = kernel.into();
    }
    if let Some(combine) = cli.combine {
        config.coadd.combine = combine.into();
    }
    if cli.no_match_background {
        config.coadd.match_background = false;
    }
    if let Some(n) = cli.min_overlap {
        config.coadd.min_overlap_pixels = n;
    }
    if let Some(secs) = cli.timeout {
        config.channel_timeout_secs = secs;
    }
    if let Some(ref preview) = cli.preview {
        config.preview = Some(preview.clone());
    }

    Ok(config)
}

fn load_config(path: &Path) -> Result<MosaicConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: MosaicConfig = toml::from_str(&contents).context("Invalid mosaic config")?;
    debug!(path = %path.display(), "Loaded config");
    Ok(config)
}
