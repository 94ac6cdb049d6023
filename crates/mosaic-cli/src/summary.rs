use std::time::Duration;

use console::Style;
use mosaic_core::frame::Channel;
use mosaic_core::grid::CommonGrid;
use mosaic_core::pipeline::{MosaicConfig, MosaicOutput};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_mosaic_summary(config: &MosaicConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Sky Mosaic"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(10)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(config.input_dir.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output_dir.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Timeout"),
        s.value.apply_to(format!("{} s", config.channel_timeout_secs))
    );
    println!();

    println!("  {}", s.header.apply_to("Grid"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Frame"),
        s.method.apply_to(config.grid.frame)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Projection"),
        s.method.apply_to(config.grid.projection)
    );
    match config.grid.resolution_arcsec {
        Some(res) => println!(
            "    {:<12}{}",
            s.label.apply_to("Resolution"),
            s.value.apply_to(format!("{res}\""))
        ),
        None => println!(
            "    {:<12}{}",
            s.label.apply_to("Resolution"),
            s.disabled.apply_to("finest input")
        ),
    }
    println!();

    println!("  {}", s.header.apply_to("Coadd"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Kernel"),
        s.method.apply_to(config.reprojection.kernel)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Combine"),
        s.method.apply_to(config.coadd.combine)
    );
    if config.coadd.match_background {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Background"),
            s.value.apply_to(format!(
                "matched (overlap \u{2265} {} px)",
                config.coadd.min_overlap_pixels
            ))
        );
    } else {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Background"),
            s.disabled.apply_to("not matched")
        );
    }
    println!();
}

pub fn print_grid(grid: &CommonGrid, frames: usize) {
    let s = Styles::new();
    let (sx, _) = grid.wcs.pixel_scales();

    println!("  {}", s.header.apply_to("Common Grid"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(frames)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Shape"),
        s.value.apply_to(format!("{} x {}", grid.width(), grid.height()))
    );
    let crval = grid.wcs.crval();
    println!(
        "    {:<12}{}",
        s.label.apply_to("Centre"),
        s.value.apply_to(format!(
            "{:.5}, {:.5} ({})",
            crval[0],
            crval[1],
            grid.wcs.frame()
        ))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Scale"),
        s.value.apply_to(format!("{:.3}\"/px", sx * 3600.0))
    );
    println!();
}

pub fn print_result(config: &MosaicConfig, output: &MosaicOutput, elapsed: Duration) {
    let s = Styles::new();

    println!();
    print_grid(&output.grid, output.frame_count);

    println!("  {}", s.header.apply_to("Outputs"));
    for channel in Channel::ALL {
        let mosaic = output.channels.get(channel);
        let covered = mosaic.coverage.iter().filter(|&&c| c > 0.0).count();
        println!(
            "    {:<12}{}  {}",
            s.label.apply_to(channel),
            s.path
                .apply_to(config.output_dir.join(format!("{}.fits", channel.stem())).display()),
            s.label.apply_to(format!(
                "{:.1}% covered",
                100.0 * covered as f64 / output.grid.pixel_count().max(1) as f64
            ))
        );
    }
    for path in &output.written {
        println!("    {:<12}{}", "", s.path.apply_to(path.display()));
    }
    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Elapsed"),
        s.value.apply_to(format!("{:.1} s", elapsed.as_secs_f64()))
    );
    println!();
}
