mod common;

use std::sync::Arc;

use approx::assert_relative_eq;
use mosaic_core::error::MosaicError;
use mosaic_core::frame::Channel;
use mosaic_core::io::fits::read_fits;
use mosaic_core::io::loader::load_frame;
use mosaic_core::pipeline::{plan_grid, run_mosaic, run_mosaic_reported, MosaicConfig, NoOpReporter};
use mosaic_core::wcs::CelestialFrame;
use ndarray::Axis;

use common::{constant_cube, rotated_wcs, tan_wcs, write_cube, ARCSEC};

/// Two 3x10x10 frames overlapping in a 5x5 block, with offset backgrounds.
fn seam_inputs(dir: &std::path::Path) {
    let a = tan_wcs(CelestialFrame::Galactic, [5.5, 5.5], [209.01, -19.38], ARCSEC);
    let b = tan_wcs(CelestialFrame::Galactic, [0.5, 0.5], [209.01, -19.38], ARCSEC);
    write_cube(dir, "frame_a.fits", &constant_cube(10, 10, [1.0, 10.0, 100.0]), &a);
    write_cube(dir, "frame_b.fits", &constant_cube(10, 10, [3.0, 12.0, 104.0]), &b);
}

#[test]
fn test_end_to_end_seam_free_mosaic() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    seam_inputs(input.path());

    let mut config = MosaicConfig::new(input.path());
    config.output_dir = output.path().to_path_buf();
    let result = run_mosaic(&config).unwrap();

    assert_eq!(result.frame_count, 2);
    let (h, w) = result.grid.shape;
    assert!((15..=17).contains(&h) && (15..=17).contains(&w), "grid {h}x{w}");

    let expected = [2.0f32, 11.0, 102.0];
    for channel in Channel::ALL {
        let mosaic = result.channels.get(channel);
        assert_eq!(mosaic.shape(), (h, w));
        let mut covered = 0;
        for ((r, c), &cov) in mosaic.coverage.indexed_iter() {
            if cov > 0.0 {
                covered += 1;
                assert_relative_eq!(
                    mosaic.data[[r, c]],
                    expected[channel.band_index()],
                    epsilon = 1e-3
                );
            } else {
                assert_eq!(mosaic.data[[r, c]], 0.0);
            }
        }
        // Union of two 10x10 frames sharing 5x5 is 175 input pixels.
        assert!(covered >= 150, "{channel}: only {covered} covered");
    }

    for stem in ["red", "grn", "blu", "rgb"] {
        assert!(output.path().join(format!("{stem}.fits")).exists(), "{stem}.fits missing");
    }
    assert_eq!(result.written, vec![output.path().join("rgb.fits")]);
}

#[test]
fn test_outputs_carry_grid_wcs_and_shapes() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    seam_inputs(input.path());

    let mut config = MosaicConfig::new(input.path());
    config.output_dir = output.path().to_path_buf();
    let result = run_mosaic(&config).unwrap();
    let (h, w) = result.grid.shape;

    let red = read_fits(&output.path().join("red.fits")).unwrap();
    assert_eq!(red.data.shape(), &[h, w]);
    assert_eq!(red.header.get_str("CTYPE1"), Some("GLON-TAN"));
    assert_eq!(red.header.get_str("CHANNEL"), Some("red"));
    assert_eq!(red.header.get_i64("NCOMBINE"), Some(2));

    let rgb = read_fits(&output.path().join("rgb.fits")).unwrap();
    assert_eq!(rgb.data.shape(), &[3, h, w]);
    assert_eq!(rgb.header.get_i64("NAXIS3"), Some(3));

    // The composite bands are the channel mosaics, in order.
    for channel in Channel::ALL {
        let band = result.rgb.band(channel);
        assert_eq!(band, result.channels.get(channel).data.view());
    }

    // rgb.fits can be read back as an input frame with the grid's WCS.
    let reloaded = load_frame(&output.path().join("rgb.fits")).unwrap();
    assert_eq!(reloaded.shape(), (h, w));
    assert_relative_eq!(reloaded.wcs.crval()[0], result.grid.wcs.crval()[0], epsilon = 1e-9);
    assert_relative_eq!(reloaded.wcs.crpix()[1], result.grid.wcs.crpix()[1], epsilon = 1e-9);
}

#[test]
fn test_existing_outputs_are_overwritten() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    seam_inputs(input.path());
    std::fs::write(output.path().join("rgb.fits"), b"stale").unwrap();

    let mut config = MosaicConfig::new(input.path());
    config.output_dir = output.path().to_path_buf();
    run_mosaic(&config).unwrap();
    assert!(read_fits(&output.path().join("rgb.fits")).is_ok());
}

#[test]
fn test_rotated_mixed_frame_inputs() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let a = rotated_wcs(CelestialFrame::Equatorial, [10.5, 10.5], [10.68, 41.27], 2.0 * ARCSEC, 20.0);
    let b = tan_wcs(CelestialFrame::Equatorial, [10.5, 10.5], [10.685, 41.272], 2.0 * ARCSEC);
    write_cube(input.path(), "a.fits", &constant_cube(20, 20, [5.0, 5.0, 5.0]), &a);
    write_cube(input.path(), "b.fits", &constant_cube(20, 20, [5.0, 5.0, 5.0]), &b);

    let mut config = MosaicConfig::new(input.path());
    config.output_dir = output.path().to_path_buf();
    config.preview = Some(output.path().join("preview.png"));
    let result = run_mosaic_reported(&config, Arc::new(NoOpReporter)).unwrap();

    for (&v, &cov) in result.channels.red.data.iter().zip(result.channels.red.coverage.iter()) {
        if cov > 0.0 {
            assert_relative_eq!(v, 5.0, epsilon = 1e-3);
        }
    }
    assert!(output.path().join("preview.png").exists());
    assert_eq!(result.written.len(), 2);
}

#[test]
fn test_plan_grid_only() {
    let input = tempfile::tempdir().unwrap();
    seam_inputs(input.path());
    let config = MosaicConfig::new(input.path());
    let (frames, grid) = plan_grid(&config).unwrap();
    assert_eq!(frames.len(), 2);
    for frame in &frames {
        assert!(grid.covers(&frame.footprint()));
    }
}

#[test]
fn test_malformed_input_aborts_before_writing() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    seam_inputs(input.path());
    std::fs::write(input.path().join("notes.txt"), "observing log").unwrap();

    let mut config = MosaicConfig::new(input.path());
    config.output_dir = output.path().to_path_buf();
    assert!(matches!(run_mosaic(&config), Err(MosaicError::Load { .. })));
    assert!(!output.path().join("red.fits").exists());
}

#[test]
fn test_failed_load_leaves_no_output_directory() {
    let input = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    seam_inputs(input.path());
    std::fs::write(input.path().join("notes.txt"), "observing log").unwrap();

    let mut config = MosaicConfig::new(input.path());
    config.output_dir = scratch.path().join("mosaic");
    assert!(matches!(run_mosaic(&config), Err(MosaicError::Load { .. })));
    assert!(!config.output_dir.exists());
}

/// Same two frames as `seam_inputs`, with the green band replaced by `green`.
fn inputs_with_green(dir: &std::path::Path, green: impl Fn(usize, usize) -> f32) {
    let a = tan_wcs(CelestialFrame::Galactic, [5.5, 5.5], [209.01, -19.38], ARCSEC);
    let b = tan_wcs(CelestialFrame::Galactic, [0.5, 0.5], [209.01, -19.38], ARCSEC);
    for (name, wcs, levels) in [
        ("frame_a.fits", &a, [1.0, 10.0, 100.0]),
        ("frame_b.fits", &b, [3.0, 12.0, 104.0]),
    ] {
        let mut cube = constant_cube(10, 10, levels);
        cube.index_axis_mut(Axis(0), Channel::Green.band_index())
            .indexed_iter_mut()
            .for_each(|((r, c), v)| *v = green(r, c));
        write_cube(dir, name, &cube, wcs);
    }
}

#[test]
fn test_green_plane_does_not_leak_into_red_or_blue() {
    let run = |green: &dyn Fn(usize, usize) -> f32| {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        inputs_with_green(input.path(), green);
        let mut config = MosaicConfig::new(input.path());
        config.output_dir = output.path().to_path_buf();
        let result = run_mosaic(&config).unwrap();
        let files = [Channel::Red, Channel::Blue].map(|c| {
            std::fs::read(output.path().join(format!("{}.fits", c.stem()))).unwrap()
        });
        (result, files)
    };

    let (bright, bright_files) = run(&|_, _| 1.0e6);
    let (holed, holed_files) = run(&|r, c| if r < 5 && c < 5 { f32::NAN } else { (r * 10 + c) as f32 });

    assert_ne!(bright.channels.green.data, holed.channels.green.data);
    for channel in [Channel::Red, Channel::Blue] {
        let x = bright.channels.get(channel);
        let y = holed.channels.get(channel);
        assert_eq!(x.data, y.data, "{channel} mosaic changed with green");
        assert_eq!(x.coverage, y.coverage, "{channel} coverage changed with green");
    }
    assert_eq!(bright_files, holed_files);
}
