use approx::assert_relative_eq;
use mosaic_core::coadd::{coadd, pairwise_offsets, CoaddConfig, CombineMethod};
use mosaic_core::error::MosaicError;
use mosaic_core::frame::Channel;
use mosaic_core::reproject::ReprojectedPlane;
use ndarray::{s, Array2};

/// Plane of `value` covering rows `r0..r1` and cols `c0..c1` of an (h, w) grid.
fn patch(h: usize, w: usize, rows: (usize, usize), cols: (usize, usize), value: f32) -> ReprojectedPlane {
    let mut data = Array2::<f32>::zeros((h, w));
    let mut footprint = Array2::<f32>::zeros((h, w));
    data.slice_mut(s![rows.0..rows.1, cols.0..cols.1]).fill(value);
    footprint.slice_mut(s![rows.0..rows.1, cols.0..cols.1]).fill(1.0);
    ReprojectedPlane { data, footprint }
}

#[test]
fn test_uncovered_pixels_are_zero() {
    let planes = vec![patch(8, 8, (0, 4), (0, 4), 5.0)];
    let mosaic = coadd(planes, (8, 8), Channel::Red, &CoaddConfig::default()).unwrap();
    assert_eq!(mosaic.data[[6, 6]], 0.0);
    assert_eq!(mosaic.coverage[[6, 6]], 0.0);
    assert_eq!(mosaic.coverage[[1, 1]], 1.0);
}

#[test]
fn test_single_frame_is_exact() {
    let mut plane = patch(6, 6, (1, 5), (1, 5), 0.0);
    for ((r, c), v) in plane.data.indexed_iter_mut() {
        if plane.footprint[[r, c]] > 0.0 {
            *v = (r * 10 + c) as f32 + 0.125;
        }
    }
    // Fractional edge weight must not scale the value.
    plane.footprint[[1, 1]] = 0.25;
    let expected = plane.data.clone();

    let mosaic = coadd(vec![plane], (6, 6), Channel::Green, &CoaddConfig::default()).unwrap();
    assert_eq!(mosaic.data, expected);
    assert_eq!(mosaic.coverage[[1, 1]], 0.25);
}

#[test]
fn test_disjoint_frames_keep_their_values() {
    let planes = vec![
        patch(10, 10, (0, 5), (0, 5), 1.0),
        patch(10, 10, (5, 10), (5, 10), 3.0),
    ];
    let mosaic = coadd(planes, (10, 10), Channel::Blue, &CoaddConfig::default()).unwrap();
    assert_eq!(mosaic.data[[2, 2]], 1.0);
    assert_eq!(mosaic.data[[7, 7]], 3.0);
    assert_eq!(mosaic.data[[2, 7]], 0.0);
}

#[test]
fn test_background_matching_removes_seam() {
    // Two 10x10 frames on a 15x15 grid, overlapping in a 5x5 block.
    let planes = vec![
        patch(15, 15, (0, 10), (0, 10), 1.0),
        patch(15, 15, (5, 15), (5, 15), 3.0),
    ];
    let mosaic = coadd(planes, (15, 15), Channel::Red, &CoaddConfig::default()).unwrap();

    for ((r, c), &cov) in mosaic.coverage.indexed_iter() {
        if cov > 0.0 {
            assert_relative_eq!(mosaic.data[[r, c]], 2.0, epsilon = 1e-6);
        }
    }
    assert_eq!(mosaic.coverage[[7, 7]], 2.0);
}

#[test]
fn test_without_matching_the_seam_remains() {
    let planes = vec![
        patch(15, 15, (0, 10), (0, 10), 1.0),
        patch(15, 15, (5, 15), (5, 15), 3.0),
    ];
    let config = CoaddConfig {
        match_background: false,
        ..CoaddConfig::default()
    };
    let mosaic = coadd(planes, (15, 15), Channel::Red, &config).unwrap();
    assert_eq!(mosaic.data[[2, 2]], 1.0);
    assert_eq!(mosaic.data[[7, 7]], 2.0);
    assert_eq!(mosaic.data[[12, 12]], 3.0);
}

#[test]
fn test_small_overlap_is_not_matched() {
    // 2x2 overlap is below the default 9-pixel minimum.
    let planes = vec![
        patch(10, 10, (0, 6), (0, 6), 1.0),
        patch(10, 10, (4, 10), (4, 10), 3.0),
    ];
    assert!(pairwise_offsets(&planes, 9).is_empty());
    let mosaic = coadd(planes, (10, 10), Channel::Red, &CoaddConfig::default()).unwrap();
    assert_eq!(mosaic.data[[0, 0]], 1.0);
    assert_eq!(mosaic.data[[9, 9]], 3.0);
}

#[test]
fn test_three_frame_chain_is_levelled() {
    let planes = vec![
        patch(6, 20, (0, 6), (0, 8), 10.0),
        patch(6, 20, (0, 6), (6, 14), 11.0),
        patch(6, 20, (0, 6), (12, 20), 13.0),
    ];
    let mosaic = coadd(planes, (6, 20), Channel::Green, &CoaddConfig::default()).unwrap();
    let first = mosaic.data[[0, 0]];
    for &v in mosaic.data.iter() {
        assert_relative_eq!(v, first, epsilon = 1e-5);
    }
    // Corrections sum to zero, so the mean level is preserved.
    assert_relative_eq!(first, (10.0 + 11.0 + 13.0) / 3.0, epsilon = 1e-5);
}

#[test]
fn test_combine_methods() {
    let planes = || {
        vec![
            patch(1, 1, (0, 1), (0, 1), 1.0),
            patch(1, 1, (0, 1), (0, 1), 2.0),
            patch(1, 1, (0, 1), (0, 1), 6.0),
        ]
    };
    let run = |combine| {
        let config = CoaddConfig {
            match_background: false,
            combine,
            ..CoaddConfig::default()
        };
        coadd(planes(), (1, 1), Channel::Red, &config).unwrap().data[[0, 0]]
    };
    assert_relative_eq!(run(CombineMethod::Mean), 3.0);
    assert_relative_eq!(run(CombineMethod::Sum), 9.0);
    assert_relative_eq!(run(CombineMethod::Median), 2.0);
    assert_relative_eq!(run(CombineMethod::Min), 1.0);
    assert_relative_eq!(run(CombineMethod::Max), 6.0);
}

#[test]
fn test_mismatched_plane_shape_is_rejected() {
    let planes = vec![patch(4, 4, (0, 4), (0, 4), 1.0)];
    assert!(matches!(
        coadd(planes, (4, 5), Channel::Red, &CoaddConfig::default()),
        Err(MosaicError::ShapeMismatch { .. })
    ));
}
