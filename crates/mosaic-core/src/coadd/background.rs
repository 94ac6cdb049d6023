use rayon::prelude::*;
use tracing::debug;

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::error::{MosaicError, Result};
use crate::reproject::ReprojectedPlane;

use super::median;

/// Measured background difference between two overlapping frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlapOffset {
    pub i: usize,
    pub j: usize,
    /// median(v_i - v_j) over the shared pixels.
    pub offset: f64,
    pub pixels: usize,
}

/// Background offset for every frame pair sharing at least `min_overlap` pixels.
pub fn pairwise_offsets(planes: &[ReprojectedPlane], min_overlap: usize) -> Vec<OverlapOffset> {
    let n = planes.len();
    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .collect();

    let measure = |&(i, j): &(usize, usize)| overlap_offset(&planes[i], &planes[j], i, j, min_overlap);

    if n >= PARALLEL_FRAME_THRESHOLD {
        pairs.par_iter().filter_map(measure).collect()
    } else {
        pairs.iter().filter_map(measure).collect()
    }
}

fn overlap_offset(
    a: &ReprojectedPlane,
    b: &ReprojectedPlane,
    i: usize,
    j: usize,
    min_overlap: usize,
) -> Option<OverlapOffset> {
    let mut diffs: Vec<f32> = a
        .data
        .iter()
        .zip(a.footprint.iter())
        .zip(b.data.iter().zip(b.footprint.iter()))
        .filter(|((va, wa), (vb, wb))| **wa > 0.0 && **wb > 0.0 && va.is_finite() && vb.is_finite())
        .map(|((va, _), (vb, _))| va - vb)
        .collect();

    let pixels = diffs.len();
    if pixels == 0 || pixels < min_overlap {
        return None;
    }
    Some(OverlapOffset {
        i,
        j,
        offset: median(&mut diffs) as f64,
        pixels,
    })
}

/// Additive per-frame corrections c minimising Σ (c_i - c_j - d_ij)².
///
/// Each connected overlap component is solved independently with the gauge
/// Σ c = 0 inside the component. Frames without any overlap get 0.
pub fn solve_corrections(n: usize, offsets: &[OverlapOffset]) -> Result<Vec<f64>> {
    let mut corrections = vec![0.0f64; n];

    for component in components(n, offsets) {
        if component.len() < 2 {
            continue;
        }
        let k = component.len();
        let mut local = vec![usize::MAX; n];
        for (idx, &frame) in component.iter().enumerate() {
            local[frame] = idx;
        }

        // Graph Laplacian plus the all-ones gauge term.
        let mut a = vec![vec![1.0f64; k]; k];
        let mut b = vec![0.0f64; k];
        for edge in offsets {
            let (li, lj) = (local[edge.i], local[edge.j]);
            if li == usize::MAX || lj == usize::MAX {
                continue;
            }
            a[li][li] += 1.0;
            a[lj][lj] += 1.0;
            a[li][lj] -= 1.0;
            a[lj][li] -= 1.0;
            b[li] += edge.offset;
            b[lj] -= edge.offset;
        }

        let solution = solve_dense(a, b).ok_or_else(|| {
            MosaicError::Background(format!(
                "singular system for overlap component of {k} frames"
            ))
        })?;
        for (idx, &frame) in component.iter().enumerate() {
            corrections[frame] = solution[idx];
        }
        debug!(frames = k, corrections = ?solution, "Solved background component");
    }

    Ok(corrections)
}

/// Subtract each frame's correction wherever it has coverage.
pub fn apply_corrections(planes: &mut [ReprojectedPlane], corrections: &[f64]) {
    for (plane, &c) in planes.iter_mut().zip(corrections) {
        if c == 0.0 {
            continue;
        }
        let c = c as f32;
        ndarray::Zip::from(&mut plane.data)
            .and(&plane.footprint)
            .for_each(|v, &w| {
                if w > 0.0 {
                    *v -= c;
                }
            });
    }
}

/// Connected components of the overlap graph, each sorted by frame index.
fn components(n: usize, offsets: &[OverlapOffset]) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    for edge in offsets {
        let (ri, rj) = (find(&mut parent, edge.i), find(&mut parent, edge.j));
        if ri != rj {
            parent[ri.max(rj)] = ri.min(rj);
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slot = vec![usize::MAX; n];
    for frame in 0..n {
        let root = find(&mut parent, frame);
        if slot[root] == usize::MAX {
            slot[root] = groups.len();
            groups.push(Vec::new());
        }
        groups[slot[root]].push(frame);
    }
    groups
}

/// Gaussian elimination with partial pivoting. `None` if the matrix is singular.
fn solve_dense(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&r, &s| a[r][col].abs().total_cmp(&a[s][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0f64; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}
