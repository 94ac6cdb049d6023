use ndarray::Array2;

use super::Resampler;

/// Whether `(x, y)` lies within the outer pixel edges of a `(h, w)` plane.
fn within_edges(x: f64, y: f64, h: usize, w: usize) -> bool {
    x >= -0.5 && x <= w as f64 - 0.5 && y >= -0.5 && y <= h as f64 - 0.5
}

/// Bilinear interpolation over the four nearest pixel centres.
///
/// Neighbours that fall outside the plane or hold non-finite values drop out;
/// the footprint is the sum of the remaining weights and the value is
/// renormalised by it. Constant inputs therefore reproject exactly.
#[derive(Clone, Copy, Debug, Default)]
pub struct BilinearResampler;

impl Resampler for BilinearResampler {
    fn name(&self) -> &'static str {
        "bilinear"
    }

    fn sample(&self, plane: &Array2<f32>, x: f64, y: f64) -> (f32, f32) {
        let (h, w) = plane.dim();
        if !within_edges(x, y, h, w) {
            return (0.0, 0.0);
        }

        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let taps = [
            (x0, y0, (1.0 - fx) * (1.0 - fy)),
            (x0 + 1, y0, fx * (1.0 - fy)),
            (x0, y0 + 1, (1.0 - fx) * fy),
            (x0 + 1, y0 + 1, fx * fy),
        ];

        let mut sum = 0.0f64;
        let mut weight = 0.0f64;
        for (cx, cy, wt) in taps {
            if wt <= 0.0 || cx < 0 || cy < 0 || cx >= w as i64 || cy >= h as i64 {
                continue;
            }
            let v = plane[[cy as usize, cx as usize]];
            if v.is_finite() {
                sum += wt * v as f64;
                weight += wt;
            }
        }

        if weight <= 1e-9 {
            (0.0, 0.0)
        } else {
            ((sum / weight) as f32, weight.min(1.0) as f32)
        }
    }
}

/// Nearest-neighbour sampling; the footprint is 1 wherever a finite pixel is hit.
#[derive(Clone, Copy, Debug, Default)]
pub struct NearestResampler;

impl Resampler for NearestResampler {
    fn name(&self) -> &'static str {
        "nearest"
    }

    fn sample(&self, plane: &Array2<f32>, x: f64, y: f64) -> (f32, f32) {
        let (h, w) = plane.dim();
        if !within_edges(x, y, h, w) {
            return (0.0, 0.0);
        }
        let col = ((x + 0.5).floor() as i64).clamp(0, w as i64 - 1) as usize;
        let row = ((y + 0.5).floor() as i64).clamp(0, h as i64 - 1) as usize;
        let v = plane[[row, col]];
        if v.is_finite() {
            (v, 1.0)
        } else {
            (0.0, 0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn bilinear_interior_is_full_weight() {
        let plane = array![[0.0f32, 1.0], [2.0, 3.0]];
        let (v, w) = BilinearResampler.sample(&plane, 0.5, 0.5);
        assert_relative_eq!(v, 1.5, epsilon = 1e-6);
        assert_relative_eq!(w, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn bilinear_edge_is_fractional() {
        let plane = Array2::<f32>::from_elem((3, 3), 4.0);
        let (v, w) = BilinearResampler.sample(&plane, -0.5, 1.0);
        assert_relative_eq!(v, 4.0);
        assert_relative_eq!(w, 0.5, epsilon = 1e-6);
        assert_eq!(BilinearResampler.sample(&plane, -0.6, 1.0), (0.0, 0.0));
    }

    #[test]
    fn bilinear_skips_nan_neighbours() {
        let plane = array![[f32::NAN, 2.0], [2.0, 2.0]];
        let (v, w) = BilinearResampler.sample(&plane, 0.5, 0.5);
        assert_relative_eq!(v, 2.0);
        assert_relative_eq!(w, 0.75, epsilon = 1e-6);
    }

    #[test]
    fn nearest_picks_closest_centre() {
        let plane = array![[1.0f32, 2.0], [3.0, 4.0]];
        assert_eq!(NearestResampler.sample(&plane, 0.6, 0.2), (2.0, 1.0));
        assert_eq!(NearestResampler.sample(&plane, 1.6, 0.2), (0.0, 0.0));
    }
}
