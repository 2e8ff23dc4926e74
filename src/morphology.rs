use image::{GrayImage, Luma};
use imageproc::distance_transform::{euclidean_squared_distance_transform, Norm};
use imageproc::morphology::{close, dilate};

use crate::image_utils::{invert, is_foreground, FOREGROUND};

/// Opening with a flat `kernel_width` x 1 structuring element, applied `iterations` times.
///
/// For a one-row kernel the opening keeps exactly the horizontal foreground
/// runs that can contain the (iterated) kernel, so it is computed per row from
/// run lengths. `iterations` erosions followed by as many dilations with a
/// width-`w` kernel equal one opening with width `iterations * (w - 1) + 1`.
///
/// Erosion treats pixels outside the image as foreground, so a run touching
/// the left or right border only loses pixels from its inner end: it survives
/// when it is longer than `iterations` times the kernel reach on that side.
pub fn horizontal_opening(mask: &GrayImage, kernel_width: u32, iterations: u32) -> GrayImage {
    let (width, height) = mask.dimensions();
    let iterations = iterations.max(1);
    let anchor = kernel_width / 2;
    let reach_right = kernel_width.saturating_sub(1).saturating_sub(anchor);

    let min_interior_run = iterations * kernel_width.saturating_sub(1) + 1;
    // A left-border run is eroded from its right end only, and vice versa
    let min_left_run = iterations * reach_right + 1;
    let min_right_run = iterations * anchor + 1;

    let mut opened = GrayImage::new(width, height);

    for y in 0..height {
        let mut x = 0;
        while x < width {
            if !is_foreground(mask.get_pixel(x, y)) {
                x += 1;
                continue;
            }

            let run_start = x;
            while x < width && is_foreground(mask.get_pixel(x, y)) {
                x += 1;
            }

            let min_run = match (run_start == 0, x == width) {
                (true, true) => 1,
                (true, false) => min_left_run,
                (false, true) => min_right_run,
                (false, false) => min_interior_run,
            };

            if x - run_start >= min_run {
                for rx in run_start..x {
                    opened.put_pixel(rx, y, Luma([FOREGROUND]));
                }
            }
        }
    }

    opened
}

/// Morphological closing with a square kernel, repeated `iterations` times
pub fn close_square(mask: &GrayImage, kernel_size: u32, iterations: u32) -> GrayImage {
    let radius = square_radius(kernel_size);
    let mut closed = mask.clone();
    for _ in 0..iterations {
        closed = close(&closed, Norm::LInf, radius);
    }
    closed
}

/// Dilation with a square kernel, repeated `iterations` times
pub fn dilate_square(mask: &GrayImage, kernel_size: u32, iterations: u32) -> GrayImage {
    let radius = square_radius(kernel_size);
    let mut dilated = mask.clone();
    for _ in 0..iterations {
        dilated = dilate(&dilated, Norm::LInf, radius);
    }
    dilated
}

fn square_radius(kernel_size: u32) -> u8 {
    (kernel_size / 2).min(u8::MAX as u32) as u8
}

/// Euclidean distance field over an image grid
#[derive(Debug, Clone)]
pub struct DistanceMap {
    pub width: u32,
    pub height: u32,
    values: Vec<f64>,
    max: f64,
}

impl DistanceMap {
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f64 {
        self.values[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn at_index(&self, idx: usize) -> f64 {
        self.values[idx]
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Mask of the pixels whose distance is strictly above `level`
    pub fn threshold(&self, level: f64) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.get(x, y) > level {
                Luma([FOREGROUND])
            } else {
                Luma([0])
            }
        })
    }

    fn from_squared(width: u32, height: u32, squared: impl Iterator<Item = f64>) -> Self {
        // With no seed pixels the transform reports infinite distances; treat those as 0
        let values: Vec<f64> = squared
            .map(|d| if d.is_finite() { d.sqrt() } else { 0.0 })
            .collect();
        let max = values.iter().copied().fold(0.0, f64::max);
        DistanceMap { width, height, values, max }
    }
}

/// Distance of every foreground pixel to the nearest background pixel (0 on background)
pub fn distance_to_background(mask: &GrayImage) -> DistanceMap {
    let (width, height) = mask.dimensions();
    let squared = euclidean_squared_distance_transform(&invert(mask));
    DistanceMap::from_squared(width, height, squared.pixels().map(|p| p[0]))
}

/// Distance of every background pixel to the nearest foreground pixel (0 on foreground)
pub fn distance_to_foreground(mask: &GrayImage) -> DistanceMap {
    let (width, height) = mask.dimensions();
    let squared = euclidean_squared_distance_transform(mask);
    DistanceMap::from_squared(width, height, squared.pixels().map(|p| p[0]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_utils::count_foreground;
    use assert_approx_eq::assert_approx_eq;

    fn mask_from_rows(rows: &[&str]) -> GrayImage {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        GrayImage::from_fn(width, height, |x, y| {
            if rows[y as usize].as_bytes()[x as usize] == b'#' {
                Luma([FOREGROUND])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn horizontal_opening_keeps_only_long_runs() {
        let mask = mask_from_rows(&[
            ".#######....",
            ".######...#.",
            "............",
        ]);
        // width 4, 2 iterations -> interior runs of at least 7 survive
        let opened = horizontal_opening(&mask, 4, 2);
        assert_eq!(count_foreground(&opened), 7);
        assert_eq!(opened.get_pixel(1, 1)[0], 0);
        assert_eq!(opened.get_pixel(7, 0)[0], FOREGROUND);
    }

    #[test]
    fn border_runs_are_eroded_from_the_inner_end_only() {
        // width 30, 2 iterations: anchor 15, reach 14 to the right
        let mut mask = GrayImage::new(200, 4);
        for x in 0..29 {
            mask.put_pixel(x, 0, Luma([FOREGROUND]));
        }
        for x in 0..28 {
            mask.put_pixel(x, 1, Luma([FOREGROUND]));
        }
        for x in 169..200 {
            mask.put_pixel(x, 2, Luma([FOREGROUND]));
        }
        for x in 170..200 {
            mask.put_pixel(x, 3, Luma([FOREGROUND]));
        }

        let opened = horizontal_opening(&mask, 30, 2);

        assert_eq!(opened.get_pixel(0, 0)[0], FOREGROUND);
        assert_eq!(opened.get_pixel(28, 0)[0], FOREGROUND);
        assert_eq!(opened.get_pixel(0, 1)[0], 0);
        assert_eq!(opened.get_pixel(199, 2)[0], FOREGROUND);
        assert_eq!(opened.get_pixel(199, 3)[0], 0);
    }

    #[test]
    fn full_width_row_survives_any_kernel() {
        let mask = mask_from_rows(&["#####", "....."]);
        let opened = horizontal_opening(&mask, 30, 2);
        assert_eq!(count_foreground(&opened), 5);
    }

    #[test]
    fn horizontal_opening_removes_vertical_strokes() {
        let mask = GrayImage::from_fn(40, 40, |x, _| if x == 20 { Luma([FOREGROUND]) } else { Luma([0]) });
        let opened = horizontal_opening(&mask, 30, 2);
        assert_eq!(count_foreground(&opened), 0);
    }

    #[test]
    fn closing_fills_small_hole() {
        let mut mask = GrayImage::from_pixel(15, 15, Luma([FOREGROUND]));
        mask.put_pixel(7, 7, Luma([0]));
        let closed = close_square(&mask, 5, 2);
        assert_eq!(closed.get_pixel(7, 7)[0], FOREGROUND);
    }

    #[test]
    fn dilation_grows_by_radius_per_iteration() {
        let mut mask = GrayImage::new(21, 21);
        mask.put_pixel(10, 10, Luma([FOREGROUND]));
        let dilated = dilate_square(&mask, 5, 3);
        // radius 2 three times -> 13 x 13 square
        assert_eq!(count_foreground(&dilated), 13 * 13);
    }

    #[test]
    fn distance_to_background_peaks_in_center() {
        let mask = mask_from_rows(&[
            ".......",
            ".#####.",
            ".#####.",
            ".#####.",
            ".#####.",
            ".#####.",
            ".......",
        ]);
        let dist = distance_to_background(&mask);
        assert_approx_eq!(dist.get(0, 0), 0.0);
        assert_approx_eq!(dist.get(1, 1), 1.0);
        assert_approx_eq!(dist.get(3, 3), 3.0);
        assert_approx_eq!(dist.max(), 3.0);
        assert_eq!(count_foreground(&dist.threshold(1.5)), 9);
    }

    #[test]
    fn distance_to_foreground_is_zero_inside() {
        let mask = mask_from_rows(&["#...."]);
        let dist = distance_to_foreground(&mask);
        assert_approx_eq!(dist.get(0, 0), 0.0);
        assert_approx_eq!(dist.get(4, 0), 4.0);
    }
}
