// src/segmentation.rs - Separation of touching particles into labeled regions

use std::collections::BTreeMap;

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::region_labelling::{connected_components, Connectivity};
use log::{debug, info};

use crate::config::Config;
use crate::image_utils::{binarize_otsu, count_foreground, in_bounds, label_color, subtract_masks, to_intensity, FOREGROUND};
use crate::morphology::{close_square, dilate_square, distance_to_background, distance_to_foreground, DistanceMap};
use crate::watershed::{flood, UNLABELED};

/// Unknown before flooding; watershed line afterwards
pub const BOUNDARY: u32 = UNLABELED;
pub const BACKGROUND: u32 = 1;
pub const FIRST_PARTICLE: u32 = 2;

/// Height-field resolution: elevation units per pixel of distance
const ELEVATION_STEPS_PER_PIXEL: f64 = 4.0;
/// Distances outside the foreground are clamped here before building the height field
const OUTSIDE_DISTANCE_CAP: f64 = 255.0;

/// Inclusive bounding box and pixel count of one label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelRegion {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub pixel_count: usize,
}

/// Per-pixel region labels: 0 boundary/unknown, 1 background, >= 2 one particle each
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap {
    labels: ImageBuffer<Luma<u32>, Vec<u32>>,
}

impl LabelMap {
    pub fn new(labels: ImageBuffer<Luma<u32>, Vec<u32>>) -> Self {
        LabelMap { labels }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.labels.dimensions()
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u32 {
        self.labels.get_pixel(x, y)[0]
    }

    #[inline]
    pub fn is_boundary(&self, x: u32, y: u32) -> bool {
        self.get(x, y) == BOUNDARY
    }

    /// Bounding boxes of all particle labels in ascending label order
    pub fn particle_regions(&self) -> BTreeMap<u32, LabelRegion> {
        let mut regions: BTreeMap<u32, LabelRegion> = BTreeMap::new();

        for (x, y, pixel) in self.labels.enumerate_pixels() {
            let label = pixel[0];
            if label < FIRST_PARTICLE {
                continue;
            }
            regions
                .entry(label)
                .and_modify(|r| {
                    r.min_x = r.min_x.min(x);
                    r.min_y = r.min_y.min(y);
                    r.max_x = r.max_x.max(x);
                    r.max_y = r.max_y.max(y);
                    r.pixel_count += 1;
                })
                .or_insert(LabelRegion {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                    pixel_count: 1,
                });
        }

        regions
    }

    /// Binary mask of `label` cropped to `region` with a one-pixel empty margin.
    ///
    /// Returns the mask and the image coordinates of its top-left pixel.
    pub fn region_mask(&self, label: u32, region: &LabelRegion) -> (GrayImage, (i32, i32)) {
        let width = region.max_x - region.min_x + 3;
        let height = region.max_y - region.min_y + 3;
        let origin = (region.min_x as i32 - 1, region.min_y as i32 - 1);

        let (img_w, img_h) = self.dimensions();

        let mask = GrayImage::from_fn(width, height, |mx, my| {
            let x = origin.0 + mx as i32;
            let y = origin.1 + my as i32;
            if in_bounds(x, y, img_w, img_h) && self.get(x as u32, y as u32) == label {
                Luma([FOREGROUND])
            } else {
                Luma([0])
            }
        });

        (mask, origin)
    }

    /// Coordinates of every watershed line pixel
    pub fn boundary_pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.labels
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] == BOUNDARY)
            .map(|(x, y, _)| (x, y))
    }

    /// False-color rendering for debugging: lines white, background black
    pub fn to_color_image(&self) -> RgbImage {
        let (width, height) = self.dimensions();
        RgbImage::from_fn(width, height, |x, y| match self.get(x, y) {
            BOUNDARY => Rgb([255, 255, 255]),
            BACKGROUND => Rgb([0, 0, 0]),
            label => label_color(label),
        })
    }
}

/// Output of the segmenter plus the intermediate masks worth inspecting
pub struct Segmentation {
    pub label_map: LabelMap,
    pub binary_mask: GrayImage,
    pub sure_foreground: GrayImage,
    pub otsu_level: u8,
    pub seed_count: usize,
}

/// Partition foreground pixels of `image` into one label per particle
pub fn segment_particles(image: &DynamicImage, config: &Config) -> Segmentation {
    let gray = to_intensity(image);
    segment_gray(&gray, config)
}

pub fn segment_gray(gray: &GrayImage, config: &Config) -> Segmentation {
    let (binary, otsu_level) = binarize_otsu(gray);
    let binary_mask = close_square(&binary, config.closing_kernel_size, config.closing_iterations);

    let inside = distance_to_background(&binary_mask);
    let sure_background = dilate_square(
        &binary_mask,
        config.closing_kernel_size,
        config.background_dilation_iterations,
    );
    let sure_foreground = inside.threshold(config.foreground_distance_fraction * inside.max());
    let unknown = subtract_masks(&sure_background, &sure_foreground);

    let (mut markers, seed_count) = build_markers(&sure_foreground, &unknown);
    debug!(
        "Otsu level {}, {} foreground pixels, max distance {:.2}, {} seed regions",
        otsu_level,
        count_foreground(&binary_mask),
        inside.max(),
        seed_count
    );

    let outside = distance_to_foreground(&binary_mask);
    let elevation = flooding_elevation(&inside, &outside);
    let line_pixels = flood(&mut markers, &elevation);

    info!(
        "Segmentation produced {} seed regions and {} watershed line pixels",
        seed_count, line_pixels
    );

    Segmentation {
        label_map: LabelMap::new(markers),
        binary_mask,
        sure_foreground,
        otsu_level,
        seed_count,
    }
}

/// Background gets label 1, each sure-foreground component 2.., unknown pixels 0
fn build_markers(sure_foreground: &GrayImage, unknown: &GrayImage) -> (ImageBuffer<Luma<u32>, Vec<u32>>, usize) {
    let mut markers = connected_components(sure_foreground, Connectivity::Eight, Luma([0u8]));
    let mut seed_count = 0;

    for (x, y, pixel) in markers.enumerate_pixels_mut() {
        let component = pixel[0];
        seed_count = seed_count.max(component as usize);
        pixel[0] = if unknown.get_pixel(x, y)[0] > 0 {
            BOUNDARY
        } else {
            component + BACKGROUND
        };
    }

    (markers, seed_count)
}

/// Height field for flooding.
///
/// Inside the foreground it is the negated distance to the background, so
/// basins grow outward from particle cores and meet at the narrowest necks.
/// Outside it rises toward the particle edge, so the background basin closes
/// in from afar and meets each particle right at its outline.
fn flooding_elevation(inside: &DistanceMap, outside: &DistanceMap) -> Vec<u32> {
    let quantize = |d: f64| (d * ELEVATION_STEPS_PER_PIXEL).round() as u32;
    let top = quantize(inside.max()) + 1;
    let count = (inside.width * inside.height) as usize;

    (0..count)
        .map(|idx| {
            let d_in = inside.at_index(idx);
            if d_in > 0.0 {
                quantize(inside.max() - d_in)
            } else {
                let d_out = outside.at_index(idx).min(OUTSIDE_DISTANCE_CAP);
                top + quantize(OUTSIDE_DISTANCE_CAP - d_out)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk_image(width: u32, height: u32, disks: &[(f32, f32, f32)]) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let inside = disks.iter().any(|&(cx, cy, r)| {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                dx * dx + dy * dy <= r * r
            });
            if inside { Luma([220]) } else { Luma([20]) }
        })
    }

    #[test]
    fn single_disk_gets_one_label() {
        let gray = disk_image(100, 100, &[(50.0, 50.0, 25.0)]);
        let segmentation = segment_gray(&gray, &Config::default());
        let regions = segmentation.label_map.particle_regions();
        assert_eq!(regions.len(), 1);
        assert_eq!(segmentation.label_map.get(50, 50), FIRST_PARTICLE);
        assert_eq!(segmentation.label_map.get(2, 2), BACKGROUND);
    }

    #[test]
    fn blank_image_has_no_particles() {
        let gray = GrayImage::from_pixel(60, 40, Luma([10]));
        let segmentation = segment_gray(&gray, &Config::default());
        assert!(segmentation.label_map.particle_regions().is_empty());
        assert_eq!(segmentation.seed_count, 0);
    }

    #[test]
    fn markers_mark_unknown_as_boundary() {
        let sure_fg = GrayImage::from_raw(4, 1, vec![255, 0, 0, 255]).unwrap();
        let unknown = GrayImage::from_raw(4, 1, vec![0, 255, 0, 0]).unwrap();
        let (markers, seeds) = build_markers(&sure_fg, &unknown);
        assert_eq!(seeds, 2);
        assert_eq!(markers.as_raw(), &vec![2, BOUNDARY, BACKGROUND, 3]);
    }

    #[test]
    fn region_mask_has_margin_and_origin() {
        let labels = ImageBuffer::from_raw(4, 3, vec![
            1, 1, 1, 1,
            1, 2, 2, 1,
            1, 1, 1, 1,
        ]).unwrap();
        let map = LabelMap::new(labels);
        let regions = map.particle_regions();
        let region = regions[&2];
        assert_eq!(region.pixel_count, 2);
        let (mask, origin) = map.region_mask(2, &region);
        assert_eq!(origin, (0, 0));
        assert_eq!(mask.dimensions(), (4, 3));
        assert_eq!(mask.get_pixel(1, 1)[0], FOREGROUND);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
    }
}
