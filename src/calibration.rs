// src/calibration.rs - Scale-bar detection and length-per-pixel calibration

use image::{DynamicImage, GrayImage};
use imageproc::contours::find_contours;
use imageproc::point::Point;
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::Config;
use crate::image_utils::{binarize_fixed, invert, to_intensity};
use crate::morphology::horizontal_opening;

/// Axis-aligned bounding box of one line-like mark
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleBarCandidate {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,
    /// Ranking key; the longest qualifying stroke wins
    pub score: f64,
}

impl ScaleBarCandidate {
    /// Inclusive bounding box of a traced outline
    pub fn from_points(points: &[Point<i32>]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }

        let width = (max_x - min_x + 1) as u32;
        let height = (max_y - min_y + 1) as u32;
        let aspect_ratio = if height == 0 { 0.0 } else { width as f64 / height as f64 };

        Some(ScaleBarCandidate {
            x: min_x,
            y: min_y,
            width,
            height,
            aspect_ratio,
            score: width as f64,
        })
    }

    /// Thin, wide rectangle test
    pub fn qualifies(&self, config: &Config) -> bool {
        self.aspect_ratio > config.min_aspect_ratio
            && self.width > config.min_bar_width
            && self.height < config.max_bar_height
    }
}

/// Outcome of scale-bar calibration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationResult {
    /// Physical length per pixel; 0 when no scale bar was found
    pub microns_per_pixel: f64,
    pub success: bool,
    pub bar: Option<ScaleBarCandidate>,
}

impl CalibrationResult {
    pub fn failed() -> Self {
        CalibrationResult {
            microns_per_pixel: 0.0,
            success: false,
            bar: None,
        }
    }

    /// Convert a pixel length, or `None` when uncalibrated
    pub fn to_physical(&self, pixels: f64) -> Option<f64> {
        if self.success {
            Some(pixels * self.microns_per_pixel)
        } else {
            None
        }
    }
}

/// Isolate long horizontal strokes: invert, binarize, open with a flat wide kernel
pub fn extract_line_mask(gray: &GrayImage, config: &Config) -> GrayImage {
    let inverted = invert(gray);
    let binary = binarize_fixed(&inverted, config.scale_bar_binary_threshold);
    horizontal_opening(&binary, config.line_kernel_width, config.line_kernel_iterations)
}

/// All outlines of the line mask as candidates, in contour scan order
pub fn find_candidates(line_mask: &GrayImage) -> Vec<ScaleBarCandidate> {
    find_contours::<i32>(line_mask)
        .iter()
        .filter_map(|contour| ScaleBarCandidate::from_points(&contour.points))
        .collect()
}

/// Longest qualifying candidate; on equal width the first one found is kept
pub fn select_scale_bar(candidates: &[ScaleBarCandidate], config: &Config) -> Option<ScaleBarCandidate> {
    let mut best: Option<ScaleBarCandidate> = None;

    for candidate in candidates {
        let qualified = candidate.qualifies(config);
        let widest = qualified && best.map_or(true, |b| candidate.score > b.score);

        debug!(
            "Contour: w={:<4} h={:<4} aspect_ratio={:.2}{}{}",
            candidate.width,
            candidate.height,
            candidate.aspect_ratio,
            if qualified { " | QUALIFIED" } else { "" },
            if widest { " -> NEW WIDEST" } else { "" },
        );

        if widest {
            best = Some(*candidate);
        }
    }

    best
}

/// Locate the scale bar in `image` and derive the physical length per pixel.
///
/// A missing scale bar is not an error: the result reports `success = false`
/// and a ratio of 0, and callers fall back to pixel units.
pub fn calibrate(image: &DynamicImage, config: &Config) -> CalibrationResult {
    let gray = to_intensity(image);
    calibrate_gray(&gray, config)
}

pub fn calibrate_gray(gray: &GrayImage, config: &Config) -> CalibrationResult {
    calibrate_with_line_mask(gray, config).0
}

/// Calibration plus the filtered line mask it was derived from
pub fn calibrate_with_line_mask(gray: &GrayImage, config: &Config) -> (CalibrationResult, GrayImage) {
    let line_mask = extract_line_mask(gray, config);
    let candidates = find_candidates(&line_mask);
    debug!("Found {} line-like contours", candidates.len());

    let result = match select_scale_bar(&candidates, config) {
        Some(bar) => {
            let microns_per_pixel = config.scale_bar_length / bar.width as f64;
            info!(
                "Scale bar detected at ({}, {}), pixel width {}, {:.4} {}/pixel",
                bar.x, bar.y, bar.width, microns_per_pixel, config.physical_unit
            );
            CalibrationResult {
                microns_per_pixel,
                success: true,
                bar: Some(bar),
            }
        }
        None => {
            warn!("Scale bar not detected; measurements will be in pixels");
            CalibrationResult::failed()
        }
    };

    (result, line_mask)
}
