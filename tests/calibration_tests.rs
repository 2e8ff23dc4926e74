mod common;

use assert_approx_eq::assert_approx_eq;
use particle_inspect_lib::calibration::{extract_line_mask, find_candidates};
use particle_inspect_lib::{calibrate, calibrate_gray, Config};

use common::*;

#[test]
fn single_bar_calibrates_to_length_per_pixel() {
    let page = scale_bar_page(300, 60, 50, 25, 200, 10);
    let result = calibrate(&to_dynamic(page), &Config::default());

    assert!(result.success);
    assert_approx_eq!(result.microns_per_pixel, 10.0);
    let bar = result.bar.unwrap();
    assert_eq!((bar.x, bar.y, bar.width, bar.height), (50, 25, 200, 10));
}

#[test]
fn longest_of_two_bars_wins() {
    let mut page = blank(320, 120, PAPER);
    fill_rect(&mut page, 20, 20, 80, 4, INK);
    fill_rect(&mut page, 120, 80, 150, 4, INK);

    let result = calibrate_gray(&page, &Config::default());

    assert!(result.success);
    assert_eq!(result.bar.unwrap().width, 150);
    assert_approx_eq!(result.microns_per_pixel, 2000.0 / 150.0);
}

#[test]
fn short_strokes_and_blobs_do_not_calibrate() {
    let mut page = blank(200, 150, PAPER);
    // too short to survive the horizontal opening
    fill_rect(&mut page, 10, 10, 40, 3, INK);
    // wide enough but far too tall
    fill_rect(&mut page, 20, 60, 150, 60, INK);

    let result = calibrate_gray(&page, &Config::default());

    assert!(!result.success);
    assert_eq!(result.microns_per_pixel, 0.0);
    assert!(result.bar.is_none());
}

#[test]
fn calibration_is_deterministic() {
    let page = to_dynamic(scale_bar_page(260, 50, 30, 20, 120, 6));
    let config = Config::default();
    assert_eq!(calibrate(&page, &config), calibrate(&page, &config));
}

#[test]
fn configured_length_scales_ratio() {
    let page = scale_bar_page(300, 60, 50, 25, 200, 10);
    let config = Config {
        scale_bar_length: 500.0,
        ..Config::default()
    };
    let result = calibrate_gray(&page, &config);
    assert_approx_eq!(result.microns_per_pixel, 2.5);
}

#[test]
fn line_mask_drops_vertical_marks() {
    let mut page = scale_bar_page(300, 100, 50, 80, 200, 8);
    fill_rect(&mut page, 150, 5, 4, 60, INK);

    let line_mask = extract_line_mask(&page, &Config::default());
    let candidates = find_candidates(&line_mask);

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].width, 200);
}

#[test]
fn bar_flush_with_left_border_still_calibrates() {
    // 55 px is shorter than the interior minimum run but survives at the border
    let page = scale_bar_page(300, 40, 0, 20, 55, 3);
    let result = calibrate_gray(&page, &Config::default());

    assert!(result.success);
    assert_eq!(result.bar.unwrap().width, 55);
    assert_approx_eq!(result.microns_per_pixel, 2000.0 / 55.0);
}

#[test]
fn short_border_stroke_is_removed() {
    let page = scale_bar_page(300, 40, 0, 20, 25, 1);
    let line_mask = extract_line_mask(&page, &Config::default());
    assert!(find_candidates(&line_mask).is_empty());
}
