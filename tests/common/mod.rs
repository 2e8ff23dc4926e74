// Synthetic micrograph builders shared by the integration tests
#![allow(dead_code)]

use std::path::PathBuf;

use image::{DynamicImage, GrayImage, Luma};

pub const DARK: u8 = 20;
pub const BRIGHT: u8 = 220;
pub const PAPER: u8 = 255;
pub const INK: u8 = 0;

pub fn blank(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

pub fn fill_rect(image: &mut GrayImage, x: u32, y: u32, width: u32, height: u32, value: u8) {
    for py in y..(y + height).min(image.height()) {
        for px in x..(x + width).min(image.width()) {
            image.put_pixel(px, py, Luma([value]));
        }
    }
}

pub fn fill_disk(image: &mut GrayImage, cx: f32, cy: f32, radius: f32, value: u8) {
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        if dx * dx + dy * dy <= radius * radius {
            *pixel = Luma([value]);
        }
    }
}

/// Square of side `size` at (`x`, `y`) with a V notch cut down from the middle of its top edge
pub fn fill_notched_square(image: &mut GrayImage, x: u32, y: u32, size: u32, notch_half_width: f32, notch_depth: f32, value: u8) {
    let center = x as f32 + size as f32 / 2.0;
    for py in y..y + size {
        for px in x..x + size {
            let offset = (px as f32 - center).abs();
            let in_notch = offset < notch_half_width
                && ((py - y) as f32) < notch_depth * (1.0 - offset / notch_half_width);
            if !in_notch {
                image.put_pixel(px, py, Luma([value]));
            }
        }
    }
}

/// White page with one black horizontal bar
pub fn scale_bar_page(width: u32, height: u32, bar_x: u32, bar_y: u32, bar_width: u32, bar_height: u32) -> GrayImage {
    let mut page = blank(width, height, PAPER);
    fill_rect(&mut page, bar_x, bar_y, bar_width, bar_height, INK);
    page
}

pub fn to_dynamic(gray: GrayImage) -> DynamicImage {
    DynamicImage::ImageLuma8(gray)
}

/// Fresh, empty output directory under the system temp dir
pub fn temp_output_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("particle_inspect_{}_{}", name, std::process::id()));
    if dir.exists() {
        std::fs::remove_dir_all(&dir).unwrap();
    }
    dir
}
