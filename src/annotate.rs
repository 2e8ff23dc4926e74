// src/annotate.rs - Overlay of particle outlines, defects and watershed lines

use bresenham::Bresenham;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use nalgebra::{Rotation2, Vector2};

use crate::calibration::CalibrationResult;
use crate::config::Config;
use crate::defect_analysis::{DefectMeasurement, Particle};
use crate::font::draw_text_bitmap;
use crate::image_utils::in_bounds;
use crate::segmentation::LabelMap;

const LINE_THICKNESS: i32 = 2;
const ARROW_TIP_FRACTION: f64 = 0.1;
const ARROW_TIP_MIN_LENGTH: f64 = 4.0;

#[inline]
fn rgb(color: [u8; 3]) -> Rgb<u8> {
    Rgb(color)
}

/// Stamp a `thickness` x `thickness` square at every pixel of the segment, end point included
pub fn draw_thick_line(canvas: &mut RgbImage, from: (i32, i32), to: (i32, i32), thickness: i32, color: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    let offset = (thickness - 1) / 2;

    let line = Bresenham::new((from.0 as isize, from.1 as isize), (to.0 as isize, to.1 as isize));
    for (x, y) in line.chain(std::iter::once((to.0 as isize, to.1 as isize))) {
        for dy in 0..thickness {
            for dx in 0..thickness {
                let px = x as i32 + dx - offset;
                let py = y as i32 + dy - offset;
                if in_bounds(px, py, width, height) {
                    canvas.put_pixel(px as u32, py as u32, color);
                }
            }
        }
    }
}

/// Segment with a two-stroke arrow head at `to`
pub fn draw_arrow(canvas: &mut RgbImage, from: (i32, i32), to: (i32, i32), thickness: i32, color: Rgb<u8>) {
    draw_thick_line(canvas, from, to, thickness, color);

    let back = Vector2::new((from.0 - to.0) as f64, (from.1 - to.1) as f64);
    let length = back.norm();
    if length == 0.0 {
        return;
    }

    let tip_length = (length * ARROW_TIP_FRACTION).max(ARROW_TIP_MIN_LENGTH).min(length);
    let back = back / length * tip_length;
    for angle in [std::f64::consts::FRAC_PI_4, -std::f64::consts::FRAC_PI_4] {
        let wing = Rotation2::new(angle) * back;
        let end = (to.0 + wing.x.round() as i32, to.1 + wing.y.round() as i32);
        draw_thick_line(canvas, to, end, thickness, color);
    }
}

fn draw_contour(canvas: &mut RgbImage, particle: &Particle, color: Rgb<u8>) {
    let points = &particle.contour;
    if points.len() == 1 {
        draw_thick_line(canvas, (points[0].x, points[0].y), (points[0].x, points[0].y), LINE_THICKNESS, color);
        return;
    }
    for (a, b) in points.iter().zip(points.iter().cycle().skip(1)) {
        draw_thick_line(canvas, (a.x, a.y), (b.x, b.y), LINE_THICKNESS, color);
    }
}

/// Depth label: physical units when calibrated, pixels otherwise
pub fn depth_label(defect: &DefectMeasurement, unit: &str) -> String {
    match defect.depth_physical {
        Some(physical) => format!("{:.1} {}", physical, unit),
        None => format!("{:.1} px", defect.depth_pixels),
    }
}

fn draw_defect(canvas: &mut RgbImage, defect: &DefectMeasurement, config: &Config) {
    let chord_color = rgb(config.defect_chord_color_rgb);
    draw_thick_line(canvas, defect.start_point, defect.end_point, LINE_THICKNESS, chord_color);

    let midpoint = (
        (defect.start_point.0 + defect.end_point.0) / 2,
        (defect.start_point.1 + defect.end_point.1) / 2,
    );
    draw_arrow(canvas, midpoint, defect.farthest_point, LINE_THICKNESS, chord_color);
    draw_filled_circle_mut(canvas, defect.farthest_point, 2, chord_color);

    let (fx, fy) = defect.farthest_point;
    draw_text_bitmap(
        canvas,
        &depth_label(defect, &config.physical_unit),
        fx + 5,
        fy - 3,
        1,
        rgb(config.depth_text_color_rgb),
    );
}

/// Render all annotations onto a copy of `image`
pub fn render_annotations(
    image: &DynamicImage,
    label_map: &LabelMap,
    particles: &[Particle],
    calibration: &CalibrationResult,
    config: &Config,
) -> RgbImage {
    let mut canvas = image.to_rgb8();

    if let Some(bar) = &calibration.bar {
        let color = rgb(config.scale_bar_color_rgb);
        for grow in 0..LINE_THICKNESS {
            let rect = Rect::at(bar.x - grow, bar.y - grow)
                .of_size(bar.width + 2 * grow as u32, bar.height + 2 * grow as u32);
            draw_hollow_rect_mut(&mut canvas, rect, color);
        }
    }

    for particle in particles {
        let (cx, cy) = (particle.centroid.0.round() as i32, particle.centroid.1.round() as i32);

        if particle.is_defective {
            let color = rgb(config.defective_color_rgb);
            if let Some(defect) = &particle.defect {
                draw_defect(&mut canvas, defect, config);
            }
            draw_text_bitmap(&mut canvas, &format!("{}(D)", particle.id), cx - 15, cy - 15, 1, color);
            draw_contour(&mut canvas, particle, color);
        } else {
            let color = rgb(config.regular_color_rgb);
            draw_contour(&mut canvas, particle, color);
            draw_text_bitmap(&mut canvas, &particle.id.to_string(), cx - 10, cy - 3, 1, color);
        }
    }

    let boundary = rgb(config.boundary_color_rgb);
    for (x, y) in label_map.boundary_pixels() {
        canvas.put_pixel(x, y, boundary);
    }

    canvas
}
