// src/watershed.rs - Marker-based priority flooding

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use image::{ImageBuffer, Luma};
use log::warn;

use crate::image_utils::in_bounds;

/// Label value of pixels not yet reached by any basin, and of watershed lines afterwards
pub const UNLABELED: u32 = 0;

/// 4-connected neighborhood used for flooding
static NEIGHBORS_4: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

/// Grow every labeled basin in `markers` over the `UNLABELED` pixels.
///
/// Pixels are visited in ascending `elevation` (row-major, one value per
/// pixel), ties in insertion order. A visited pixel whose labeled 4-neighbors
/// disagree becomes a permanent watershed line and keeps `UNLABELED`; it never
/// propagates and is never revisited. Returns the number of line pixels.
///
/// `elevation` must hold exactly one value per pixel; otherwise `markers` is
/// left untouched and 0 is returned.
pub fn flood(markers: &mut ImageBuffer<Luma<u32>, Vec<u32>>, elevation: &[u32]) -> usize {
    let (width, height) = markers.dimensions();
    let pixel_count = (width * height) as usize;
    if elevation.len() != pixel_count {
        warn!(
            "Elevation has {} values for {} pixels; flooding skipped",
            elevation.len(),
            pixel_count
        );
        return 0;
    }

    let mut queued = vec![false; pixel_count];
    let mut heap = BinaryHeap::new();
    let mut sequence: u64 = 0;

    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) as usize;
            if markers.get_pixel(x, y)[0] != UNLABELED {
                queued[idx] = true;
            }
        }
    }

    // Seed the queue with unlabeled pixels touching a basin
    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) as usize;
            if queued[idx] {
                continue;
            }
            let touches_basin = neighbors(x, y, width, height)
                .any(|(nx, ny)| markers.get_pixel(nx, ny)[0] != UNLABELED);
            if touches_basin {
                queued[idx] = true;
                heap.push(Reverse((elevation[idx], sequence, x, y)));
                sequence += 1;
            }
        }
    }

    let mut line_pixels = 0;

    while let Some(Reverse((_, _, x, y))) = heap.pop() {
        let mut label = None;
        let mut conflict = false;

        for (nx, ny) in neighbors(x, y, width, height) {
            let neighbor_label = markers.get_pixel(nx, ny)[0];
            if neighbor_label == UNLABELED {
                continue;
            }
            match label {
                None => label = Some(neighbor_label),
                Some(current) if current != neighbor_label => conflict = true,
                _ => {}
            }
        }

        if conflict {
            line_pixels += 1;
            continue;
        }

        let Some(label) = label else { continue };
        markers.put_pixel(x, y, Luma([label]));

        for (nx, ny) in neighbors(x, y, width, height) {
            let idx = (ny * width + nx) as usize;
            if !queued[idx] {
                queued[idx] = true;
                heap.push(Reverse((elevation[idx], sequence, nx, ny)));
                sequence += 1;
            }
        }
    }

    line_pixels
}

fn neighbors(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    NEIGHBORS_4.iter().filter_map(move |&(dx, dy)| {
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        if in_bounds(nx, ny, width, height) {
            Some((nx as u32, ny as u32))
        } else {
            None
        }
    })
}
