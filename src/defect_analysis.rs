// src/defect_analysis.rs - Per-particle solidity classification and defect depth

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use log::{debug, info};
use serde::Serialize;

use crate::calibration::CalibrationResult;
use crate::config::Config;
use crate::geometry::{
    convexity_defects, deepest_defect, hull_indices, hull_points, polygon_area, polygon_centroid,
};
use crate::segmentation::LabelMap;

/// Deepest concavity of a defective particle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefectMeasurement {
    pub start_point: (i32, i32),
    pub end_point: (i32, i32),
    pub farthest_point: (i32, i32),
    pub depth_pixels: f64,
    /// Set only when calibration succeeded
    pub depth_physical: Option<f64>,
}

/// One measured particle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Particle {
    /// 1-based display index, sequential in ascending label order
    pub id: usize,
    /// Label value in the label map
    pub label: u32,
    #[serde(skip)]
    pub contour: Vec<Point<i32>>,
    pub area: f64,
    pub hull_area: f64,
    pub solidity: f64,
    pub centroid: (f64, f64),
    pub is_defective: bool,
    pub defect: Option<DefectMeasurement>,
}

#[inline]
fn xy(p: Point<i32>) -> (i32, i32) {
    (p.x, p.y)
}

/// Largest outer contour of a binary mask, shifted by `origin` into image coordinates
pub fn largest_outer_contour(mask: &GrayImage, origin: (i32, i32)) -> Option<Vec<Point<i32>>> {
    let contours = find_contours::<i32>(mask);

    let largest = contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .map(|c| {
            let area = polygon_area(&c.points);
            (c.points, area)
        })
        .fold(None, |best: Option<(Vec<Point<i32>>, f64)>, (points, area)| match best {
            Some((_, best_area)) if best_area >= area => best,
            _ => Some((points, area)),
        })?;

    Some(
        largest
            .0
            .into_iter()
            .map(|p| Point::new(p.x + origin.0, p.y + origin.1))
            .collect(),
    )
}

/// Measure one traced contour.
///
/// Returns `None` when the contour encloses less than `min_particle_area` or
/// its hull is degenerate; such labels are treated as segmentation noise.
pub fn measure_contour(
    id: usize,
    label: u32,
    contour: Vec<Point<i32>>,
    calibration: &CalibrationResult,
    config: &Config,
) -> Option<Particle> {
    let area = polygon_area(&contour);
    if area < config.min_particle_area {
        return None;
    }

    let hull = hull_indices(&contour);
    let hull_area = polygon_area(&hull_points(&contour, &hull));
    if hull_area <= 0.0 {
        debug!("Label {}: degenerate hull, skipped", label);
        return None;
    }

    let solidity = (area / hull_area).min(1.0);
    let centroid = polygon_centroid(&contour)?;
    let is_defective = solidity < config.solidity_threshold;

    let defect = if is_defective && hull.len() >= config.min_hull_points {
        let defects = convexity_defects(&contour, &hull);
        deepest_defect(&defects).map(|d| DefectMeasurement {
            start_point: xy(contour[d.start]),
            end_point: xy(contour[d.end]),
            farthest_point: xy(contour[d.farthest]),
            depth_pixels: d.depth,
            depth_physical: calibration.to_physical(d.depth),
        })
    } else {
        None
    };

    Some(Particle {
        id,
        label,
        contour,
        area,
        hull_area,
        solidity,
        centroid,
        is_defective,
        defect,
    })
}

/// Measure every particle label of `label_map` in ascending label order
pub fn analyze_particles(
    label_map: &LabelMap,
    calibration: &CalibrationResult,
    config: &Config,
) -> Vec<Particle> {
    let mut particles = Vec::new();
    let mut next_id = 1;

    for (label, region) in label_map.particle_regions() {
        let (mask, origin) = label_map.region_mask(label, &region);

        let Some(contour) = largest_outer_contour(&mask, origin) else {
            debug!("Label {}: no contour found, skipped", label);
            continue;
        };

        match measure_contour(next_id, label, contour, calibration, config) {
            Some(particle) => {
                debug!(
                    "Particle ID: {:<3} | Solidity: {:.4} | Status: {}",
                    particle.id,
                    particle.solidity,
                    if particle.is_defective { "Defective" } else { "OK" }
                );
                particles.push(particle);
                next_id += 1;
            }
            None => debug!("Label {}: below minimum area or degenerate, skipped", label),
        }
    }

    info!(
        "Analyzed {} particles, {} defective",
        particles.len(),
        particles.iter().filter(|p| p.is_defective).count()
    );

    particles
}
