// src/report.rs - Analysis report and population statistics

use image::{GrayImage, RgbImage};
use serde::Serialize;

use crate::calibration::CalibrationResult;
use crate::defect_analysis::Particle;
use crate::segmentation::LabelMap;

/// Area statistics over all reported particles
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PopulationStatistics {
    pub particle_count: usize,
    pub defective_count: usize,
    pub total_area_px: f64,
    pub mean_area_px: f64,
    pub min_area_px: f64,
    pub max_area_px: f64,
    /// Squared physical units; only when calibrated
    pub total_area_physical: Option<f64>,
    pub mean_area_physical: Option<f64>,
}

impl PopulationStatistics {
    pub fn from_particles(particles: &[Particle], calibration: &CalibrationResult) -> Self {
        if particles.is_empty() {
            return PopulationStatistics::default();
        }

        let areas = particles.iter().map(|p| p.area);
        let total_area_px: f64 = areas.clone().sum();
        let min_area_px = areas.clone().fold(f64::INFINITY, f64::min);
        let max_area_px = areas.fold(0.0, f64::max);
        let mean_area_px = total_area_px / particles.len() as f64;

        let area_factor = calibration
            .success
            .then(|| calibration.microns_per_pixel * calibration.microns_per_pixel);

        PopulationStatistics {
            particle_count: particles.len(),
            defective_count: particles.iter().filter(|p| p.is_defective).count(),
            total_area_px,
            mean_area_px,
            min_area_px,
            max_area_px,
            total_area_physical: area_factor.map(|f| total_area_px * f),
            mean_area_physical: area_factor.map(|f| mean_area_px * f),
        }
    }
}

/// Masks produced along the way, kept for debug output
#[derive(Debug, Clone)]
pub struct Intermediates {
    pub line_mask: GrayImage,
    pub binary_mask: GrayImage,
    pub sure_foreground: GrayImage,
}

/// Everything one pipeline run produces
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub filename: String,
    pub physical_unit: String,
    pub calibration: CalibrationResult,
    pub particles: Vec<Particle>,
    pub statistics: PopulationStatistics,
    #[serde(skip)]
    pub label_map: LabelMap,
    #[serde(skip)]
    pub annotated: RgbImage,
    #[serde(skip)]
    pub intermediates: Intermediates,
}

impl AnalysisReport {
    /// Calibration summary followed by one block per particle
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let unit = &self.physical_unit;

        match (&self.calibration.bar, self.calibration.success) {
            (Some(bar), true) => {
                lines.push(format!("Scale bar detected. Pixel width: {}", bar.width));
                lines.push(format!(
                    "Conversion factor: {:.4} {}/pixel",
                    self.calibration.microns_per_pixel, unit
                ));
            }
            _ => lines.push("WARNING: Scale bar not detected! Measurements will be in pixels.".to_string()),
        }

        for particle in &self.particles {
            lines.push(format!(
                "Particle ID: {:<3} | Solidity: {:.4} | Status: {}",
                particle.id,
                particle.solidity,
                if particle.is_defective { "Defective" } else { "OK" }
            ));

            if let Some(defect) = &particle.defect {
                match defect.depth_physical {
                    Some(physical) => lines.push(format!(
                        "      Max Defect Depth: {:.2} pixels ({:.2} {})",
                        defect.depth_pixels, physical, unit
                    )),
                    None => lines.push(format!(
                        "      Max Defect Depth: {:.2} pixels",
                        defect.depth_pixels
                    )),
                }
            }
        }

        let stats = &self.statistics;
        let mut summary = format!(
            "Particles: {} ({} defective) | Mean area: {:.1} px^2",
            stats.particle_count, stats.defective_count, stats.mean_area_px
        );
        if let Some(mean_physical) = stats.mean_area_physical {
            summary.push_str(&format!(" ({:.1} {}^2)", mean_physical, unit));
        }
        lines.push(summary);

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn particle(id: usize, area: f64, is_defective: bool) -> Particle {
        Particle {
            id,
            label: id as u32 + 1,
            contour: Vec::new(),
            area,
            hull_area: area,
            solidity: 1.0,
            centroid: (0.0, 0.0),
            is_defective,
            defect: None,
        }
    }

    #[test]
    fn statistics_of_empty_population_are_zero() {
        let stats = PopulationStatistics::from_particles(&[], &CalibrationResult::failed());
        assert_eq!(stats, PopulationStatistics::default());
    }

    #[test]
    fn statistics_scale_area_by_squared_ratio() {
        let calibration = CalibrationResult {
            microns_per_pixel: 2.0,
            success: true,
            bar: None,
        };
        let particles = vec![particle(1, 100.0, false), particle(2, 300.0, true)];
        let stats = PopulationStatistics::from_particles(&particles, &calibration);
        assert_eq!(stats.particle_count, 2);
        assert_eq!(stats.defective_count, 1);
        assert_approx_eq!(stats.mean_area_px, 200.0);
        assert_approx_eq!(stats.min_area_px, 100.0);
        assert_approx_eq!(stats.max_area_px, 300.0);
        assert_approx_eq!(stats.total_area_physical.unwrap(), 1600.0);
    }

    #[test]
    fn uncalibrated_statistics_have_no_physical_area() {
        let stats = PopulationStatistics::from_particles(&[particle(1, 150.0, false)], &CalibrationResult::failed());
        assert!(stats.mean_area_physical.is_none());
    }
}
