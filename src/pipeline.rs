// src/pipeline.rs - One-image, one-pass measurement pipeline

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::annotate::render_annotations;
use crate::calibration::calibrate_with_line_mask;
use crate::config::Config;
use crate::defect_analysis::analyze_particles;
use crate::errors::Result;
use crate::image_io::{save_image, InputImage};
use crate::image_utils::{mask_to_rgb, to_intensity};
use crate::output::{write_json_report, write_particle_csv};
use crate::report::{AnalysisReport, Intermediates, PopulationStatistics};
use crate::segmentation::segment_gray;

/// Which artifacts `run_and_save` writes next to the annotated image
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub write_json: bool,
    pub save_debug_images: bool,
}

/// Paths of the files written by `run_and_save`
#[derive(Debug, Clone)]
pub struct SavedArtifacts {
    pub annotated_image: PathBuf,
    pub particle_csv: PathBuf,
    pub json_report: Option<PathBuf>,
}

/// Run calibration, segmentation and defect analysis on one image.
///
/// Stages run strictly in order and share no state with other invocations.
pub fn process_image(input: &InputImage, config: &Config) -> Result<AnalysisReport> {
    config.validate()?;

    let (width, height) = (input.image.width(), input.image.height());
    info!("Processing {} ({}x{})", input.filename, width, height);

    let gray = to_intensity(&input.image);

    // Step 1: scale-bar calibration
    let (calibration, line_mask) = calibrate_with_line_mask(&gray, config);

    // Step 2: watershed segmentation
    let segmentation = segment_gray(&gray, config);

    // Step 3: per-particle defect analysis
    let particles = analyze_particles(&segmentation.label_map, &calibration, config);
    let statistics = PopulationStatistics::from_particles(&particles, &calibration);

    // Step 4: annotation
    let annotated = render_annotations(
        &input.image,
        &segmentation.label_map,
        &particles,
        &calibration,
        config,
    );

    debug!(
        "{}: otsu level {}, {} seeds, {} particles kept",
        input.filename,
        segmentation.otsu_level,
        segmentation.seed_count,
        particles.len()
    );

    Ok(AnalysisReport {
        filename: input.filename.clone(),
        physical_unit: config.physical_unit.clone(),
        calibration,
        particles,
        statistics,
        label_map: segmentation.label_map,
        annotated,
        intermediates: Intermediates {
            line_mask,
            binary_mask: segmentation.binary_mask,
            sure_foreground: segmentation.sure_foreground,
        },
    })
}

/// Run the pipeline and write the annotated image, CSV and optional JSON/debug files
pub fn run_and_save<P: AsRef<Path>>(
    input: &InputImage,
    config: &Config,
    output_dir: P,
    options: OutputOptions,
) -> Result<(AnalysisReport, SavedArtifacts)> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let report = process_image(input, config)?;

    let annotated_image = output_dir.join(format!("{}_annotated.{}", input.filename, input.extension));
    save_image(&report.annotated, &annotated_image)?;

    let particle_csv = write_particle_csv(&report, output_dir, &input.filename)?;

    let json_report = if options.write_json {
        Some(write_json_report(&report, output_dir, &input.filename)?)
    } else {
        None
    };

    if options.save_debug_images {
        save_debug_images(&report, output_dir, &input.filename)?;
    }

    info!("Results for {} written to {}", input.filename, output_dir.display());

    Ok((
        report,
        SavedArtifacts {
            annotated_image,
            particle_csv,
            json_report,
        },
    ))
}

fn save_debug_images(report: &AnalysisReport, output_dir: &Path, filename: &str) -> Result<()> {
    let debug_dir = output_dir.join("debug");
    fs::create_dir_all(&debug_dir)?;

    let intermediates = &report.intermediates;
    save_image(&mask_to_rgb(&intermediates.line_mask), debug_dir.join(format!("{}_lines.png", filename)))?;
    save_image(&mask_to_rgb(&intermediates.binary_mask), debug_dir.join(format!("{}_binary.png", filename)))?;
    save_image(&mask_to_rgb(&intermediates.sure_foreground), debug_dir.join(format!("{}_sure_fg.png", filename)))?;
    save_image(&report.label_map.to_color_image(), debug_dir.join(format!("{}_labels.png", filename)))?;

    debug!("Debug images saved to {}", debug_dir.display());

    Ok(())
}
