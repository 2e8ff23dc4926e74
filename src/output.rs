use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use csv::Writer;

use crate::errors::Result;
use crate::report::AnalysisReport;

/// Write one CSV row per particle to `<output_dir>/<filename>_particles.csv`
pub fn write_particle_csv<P: AsRef<Path>>(
    report: &AnalysisReport,
    output_dir: P,
    filename: &str,
) -> Result<PathBuf> {
    let output_path = output_dir.as_ref().join(format!("{}_particles.csv", filename));

    // Create directory if it doesn't exist
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(&output_path)?;

    let depth_physical_header = format!("Depth_{}", report.physical_unit);
    writer.write_record([
        "Particle_Index",
        "Label",
        "Centroid_X",
        "Centroid_Y",
        "Area_px",
        "Hull_Area_px",
        "Solidity",
        "Status",
        "Depth_px",
        depth_physical_header.as_str(),
    ])?;

    for particle in &report.particles {
        let depth_px = particle
            .defect
            .as_ref()
            .map(|d| format!("{:.6}", d.depth_pixels))
            .unwrap_or_default();
        let depth_physical = particle
            .defect
            .as_ref()
            .and_then(|d| d.depth_physical)
            .map(|d| format!("{:.6}", d))
            .unwrap_or_default();

        writer.write_record(&[
            particle.id.to_string(),
            particle.label.to_string(),
            format!("{:.2}", particle.centroid.0),
            format!("{:.2}", particle.centroid.1),
            format!("{:.1}", particle.area),
            format!("{:.1}", particle.hull_area),
            format!("{:.6}", particle.solidity),
            if particle.is_defective { "Defective" } else { "OK" }.to_string(),
            depth_px,
            depth_physical,
        ])?;
    }

    writer.flush()?;

    Ok(output_path)
}

/// Serialize the report (calibration, particles, statistics) to `<output_dir>/<filename>_report.json`
pub fn write_json_report<P: AsRef<Path>>(
    report: &AnalysisReport,
    output_dir: P,
    filename: &str,
) -> Result<PathBuf> {
    let output_path = output_dir.as_ref().join(format!("{}_report.json", filename));

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(&output_path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;

    Ok(output_path)
}
