// src/lib.rs - Library interface for particle inspection

pub mod annotate;
pub mod calibration;
pub mod config;
pub mod defect_analysis;
pub mod errors;
pub mod font;
pub mod geometry;
pub mod image_io;
pub mod image_utils;
pub mod morphology;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod segmentation;
pub mod watershed;

// Re-export commonly used types and functions
pub use errors::{ParticleError, Result};
pub use config::Config;
pub use pipeline::{process_image, run_and_save, OutputOptions, SavedArtifacts};
pub use image_io::{InputImage, load_image, save_image};
pub use report::{AnalysisReport, PopulationStatistics};

// Re-export the three stages
pub use calibration::{
    calibrate,
    calibrate_gray,
    CalibrationResult,
    ScaleBarCandidate,
};
pub use segmentation::{
    segment_particles,
    segment_gray,
    LabelMap,
    Segmentation,
    BACKGROUND,
    BOUNDARY,
    FIRST_PARTICLE,
};
pub use defect_analysis::{
    analyze_particles,
    measure_contour,
    DefectMeasurement,
    Particle,
};
