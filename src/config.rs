use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{ParticleError, Result};

/// Tunable thresholds and annotation colors for a single pipeline run
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    // Scale-bar calibration
    #[serde(default = "default_scale_bar_length")]
    pub scale_bar_length: f64,

    #[serde(default = "default_physical_unit")]
    pub physical_unit: String,

    /// Cutoff applied to the inverted intensity image
    #[serde(default = "default_scale_bar_binary_threshold")]
    pub scale_bar_binary_threshold: u8,

    #[serde(default = "default_line_kernel_width")]
    pub line_kernel_width: u32,

    #[serde(default = "default_line_kernel_iterations")]
    pub line_kernel_iterations: u32,

    #[serde(default = "default_min_aspect_ratio")]
    pub min_aspect_ratio: f64,

    #[serde(default = "default_min_bar_width")]
    pub min_bar_width: u32,

    #[serde(default = "default_max_bar_height")]
    pub max_bar_height: u32,

    // Segmentation
    #[serde(default = "default_closing_kernel_size")]
    pub closing_kernel_size: u32,

    #[serde(default = "default_closing_iterations")]
    pub closing_iterations: u32,

    #[serde(default = "default_background_dilation_iterations")]
    pub background_dilation_iterations: u32,

    #[serde(default = "default_foreground_distance_fraction")]
    pub foreground_distance_fraction: f64,

    // Defect analysis
    #[serde(default = "default_min_particle_area")]
    pub min_particle_area: f64,

    #[serde(default = "default_solidity_threshold")]
    pub solidity_threshold: f64,

    #[serde(default = "default_min_hull_points")]
    pub min_hull_points: usize,

    // Annotation colors (RGB)
    #[serde(default = "default_regular_color_rgb")]
    pub regular_color_rgb: [u8; 3],

    #[serde(default = "default_defective_color_rgb")]
    pub defective_color_rgb: [u8; 3],

    #[serde(default = "default_defect_chord_color_rgb")]
    pub defect_chord_color_rgb: [u8; 3],

    #[serde(default = "default_depth_text_color_rgb")]
    pub depth_text_color_rgb: [u8; 3],

    #[serde(default = "default_boundary_color_rgb")]
    pub boundary_color_rgb: [u8; 3],

    #[serde(default = "default_scale_bar_color_rgb")]
    pub scale_bar_color_rgb: [u8; 3],
}

fn default_scale_bar_length() -> f64 {
    2000.0
}

fn default_physical_unit() -> String {
    "um".to_string()
}

fn default_scale_bar_binary_threshold() -> u8 {
    50
}

fn default_line_kernel_width() -> u32 {
    30
}

fn default_line_kernel_iterations() -> u32 {
    2
}

fn default_min_aspect_ratio() -> f64 {
    15.0
}

fn default_min_bar_width() -> u32 {
    50
}

fn default_max_bar_height() -> u32 {
    25
}

fn default_closing_kernel_size() -> u32 {
    5
}

fn default_closing_iterations() -> u32 {
    2
}

fn default_background_dilation_iterations() -> u32 {
    3
}

fn default_foreground_distance_fraction() -> f64 {
    0.5
}

fn default_min_particle_area() -> f64 {
    100.0
}

fn default_solidity_threshold() -> f64 {
    0.95
}

fn default_min_hull_points() -> usize {
    4
}

fn default_regular_color_rgb() -> [u8; 3] {
    [0, 255, 0]
}

fn default_defective_color_rgb() -> [u8; 3] {
    [255, 0, 0]
}

fn default_defect_chord_color_rgb() -> [u8; 3] {
    [255, 0, 255]
}

fn default_depth_text_color_rgb() -> [u8; 3] {
    [255, 255, 0]
}

fn default_boundary_color_rgb() -> [u8; 3] {
    [255, 255, 0]
}

fn default_scale_bar_color_rgb() -> [u8; 3] {
    [0, 255, 255]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scale_bar_length: default_scale_bar_length(),
            physical_unit: default_physical_unit(),
            scale_bar_binary_threshold: default_scale_bar_binary_threshold(),
            line_kernel_width: default_line_kernel_width(),
            line_kernel_iterations: default_line_kernel_iterations(),
            min_aspect_ratio: default_min_aspect_ratio(),
            min_bar_width: default_min_bar_width(),
            max_bar_height: default_max_bar_height(),
            closing_kernel_size: default_closing_kernel_size(),
            closing_iterations: default_closing_iterations(),
            background_dilation_iterations: default_background_dilation_iterations(),
            foreground_distance_fraction: default_foreground_distance_fraction(),
            min_particle_area: default_min_particle_area(),
            solidity_threshold: default_solidity_threshold(),
            min_hull_points: default_min_hull_points(),
            regular_color_rgb: default_regular_color_rgb(),
            defective_color_rgb: default_defective_color_rgb(),
            defect_chord_color_rgb: default_defect_chord_color_rgb(),
            depth_text_color_rgb: default_depth_text_color_rgb(),
            boundary_color_rgb: default_boundary_color_rgb(),
            scale_bar_color_rgb: default_scale_bar_color_rgb(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ParticleError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ParticleError::ConfigLoad {
            source: e,
            path: path.to_path_buf(),
        })?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.scale_bar_length > 0.0) {
            return Err(ParticleError::Config(
                "scale_bar_length must be > 0.0".to_string(),
            ));
        }

        if self.line_kernel_width == 0 || self.line_kernel_iterations == 0 {
            return Err(ParticleError::Config(
                "line_kernel_width and line_kernel_iterations must be > 0".to_string(),
            ));
        }

        if self.min_aspect_ratio <= 0.0 {
            return Err(ParticleError::Config(
                "min_aspect_ratio must be > 0.0".to_string(),
            ));
        }

        if self.max_bar_height == 0 {
            return Err(ParticleError::Config(
                "max_bar_height must be > 0".to_string(),
            ));
        }

        if self.closing_kernel_size == 0 {
            return Err(ParticleError::Config(
                "closing_kernel_size must be > 0".to_string(),
            ));
        }

        if self.foreground_distance_fraction <= 0.0 || self.foreground_distance_fraction >= 1.0 {
            return Err(ParticleError::Config(
                "foreground_distance_fraction must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }

        if self.min_particle_area < 0.0 {
            return Err(ParticleError::Config(
                "min_particle_area must be >= 0.0".to_string(),
            ));
        }

        if self.solidity_threshold <= 0.0 || self.solidity_threshold > 1.0 {
            return Err(ParticleError::Config(
                "solidity_threshold must be in (0.0, 1.0]".to_string(),
            ));
        }

        if self.min_hull_points < 3 {
            return Err(ParticleError::Config(
                "min_hull_points must be >= 3".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ParticleError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}
