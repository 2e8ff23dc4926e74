use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Error types for particle inspection
#[derive(Error, Debug)]
pub enum ParticleError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Image has zero width or height: {path}")]
    EmptyImage { path: PathBuf },

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, ParticleError>;
