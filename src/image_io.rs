use std::path::{Path, PathBuf};
use image::{DynamicImage, ImageFormat, RgbImage};

use crate::errors::{ParticleError, Result};

/// Represents an input image with its metadata
pub struct InputImage {
    pub image: DynamicImage,
    pub path: PathBuf,
    pub filename: String,
    /// Lower-cased extension of the source file, used to pick the output format
    pub extension: String,
}

impl InputImage {
    /// Wrap an in-memory image; the name is used for output files
    pub fn from_image(image: DynamicImage, filename: &str) -> Result<Self> {
        let path = PathBuf::from(format!("{}.png", filename));
        if image.width() == 0 || image.height() == 0 {
            return Err(ParticleError::EmptyImage { path });
        }

        Ok(InputImage {
            image,
            path,
            filename: filename.to_string(),
            extension: "png".to_string(),
        })
    }
}

/// Load an image of any supported format, rejecting zero-sized ones
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(ParticleError::InvalidPath(path.to_path_buf()));
    }

    // Get filename without extension
    let filename = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ParticleError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let extension = path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_else(|| "png".to_string());

    let image = image::open(path)?;

    if image.width() == 0 || image.height() == 0 {
        return Err(ParticleError::EmptyImage { path: path.to_path_buf() });
    }

    Ok(InputImage {
        image,
        path: path.to_path_buf(),
        filename,
        extension,
    })
}

/// Save an RGB image, choosing the encoder from the path's extension (PNG when unknown)
pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
    image.save_with_format(path, format)?;

    Ok(())
}
