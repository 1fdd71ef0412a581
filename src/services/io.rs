//! Image file input/output
//!
//! Keeps decoding and encoding out of the batch runner so every failure is
//! mapped to the crate's error type in one place.

use crate::error::{BgRemovalError, Result};
use image::DynamicImage;
use std::path::Path;

/// Service for image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// Falls back to content sniffing when the extension does not match the
    /// actual format.
    ///
    /// # Errors
    /// - `Filesystem` when the file cannot be read
    /// - `Image` when neither the extension nor the content can be decoded
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(image::ImageError::IoError(e)) => {
                Err(BgRemovalError::filesystem("read image file", path_ref, e))
            },
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );

                let data = std::fs::read(path_ref)
                    .map_err(|io_err| BgRemovalError::filesystem("read image data", path_ref, io_err))?;
                image::load_from_memory(&data).map_err(BgRemovalError::from)
            },
        }
    }

    /// Save an image as PNG, creating the parent directory if needed
    ///
    /// # Errors
    /// - `Filesystem` when the directory or file cannot be written
    /// - `Image` when encoding fails
    pub fn save_png<P: AsRef<Path>>(image: &DynamicImage, path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| BgRemovalError::filesystem("create output directory", parent, e))?;
        }

        match image.save_with_format(path_ref, image::ImageFormat::Png) {
            Ok(()) => Ok(()),
            Err(image::ImageError::IoError(e)) => {
                Err(BgRemovalError::filesystem("write output image", path_ref, e))
            },
            Err(e) => Err(BgRemovalError::from(e)),
        }
    }

    /// Check if a file path has a supported image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                matches!(
                    ext.to_lowercase().as_str(),
                    "jpg" | "jpeg" | "png" | "webp" | "tiff" | "tif"
                )
            })
    }
}
