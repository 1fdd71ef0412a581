//! Tensor conversion around the segmentation network
//!
//! Input: RGB resized to the model's square resolution, scaled by the image
//! maximum, then normalized per channel (NCHW).
//! Output: first channel min-max normalized into a mask, or for multi-class
//! models every pixel whose best class is not background.

use crate::{
    error::{BgRemovalError, Result},
    models::ModelProfile,
};
use image::{imageops::FilterType, DynamicImage, GrayImage, Luma, RgbaImage};
use ndarray::{Array4, ArrayViewD, Axis, Ix4};

/// Image to tensor and tensor to mask conversions
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Convert `image` into the normalized `1x3xSxS` input tensor
    #[must_use]
    pub fn to_tensor(image: &DynamicImage, profile: &ModelProfile) -> Array4<f32> {
        let size = profile.input_size;
        let resized = image::imageops::resize(&image.to_rgb8(), size, size, FilterType::Lanczos3);

        let max = resized
            .as_raw()
            .iter()
            .copied()
            .max()
            .map_or(1e-6, |m| f32::from(m).max(1e-6));

        let side = size as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for (channel, value) in pixel.0.iter().enumerate() {
                let scaled = f32::from(*value) / max;
                let normalized = (scaled - profile.mean.get(channel).copied().unwrap_or(0.0))
                    / profile.std.get(channel).copied().unwrap_or(1.0);
                if let Some(slot) = tensor.get_mut([0, channel, y as usize, x as usize]) {
                    *slot = normalized;
                }
            }
        }
        tensor
    }

    /// Turn the network output into a mask of `width x height`
    ///
    /// # Errors
    /// `Computation` when the output is not a non-empty 4D tensor.
    #[allow(clippy::indexing_slicing)] // indices bounded by the tensor's own dimensions
    pub fn mask_from_output(
        output: ArrayViewD<'_, f32>,
        multiclass: bool,
        width: u32,
        height: u32,
    ) -> Result<GrayImage> {
        let output = output.into_dimensionality::<Ix4>().map_err(|e| {
            BgRemovalError::computation(format!("Expected 4D segmentation output: {e}"))
        })?;
        let (_, channels, rows, cols) = output.dim();
        if channels == 0 || rows == 0 || cols == 0 {
            return Err(BgRemovalError::computation("Segmentation output is empty"));
        }
        let batch = output.index_axis(Axis(0), 0);

        let raw = if multiclass {
            GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
                let (x, y) = (x as usize, y as usize);
                let best = (0..channels)
                    .max_by(|a, b| batch[[*a, y, x]].total_cmp(&batch[[*b, y, x]]))
                    .unwrap_or(0);
                Luma([if best == 0 { 0 } else { 255 }])
            })
        } else {
            let plane = batch.index_axis(Axis(0), 0);
            let min = plane.iter().copied().fold(f32::INFINITY, f32::min);
            let max = plane.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let range = (max - min).max(f32::EPSILON);
            GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
                let value = (plane[[y as usize, x as usize]] - min) / range;
                Luma([(value * 255.0).round().clamp(0.0, 255.0) as u8])
            })
        };

        Ok(image::imageops::resize(&raw, width, height, FilterType::Lanczos3))
    }

    /// Cutout of `image` with `mask` as alpha
    #[must_use]
    pub fn apply_mask(image: &DynamicImage, mask: &GrayImage) -> DynamicImage {
        let mut rgba: RgbaImage = image.to_rgba8();
        for (pixel, alpha) in rgba.pixels_mut().zip(mask.pixels()) {
            pixel.0[3] = alpha.0[0];
        }
        DynamicImage::ImageRgba8(rgba)
    }
}
