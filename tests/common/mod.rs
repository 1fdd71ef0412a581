//! Shared fixtures for the integration tests

#![allow(dead_code)]

use bgremove_tiles::{IcholPreconditioner, MattingOptions, ModelId, SegmentationBackend};
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-pixel backend: RGB is inverted and alpha marks bright pixels
///
/// Each output pixel depends only on the matching input pixel, so tiled and
/// direct processing must agree exactly.
#[derive(Default)]
pub struct PixelBackend {
    loads: AtomicUsize,
    removals: AtomicUsize,
}

impl PixelBackend {
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn removal_count(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }
}

impl SegmentationBackend for PixelBackend {
    type Session = ModelId;

    fn load_session(&self, model: ModelId) -> anyhow::Result<ModelId> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(model)
    }

    fn remove(
        &self,
        image: &DynamicImage,
        _session: &ModelId,
        _options: &MattingOptions,
        _preconditioner: &IcholPreconditioner,
    ) -> anyhow::Result<DynamicImage> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        let mut out = image.to_rgba8();
        for pixel in out.pixels_mut() {
            let [r, g, b, _] = pixel.0;
            let bright = (u16::from(r) + u16::from(g) + u16::from(b)) / 3 > 127;
            *pixel = Rgba([255 - r, 255 - g, 255 - b, if bright { 255 } else { 0 }]);
        }
        Ok(DynamicImage::ImageRgba8(out))
    }
}

/// Image where every pixel is distinct enough to expose misplaced tiles
pub fn pattern_image(width: u32, height: u32) -> DynamicImage {
    let mut image = RgbaImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        *pixel = Rgba([(x % 256) as u8, (y % 256) as u8, ((x * 7 + y * 13) % 256) as u8, 255]);
    }
    DynamicImage::ImageRgba8(image)
}

/// Write a PNG fixture into `dir`
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) {
    pattern_image(width, height).save(dir.join(name)).unwrap();
}
