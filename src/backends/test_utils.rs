//! Test utilities and mock backends
//!
//! `MockBackend` implements `SegmentationBackend` without any model files.
//! Its removal is a deterministic per-pixel transform, so processing an
//! image whole or in tiles yields identical pixels.

use crate::{
    config::MattingOptions, inference::SegmentationBackend, models::ModelId,
    preconditioner::IcholPreconditioner,
};
use image::{DynamicImage, Rgba, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type DelayFn = dyn Fn(&DynamicImage) -> Duration + Send + Sync;
type FailFn = dyn Fn(&DynamicImage) -> bool + Send + Sync;

/// Session handed out by the mock backend
#[derive(Debug)]
pub struct MockSession {
    pub model: ModelId,
    /// Sequence number of the load that produced this session
    pub id: usize,
}

/// Record of one removal call
#[derive(Debug, Clone)]
pub struct RemoveCall {
    pub model: ModelId,
    pub dimensions: (u32, u32),
    pub options: MattingOptions,
    pub preconditioner: IcholPreconditioner,
}

/// Mock segmentation backend
pub struct MockBackend {
    loads: AtomicUsize,
    failing_loads: AtomicUsize,
    load_delay: Duration,
    remove_delay: Option<Box<DelayFn>>,
    remove_failure: Option<Box<FailFn>>,
    calls: Arc<Mutex<Vec<RemoveCall>>>,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            loads: AtomicUsize::new(0),
            failing_loads: AtomicUsize::new(0),
            load_delay: Duration::ZERO,
            remove_delay: None,
            remove_failure: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sleep this long inside every session load
    #[must_use]
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Fail the first `count` session loads
    #[must_use]
    pub fn failing_loads(self, count: usize) -> Self {
        self.failing_loads.store(count, Ordering::SeqCst);
        self
    }

    /// Sleep for a duration computed from the input before returning
    #[must_use]
    pub fn with_remove_delay<F>(mut self, delay: F) -> Self
    where
        F: Fn(&DynamicImage) -> Duration + Send + Sync + 'static,
    {
        self.remove_delay = Some(Box::new(delay));
        self
    }

    /// Fail removal for inputs matching `predicate`
    #[must_use]
    pub fn failing_remove_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&DynamicImage) -> bool + Send + Sync + 'static,
    {
        self.remove_failure = Some(Box::new(predicate));
        self
    }

    /// Number of successful and failed session loads so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Removal calls made so far
    pub fn calls(&self) -> Vec<RemoveCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The transform applied by `remove`, exposed for expected-output checks
    #[must_use]
    pub fn transform(image: &DynamicImage) -> DynamicImage {
        let rgba = image.to_rgba8();
        let mut out = RgbaImage::new(rgba.width(), rgba.height());
        for (x, y, pixel) in rgba.enumerate_pixels() {
            let [r, g, b, _] = pixel.0;
            let luma = (u16::from(r) + u16::from(g) + u16::from(b)) / 3;
            let alpha = if luma > 127 { 255 } else { 0 };
            out.put_pixel(x, y, Rgba([255 - r, 255 - g, 255 - b, alpha]));
        }
        DynamicImage::ImageRgba8(out)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentationBackend for MockBackend {
    type Session = MockSession;

    fn load_session(&self, model: ModelId) -> anyhow::Result<MockSession> {
        let id = self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.load_delay.is_zero() {
            std::thread::sleep(self.load_delay);
        }

        let remaining = self.failing_loads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_loads.store(remaining - 1, Ordering::SeqCst);
            anyhow::bail!("mock model file missing for {model}");
        }

        Ok(MockSession { model, id })
    }

    fn remove(
        &self,
        image: &DynamicImage,
        session: &MockSession,
        options: &MattingOptions,
        preconditioner: &IcholPreconditioner,
    ) -> anyhow::Result<DynamicImage> {
        self.calls.lock().unwrap().push(RemoveCall {
            model: session.model,
            dimensions: (image.width(), image.height()),
            options: *options,
            preconditioner: preconditioner.clone(),
        });

        if let Some(delay) = &self.remove_delay {
            std::thread::sleep(delay(image));
        }
        if let Some(predicate) = &self.remove_failure {
            if predicate(image) {
                anyhow::bail!("matting solver did not converge for any shift");
            }
        }

        Ok(Self::transform(image))
    }
}

/// Image with a distinct solid color per quadrant (floor-split like the pipeline)
#[must_use]
pub fn quadrant_image(width: u32, height: u32) -> DynamicImage {
    let colors = [
        Rgba([200, 30, 30, 255]),
        Rgba([30, 200, 30, 255]),
        Rgba([30, 30, 200, 255]),
        Rgba([220, 220, 220, 255]),
    ];
    let (mid_x, mid_y) = (width / 2, height / 2);
    let image = RgbaImage::from_fn(width, height, |x, y| {
        let index = usize::from(x >= mid_x) + 2 * usize::from(y >= mid_y);
        colors[index]
    });
    DynamicImage::ImageRgba8(image)
}

/// Image whose every pixel is distinct, for round-trip checks
#[must_use]
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x * 7 + y * 13) % 256) as u8, 255])
    });
    DynamicImage::ImageRgba8(image)
}
