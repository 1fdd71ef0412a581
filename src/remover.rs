//! Single background removal call
//!
//! Resolves the session through the injected cache, runs the backend and
//! reports how long each phase took.

use crate::{
    config::MattingOptions,
    error::{BgRemovalError, Result},
    inference::SegmentationBackend,
    locale::Locale,
    models::ModelId,
    preconditioner::IcholPreconditioner,
    session_cache::SessionCache,
    tracing_config::spans,
};
use image::DynamicImage;
use instant::Instant;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Wall-clock durations of one removal call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalTimings {
    /// Session acquisition (near zero on a cache hit)
    pub load: Duration,
    /// Segmentation and optional matting
    pub compute: Duration,
}

impl RemovalTimings {
    /// Localized two-line performance summary with two decimals
    #[must_use]
    pub fn summary(&self, locale: Locale) -> String {
        locale.performance_summary(self.load.as_secs_f64(), self.compute.as_secs_f64())
    }

    /// Total of both phases
    #[must_use]
    pub fn total(&self) -> Duration {
        self.load + self.compute
    }
}

/// Result image and timings
#[derive(Debug, Clone)]
pub struct RemovalOutput {
    pub image: DynamicImage,
    pub timings: RemovalTimings,
}

/// Runs one removal against a shared session cache
pub struct BackgroundRemover<B: SegmentationBackend> {
    cache: Arc<SessionCache<B>>,
    locale: Locale,
}

impl<B: SegmentationBackend> BackgroundRemover<B> {
    pub fn new(cache: Arc<SessionCache<B>>, locale: Locale) -> Self {
        Self { cache, locale }
    }

    /// Shorthand for a remover with a fresh cache over `backend`
    pub fn with_backend(backend: Arc<B>, locale: Locale) -> Self {
        Self::new(Arc::new(SessionCache::new(backend)), locale)
    }

    pub fn cache(&self) -> &Arc<SessionCache<B>> {
        &self.cache
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Remove the background of `image` with `model`
    ///
    /// # Errors
    /// - `Input` when no image is given (nothing is loaded or computed)
    /// - `Model` when the session cannot be loaded
    /// - `Computation` with the backend's message when removal fails
    pub fn remove(
        &self,
        image: Option<&DynamicImage>,
        model: ModelId,
        options: &MattingOptions,
        preconditioner: &IcholPreconditioner,
    ) -> Result<RemovalOutput> {
        let Some(image) = image else {
            return Err(BgRemovalError::input(self.locale.no_image()));
        };

        let _span = spans::removal(model, (image.width(), image.height())).entered();
        info!(
            model = %model,
            alpha_matting = options.alpha_matting,
            foreground_threshold = options.foreground_threshold,
            background_threshold = options.background_threshold,
            erode_size = options.erode_size,
            epsilon = options.epsilon,
            only_mask = options.only_mask,
            discard_threshold = preconditioner.discard_threshold(),
            shifts = ?preconditioner.shifts(),
            "Removing background"
        );

        let start = Instant::now();
        let session = self.cache.get_or_load(model)?;
        let load = start.elapsed();

        let start = Instant::now();
        let output = self
            .cache
            .backend()
            .remove(image, &session, options, preconditioner)
            .map_err(|e| BgRemovalError::computation(format!("{e:#}")))?;
        let compute = start.elapsed();

        let timings = RemovalTimings { load, compute };
        debug!(
            load_ms = load.as_millis() as u64,
            compute_ms = compute.as_millis() as u64,
            "Background removal finished"
        );

        Ok(RemovalOutput {
            image: output,
            timings,
        })
    }
}
