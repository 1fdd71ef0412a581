//! Collaborator traits for segmentation and alpha matting
//!
//! The orchestration layer never runs the network or the matting solver
//! itself. It talks to them through these traits; the ONNX backend and the
//! test mocks are the implementations.

use crate::{config::MattingOptions, models::ModelId, preconditioner::IcholPreconditioner};
use image::{DynamicImage, GrayImage, RgbImage};

/// Segmentation + matting collaborator
///
/// Implementations must be shareable across the tile workers; a session is
/// loaded once per model and then used read-only.
pub trait SegmentationBackend: Send + Sync {
    /// Loaded network handle
    type Session: Send + Sync;

    /// Load the session for `model`
    ///
    /// # Errors
    /// Any failure to locate or initialize the model.
    fn load_session(&self, model: ModelId) -> anyhow::Result<Self::Session>;

    /// Remove the background of `image`
    ///
    /// The preconditioner is only consulted when `options.alpha_matting` is
    /// set. The returned image has the same dimensions as the input.
    ///
    /// # Errors
    /// Any failure inside segmentation or matting; the message is surfaced
    /// to the caller unmodified.
    fn remove(
        &self,
        image: &DynamicImage,
        session: &Self::Session,
        options: &MattingOptions,
        preconditioner: &IcholPreconditioner,
    ) -> anyhow::Result<DynamicImage>;
}

/// Alpha matting solver that refines a coarse mask into a matte
pub trait MattingSolver: Send + Sync {
    /// Estimate the alpha matte of `image` from the segmentation `mask`
    ///
    /// Trimap thresholds, erosion and epsilon come from `options`; the linear
    /// system is preconditioned with `preconditioner`.
    ///
    /// # Errors
    /// Solver failures such as a factorization that fails for every shift.
    fn estimate_alpha(
        &self,
        image: &RgbImage,
        mask: &GrayImage,
        options: &MattingOptions,
        preconditioner: &IcholPreconditioner,
    ) -> anyhow::Result<GrayImage>;
}
