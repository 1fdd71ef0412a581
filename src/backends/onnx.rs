//! ONNX Runtime segmentation backend
//!
//! Loads `<model_dir>/<id>.onnx`, runs the network on the whole input and
//! turns the first output into a mask. Alpha matting is delegated to an
//! injected [`MattingSolver`].

use crate::{
    config::MattingOptions,
    inference::{MattingSolver, SegmentationBackend},
    models::ModelId,
    preconditioner::IcholPreconditioner,
    utils::ImagePreprocessor,
};
use anyhow::{anyhow, bail, Context};
use image::{DynamicImage, GrayImage};
use instant::Instant;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Environment variable naming the model directory
pub const MODEL_DIR_ENV: &str = "U2NET_HOME";

/// Hardware execution provider for ONNX Runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    /// CUDA, then CoreML, then CPU
    #[default]
    Auto,
    Cpu,
    Cuda,
    #[cfg_attr(feature = "cli", value(name = "coreml"))]
    #[serde(rename = "coreml")]
    CoreMl,
}

/// Model directory from `U2NET_HOME`, falling back to `~/.u2net`
#[must_use]
pub fn default_model_dir() -> PathBuf {
    match std::env::var_os(MODEL_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".u2net"),
    }
}

/// Loaded ONNX Runtime session
///
/// `Session::run` needs exclusive access, so concurrent removals with the
/// same session are serialized.
pub struct OnnxSession {
    model: ModelId,
    session: Mutex<Session>,
}

impl OnnxSession {
    pub fn model(&self) -> ModelId {
        self.model
    }
}

/// Segmentation backend running rembg-style models with ONNX Runtime
pub struct OnnxBackend {
    model_dir: PathBuf,
    provider: ExecutionProvider,
    intra_threads: usize,
    matting: Option<Arc<dyn MattingSolver>>,
}

impl OnnxBackend {
    /// Backend reading models from `model_dir`
    pub fn new<P: Into<PathBuf>>(model_dir: P) -> Self {
        Self {
            model_dir: model_dir.into(),
            provider: ExecutionProvider::default(),
            intra_threads: 0,
            matting: None,
        }
    }

    /// Backend reading models from [`default_model_dir`]
    pub fn from_env() -> Self {
        Self::new(default_model_dir())
    }

    #[must_use]
    pub fn with_execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Threads per operator; 0 uses all available cores
    #[must_use]
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = threads;
        self
    }

    /// Solver used when alpha matting is requested
    #[must_use]
    pub fn with_matting_solver(mut self, solver: Arc<dyn MattingSolver>) -> Self {
        self.matting = Some(solver);
        self
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Path of the weights for `model`
    pub fn model_path(&self, model: ModelId) -> PathBuf {
        self.model_dir.join(model.file_name())
    }

    fn session_builder(&self) -> anyhow::Result<ort::session::builder::SessionBuilder> {
        let builder = Session::builder()
            .context("Failed to create session builder")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?;

        let builder = match self.provider {
            ExecutionProvider::Cpu => {
                log::info!("Using CPU execution provider");
                builder
            },
            ExecutionProvider::Cuda => {
                let cuda = CUDAExecutionProvider::default();
                if OrtExecutionProvider::is_available(&cuda).unwrap_or(false) {
                    log::info!("Using CUDA execution provider");
                    builder
                        .with_execution_providers([cuda.build()])
                        .context("Failed to set CUDA execution provider")?
                } else {
                    log::warn!("CUDA execution provider requested but not available, falling back to CPU");
                    builder
                }
            },
            ExecutionProvider::CoreMl => {
                let coreml = CoreMLExecutionProvider::default();
                if OrtExecutionProvider::is_available(&coreml).unwrap_or(false) {
                    log::info!("Using CoreML execution provider");
                    builder
                        .with_execution_providers([coreml.build()])
                        .context("Failed to set CoreML execution provider")?
                } else {
                    log::warn!("CoreML execution provider requested but not available, falling back to CPU");
                    builder
                }
            },
            ExecutionProvider::Auto => {
                let mut providers = Vec::new();
                let cuda = CUDAExecutionProvider::default();
                if OrtExecutionProvider::is_available(&cuda).unwrap_or(false) {
                    providers.push(cuda.build());
                }
                let coreml = CoreMLExecutionProvider::default();
                if OrtExecutionProvider::is_available(&coreml).unwrap_or(false) {
                    providers.push(coreml.build());
                }

                if providers.is_empty() {
                    log::debug!("No hardware acceleration available, using CPU");
                    builder
                } else {
                    log::info!("Hardware acceleration enabled with {} provider(s)", providers.len());
                    builder
                        .with_execution_providers(providers)
                        .context("Failed to set auto execution providers")?
                }
            },
        };

        let intra_threads = if self.intra_threads > 0 {
            self.intra_threads
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4)
        };

        builder
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")
    }

    fn segment(&self, image: &DynamicImage, session: &OnnxSession) -> anyhow::Result<GrayImage> {
        let model = session.model;
        let tensor = ImagePreprocessor::to_tensor(image, &model.profile());
        let input = Value::from_array(tensor).context("Failed to convert input tensor")?;

        let start = Instant::now();
        let mut guard = session.session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = guard
            .run(ort::inputs![input])
            .with_context(|| format!("ONNX inference failed for {model}"))?;
        log::debug!(
            "Inference for {} took {:.2}ms",
            model,
            start.elapsed().as_secs_f64() * 1000.0
        );

        let first_key = outputs
            .keys()
            .next()
            .ok_or_else(|| anyhow!("No output tensors found"))?
            .to_string();
        let output = outputs
            .get(&first_key)
            .ok_or_else(|| anyhow!("First output tensor not found"))?
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let mask = ImagePreprocessor::mask_from_output(
            output,
            model.is_multiclass(),
            image.width(),
            image.height(),
        )?;
        Ok(mask)
    }
}

impl SegmentationBackend for OnnxBackend {
    type Session = OnnxSession;

    fn load_session(&self, model: ModelId) -> anyhow::Result<OnnxSession> {
        let path = self.model_path(model);
        if !path.is_file() {
            bail!(
                "Model file '{}' not found (set {} to the model directory)",
                path.display(),
                MODEL_DIR_ENV
            );
        }

        let session = self
            .session_builder()?
            .commit_from_file(&path)
            .with_context(|| format!("Failed to create session from '{}'", path.display()))?;
        log::debug!("ONNX Runtime session created for {}", model);

        Ok(OnnxSession {
            model,
            session: Mutex::new(session),
        })
    }

    fn remove(
        &self,
        image: &DynamicImage,
        session: &OnnxSession,
        options: &MattingOptions,
        preconditioner: &IcholPreconditioner,
    ) -> anyhow::Result<DynamicImage> {
        let mask = self.segment(image, session)?;

        if options.only_mask {
            return Ok(DynamicImage::ImageLuma8(mask));
        }

        if options.alpha_matting {
            let solver = self
                .matting
                .as_ref()
                .ok_or_else(|| anyhow!("Alpha matting requested but no matting solver is configured"))?;
            let alpha = solver.estimate_alpha(&image.to_rgb8(), &mask, options, preconditioner)?;
            return Ok(ImagePreprocessor::apply_mask(image, &alpha));
        }

        Ok(ImagePreprocessor::apply_mask(image, &mask))
    }
}
