#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # bgremove-tiles
//!
//! Background removal for rembg-style segmentation models, with two ways of
//! scaling a request out:
//!
//! - **Tiled pipeline**: one image is split into four quadrants that are
//!   processed by four parallel workers and merged back in fixed quadrant
//!   order, whatever order the workers finish in.
//! - **Batch runner**: every file of a directory is processed in sorted order
//!   into a fresh, timestamp-named result directory.
//!
//! Alpha matting is parameterized by an incomplete-Cholesky preconditioner
//! (a discard threshold plus an ordered sequence of diagonal shifts) that is
//! built from user text by [`params`] and passed unchanged to the matting
//! collaborator.
//!
//! ## Features
//!
//! - **Session cache**: each model is loaded at most once per cache, also under
//!   concurrent requests
//! - **Localized messages**: English and Simplified Chinese validation errors
//!   and performance summaries
//! - **ONNX Runtime backend** (`onnx` feature): `U2NET_HOME`/`~/.u2net` model
//!   layout with CUDA and `CoreML` execution providers
//! - **CLI** (`cli` feature): single file, tiled and batch modes with progress
//!   bars
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgremove_tiles::{
//!     backends::OnnxBackend, config::TilingMode, params::RawSolverParams,
//!     ImageIOService, Locale, ModelId, RemovalConfig, TiledPipeline,
//! };
//! use std::sync::Arc;
//!
//! # fn example() -> anyhow::Result<()> {
//! let raw = RawSolverParams {
//!     shifts: Some("0, 1e-4, 1e-2".to_string()),
//!     ..RawSolverParams::default()
//! };
//! let config = RemovalConfig::builder()
//!     .model(ModelId::U2Net)
//!     .raw_solver_params(&raw)?
//!     .build()?;
//!
//! let backend = Arc::new(OnnxBackend::from_env());
//! let pipeline = TiledPipeline::new(backend, Locale::En, TilingMode::Exact);
//!
//! let image = ImageIOService::load_image("input.jpg")?;
//! let output = pipeline.process_tiled(
//!     &image,
//!     config.model,
//!     &config.matting,
//!     &config.preconditioner(),
//! )?;
//! ImageIOService::save_png(&output.image, "output.png")?;
//! println!("{}", output.timings.summary(Locale::En));
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `onnx` (default): ONNX Runtime segmentation backend
//! - `cli` (default): command-line interface, progress bars and subscriber setup
//! - `webp-support` (default): WebP image input
//! - `tracing-json`: JSON log output for the CLI
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! bgremove-tiles = { version = "0.1", default-features = false, features = ["onnx"] }
//! ```
//!
//! Any [`SegmentationBackend`] implementation can drive the pipeline and the
//! batch runner, so the ONNX backend is optional.

pub mod backends;
pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod locale;
pub mod models;
pub mod params;
pub mod pipeline;
pub mod preconditioner;
pub mod remover;
pub mod services;
pub mod session_cache;
pub mod tiling;
pub mod tracing_config;
pub mod utils;

// Public API exports
#[cfg(feature = "onnx")]
pub use backends::{ExecutionProvider, OnnxBackend};
pub use batch::{BatchOutcome, BatchPlan, BatchReport, BatchRunner};
pub use config::{BatchFailurePolicy, MattingOptions, RemovalConfig, TilingMode};
pub use error::{BgRemovalError, Result};
pub use inference::{MattingSolver, SegmentationBackend};
pub use locale::Locale;
pub use models::ModelId;
pub use params::{RawSolverParams, SolverParams};
pub use pipeline::TiledPipeline;
pub use preconditioner::{IcholConfig, IcholPreconditioner, PreconditionerFactory};
pub use remover::{BackgroundRemover, RemovalOutput, RemovalTimings};
pub use services::{ImageIOService, NoOpProgressReporter, ProgressReporter, TracingProgressReporter};
pub use session_cache::{SessionCache, SessionCacheStats};
pub use tiling::{merge_quadrants, split_quadrants, Quadrant};
pub use tracing_config::{spans, TracingConfig, TracingFormat};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, init_library_tracing};
