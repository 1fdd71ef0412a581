//! Tracing configuration for structured logging
//!
//! The library only emits events and spans. Subscribers are installed by the
//! binary through [`TracingConfig`], or by embedders via
//! [`init_library_tracing`].

use crate::models::ModelId;

#[cfg(feature = "cli")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Output format for tracing events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output with colors (default for CLI)
    Console,
    /// Compact console output without colors, for CI logs
    Compact,
    /// JSON structured logging
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Tracing configuration builder
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    /// Output format
    pub format: TracingFormat,
    /// Environment filter string (overrides verbosity if set)
    pub env_filter: Option<String>,
    /// Run ID for correlating the events of one invocation
    pub run_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            env_filter: None,
            run_id: None,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level (0-2+)
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Set custom environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    pub fn with_run_id<S: Into<String>>(mut self, run_id: S) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",  // request parameters, batch progress, session loads
            1 => "debug", // -v: timings, cache hits, tile scheduling
            _ => "trace", // -vv and above
        }
    }

    /// Install the global subscriber
    #[cfg(feature = "cli")]
    pub fn init(self) -> anyhow::Result<()> {
        use tracing_subscriber::fmt;

        let filter = match &self.env_filter {
            Some(env_filter) => EnvFilter::try_new(env_filter)?,
            None => EnvFilter::try_new(self.verbosity_to_filter())?,
        };

        let registry = Registry::default().with(filter);

        match self.format {
            TracingFormat::Console => {
                let fmt_layer = fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_thread_names(false)
                    .with_level(true)
                    .compact();
                registry.with(fmt_layer).try_init()?;
            },
            TracingFormat::Compact => {
                let fmt_layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_thread_names(true)
                    .compact();
                registry.with(fmt_layer).try_init()?;
            },
            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true);
                registry.with(fmt_layer).try_init()?;
            },
        }

        if let Some(run_id) = &self.run_id {
            tracing::info!(run_id = %run_id, "Background removal run started");
        }

        Ok(())
    }
}

/// Initialize tracing with CLI-friendly defaults and a fresh run ID
#[cfg(feature = "cli")]
pub fn init_cli_tracing(verbosity: u8, format: TracingFormat) -> anyhow::Result<()> {
    TracingConfig::new()
        .with_verbosity(verbosity)
        .with_format(format)
        .with_run_id(uuid::Uuid::new_v4().to_string())
        .init()
}

/// Initialize tracing for library usage from `RUST_LOG`
///
/// Does nothing when a global subscriber is already installed.
#[cfg(feature = "cli")]
pub fn init_library_tracing() {
    if tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .finish(),
    )
    .is_ok()
    {
        tracing::debug!("Library tracing initialized");
    }
}

/// Span creation helpers
pub mod spans {
    use super::ModelId;
    use tracing::{Level, Span};

    /// Span around a single session load
    pub fn model_loading(model: ModelId) -> Span {
        tracing::span!(Level::INFO, "model_loading", model = %model)
    }

    /// Span around one background removal call
    pub fn removal(model: ModelId, dimensions: (u32, u32)) -> Span {
        tracing::span!(
            Level::DEBUG,
            "removal",
            model = %model,
            width = %dimensions.0,
            height = %dimensions.1
        )
    }

    /// Span around one quadrant inside a tile worker
    pub fn tile_processing(worker: usize, quadrant: &str) -> Span {
        tracing::span!(
            Level::DEBUG,
            "tile_processing",
            worker = %worker,
            quadrant = %quadrant
        )
    }

    /// Span around a whole batch directory run
    pub fn batch_processing(source: &std::path::Path, file_count: usize) -> Span {
        tracing::span!(
            Level::INFO,
            "batch_processing",
            source = %source.display(),
            file_count = %file_count
        )
    }
}
