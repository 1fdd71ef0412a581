//! Conversion of CLI arguments into a `RemovalConfig`

use crate::cli::main_impl::Cli;
use crate::{
    config::{BatchFailurePolicy, RemovalConfig},
    params::{resolve_discard_threshold, resolve_epsilon, resolve_shifts},
};
use anyhow::{Context, Result};

/// Layers CLI flags over the configuration file (or the defaults)
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the removal configuration for this invocation
    ///
    /// Solver numbers are parsed from text with the effective locale, so a
    /// bad `--shifts` value yields the localized, field-named message.
    pub(crate) fn from_cli(cli: &Cli) -> Result<RemovalConfig> {
        let base = match &cli.config {
            Some(path) => RemovalConfig::from_json_file(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
            None => RemovalConfig::default(),
        };

        let locale = cli.locale.unwrap_or(base.locale);
        let mut matting = base.matting;
        matting.alpha_matting |= cli.alpha_matting;
        matting.only_mask |= cli.only_mask;
        if let Some(value) = cli.foreground_threshold {
            matting.foreground_threshold = value;
        }
        if let Some(value) = cli.background_threshold {
            matting.background_threshold = value;
        }
        if let Some(value) = cli.erode_size {
            matting.erode_size = value;
        }

        let mut builder = base
            .clone()
            .into_builder()
            .locale(locale)
            .model(cli.model.unwrap_or(base.model))
            .matting(matting)
            .tiling_mode(cli.tiling_mode.unwrap_or(base.tiling_mode));

        if let Some(text) = cli.discard_threshold.as_deref() {
            builder = builder.discard_threshold(resolve_discard_threshold(Some(text), locale)?);
        }
        if let Some(text) = cli.shifts.as_deref() {
            builder = builder.shifts(resolve_shifts(Some(text), locale)?);
        }
        if let Some(text) = cli.epsilon.as_deref() {
            builder = builder.epsilon(resolve_epsilon(Some(text), locale)?);
        }
        if cli.fail_fast {
            builder = builder.batch_failure_policy(BatchFailurePolicy::FailFast);
        }
        if let Some(pattern) = &cli.pattern {
            builder = builder.batch_pattern(pattern.clone());
        }

        builder.build().context("Invalid configuration")
    }
}
