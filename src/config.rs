//! Configuration types for background removal operations

use crate::{
    error::{BgRemovalError, Result},
    locale::Locale,
    models::ModelId,
    params::{RawSolverParams, SolverParams, DEFAULT_EPSILON},
    preconditioner::{IcholConfig, IcholPreconditioner},
    utils::NumericValidator,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Flags forwarded to the segmentation and matting collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MattingOptions {
    /// Refine the segmentation mask with alpha matting
    pub alpha_matting: bool,
    /// Mask values above this become definite foreground in the trimap
    pub foreground_threshold: u8,
    /// Mask values below this become definite background in the trimap
    pub background_threshold: u8,
    /// Erosion applied to the trimap regions
    pub erode_size: u8,
    /// Regularization strength of the matting solver
    pub epsilon: f64,
    /// Return the mask instead of the cutout
    pub only_mask: bool,
}

impl Default for MattingOptions {
    fn default() -> Self {
        Self {
            alpha_matting: false,
            foreground_threshold: 240,
            background_threshold: 15,
            erode_size: 15,
            epsilon: DEFAULT_EPSILON,
            only_mask: false,
        }
    }
}

/// How the four processed quadrants are put back together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum TilingMode {
    /// Canvas of twice the largest tile; odd dimensions leave a one pixel
    /// seam on the right/bottom edge
    #[default]
    Legacy,
    /// Canvas sized from the actual tile dimensions; exact for any size
    Exact,
}

impl std::fmt::Display for TilingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Exact => write!(f, "exact"),
        }
    }
}

/// What a batch run does when a single file fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchFailurePolicy {
    /// Record the failure and continue with the next file
    #[default]
    Isolate,
    /// Abort the run on the first failure
    FailFast,
}

/// Complete configuration for a removal request, tiled run or batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovalConfig {
    /// Segmentation model
    pub model: ModelId,
    /// Matting flags
    pub matting: MattingOptions,
    /// Incomplete-Cholesky tuning
    pub ichol: IcholConfig,
    /// Language of user-facing messages
    pub locale: Locale,
    /// Quadrant merge strategy for the tiled pipeline
    pub tiling_mode: TilingMode,
    /// Per-file failure handling for batch runs
    pub batch_failure_policy: BatchFailurePolicy,
    /// Optional glob applied to file names in batch runs (e.g. "*.jpg")
    pub batch_pattern: Option<String>,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            model: ModelId::default(),
            matting: MattingOptions::default(),
            ichol: IcholConfig::default(),
            locale: Locale::default(),
            tiling_mode: TilingMode::default(),
            batch_failure_policy: BatchFailurePolicy::default(),
            batch_pattern: None,
        }
    }
}

impl RemovalConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder::new()
    }

    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BgRemovalError::filesystem("read configuration file", path, e))?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            BgRemovalError::invalid_config(format!(
                "Failed to parse configuration '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate numeric fields
    ///
    /// # Errors
    /// - Non-finite discard threshold
    /// - Empty or non-finite shift sequence
    /// - Non-positive or non-finite epsilon
    /// - Invalid batch glob pattern
    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_finite(self.ichol.discard_threshold, "discard threshold")?;
        NumericValidator::validate_shifts(&self.ichol.shifts)?;
        NumericValidator::validate_positive(self.matting.epsilon, "epsilon")?;

        if let Some(pattern) = &self.batch_pattern {
            glob::Pattern::new(pattern).map_err(|e| {
                BgRemovalError::invalid_config(format!("Invalid batch pattern '{}': {}", pattern, e))
            })?;
        }

        Ok(())
    }

    /// Builder starting from this configuration, for layering overrides
    #[must_use]
    pub fn into_builder(self) -> RemovalConfigBuilder {
        RemovalConfigBuilder { config: self }
    }

    /// Preconditioner strategy bound to this configuration's tuning
    #[must_use]
    pub fn preconditioner(&self) -> IcholPreconditioner {
        IcholPreconditioner::from_config(self.ichol.clone())
    }
}

/// Builder for `RemovalConfig`
pub struct RemovalConfigBuilder {
    config: RemovalConfig,
}

impl RemovalConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RemovalConfig::default(),
        }
    }

    #[must_use]
    pub fn model(mut self, model: ModelId) -> Self {
        self.config.model = model;
        self
    }

    #[must_use]
    pub fn matting(mut self, matting: MattingOptions) -> Self {
        self.config.matting = matting;
        self
    }

    #[must_use]
    pub fn alpha_matting(mut self, enabled: bool) -> Self {
        self.config.matting.alpha_matting = enabled;
        self
    }

    #[must_use]
    pub fn only_mask(mut self, only_mask: bool) -> Self {
        self.config.matting.only_mask = only_mask;
        self
    }

    #[must_use]
    pub fn discard_threshold(mut self, threshold: f64) -> Self {
        self.config.ichol.discard_threshold = threshold;
        self
    }

    #[must_use]
    pub fn shifts(mut self, shifts: Vec<f64>) -> Self {
        self.config.ichol.shifts = shifts;
        self
    }

    #[must_use]
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.config.matting.epsilon = epsilon;
        self
    }

    /// Apply already parsed solver parameters
    #[must_use]
    pub fn solver_params(mut self, params: SolverParams) -> Self {
        self.config.ichol = params.ichol;
        self.config.matting.epsilon = params.epsilon;
        self
    }

    #[must_use]
    pub fn locale(mut self, locale: Locale) -> Self {
        self.config.locale = locale;
        self
    }

    #[must_use]
    pub fn tiling_mode(mut self, mode: TilingMode) -> Self {
        self.config.tiling_mode = mode;
        self
    }

    #[must_use]
    pub fn batch_failure_policy(mut self, policy: BatchFailurePolicy) -> Self {
        self.config.batch_failure_policy = policy;
        self
    }

    #[must_use]
    pub fn batch_pattern<S: Into<String>>(mut self, pattern: S) -> Self {
        self.config.batch_pattern = Some(pattern.into());
        self
    }

    /// Parse raw text solver parameters with the builder's locale
    ///
    /// # Errors
    /// Returns a field-tagged `Parse` error for the first invalid field.
    pub fn raw_solver_params(self, raw: &RawSolverParams) -> Result<Self> {
        let params = raw.parse(self.config.locale)?;
        Ok(self.solver_params(params))
    }

    /// Build the configuration
    ///
    /// # Errors
    /// Returns `BgRemovalError::InvalidConfig` when validation fails.
    pub fn build(self) -> Result<RemovalConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for RemovalConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RemovalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.model, ModelId::IsnetGeneralUse);
        assert_eq!(config.matting.foreground_threshold, 240);
        assert_eq!(config.matting.background_threshold, 15);
        assert_eq!(config.matting.erode_size, 15);
        assert_eq!(config.tiling_mode, TilingMode::Legacy);
        assert_eq!(config.batch_failure_policy, BatchFailurePolicy::Isolate);
    }

    #[test]
    fn test_builder_chain() {
        let config = RemovalConfig::builder()
            .model(ModelId::U2NetP)
            .alpha_matting(true)
            .discard_threshold(1e-3)
            .shifts(vec![0.1, 1.0])
            .epsilon(1e-6)
            .tiling_mode(TilingMode::Exact)
            .batch_failure_policy(BatchFailurePolicy::FailFast)
            .batch_pattern("*.png")
            .build()
            .unwrap();

        assert_eq!(config.model, ModelId::U2NetP);
        assert!(config.matting.alpha_matting);
        assert_eq!(config.preconditioner().shifts(), &[0.1, 1.0]);
        assert_eq!(config.preconditioner().discard_threshold(), 1e-3);
        assert_eq!(config.matting.epsilon, 1e-6);
        assert_eq!(config.batch_pattern.as_deref(), Some("*.png"));
    }

    #[test]
    fn test_builder_rejects_invalid_numbers() {
        assert!(RemovalConfig::builder().shifts(vec![]).build().is_err());
        assert!(RemovalConfig::builder().epsilon(0.0).build().is_err());
        assert!(RemovalConfig::builder()
            .discard_threshold(f64::NAN)
            .build()
            .is_err());
        assert!(RemovalConfig::builder().batch_pattern("[").build().is_err());
    }

    #[test]
    fn test_raw_solver_params_use_builder_locale() {
        let raw = RawSolverParams {
            discard_threshold: Some("bad".to_string()),
            ..RawSolverParams::default()
        };
        let err = RemovalConfig::builder()
            .locale(Locale::ZhCn)
            .raw_solver_params(&raw)
            .err()
            .unwrap();
        assert!(err.to_string().contains("必须为数字"));
    }

    #[test]
    fn test_json_round_trip_with_partial_input() {
        let config: RemovalConfig =
            serde_json::from_str(r#"{"model": "u2net", "tiling_mode": "exact"}"#).unwrap();
        assert_eq!(config.model, ModelId::U2Net);
        assert_eq!(config.tiling_mode, TilingMode::Exact);
        assert_eq!(config.ichol, IcholConfig::default());

        let json = serde_json::to_string(&config).unwrap();
        let back: RemovalConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"locale": "zh-CN", "batch_failure_policy": "fail-fast"}"#)
            .unwrap();
        let config = RemovalConfig::from_json_file(&path).unwrap();
        assert_eq!(config.locale, Locale::ZhCn);
        assert_eq!(config.batch_failure_policy, BatchFailurePolicy::FailFast);

        let missing = RemovalConfig::from_json_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(BgRemovalError::Filesystem { .. })));
    }
}
