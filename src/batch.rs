//! Batch directory runner
//!
//! Every run writes into a fresh `<dest_base>/<YYYYmmddHHMMSS>` directory.
//! The source directory is listed once into a [`BatchPlan`]; the plan can be
//! iterated again and resumed through [`BatchPlan::pending`], which skips
//! items whose output already exists.

use crate::{
    config::{BatchFailurePolicy, MattingOptions, RemovalConfig},
    error::{BgRemovalError, Result},
    inference::SegmentationBackend,
    locale::Locale,
    models::ModelId,
    preconditioner::IcholPreconditioner,
    remover::BackgroundRemover,
    services::{ImageIOService, NoOpProgressReporter, ProgressReporter},
    session_cache::SessionCache,
    tracing_config::spans,
};
use chrono::{DateTime, Local};
use instant::Instant;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Name format of the per-run destination directory
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// One source file and the output it will be written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Ordered list of the files a batch run will process
#[derive(Debug, Clone)]
pub struct BatchPlan {
    source_dir: PathBuf,
    destination_dir: PathBuf,
    items: Vec<BatchItem>,
}

impl BatchPlan {
    /// List `source_dir` into a plan targeting `destination_dir`
    ///
    /// Only regular files directly inside `source_dir` are taken, filtered by
    /// `pattern` on the file name and sorted by name. Each output is named
    /// after the source stem with a `.png` extension.
    ///
    /// # Errors
    /// `Filesystem` when the directory cannot be listed.
    pub fn discover(
        source_dir: &Path,
        destination_dir: &Path,
        pattern: Option<&glob::Pattern>,
    ) -> Result<Self> {
        let entries = std::fs::read_dir(source_dir)
            .map_err(|e| BgRemovalError::filesystem("read source directory", source_dir, e))?;

        let mut sources = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| BgRemovalError::filesystem("read source directory", source_dir, e))?
                .path();

            if !path.is_file() {
                debug!(path = %path.display(), "Skipping non-file entry");
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                debug!(path = %path.display(), "Skipping file with non UTF-8 name");
                continue;
            };
            if pattern.is_some_and(|p| !p.matches(name)) {
                debug!(file = name, "Skipping file not matching pattern");
                continue;
            }
            sources.push(path);
        }
        sources.sort();

        let items = sources
            .into_iter()
            .map(|source| {
                let mut name = source.file_stem().unwrap_or_default().to_os_string();
                name.push(".png");
                let destination = destination_dir.join(name);
                BatchItem {
                    source,
                    destination,
                }
            })
            .collect();

        Ok(Self {
            source_dir: source_dir.to_path_buf(),
            destination_dir: destination_dir.to_path_buf(),
            items,
        })
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn destination_dir(&self) -> &Path {
        &self.destination_dir
    }

    /// All items in processing order
    pub fn items(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter()
    }

    /// Items whose output does not exist yet
    pub fn pending(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|item| !item.destination.exists())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A file that was processed and saved
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub source: PathBuf,
    pub output: PathBuf,
    pub elapsed: Duration,
}

/// A file that failed; the run continued under `BatchFailurePolicy::Isolate`
#[derive(Debug)]
pub struct FailedFile {
    pub source: PathBuf,
    pub error: BgRemovalError,
}

/// Per-file result, in processing order
#[derive(Debug)]
pub enum BatchOutcome {
    Processed(ProcessedFile),
    Failed(FailedFile),
}

/// Summary of a batch run
#[derive(Debug)]
pub struct BatchReport {
    pub destination: PathBuf,
    pub outcomes: Vec<BatchOutcome>,
    pub total_time: Duration,
}

impl BatchReport {
    pub fn processed(&self) -> impl Iterator<Item = &ProcessedFile> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            BatchOutcome::Processed(file) => Some(file),
            BatchOutcome::Failed(_) => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = &FailedFile> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            BatchOutcome::Failed(file) => Some(file),
            BatchOutcome::Processed(_) => None,
        })
    }

    pub fn success_count(&self) -> usize {
        self.processed().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    /// True when no file failed
    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }
}

/// Create `<dest_base>/<timestamp>`; an existing directory is an error
///
/// # Errors
/// `Filesystem` when the base cannot be created or the run directory exists.
pub fn create_run_directory(dest_base: &Path, timestamp: DateTime<Local>) -> Result<PathBuf> {
    std::fs::create_dir_all(dest_base)
        .map_err(|e| BgRemovalError::filesystem("create destination base directory", dest_base, e))?;

    let run_dir = dest_base.join(timestamp.format(TIMESTAMP_FORMAT).to_string());
    std::fs::create_dir(&run_dir)
        .map_err(|e| BgRemovalError::filesystem("create run directory", &run_dir, e))?;
    Ok(run_dir)
}

/// Runs the removal call over every file of a directory, one at a time
pub struct BatchRunner<B: SegmentationBackend> {
    remover: BackgroundRemover<B>,
    policy: BatchFailurePolicy,
    pattern: Option<glob::Pattern>,
    reporter: Arc<dyn ProgressReporter>,
}

impl<B: SegmentationBackend> BatchRunner<B> {
    pub fn new(cache: Arc<SessionCache<B>>, locale: Locale) -> Self {
        Self {
            remover: BackgroundRemover::new(cache, locale),
            policy: BatchFailurePolicy::default(),
            pattern: None,
            reporter: Arc::new(NoOpProgressReporter),
        }
    }

    /// Runner configured with the locale, failure policy and pattern of `config`
    ///
    /// # Errors
    /// `InvalidConfig` for an invalid glob pattern.
    pub fn from_config(cache: Arc<SessionCache<B>>, config: &RemovalConfig) -> Result<Self> {
        let runner = Self::new(cache, config.locale).with_policy(config.batch_failure_policy);
        match &config.batch_pattern {
            Some(pattern) => runner.with_pattern(pattern),
            None => Ok(runner),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: BatchFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Only process files whose name matches `pattern` (e.g. `*.jpg`)
    ///
    /// # Errors
    /// `InvalidConfig` when the pattern does not parse.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        let compiled = glob::Pattern::new(pattern).map_err(|e| {
            BgRemovalError::invalid_config(format!("Invalid batch pattern '{}': {}", pattern, e))
        })?;
        self.pattern = Some(compiled);
        Ok(self)
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn policy(&self) -> BatchFailurePolicy {
        self.policy
    }

    /// Create the run directory for the current local time and list the source
    ///
    /// # Errors
    /// `Filesystem` on a directory collision or an unreadable source.
    pub fn plan(&self, source_dir: &Path, dest_base: &Path) -> Result<BatchPlan> {
        self.plan_at(source_dir, dest_base, Local::now())
    }

    /// Like [`plan`](Self::plan) with an explicit timestamp
    pub fn plan_at(
        &self,
        source_dir: &Path,
        dest_base: &Path,
        timestamp: DateTime<Local>,
    ) -> Result<BatchPlan> {
        let destination = create_run_directory(dest_base, timestamp)?;
        BatchPlan::discover(source_dir, &destination, self.pattern.as_ref())
    }

    /// Process every file of `source_dir` into a fresh run directory
    ///
    /// # Errors
    /// - `Filesystem` on a directory collision or an unreadable source
    /// - under `FailFast`, the first per-file error
    pub fn run(
        &self,
        source_dir: &Path,
        dest_base: &Path,
        model: ModelId,
        options: &MattingOptions,
        preconditioner: &IcholPreconditioner,
    ) -> Result<BatchReport> {
        let plan = self.plan(source_dir, dest_base)?;
        self.run_plan(&plan, model, options, preconditioner)
    }

    /// Process the pending items of `plan`
    ///
    /// # Errors
    /// Under `FailFast`, the first per-file error.
    pub fn run_plan(
        &self,
        plan: &BatchPlan,
        model: ModelId,
        options: &MattingOptions,
        preconditioner: &IcholPreconditioner,
    ) -> Result<BatchReport> {
        let pending: Vec<&BatchItem> = plan.pending().collect();
        let _span = spans::batch_processing(plan.source_dir(), pending.len()).entered();
        info!(
            source = %plan.source_dir().display(),
            destination = %plan.destination_dir().display(),
            files = pending.len(),
            skipped = plan.len() - pending.len(),
            policy = ?self.policy,
            "Starting batch run"
        );

        let start = Instant::now();
        self.reporter.on_start(pending.len());
        let mut outcomes = Vec::with_capacity(pending.len());

        for (index, item) in pending.into_iter().enumerate() {
            self.reporter.on_file_start(&item.source, index);
            let file_start = Instant::now();

            match self.process_item(item, model, options, preconditioner) {
                Ok(()) => {
                    let elapsed = file_start.elapsed();
                    info!(
                        file = %item.source.display(),
                        elapsed_secs = elapsed.as_secs_f64(),
                        "Processed file"
                    );
                    self.reporter.on_file_complete(&item.source, &item.destination, elapsed);
                    outcomes.push(BatchOutcome::Processed(ProcessedFile {
                        source: item.source.clone(),
                        output: item.destination.clone(),
                        elapsed,
                    }));
                },
                Err(error) => {
                    self.reporter.on_file_error(&item.source, &error.to_string());
                    if self.policy == BatchFailurePolicy::FailFast {
                        let successful = outcomes.len();
                        self.reporter.on_batch_complete(successful, 1, start.elapsed());
                        return Err(error);
                    }
                    outcomes.push(BatchOutcome::Failed(FailedFile {
                        source: item.source.clone(),
                        error,
                    }));
                },
            }
        }

        let report = BatchReport {
            destination: plan.destination_dir().to_path_buf(),
            outcomes,
            total_time: start.elapsed(),
        };
        self.reporter.on_batch_complete(
            report.success_count(),
            report.failure_count(),
            report.total_time,
        );
        Ok(report)
    }

    fn process_item(
        &self,
        item: &BatchItem,
        model: ModelId,
        options: &MattingOptions,
        preconditioner: &IcholPreconditioner,
    ) -> Result<()> {
        let image = ImageIOService::load_image(&item.source)?;
        let output = self.remover.remove(Some(&image), model, options, preconditioner)?;
        ImageIOService::save_png(&output.image, &item.destination)
    }
}
