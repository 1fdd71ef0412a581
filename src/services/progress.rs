//! Progress reporting for batch runs
//!
//! The batch runner only talks to the [`ProgressReporter`] trait; the CLI
//! plugs in a progress bar, library users get structured log events or
//! nothing at all.

use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Progress callbacks for a batch run
pub trait ProgressReporter: Send + Sync {
    /// Called once the file list is known
    fn on_start(&self, total_files: usize);

    /// Called before a file is processed
    fn on_file_start(&self, file: &Path, index: usize);

    /// Called after a file was processed and saved
    fn on_file_complete(&self, file: &Path, output: &Path, processing_time: Duration);

    /// Called when a file fails
    fn on_file_error(&self, file: &Path, error: &str);

    /// Called when the run ends, also after a fail-fast abort
    fn on_batch_complete(&self, successful: usize, failed: usize, total_time: Duration);
}

/// Reports progress as `tracing` events
#[derive(Debug, Default)]
pub struct TracingProgressReporter;

impl ProgressReporter for TracingProgressReporter {
    fn on_start(&self, total_files: usize) {
        info!(total_files, "Starting batch");
    }

    fn on_file_start(&self, file: &Path, index: usize) {
        info!(index = index + 1, file = %file.display(), "Processing file");
    }

    fn on_file_complete(&self, file: &Path, output: &Path, processing_time: Duration) {
        info!(
            file = %file.display(),
            output = %output.display(),
            elapsed_ms = processing_time.as_millis() as u64,
            "File completed"
        );
    }

    fn on_file_error(&self, file: &Path, error: &str) {
        warn!(file = %file.display(), error = %error, "File failed");
    }

    fn on_batch_complete(&self, successful: usize, failed: usize, total_time: Duration) {
        info!(
            successful,
            failed,
            total_secs = total_time.as_secs_f64(),
            "Batch complete"
        );
    }
}

/// Progress reporter that does nothing
#[derive(Debug, Default)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn on_start(&self, _total_files: usize) {}
    fn on_file_start(&self, _file: &Path, _index: usize) {}
    fn on_file_complete(&self, _file: &Path, _output: &Path, _processing_time: Duration) {}
    fn on_file_error(&self, _file: &Path, _error: &str) {}
    fn on_batch_complete(&self, _successful: usize, _failed: usize, _total_time: Duration) {}
}
