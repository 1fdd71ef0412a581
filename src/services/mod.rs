//! Services that keep file I/O and progress reporting out of the removal logic

pub mod io;
pub mod progress;

pub use io::ImageIOService;
pub use progress::{NoOpProgressReporter, ProgressReporter, TracingProgressReporter};
