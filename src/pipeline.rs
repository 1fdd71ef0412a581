//! Tiled parallel pipeline
//!
//! ```text
//! split ──► [task queue] ──► worker 0..4 ──► [result channel] ──► slots ──► merge
//! ```
//!
//! Each worker owns a private session cache over the shared backend, so the
//! workers never contend on a session. Results are written into a slot array
//! by quadrant index, which keeps the merge independent of completion order.
//! The first failure sets an abort flag; workers drain the remaining tasks
//! without processing them and the error is returned without a merge.

use crate::{
    config::{MattingOptions, TilingMode},
    error::{BgRemovalError, Result},
    inference::SegmentationBackend,
    locale::Locale,
    models::ModelId,
    preconditioner::IcholPreconditioner,
    remover::{BackgroundRemover, RemovalOutput, RemovalTimings},
    session_cache::SessionCache,
    tiling::{merge_quadrants, split_quadrants, Tile},
    tracing_config::spans,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use image::DynamicImage;
use instant::Instant;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// Number of tile workers, one per quadrant
pub const TILE_WORKERS: usize = 4;

struct TileOutcome {
    index: usize,
    result: Result<RemovalOutput>,
}

/// Request shared by all workers of one tiled run
struct TileJob<'a> {
    model: ModelId,
    options: &'a MattingOptions,
    preconditioner: &'a IcholPreconditioner,
}

/// Splits an image into quadrants and removes their backgrounds in parallel
pub struct TiledPipeline<B: SegmentationBackend> {
    workers: Vec<BackgroundRemover<B>>,
    mode: TilingMode,
}

impl<B: SegmentationBackend> TiledPipeline<B> {
    /// Create a pipeline whose workers share `backend`
    ///
    /// Worker caches live as long as the pipeline, so repeated runs reuse the
    /// sessions each worker already loaded.
    pub fn new(backend: Arc<B>, locale: Locale, mode: TilingMode) -> Self {
        let workers = (0..TILE_WORKERS)
            .map(|_| {
                BackgroundRemover::new(Arc::new(SessionCache::new(Arc::clone(&backend))), locale)
            })
            .collect();
        Self { workers, mode }
    }

    pub fn mode(&self) -> TilingMode {
        self.mode
    }

    /// Session caches of the workers, in worker order
    pub fn worker_caches(&self) -> impl Iterator<Item = &Arc<SessionCache<B>>> {
        self.workers.iter().map(BackgroundRemover::cache)
    }

    /// Remove the background of `image` tile by tile
    ///
    /// Timings report the slowest worker's session load and the wall clock of
    /// the whole fan-out.
    ///
    /// # Errors
    /// - `Input` for images below 2x2 pixels
    /// - the first tile failure (`Model` or `Computation`)
    /// - `Internal` when a worker panics
    pub fn process_tiled(
        &self,
        image: &DynamicImage,
        model: ModelId,
        options: &MattingOptions,
        preconditioner: &IcholPreconditioner,
    ) -> Result<RemovalOutput> {
        let tiles = split_quadrants(image)?;
        info!(
            model = %model,
            width = image.width(),
            height = image.height(),
            mode = %self.mode,
            "Processing image in {} tiles",
            tiles.len()
        );

        let (task_tx, task_rx) = unbounded::<Tile>();
        for tile in tiles {
            task_tx
                .send(tile)
                .map_err(|_| BgRemovalError::internal("Tile queue closed before dispatch"))?;
        }
        drop(task_tx);

        let job = TileJob {
            model,
            options,
            preconditioner,
        };
        let abort = AtomicBool::new(false);
        let start = Instant::now();

        let mut slots: [Option<DynamicImage>; 4] = Default::default();
        let mut load = std::time::Duration::ZERO;
        let mut first_error = None;

        thread::scope(|scope| {
            let (result_tx, result_rx) = unbounded::<TileOutcome>();
            let handles: Vec<_> = self
                .workers
                .iter()
                .enumerate()
                .map(|(worker, remover)| {
                    let task_rx = task_rx.clone();
                    let result_tx = result_tx.clone();
                    let (job, abort) = (&job, &abort);
                    scope.spawn(move || tile_worker(worker, remover, &task_rx, &result_tx, job, abort))
                })
                .collect();
            drop(result_tx);

            for outcome in result_rx {
                match outcome.result {
                    Ok(output) => {
                        load = load.max(output.timings.load);
                        if let Some(slot) = slots.get_mut(outcome.index) {
                            *slot = Some(output.image);
                        }
                    },
                    Err(e) => {
                        abort.store(true, Ordering::SeqCst);
                        warn!(tile = outcome.index, error = %e, "Tile failed, aborting run");
                        first_error.get_or_insert(e);
                    },
                }
            }

            for handle in handles {
                if handle.join().is_err() {
                    first_error.get_or_insert(BgRemovalError::internal("Tile worker panicked"));
                }
            }
        });

        if let Some(e) = first_error {
            return Err(e);
        }

        let [Some(top_left), Some(top_right), Some(bottom_left), Some(bottom_right)] = slots else {
            return Err(BgRemovalError::internal("Tile result missing after all workers finished"));
        };
        let merged = merge_quadrants(&[top_left, top_right, bottom_left, bottom_right], self.mode);

        let timings = RemovalTimings {
            load,
            compute: start.elapsed(),
        };
        debug!(
            load_ms = timings.load.as_millis() as u64,
            compute_ms = timings.compute.as_millis() as u64,
            width = merged.width(),
            height = merged.height(),
            "Tiled removal finished"
        );

        Ok(RemovalOutput {
            image: merged,
            timings,
        })
    }
}

fn tile_worker<B: SegmentationBackend>(
    worker: usize,
    remover: &BackgroundRemover<B>,
    tasks: &Receiver<Tile>,
    results: &Sender<TileOutcome>,
    job: &TileJob<'_>,
    abort: &AtomicBool,
) {
    for tile in tasks.iter() {
        if abort.load(Ordering::SeqCst) {
            debug!(worker, quadrant = %tile.quadrant, "Skipping tile after earlier failure");
            continue;
        }

        let _span = spans::tile_processing(worker, tile.quadrant.as_str()).entered();
        let result = remover.remove(Some(&tile.image), job.model, job.options, job.preconditioner);
        let outcome = TileOutcome {
            index: tile.quadrant.index(),
            result,
        };
        if results.send(outcome).is_err() {
            break;
        }
    }
}
