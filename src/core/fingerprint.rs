use crate::core::hash::{FingerprintTriple, HashError, PerceptualHasher};
use crate::core::progress::{ProgressReporter, ScanPhase, ScanProgress, report_guarded};
use crate::core::scanner::ScanError;
use rayon::prelude::*;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

/// Successfully hashed images, iterated in path order.
pub type FingerprintMap = BTreeMap<PathBuf, FingerprintTriple>;

/// Number of completions between two progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 10;

enum Outcome {
    Hashed(FingerprintTriple),
    Failed(HashError),
    Skipped,
}

/// Hashes candidate images on a bounded worker pool.
pub struct FingerprintEngine {
    hasher: PerceptualHasher,
    progress_interval: usize,
    cancellation_token: Arc<AtomicBool>,
}

impl FingerprintEngine {
    pub fn new() -> Self {
        Self {
            hasher: PerceptualHasher::new(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            cancellation_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn with_cancellation_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn get_cancellation_token(&self) -> Arc<AtomicBool> {
        self.cancellation_token.clone()
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation_token.load(Ordering::Relaxed)
    }

    /// Fingerprint every path, running at most `max_parallelism` workers.
    ///
    /// Images that fail to open or decode are logged, reported through
    /// `progress` and left out of the map; they never fail the batch. The
    /// result only depends on which images decode, not on scheduling.
    pub fn compute_fingerprints(
        &self,
        paths: &[PathBuf],
        max_parallelism: usize,
        progress: &dyn ProgressReporter,
    ) -> Result<FingerprintMap, ScanError> {
        if max_parallelism == 0 {
            return Err(ScanError::InvalidParallelism);
        }
        if self.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let total_files = paths.len();
        report_guarded(
            progress,
            &ScanProgress::new(ScanPhase::Fingerprinting, 0, total_files),
        );

        if paths.is_empty() {
            return Ok(FingerprintMap::new());
        }

        let workers = worker_count(max_parallelism, total_files);
        log::debug!("Hashing {} images on {} workers", total_files, workers);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("simgroup-hash-{}", i))
            .build()?;

        let processed_count = AtomicUsize::new(0);
        let start_time = Instant::now();

        let results: Vec<(&PathBuf, Outcome)> = pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    if self.is_cancelled() {
                        return (path, Outcome::Skipped);
                    }

                    let hashed = panic::catch_unwind(AssertUnwindSafe(|| {
                        self.hasher.fingerprint_file(path)
                    }));
                    let outcome = match hashed {
                        Ok(Ok(triple)) => Outcome::Hashed(triple),
                        Ok(Err(e)) => Outcome::Failed(e),
                        Err(payload) => {
                            Outcome::Failed(HashError::Panicked(panic_message(&*payload)))
                        }
                    };

                    let current_count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Outcome::Failed(e) = &outcome {
                        log::warn!("Error processing {}: {}", path.display(), e);
                        report_guarded(
                            progress,
                            &ScanProgress::failure(
                                path.to_string_lossy().to_string(),
                                e.to_string(),
                                current_count,
                                total_files,
                            ),
                        );
                    }
                    if current_count % self.progress_interval == 0 && current_count < total_files
                    {
                        report_guarded(
                            progress,
                            &ScanProgress::new(ScanPhase::Fingerprinting, current_count, total_files),
                        );
                    }

                    (path, outcome)
                })
                .collect()
        });

        if self.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let mut fingerprints = FingerprintMap::new();
        let mut failed_files = 0;
        for (path, outcome) in results {
            match outcome {
                Outcome::Hashed(triple) => {
                    fingerprints.insert(path.clone(), triple);
                }
                Outcome::Failed(_) => failed_files += 1,
                Outcome::Skipped => {}
            }
        }

        log::info!(
            "Hashed {} of {} images in {:.2?} ({} failed)",
            fingerprints.len(),
            total_files,
            start_time.elapsed(),
            failed_files
        );

        report_guarded(
            progress,
            &ScanProgress {
                failed_files,
                ..ScanProgress::new(ScanPhase::Fingerprinting, total_files, total_files)
            },
        );

        Ok(fingerprints)
    }
}

/// Pool size for a batch: never more workers than images.
fn worker_count(max_parallelism: usize, total_files: usize) -> usize {
    max_parallelism.min(total_files).max(1)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Default for FingerprintEngine {
    fn default() -> Self {
        Self::new()
    }
}
