use crate::core::discovery::{ImageExtensions, default_extensions, list_candidate_paths};
use crate::core::duplicate::{ScoreWeights, SimilarityGroup, SimilarityGrouper};
use crate::core::fingerprint::{DEFAULT_PROGRESS_INTERVAL, FingerprintEngine};
use crate::core::hash::HASH_BITS;
use crate::core::progress::{NoProgress, ProgressReporter, ScanPhase, ScanProgress, report_guarded};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use thiserror::Error;

/// Default per-hash Hamming distance tolerance.
pub const DEFAULT_THRESHOLD: u32 = 5;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid path: {path}")]
    InvalidPath { path: String },

    #[error("Invalid threshold {threshold}: must be between 0 and {max}")]
    InvalidThreshold { threshold: u32, max: u32 },

    #[error("Parallelism must be at least 1")]
    InvalidParallelism,

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Operation cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    pub threshold: u32,
    /// Worker count for hashing; `None` uses one worker per CPU. Larger
    /// values are capped at the CPU count.
    pub max_parallelism: Option<usize>,
    pub extensions: Vec<String>,
    pub weights: ScoreWeights,
    pub progress_interval: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_parallelism: None,
            extensions: default_extensions(),
            weights: ScoreWeights::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl ScanOptions {
    pub fn effective_parallelism(&self) -> usize {
        let cpus = num_cpus::get();
        self.max_parallelism.unwrap_or(cpus).min(cpus)
    }

    /// Reject settings that would make the scan meaningless, before any work starts.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.threshold > HASH_BITS {
            return Err(ScanError::InvalidThreshold {
                threshold: self.threshold,
                max: HASH_BITS,
            });
        }
        if self.effective_parallelism() == 0 {
            return Err(ScanError::InvalidParallelism);
        }
        Ok(())
    }
}

/// Discovers, fingerprints and groups the images below a root directory.
pub struct SimilarityScanner {
    options: ScanOptions,
    progress_reporter: Option<Box<dyn ProgressReporter>>,
    cancellation_token: Arc<AtomicBool>,
}

impl SimilarityScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            progress_reporter: None,
            cancellation_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_progress_reporter(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.progress_reporter = Some(Box::new(reporter));
        self
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn get_cancellation_token(&self) -> Arc<AtomicBool> {
        self.cancellation_token.clone()
    }

    pub fn cancel_scan(&self) {
        self.cancellation_token.store(true, Ordering::Relaxed);
    }

    fn check_cancelled(&self) -> Result<(), ScanError> {
        if self.cancellation_token.load(Ordering::Relaxed) {
            return Err(ScanError::Cancelled);
        }
        Ok(())
    }

    fn send_progress(&self, progress: ScanProgress) {
        if let Some(reporter) = &self.progress_reporter {
            report_guarded(reporter.as_ref(), &progress);
        }
    }

    pub fn scan(&self, root: &Path) -> Result<Vec<SimilarityGroup>, ScanError> {
        if !root.exists() {
            return Err(ScanError::InvalidPath {
                path: root.to_string_lossy().to_string(),
            });
        }
        if !root.is_dir() {
            return Err(ScanError::InvalidPath {
                path: format!("{} is not a directory", root.to_string_lossy()),
            });
        }
        self.options.validate()?;
        let grouper = SimilarityGrouper::with_weights(self.options.threshold, self.options.weights)?;
        self.check_cancelled()?;

        let start_time = Instant::now();

        // Phase 1: Discovery
        self.send_progress(ScanProgress::new(ScanPhase::Discovery, 0, 0));
        let extensions = ImageExtensions::new(&self.options.extensions);
        let candidates: Vec<PathBuf> = list_candidate_paths(root, &extensions);
        self.check_cancelled()?;

        // Phase 2: Fingerprinting
        let engine = FingerprintEngine::new()
            .with_progress_interval(self.options.progress_interval)
            .with_cancellation_token(self.cancellation_token.clone());
        let reporter: &dyn ProgressReporter = match &self.progress_reporter {
            Some(reporter) => reporter.as_ref(),
            None => &NoProgress,
        };
        let fingerprints = engine.compute_fingerprints(
            &candidates,
            self.options.effective_parallelism(),
            reporter,
        )?;
        self.check_cancelled()?;

        // Phase 3: Grouping
        self.send_progress(ScanProgress::new(
            ScanPhase::Grouping,
            fingerprints.len(),
            candidates.len(),
        ));
        let groups = grouper.group(&fingerprints);

        self.send_progress(ScanProgress::new(
            ScanPhase::Complete,
            fingerprints.len(),
            candidates.len(),
        ));
        log::info!(
            "Scan of {} finished in {:.2?}: {} candidates, {} groups",
            root.display(),
            start_time.elapsed(),
            candidates.len(),
            groups.len()
        );

        Ok(groups)
    }
}

impl Default for SimilarityScanner {
    fn default() -> Self {
        Self::new(ScanOptions::default())
    }
}
