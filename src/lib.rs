//! Perceptual near-duplicate image grouping.
//!
//! Every image below a directory gets three perceptual hashes (DCT, gradient
//! and mean). Pairs are compared with a weighted vote across the three and
//! grouped around seed images. See [`find_similar_images`] for the one-call
//! entry point, or [`SimilarityScanner`] for options, progress and
//! cancellation.

pub mod core;

pub use crate::core::discovery::{ImageExtensions, list_candidate_paths};
pub use crate::core::duplicate::{ScoreWeights, SimilarityGroup, SimilarityGrouper, group_similar};
pub use crate::core::fingerprint::{FingerprintEngine, FingerprintMap};
pub use crate::core::hash::{FingerprintTriple, HashError, PerceptualHasher};
pub use crate::core::progress::{
    FnReporter, NoProgress, ProgressReporter, ScanPhase, ScanProgress,
};
pub use crate::core::scanner::{DEFAULT_THRESHOLD, ScanError, ScanOptions, SimilarityScanner};

use std::path::Path;

/// Find groups of similar images below `root`.
///
/// `threshold` is the per-hash Hamming distance still counted as a match
/// ([`DEFAULT_THRESHOLD`] is a good start). An empty result means no similar
/// images were found; failures are returned as `Err`.
pub fn find_similar_images(
    root: &Path,
    threshold: u32,
    progress: impl ProgressReporter + 'static,
) -> Result<Vec<SimilarityGroup>, ScanError> {
    let options = ScanOptions {
        threshold,
        ..ScanOptions::default()
    };
    SimilarityScanner::new(options)
        .with_progress_reporter(progress)
        .scan(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[test]
    fn test_find_similar_images_reports_text() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        crate::core::hash::test_images::save_noise(&root.join("one.png"), 3);
        fs::copy(root.join("one.png"), root.join("two.png")).unwrap();

        let messages = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = messages.clone();
        let groups = find_similar_images(
            root,
            DEFAULT_THRESHOLD,
            FnReporter(move |p: &ScanProgress| sink.lock().unwrap().push(p.to_string())),
        )
        .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);

        let messages = messages.lock().unwrap();
        assert_eq!(messages.first().map(String::as_str), Some("Scanning images..."));
        assert!(messages.contains(&"Processed 2 images. Finding similar groups...".to_string()));
    }
}
