use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanProgress {
    pub phase: ScanPhase,
    pub files_processed: usize,
    pub total_files: usize,
    pub failed_files: usize,
    pub current_file: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ScanPhase {
    Discovery,
    Fingerprinting,
    Grouping,
    Complete,
}

impl ScanProgress {
    pub fn new(phase: ScanPhase, files_processed: usize, total_files: usize) -> Self {
        Self {
            phase,
            files_processed,
            total_files,
            failed_files: 0,
            current_file: None,
            error_message: None,
        }
    }

    /// A per-image failure notice. The image is left out of the results.
    pub fn failure(
        current_file: String,
        error_message: String,
        files_processed: usize,
        total_files: usize,
    ) -> Self {
        Self {
            phase: ScanPhase::Fingerprinting,
            files_processed,
            total_files,
            failed_files: 1,
            current_file: Some(current_file),
            error_message: Some(error_message),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error_message.is_some()
    }
}

impl fmt::Display for ScanProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(file), Some(error)) = (&self.current_file, &self.error_message) {
            return write!(f, "Error processing {}: {}", file, error);
        }

        match self.phase {
            ScanPhase::Discovery => write!(f, "Scanning images..."),
            ScanPhase::Fingerprinting => write!(
                f,
                "Processed {}/{} images...",
                self.files_processed, self.total_files
            ),
            ScanPhase::Grouping => write!(
                f,
                "Processed {} images. Finding similar groups...",
                self.files_processed
            ),
            ScanPhase::Complete => write!(f, "Scan complete"),
        }
    }
}

/// Receives status updates while a scan runs.
///
/// Reports arrive from worker threads, so implementations must be
/// `Send + Sync`. A reporter must not block for long; the engine calls it
/// inline.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: &ScanProgress);
}

/// Deliver `progress`, containing any panic raised by the reporter so a
/// faulty sink cannot abort a scan.
pub(crate) fn report_guarded(reporter: &dyn ProgressReporter, progress: &ScanProgress) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        reporter.report(progress);
    })) {
        log::warn!("Progress reporter panicked: {:?}", e);
    }
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _progress: &ScanProgress) {}
}

/// Adapts a closure into a reporter.
pub struct FnReporter<F>(pub F);

impl<F> ProgressReporter for FnReporter<F>
where
    F: Fn(&ScanProgress) + Send + Sync,
{
    fn report(&self, progress: &ScanProgress) {
        (self.0)(progress)
    }
}

impl ProgressReporter for mpsc::UnboundedSender<ScanProgress> {
    fn report(&self, progress: &ScanProgress) {
        // The receiver going away only means nobody is listening any more.
        let _ = self.send(progress.clone());
    }
}

impl ProgressReporter for ProgressBar {
    fn report(&self, progress: &ScanProgress) {
        if progress.is_failure() {
            self.println(progress.to_string());
            return;
        }

        if progress.phase == ScanPhase::Fingerprinting {
            self.set_length(progress.total_files as u64);
            self.set_position(progress.files_processed as u64);
        }
        self.set_message(progress.to_string());
    }
}

impl<R: ProgressReporter + ?Sized> ProgressReporter for &R {
    fn report(&self, progress: &ScanProgress) {
        (**self).report(progress)
    }
}

impl<R: ProgressReporter + ?Sized> ProgressReporter for Box<R> {
    fn report(&self, progress: &ScanProgress) {
        (**self).report(progress)
    }
}

impl<R: ProgressReporter + ?Sized> ProgressReporter for std::sync::Arc<R> {
    fn report(&self, progress: &ScanProgress) {
        (**self).report(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_progress_text() {
        assert_eq!(
            ScanProgress::new(ScanPhase::Discovery, 0, 0).to_string(),
            "Scanning images..."
        );
        assert_eq!(
            ScanProgress::new(ScanPhase::Fingerprinting, 10, 42).to_string(),
            "Processed 10/42 images..."
        );
        assert_eq!(
            ScanProgress::new(ScanPhase::Grouping, 40, 42).to_string(),
            "Processed 40 images. Finding similar groups..."
        );
        assert_eq!(
            ScanProgress::failure("a.png".into(), "bad header".into(), 3, 42).to_string(),
            "Error processing a.png: bad header"
        );
    }

    #[test]
    fn test_channel_reporter() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ScanProgress>();
        tx.report(&ScanProgress::new(ScanPhase::Complete, 1, 1));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.phase, ScanPhase::Complete);
        assert!(rx.try_recv().is_err());

        // A dropped receiver must not panic the sender side.
        drop(rx);
        tx.report(&ScanProgress::new(ScanPhase::Complete, 1, 1));
    }

    #[test]
    fn test_guarded_report_contains_panic() {
        let reporter = FnReporter(|p: &ScanProgress| {
            if p.phase == ScanPhase::Complete {
                panic!("sink failed");
            }
        });
        report_guarded(&reporter, &ScanProgress::new(ScanPhase::Complete, 0, 0));
    }

    #[test]
    fn test_fn_reporter_collects_text() {
        let messages = Mutex::new(Vec::new());
        let reporter = FnReporter(|p: &ScanProgress| messages.lock().unwrap().push(p.to_string()));

        reporter.report(&ScanProgress::new(ScanPhase::Discovery, 0, 0));
        (&reporter).report(&ScanProgress::new(ScanPhase::Complete, 0, 0));

        assert_eq!(
            *messages.lock().unwrap(),
            vec!["Scanning images...".to_string(), "Scan complete".to_string()]
        );
    }
}
