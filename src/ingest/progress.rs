//! Progress tracking for pipeline runs

use super::source::IngestStats;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

/// Progress tracker for a pipeline run
///
/// Display and counters only; checkpoint persistence is the pipeline's job
/// since it owns the `BatchContext`.
pub struct IngestProgress {
    /// Progress bar (None if running in quiet mode)
    progress_bar: Option<ProgressBar>,
    /// Start time
    start_time: Instant,
    /// Extraction attempts performed
    items_processed: AtomicUsize,
    /// Drafts built during preprocess
    drafts_preprocessed: AtomicUsize,
    /// Drafts committed to the store
    drafts_committed: AtomicUsize,
    /// Attempts that yielded nothing
    items_skipped: AtomicUsize,
    /// Items or drafts that errored
    items_errored: AtomicUsize,
    /// Cancelled flag
    cancelled: AtomicBool,
}

impl IngestProgress {
    /// Create a new progress tracker for `total` expected attempts
    pub fn new(total: usize, quiet: bool) -> Self {
        let progress_bar = if !quiet {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        Self {
            progress_bar,
            start_time: Instant::now(),
            items_processed: AtomicUsize::new(0),
            drafts_preprocessed: AtomicUsize::new(0),
            drafts_committed: AtomicUsize::new(0),
            items_skipped: AtomicUsize::new(0),
            items_errored: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Reset the expected attempt count once the run size is known
    pub fn set_total(&self, total: usize) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_length(total as u64);
        }
    }

    /// Record a preprocessed draft
    pub fn draft_preprocessed(&self, title: &str) {
        self.drafts_preprocessed.fetch_add(1, Ordering::Relaxed);
        self.attempt_done(title);
    }

    /// Record an attempt that produced no item
    pub fn item_skipped(&self) {
        self.items_skipped.fetch_add(1, Ordering::Relaxed);
        self.attempt_done("");
    }

    /// Record a failed attempt or draft
    pub fn item_errored(&self) {
        self.items_errored.fetch_add(1, Ordering::Relaxed);
        self.attempt_done("");
    }

    /// Record a committed draft
    pub fn draft_committed(&self) {
        self.drafts_committed.fetch_add(1, Ordering::Relaxed);
    }

    fn attempt_done(&self, title: &str) {
        let processed = self.items_processed.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(ref pb) = self.progress_bar {
            pb.set_position(processed as u64);

            let elapsed = self.start_time.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                processed as f64 / elapsed
            } else {
                0.0
            };

            // Truncate safely for UTF-8
            let display_title = if title.chars().count() > 30 {
                let truncated: String = title.chars().take(27).collect();
                format!("{}...", truncated)
            } else {
                title.to_string()
            };

            pb.set_message(format!("{:.1} items/s | {}", rate, display_title));
        }
    }

    /// Get current statistics
    pub fn get_stats(&self) -> IngestStats {
        let mut stats = IngestStats {
            items_processed: self.items_processed.load(Ordering::Relaxed),
            drafts_preprocessed: self.drafts_preprocessed.load(Ordering::Relaxed),
            drafts_committed: self.drafts_committed.load(Ordering::Relaxed),
            items_errored: self.items_errored.load(Ordering::Relaxed),
            items_skipped: self.items_skipped.load(Ordering::Relaxed),
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
            items_per_second: 0.0,
        };
        stats.update_rate();
        stats
    }

    /// Check if the run has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Cancel the run; the pipeline stops between items
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        if let Some(ref pb) = self.progress_bar {
            pb.abandon_with_message("Cancelled");
        }
    }

    /// Finish the progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            let stats = self.get_stats();
            pb.finish_with_message(format!(
                "Done! {} preprocessed, {} committed, {} errors",
                stats.drafts_preprocessed, stats.drafts_committed, stats.items_errored
            ));
        }
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        let stats = self.get_stats();

        println!("\nIngest Summary");
        println!("==============");
        println!("Attempts performed:  {}", stats.items_processed);
        println!("Drafts preprocessed: {}", stats.drafts_preprocessed);
        println!("Drafts committed:    {}", stats.drafts_committed);
        println!("Empty extractions:   {}", stats.items_skipped);
        println!("Errors:              {}", stats.items_errored);
        println!("Elapsed time:        {:.1}s", stats.elapsed_seconds);
        println!("Processing rate:     {:.1} items/s", stats.items_per_second);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_tracking() {
        let progress = IngestProgress::new(4, true);

        progress.draft_preprocessed("First Item");
        progress.draft_preprocessed("Second Item");
        progress.item_skipped();
        progress.item_errored();
        progress.draft_committed();

        let stats = progress.get_stats();
        assert_eq!(stats.items_processed, 4);
        assert_eq!(stats.drafts_preprocessed, 2);
        assert_eq!(stats.drafts_committed, 1);
        assert_eq!(stats.items_skipped, 1);
        assert_eq!(stats.items_errored, 1);
    }

    #[test]
    fn test_cancellation() {
        let progress = IngestProgress::new(10, true);
        assert!(!progress.is_cancelled());
        progress.cancel();
        assert!(progress.is_cancelled());
    }
}
