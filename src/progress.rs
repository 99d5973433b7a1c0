//! Progress reporting utilities using indicatif.
//!
//! The pipeline reports through the [`ProgressCallback`] trait; [`Progress`]
//! renders those events as a terminal progress bar. Per-note outcomes arrive
//! as messages (`cached`, `summarized`, `skipped`) and are tallied for the
//! final line.
//!
//! # Accessible Mode
//!
//! When accessible mode is enabled the bar uses ASCII characters only and
//! redraws less often.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress callback for pipeline phases.
///
/// Implement this trait to receive progress updates during a run.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (e.g., "summarize")
    /// * `total` - Total number of items to process
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called before each item is processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been processed, providing its size.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called with a short status for the current item.
    fn on_message(&self, _message: &str) {}
}

/// Per-note tallies gathered from progress messages.
#[derive(Debug, Default)]
struct Tally {
    cached: AtomicUsize,
    summarized: AtomicUsize,
    skipped: AtomicUsize,
}

impl Tally {
    fn record(&self, message: &str) {
        let counter = match message {
            "cached" => &self.cached,
            "summarized" => &self.summarized,
            "skipped" => &self.skipped,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn summary(&self) -> String {
        format!(
            "{} summarized, {} cached, {} skipped",
            self.summarized.load(Ordering::Relaxed),
            self.cached.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed)
        )
    }
}

/// Progress reporter using indicatif.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    tally: Tally,
    quiet: bool,
    accessible: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use vaultdigest::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self::with_accessible(quiet, false)
    }

    /// Create a new progress reporter with accessible mode.
    #[must_use]
    pub fn with_accessible(quiet: bool, accessible: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            tally: Tally::default(),
            quiet,
            accessible,
        }
    }

    /// Check if accessible mode is enabled.
    #[must_use]
    pub fn is_accessible(&self) -> bool {
        self.accessible
    }

    /// Outcome counts so far, formatted for display.
    #[must_use]
    pub fn summary(&self) -> String {
        self.tally.summary()
    }

    fn style(&self) -> ProgressStyle {
        if self.accessible {
            ProgressStyle::with_template("[{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-")
        } else {
            ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(ref pb) = *guard {
                f(pb);
            }
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total as u64);
        pb.set_style(self.style());
        pb.set_message(phase.to_string());
        if self.accessible {
            pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(2));
        } else {
            pb.enable_steady_tick(Duration::from_millis(200));
        }

        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(pb);
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        self.with_bar(|pb| {
            pb.set_position(current.saturating_sub(1) as u64);
            pb.set_message(truncate_path(path, 40));
        });
    }

    fn on_item_completed(&self, _bytes: u64) {
        if self.quiet {
            return;
        }
        self.with_bar(|pb| pb.inc(1));
    }

    fn on_phase_end(&self, _phase: &str) {
        let finished = self.bar.lock().ok().and_then(|mut guard| guard.take());
        if let Some(pb) = finished {
            pb.finish_with_message(self.tally.summary());
        }
    }

    fn on_message(&self, message: &str) {
        self.tally.record(message);
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let skip = name_len + 3 - max_len.min(name_len + 3);
        let tail: String = file_name.chars().skip(skip).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
