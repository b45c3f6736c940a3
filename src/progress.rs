//! Progress reporting for the pipeline stages.
//!
//! Each stage receives an `Arc<dyn ProgressCallback>` at construction and
//! reports through it. Three implementations are provided:
//!
//! - [`Progress`]: indicatif spinners, one per stage, for interactive runs
//! - [`LogProgress`]: periodic `info` log lines, for non-terminal output
//! - [`NoProgress`]: silent, for embedding and tests
//!
//! Callbacks never return errors and must not panic; a reporter that cannot
//! display something simply drops it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Stage name used by the crawler.
pub const PHASE_CRAWL: &str = "crawl";
/// Stage name used by the candidate filter.
pub const PHASE_FILTER: &str = "filter";
/// Stage name used by the verifier.
pub const PHASE_VERIFY: &str = "verify";

/// Progress callback for the pipeline stages.
///
/// Stages run concurrently, so every call names the phase it belongs to.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    fn on_phase_start(&self, phase: &str);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the reporting phase
    /// * `current` - Monotonic count of items seen by this phase (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, phase: &str, current: usize, path: &str);

    /// Called when an item is skipped because of a recoverable error.
    fn on_error(&self, _phase: &str, _path: &str, _message: &str) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_phase_start(&self, _phase: &str) {}
    fn on_progress(&self, _phase: &str, _current: usize, _path: &str) {}
    fn on_phase_end(&self, _phase: &str) {}
}

/// Progress reporter that writes a log line every `interval` items.
#[derive(Debug)]
pub struct LogProgress {
    interval: usize,
    errors: AtomicUsize,
}

impl LogProgress {
    /// Create a reporter logging every `interval` items (minimum 1).
    #[must_use]
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            errors: AtomicUsize::new(0),
        }
    }

    /// Number of recoverable errors reported so far.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }
}

impl ProgressCallback for LogProgress {
    fn on_phase_start(&self, phase: &str) {
        log::debug!("{}: started", phase);
    }

    fn on_progress(&self, phase: &str, current: usize, _path: &str) {
        if current % self.interval == 0 {
            log::info!("{}: {:>8} files", phase, current);
        }
    }

    fn on_error(&self, phase: &str, path: &str, message: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        log::debug!("{}: skipped {} ({})", phase, path, message);
    }

    fn on_phase_end(&self, phase: &str) {
        log::debug!("{}: finished", phase);
    }

    fn on_message(&self, message: &str) {
        log::info!("{}", message);
    }
}

/// Progress reporter using indicatif.
///
/// One spinner per running stage; all of them live in a shared
/// [`MultiProgress`] so concurrent stages do not overwrite each other.
pub struct Progress {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
    accessible: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupsift::progress::Progress;
    ///
    /// let progress = Progress::new();
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_accessible(false)
    }

    /// Create a reporter; accessible mode drops spinner animation and
    /// Unicode glyphs.
    #[must_use]
    pub fn with_accessible(accessible: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
            accessible,
        }
    }

    /// Check if accessible mode is enabled.
    #[must_use]
    pub fn is_accessible(&self) -> bool {
        self.accessible
    }

    fn style(&self) -> ProgressStyle {
        if self.accessible {
            ProgressStyle::with_template("{prefix:>6} [{elapsed_precise}] {pos} files {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
        } else {
            ProgressStyle::with_template(
                "{spinner:.green} {prefix:>6} [{elapsed_precise}] {pos} files {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        }
    }

    fn with_bar(&self, phase: &str, f: impl FnOnce(&ProgressBar)) {
        if let Ok(bars) = self.bars.lock() {
            if let Some(pb) = bars.get(phase) {
                f(pb);
            }
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.style());
        pb.set_prefix(phase.to_string());
        let tick_rate = if self.accessible { 500 } else { 100 };
        pb.enable_steady_tick(Duration::from_millis(tick_rate));
        if let Ok(mut bars) = self.bars.lock() {
            bars.insert(phase.to_string(), pb);
        }
    }

    fn on_progress(&self, phase: &str, current: usize, path: &str) {
        self.with_bar(phase, |pb| {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(path, 40));
        });
    }

    fn on_error(&self, phase: &str, path: &str, message: &str) {
        log::debug!("{}: skipped {} ({})", phase, path, message);
    }

    fn on_phase_end(&self, phase: &str) {
        let pb = self.bars.lock().ok().and_then(|mut bars| bars.remove(phase));
        if let Some(pb) = pb {
            pb.finish_with_message("done");
        }
    }

    fn on_message(&self, message: &str) {
        let _ = self.multi.println(message);
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.len() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if file_name.len() >= max_len {
        let tail: String = file_name
            .chars()
            .rev()
            .take(max_len.saturating_sub(3))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        return format!("...{tail}");
    }

    format!(".../{}", file_name)
}
