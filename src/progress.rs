//! Progress reporting for scans.
//!
//! The ingestion controller emits one [`ProgressEvent`] per resolved item to a
//! [`ProgressCallback`]. Events are display-only: nothing in the scan result
//! depends on them. [`Progress`] renders them as an indicatif bar for the CLI.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

/// One progress update emitted after an item resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Items resolved so far
    pub processed: usize,
    /// Items in the scan
    pub total: usize,
    /// Display name of the item that just resolved
    pub current_name: String,
}

impl ProgressEvent {
    /// Completion as a rounded percentage.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.processed as f64 / self.total as f64) * 100.0).round() as u8
    }
}

/// Receives progress updates during a scan.
pub trait ProgressCallback: Send + Sync {
    /// Called once before the first item is dispatched.
    fn on_scan_start(&self, total: usize);

    /// Called for each resolved item.
    fn on_progress(&self, event: &ProgressEvent);

    /// Called once every item has resolved.
    fn on_scan_end(&self);
}

/// Terminal progress bar using indicatif.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a reporter; a quiet reporter draws nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupelens::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bar) = guard.as_ref() {
            f(bar);
        }
    }
}

impl ProgressCallback for Progress {
    fn on_scan_start(&self, total: usize) {
        if self.quiet {
            return;
        }
        let bar = ProgressBar::new(total as u64);
        bar.set_style(Self::style());
        bar.set_message("Fingerprinting");
        *self.bar.lock().unwrap_or_else(|e| e.into_inner()) = Some(bar);
    }

    fn on_progress(&self, event: &ProgressEvent) {
        self.with_bar(|bar| {
            bar.set_position(event.processed as u64);
            bar.set_message(format!("Scanning: {}", truncate_name(&event.current_name, 30)));
        });
    }

    fn on_scan_end(&self) {
        if let Some(bar) = self.bar.lock().unwrap_or_else(|e| e.into_inner()).take() {
            bar.finish_with_message("Scan complete");
        }
    }
}

/// Shorten a display name to at most `max_len` characters.
fn truncate_name(name: &str, max_len: usize) -> String {
    let count = name.chars().count();
    if count <= max_len {
        return name.to_string();
    }
    let tail: String = name.chars().skip(count - (max_len - 3)).collect();
    format!("...{tail}")
}
