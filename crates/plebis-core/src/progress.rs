//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: indicatif bars (attempted IDs, index flush status line).
//! Non-TTY mode: periodic log lines instead of bars.

use std::io::IsTerminal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Non-TTY: log a progress line every this many attempted IDs
const LOG_EVERY: u64 = 1_000;

/// Attempted-vs-total ID bar
fn id_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:<8.dim} {pos:>7}/{len:7} {bar:40.green/dim} {per_sec:>8} {eta:>4}")
        .expect("invalid template")
        .progress_chars("--")
}

/// Central progress context managing multi-progress bars.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        let is_tty = std::io::stderr().is_terminal();
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Context that never draws (tests, library callers).
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()),
            is_tty: false,
        }
    }

    /// Counter of attempted IDs out of `total`.
    pub fn id_progress(&self, label: &str, total: u64) -> IdProgress {
        let bar = if self.is_tty {
            let pb = self.multi.add(ProgressBar::new(total));
            pb.set_style(id_bar_style());
            pb.set_prefix(label.to_string());
            pb
        } else {
            ProgressBar::hidden()
        };
        IdProgress {
            bar,
            label: label.to_string(),
            total,
            done: AtomicU64::new(0),
            log_lines: !self.is_tty,
        }
    }

    /// Create a stage status line managed by MultiProgress.
    ///
    /// Returns a ProgressBar with a spinner for active status display.
    /// Update with `pb.set_message(...)`; call `pb.finish()` to stop the spinner.
    pub fn stage_line(&self, name: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(0));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {prefix:<8.cyan.bold} {wide_msg}")
                .expect("invalid template"),
        );
        pb.set_prefix(name.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// Whether running in TTY mode.
    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Get reference to `MultiProgress` for log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for `ProgressContext`.
pub type SharedProgress = Arc<ProgressContext>;

/// Shared attempted-ID counter, drawn as a bar or logged periodically.
pub struct IdProgress {
    bar: ProgressBar,
    label: String,
    total: u64,
    done: AtomicU64,
    log_lines: bool,
}

impl IdProgress {
    /// Record one attempted ID (skipped, failed and stored all count).
    pub fn inc(&self) {
        let n = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        self.bar.inc(1);
        if self.log_lines && n % LOG_EVERY == 0 {
            log::info!("{}: {} / {}", self.label, fmt_num(n), fmt_num(self.total));
        }
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Format number with thousand separators.
pub fn fmt_num(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_num_small() {
        assert_eq!(fmt_num(0), "0");
        assert_eq!(fmt_num(12), "12");
        assert_eq!(fmt_num(123), "123");
    }

    #[test]
    fn fmt_num_thousands() {
        assert_eq!(fmt_num(1_000), "1,000");
        assert_eq!(fmt_num(199_999), "199,999");
        assert_eq!(fmt_num(1_234_567), "1,234,567");
    }

    #[test]
    fn id_progress_counts() {
        let ctx = ProgressContext::hidden();
        let p = ctx.id_progress("ids", 10);
        for _ in 0..3 {
            p.inc();
        }
        assert_eq!(p.done(), 3);
        p.finish();
    }

    #[test]
    fn hidden_context_is_not_tty() {
        let ctx = ProgressContext::hidden();
        assert!(!ctx.is_tty());
        assert!(ctx.stage_line("index").is_hidden());
    }
}
