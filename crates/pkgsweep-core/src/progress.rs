//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: one indicatif bar per shard (cleared once the shard is written).
//! Non-TTY mode: hidden bars; [`Tracker`] still logs every tenth of a shard.

use std::cell::Cell;
use std::io::IsTerminal;
use std::sync::Arc;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Per-shard bar counting settled identifiers
fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:<12.dim} {bar:30.green/dim} {pos:>7}/{len:7} {per_sec:>9} {eta:>4} {wide_msg:.dim}")
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

    /// Context that never draws (tests, file logging).
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: false,
        }
    }

    /// Create a shard bar sized to `total` identifiers.
    ///
    /// Non-TTY: hidden (no-op).
    pub fn shard_bar(&self, label: &str, total: usize) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(total as u64));
        pb.set_style(bar_style());
        pb.set_prefix(label.to_string());
        pb
    }

    /// Tracker for one shard: drives the bar and the periodic log line.
    pub fn tracker(&self, label: &str, total: usize) -> Tracker {
        Tracker::new(label, total, self.shard_bar(label, total))
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

/// Shared handle to a `ProgressContext`.
pub type SharedProgress = Arc<ProgressContext>;

/// Completion counter for one shard.
///
/// Logs `label: done k/n` every `max(1, n / 10)` completions and on the
/// last one. Single-threaded by construction: every task of a shard runs
/// on the same task, so a `Cell` is enough.
pub struct Tracker {
    label: String,
    total: usize,
    step: usize,
    done: Cell<usize>,
    pb: ProgressBar,
}

impl Tracker {
    pub fn new(label: &str, total: usize, pb: ProgressBar) -> Self {
        Self {
            label: label.to_string(),
            total,
            step: (total / 10).max(1),
            done: Cell::new(0),
            pb,
        }
    }

    /// Record one settled task.
    pub fn complete(&self) {
        let done = self.done.get() + 1;
        self.done.set(done);
        self.pb.inc(1);
        if self.reports_at(done) {
            log::info!(
                "{}: done {}/{}",
                self.label,
                fmt_num(done),
                fmt_num(self.total)
            );
        }
    }

    /// Whether the `done`-th completion emits a log line
    fn reports_at(&self, done: usize) -> bool {
        done % self.step == 0 || done == self.total
    }

    pub fn done(&self) -> usize {
        self.done.get()
    }

    /// Clear the bar once the shard is written.
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

/// Format number with thousand separators.
pub fn fmt_num(n: usize) -> String {
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
        assert_eq!(fmt_num(20_000), "20,000");
        assert_eq!(fmt_num(1_234_567), "1,234,567");
    }

    #[test]
    fn tracker_counts_completions() {
        let t = Tracker::new("shard_0", 25, ProgressBar::hidden());
        for _ in 0..25 {
            t.complete();
        }
        assert_eq!(t.done(), 25);
        assert_eq!(t.step, 2);
    }

    #[test]
    fn tracker_logs_every_tenth_and_last() {
        let t = Tracker::new("shard_0", 25, ProgressBar::hidden());
        let points: Vec<usize> = (1..=25).filter(|&d| t.reports_at(d)).collect();
        assert_eq!(points, vec![2, 4, 6, 8, 10, 12, 14, 16, 18, 20, 22, 24, 25]);

        let t = Tracker::new("shard_1", 20_000, ProgressBar::hidden());
        let points: Vec<usize> = (1..=20_000).filter(|&d| t.reports_at(d)).collect();
        assert_eq!(points.len(), 10);
        assert_eq!(points[0], 2_000);
        assert_eq!(points.last(), Some(&20_000));
    }

    #[test]
    fn tracker_small_shard_logs_each_completion() {
        let t = Tracker::new("tiny", 3, ProgressBar::hidden());
        let points: Vec<usize> = (1..=3).filter(|&d| t.reports_at(d)).collect();
        assert_eq!(points, vec![1, 2, 3]);
    }

    #[test]
    fn tracker_step_never_zero() {
        let t = Tracker::new("tiny", 3, ProgressBar::hidden());
        assert_eq!(t.step, 1);
    }

    #[test]
    fn hidden_context_hides_bars() {
        let ctx = ProgressContext::hidden();
        assert!(!ctx.is_tty());
        assert!(ctx.shard_bar("x", 10).is_hidden());
    }
}
