use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use crate::shared::constants::MAX_RECENT_MESSAGES;

/// Observer for capture-run events.
///
/// Use cases report through this trait so the CLI, tests, or any other
/// front end can decide what to do with the events.
pub trait CaptureLogger: Send {
    /// Frame-level progress through a finite source.
    fn progress(&mut self, current: usize, total: usize);

    /// How long a named stage took for one pass.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A point-in-time measurement (face count, blur score, ...).
    fn metric(&mut self, name: &str, value: f64);

    /// A status message worth showing to the user.
    fn info(&mut self, message: &str);

    /// Per-face detail, usually filtered out.
    fn debug(&mut self, message: &str);

    /// Something the user should act on; the run continues.
    fn warn(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullCaptureLogger;

impl CaptureLogger for NullCaptureLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
    fn debug(&mut self, _message: &str) {}
    fn warn(&mut self, _message: &str) {}
}

/// Forwards to the `log` facade, aggregates stage timings and metrics for
/// a summary, and keeps the most recent messages (newest first).
pub struct StdoutCaptureLogger {
    throttle_frames: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    total_frames: usize,
    recent: VecDeque<String>,
}

impl StdoutCaptureLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            total_frames: 0,
            recent: VecDeque::with_capacity(MAX_RECENT_MESSAGES),
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Capture summary ({} frames, {:.1}s total):",
            self.total_frames,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({} passes)",
                durations.len()
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let values = &self.metrics[name];
            let avg = values.iter().sum::<f64>() / values.len().max(1) as f64;
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            lines.push(format!("  {name}: avg {avg:.1}  max {max:.1}"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }

    /// Recent info and debug messages, newest first.
    pub fn recent_messages(&self) -> impl Iterator<Item = &str> {
        self.recent.iter().map(|s| s.as_str())
    }

    fn remember(&mut self, message: &str) {
        let secs = self.start_time.elapsed().as_secs_f64();
        self.recent.push_front(format!("[{secs:7.2}s] {message}"));
        self.recent.truncate(MAX_RECENT_MESSAGES);
    }
}

impl Default for StdoutCaptureLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl CaptureLogger for StdoutCaptureLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.total_frames = current.max(self.total_frames);
        if total > 0 && (current % self.throttle_frames == 0 || current == total) {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Processing: {current}/{total} frames ({pct:.1}%)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        self.remember(message);
        log::info!("{message}");
    }

    fn debug(&mut self, message: &str) {
        self.remember(message);
        log::debug!("{message}");
    }

    fn warn(&mut self, message: &str) {
        self.remember(message);
        log::warn!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
