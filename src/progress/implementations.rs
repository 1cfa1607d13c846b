//! Progress sink implementations.
//!
//! | Use Case | Implementation |
//! |----------|----------------|
//! | Library default, CI | [`SilentProgressSink`] |
//! | Interactive CLI | [`BarProgressSink`] |
//! | Tests | [`RecordingProgressSink`] |
//!
//! # Example: Using RecordingProgressSink in Tests
//!
//! ```rust
//! use churnmap::progress::implementations::{ProgressEvent, RecordingProgressSink};
//! use churnmap::progress::traits::ProgressSink;
//!
//! let recorder = RecordingProgressSink::new();
//!
//! recorder.start_stage("Recompute");
//! recorder.report("Recompute", 1, 10);
//! recorder.complete_stage("Recompute");
//!
//! let events = recorder.events();
//! assert_eq!(events.len(), 3);
//! assert!(matches!(events[0], ProgressEvent::StartStage { .. }));
//! ```

use super::traits::ProgressSink;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;
use std::sync::Arc;

const TEMPLATE_BAR: &str = "{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

/// No-op sink
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentProgressSink;

impl ProgressSink for SilentProgressSink {
    #[inline]
    fn report(&self, _stage: &str, _current: usize, _total: usize) {}

    #[inline]
    fn start_stage(&self, _name: &str) {}

    #[inline]
    fn complete_stage(&self, _name: &str) {}

    #[inline]
    fn warn(&self, _message: &str) {}
}

/// Terminal progress bar on stderr.
///
/// One bar per stage; the length is set from the first `report` call. When
/// `quiet` is set, or stderr is not a terminal, the bar is hidden and only
/// warnings are printed.
#[derive(Debug)]
pub struct BarProgressSink {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl BarProgressSink {
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn new_bar(&self, name: &str) -> ProgressBar {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        if self.quiet {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        // A malformed template only loses styling
        if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE_BAR) {
            bar.set_style(style.progress_chars("█▓▒░  "));
        }
        bar.set_message(name.to_string());
        bar
    }
}

impl Default for BarProgressSink {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ProgressSink for BarProgressSink {
    fn report(&self, _stage: &str, current: usize, total: usize) {
        if let Some(bar) = self.bar.lock().as_ref() {
            bar.set_length(total as u64);
            bar.set_position(current.min(total) as u64);
        }
    }

    fn start_stage(&self, name: &str) {
        let bar = self.new_bar(name);
        if let Some(previous) = self.bar.lock().replace(bar) {
            previous.finish_and_clear();
        }
    }

    fn complete_stage(&self, name: &str) {
        if let Some(bar) = self.bar.lock().take() {
            bar.finish_with_message(format!("{} complete", name));
        }
    }

    fn warn(&self, message: &str) {
        match self.bar.lock().as_ref() {
            Some(bar) if !bar.is_hidden() => bar.println(format!("Warning: {}", message)),
            _ => eprintln!("Warning: {}", message),
        }
    }
}

/// Event captured by [`RecordingProgressSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Report {
        stage: String,
        current: usize,
        total: usize,
    },
    StartStage {
        name: String,
    },
    CompleteStage {
        name: String,
    },
    Warning {
        message: String,
    },
}

/// Sink that records every event, for assertions in tests
#[derive(Clone, Debug, Default)]
pub struct RecordingProgressSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Warning { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Highest `current` reported for a stage
    pub fn max_reported(&self, stage: &str) -> Option<usize> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Report { stage: s, current, .. } if s == stage => Some(*current),
                _ => None,
            })
            .max()
    }

    fn push(&self, event: ProgressEvent) {
        self.events.lock().push(event);
    }
}

impl ProgressSink for RecordingProgressSink {
    fn report(&self, stage: &str, current: usize, total: usize) {
        self.push(ProgressEvent::Report {
            stage: stage.to_string(),
            current,
            total,
        });
    }

    fn start_stage(&self, name: &str) {
        self.push(ProgressEvent::StartStage {
            name: name.to_string(),
        });
    }

    fn complete_stage(&self, name: &str) {
        self.push(ProgressEvent::CompleteStage {
            name: name.to_string(),
        });
    }

    fn warn(&self, message: &str) {
        self.push(ProgressEvent::Warning {
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_captures_in_order() {
        let recorder = RecordingProgressSink::new();
        recorder.start_stage("Recompute");
        recorder.report("Recompute", 1, 3);
        recorder.warn("shipper 4 failed");
        recorder.report("Recompute", 3, 3);
        recorder.complete_stage("Recompute");

        assert_eq!(recorder.events().len(), 5);
        assert_eq!(recorder.warnings(), vec!["shipper 4 failed".to_string()]);
        assert_eq!(recorder.max_reported("Recompute"), Some(3));
        assert_eq!(recorder.max_reported("Backfill"), None);
    }

    #[test]
    fn test_recording_sink_clones_share_events() {
        let recorder = RecordingProgressSink::new();
        let shared: Arc<dyn ProgressSink> = Arc::new(recorder.clone());
        shared.start_stage("Backfill");
        assert_eq!(
            recorder.events(),
            vec![ProgressEvent::StartStage {
                name: "Backfill".to_string()
            }]
        );
    }

    #[test]
    fn test_quiet_bar_sink_is_safe_without_stage() {
        let sink = BarProgressSink::new(true);
        sink.report("Recompute", 5, 2);
        sink.start_stage("Recompute");
        sink.report("Recompute", 5, 2);
        sink.complete_stage("Recompute");
        sink.complete_stage("Recompute");
    }
}
