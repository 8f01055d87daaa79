//! Stage timing report for the pipeline.
//!
//! Timings are collected into an explicit value threaded through the
//! pipeline, decoupled from algorithmic state. Spans preserve insertion
//! order so reports read in pipeline order.

use std::fmt;
use std::time::{Duration, Instant};

use log::debug;
use serde::Serialize;

/// Named stage durations in insertion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimingReport {
    spans: Vec<(String, Duration)>,
}

impl TimingReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed span. Stage names are expected to be unique per
    /// run; a repeated name is simply appended.
    pub fn record(&mut self, stage: &str, elapsed: Duration) {
        debug!("stage '{}' took {:.3}ms", stage, elapsed.as_secs_f64() * 1e3);
        self.spans.push((stage.to_string(), elapsed));
    }

    /// Time `f` and record it under `stage`.
    pub fn span<T>(&mut self, stage: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(stage, start.elapsed());
        out
    }

    /// Lookup by stage name (first match).
    pub fn get(&self, stage: &str) -> Option<Duration> {
        self.spans.iter().find(|(s, _)| s == stage).map(|(_, d)| *d)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.spans.iter().map(|(s, d)| (s.as_str(), *d))
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

impl fmt::Display for TimingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Timing report:")?;
        for (stage, dur) in &self.spans {
            writeln!(f, "  {:<24} {:>10.3}ms", stage, dur.as_secs_f64() * 1e3)?;
        }
        Ok(())
    }
}
