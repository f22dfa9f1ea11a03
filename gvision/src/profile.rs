// THEORY:
// Optional timing instrumentation. The equalizer reports how long each named
// stage of a frame took ("histogram", "remap") to a `DurationSink` when one is
// attached. The stock sink, `DurationAverager`, keeps a running average per key
// and logs a decimated sample (every 11th) through `tracing`.
//
// A sink sits on the hot path of every frame, so it must never block or fail:
// `DurationAverager` only ever uses `try_lock` on the recording side and simply
// drops a sample when the map is contended.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::info;

/// One sample in every `REPORT_EVERY` is logged.
pub const REPORT_EVERY: u64 = 11;

/// True for the samples that get logged: the 1st, 12th, 23rd and so on.
pub fn should_report(samples: u64) -> bool {
    samples % REPORT_EVERY == 1
}

pub trait DurationSink: Send + Sync {
    fn record(&self, key: &str, elapsed: Duration);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationStats {
    pub samples: u64,
    pub total: Duration,
}

impl DurationStats {
    pub fn average(&self) -> Duration {
        if self.samples == 0 {
            return Duration::ZERO;
        }
        self.total / self.samples as u32
    }
}

/// Per-key running averages, keyed case-insensitively.
#[derive(Debug, Default)]
pub struct DurationAverager {
    stats: Mutex<HashMap<String, DurationStats>>,
}

impl DurationAverager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self, key: &str) -> Option<DurationStats> {
        let stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.get(&key.to_ascii_lowercase()).copied()
    }

    /// All keys with their stats, sorted by key.
    pub fn snapshot(&self) -> Vec<(String, DurationStats)> {
        let stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<_> = stats.iter().map(|(key, s)| (key.clone(), *s)).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl DurationSink for DurationAverager {
    fn record(&self, key: &str, elapsed: Duration) {
        let Ok(mut stats) = self.stats.try_lock() else {
            return;
        };
        let entry = stats.entry(key.to_ascii_lowercase()).or_default();
        entry.samples += 1;
        entry.total += elapsed;

        if should_report(entry.samples) {
            info!(
                key,
                samples = entry.samples,
                average_us = entry.average().as_micros() as u64,
                "stage duration"
            );
        }
    }
}
