// THEORY:
// `EqualizerConfig` is everything the equalizer decides once, at construction
// time: whether histograms are computed on the calling thread or on the worker
// pool, how many workers that pool gets and whether they are pinned, how many
// scratch histograms rotate, which YUV coefficient set packed luma frames use,
// and how many series a histogram plot replicates. Nothing here can change after
// the equalizer is built.
//
// The struct deserializes from partial JSON; every missing field takes its
// default.

use crate::core_modules::histogram_pool::DEFAULT_HISTOGRAM_SLOTS;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub use crate::core_modules::pixel::pixel::YuvStandard;

pub const DEFAULT_PLOT_SERIES: u32 = 8;

/// Where the histogram pass of a frame runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramMode {
    /// On the calling thread.
    Single,
    /// On the persistent worker pool, one band per worker.
    #[default]
    Pooled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqualizerConfig {
    pub mode: HistogramMode,
    /// Worker count for `HistogramMode::Pooled`. `None` means one per logical core.
    pub workers: Option<usize>,
    /// Pin each worker to its own core.
    pub pin_workers: bool,
    /// Number of scratch histograms in the round-robin pool.
    pub histogram_slots: usize,
    pub yuv_standard: YuvStandard,
    /// Number of replicated series a histogram plot is drawn with.
    pub plot_series: u32,
}

impl Default for EqualizerConfig {
    fn default() -> Self {
        Self {
            mode: HistogramMode::Pooled,
            workers: None,
            pin_workers: true,
            histogram_slots: DEFAULT_HISTOGRAM_SLOTS,
            yuv_standard: YuvStandard::Studio,
            plot_series: DEFAULT_PLOT_SERIES,
        }
    }
}

impl EqualizerConfig {
    pub fn single() -> Self {
        Self { mode: HistogramMode::Single, ..Self::default() }
    }

    pub fn pooled(workers: usize) -> Self {
        Self {
            mode: HistogramMode::Pooled,
            workers: Some(workers),
            ..Self::default()
        }
    }

    /// The worker count the pool will actually start with.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == Some(0) {
            return Err(Error::InvalidArgument("worker count must be at least 1".into()));
        }
        if self.histogram_slots == 0 {
            return Err(Error::InvalidArgument(
                "histogram slot count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_pooled_and_valid() {
        let config = EqualizerConfig::default();
        assert_eq!(config.mode, HistogramMode::Pooled);
        assert_eq!(config.histogram_slots, 8);
        assert!(config.pin_workers);
        assert!(config.worker_count() >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_workers_and_slots() {
        assert!(EqualizerConfig::pooled(0).validate().is_err());
        let config = EqualizerConfig { histogram_slots: 0, ..EqualizerConfig::single() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: EqualizerConfig =
            serde_json::from_str(r#"{ "mode": "single", "yuv_standard": "bt709" }"#).unwrap();
        assert_eq!(config.mode, HistogramMode::Single);
        assert_eq!(config.yuv_standard, YuvStandard::Bt709);
        assert_eq!(config.histogram_slots, DEFAULT_HISTOGRAM_SLOTS);
        assert_eq!(config.workers, None);
    }
}
