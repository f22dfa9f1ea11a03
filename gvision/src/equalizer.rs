// THEORY:
// The `equalizer` module is the top-level API of the engine. A `FrameEqualizer`
// takes one frame at a time, in place, and runs it through four fixed steps:
//
// 1.  **Lease**: take the next scratch histogram from the round-robin pool and
//     zero it.
// 2.  **Histogram**: fill it, either on the calling thread or by fanning the
//     frame out over the persistent worker pool and merging the bands.
// 3.  **CDF**: prefix-sum the histogram and normalize it against the pixel count
//     into a 256-entry lookup table.
// 4.  **Remap**: a second full pass on the calling thread that rewrites every
//     sampled pixel's derived channel through the table.
//
// The frame is validated before step 1, so a frame that errors out is handed
// back byte-for-byte unchanged. `process_frame` is the host-facing wrapper that
// turns that into a pass-through instead of an error.

use crate::config::{EqualizerConfig, HistogramMode};
use crate::core_modules::format::{ColorExtraction, ImageFormat};
use crate::core_modules::histogram::{
    Cdf, ChannelSampler, Histogram, compute_cdf, compute_pdf_into, normalize_cdf, remap_region,
};
use crate::core_modules::histogram_pool::{HistogramPool, SlotId};
use crate::core_modules::worker_pool::HistogramWorkerPool;
use crate::error::Result;
use crate::plot::HistogramSink;
use crate::profile::DurationSink;
use image::{GrayImage, RgbImage};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// What happened to a frame handed to [`FrameEqualizer::process_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No usable format; the frame was not looked at.
    Skipped,
    /// The frame was rewritten in place.
    Equalized,
    /// The frame failed validation and was left untouched.
    PassedThrough,
}

enum HistogramEngine {
    Single,
    Pooled(HistogramWorkerPool),
}

pub struct FrameEqualizer {
    config: EqualizerConfig,
    engine: HistogramEngine,
    scratch: HistogramPool,
    last_slot: Option<SlotId>,
    cdf: Cdf,
    frames_equalized: u64,
    duration_sink: Option<Arc<dyn DurationSink>>,
    histogram_sink: Option<Box<dyn HistogramSink>>,
}

impl FrameEqualizer {
    pub fn new(config: EqualizerConfig) -> Result<Self> {
        config.validate()?;

        let engine = match config.mode {
            HistogramMode::Single => HistogramEngine::Single,
            HistogramMode::Pooled => HistogramEngine::Pooled(HistogramWorkerPool::with_affinity(
                config.worker_count(),
                config.pin_workers,
            )?),
        };
        let scratch = HistogramPool::new(config.histogram_slots)?;

        info!(
            mode = ?config.mode,
            histogram_slots = config.histogram_slots,
            yuv_standard = ?config.yuv_standard,
            "frame equalizer ready"
        );

        Ok(Self {
            config,
            engine,
            scratch,
            last_slot: None,
            cdf: Cdf::default(),
            frames_equalized: 0,
            duration_sink: None,
            histogram_sink: None,
        })
    }

    pub fn with_duration_sink(mut self, sink: Arc<dyn DurationSink>) -> Self {
        self.duration_sink = Some(sink);
        self
    }

    pub fn with_histogram_sink(mut self, sink: Box<dyn HistogramSink>) -> Self {
        self.histogram_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &EqualizerConfig {
        &self.config
    }

    /// Threads the histogram pass runs on; 1 in single-threaded mode.
    pub fn worker_count(&self) -> usize {
        match &self.engine {
            HistogramEngine::Single => 1,
            HistogramEngine::Pooled(pool) => pool.worker_count(),
        }
    }

    pub fn frames_equalized(&self) -> u64 {
        self.frames_equalized
    }

    /// Histogram of the most recently equalized frame.
    pub fn last_histogram(&self) -> Option<&Histogram> {
        self.last_slot.map(|slot| self.scratch.get(slot))
    }

    /// Normalized lookup table of the most recently equalized frame.
    pub fn last_cdf(&self) -> Option<&Cdf> {
        self.last_slot.map(|_| &self.cdf)
    }

    /// Equalizes `frame` in place.
    pub fn equalize(&mut self, frame: &mut [u8], format: &ImageFormat) -> Result<()> {
        format.validate_buffer(frame.len())?;
        let standard = self.config.yuv_standard;

        let slot = self.scratch.lease();
        let started = Instant::now();
        {
            let histogram = self.scratch.get_mut(slot);
            match &mut self.engine {
                HistogramEngine::Single => compute_pdf_into(frame, format, standard, histogram)?,
                HistogramEngine::Pooled(pool) => pool.run_frame(frame, format, standard, histogram)?,
            }
        }
        self.record("histogram", started.elapsed());

        let histogram = self.scratch.get(slot);
        let mut cdf = compute_cdf(histogram);
        normalize_cdf(&mut cdf, format.pixel_count())?;

        if let Some(sink) = self.histogram_sink.as_mut() {
            sink.emit(histogram);
        }

        let started = Instant::now();
        remap_region(frame, format, ChannelSampler::new(format, standard), &cdf);
        self.record("remap", started.elapsed());

        self.cdf = cdf;
        self.last_slot = Some(slot);
        self.frames_equalized += 1;
        trace!(
            slot = slot.index(),
            width = format.width,
            height = format.height,
            "frame equalized"
        );
        Ok(())
    }

    /// Host-boundary entry point: never fails, reports what it did instead.
    pub fn process_frame(&mut self, frame: &mut [u8], format: Option<&ImageFormat>) -> FrameOutcome {
        let Some(format) = format else {
            debug!("frame skipped: no format negotiated");
            return FrameOutcome::Skipped;
        };
        if format.is_empty() {
            debug!(width = format.width, height = format.height, "frame skipped: empty format");
            return FrameOutcome::Skipped;
        }

        match self.equalize(frame, format) {
            Ok(()) => FrameOutcome::Equalized,
            Err(err) => {
                warn!(error = %err, "frame passed through unmodified");
                FrameOutcome::PassedThrough
            }
        }
    }

    /// Equalizes an 8-bit RGB image on the given derived channel.
    pub fn equalize_rgb_image(&mut self, image: &mut RgbImage, extraction: ColorExtraction) -> Result<()> {
        let (width, height) = image.dimensions();
        let format = ImageFormat::packed_rgb(width, height, extraction);
        self.equalize(image, &format)
    }

    /// Equalizes an 8-bit greyscale image as a bare luma plane.
    pub fn equalize_luma_image(&mut self, image: &mut GrayImage) -> Result<()> {
        let (width, height) = image.dimensions();
        let format = ImageFormat::planar_yuv420(width, height);
        self.equalize(image, &format)
    }

    /// Stops the worker pool, if any. Dropping the equalizer does the same.
    pub fn shutdown(self) {
        if let HistogramEngine::Pooled(pool) = self.engine {
            pool.shutdown();
        }
    }

    fn record(&self, key: &str, elapsed: Duration) {
        if let Some(sink) = &self.duration_sink {
            sink.record(key, elapsed);
        }
    }
}
