// THEORY:
// This file is the main entry point for the `gvision` library crate, a parallel
// histogram-equalization engine for raw 8-bit video frames.
//
// The primary goal is to export the `FrameEqualizer` and its configuration as
// the high-level interface, with `FrameStage` as the async wrapper for tokio
// hosts. The building blocks in `core_modules` (color model converter, histogram
// engine, partitioner, scratch and worker pools) stay public so they can be
// driven and tested on their own, and the `profile` and `plot` modules define
// the optional instrumentation and visualization seams.

pub mod config;
pub mod core_modules;
pub mod equalizer;
pub mod error;
pub mod parallel_pipeline;
pub mod plot;
pub mod profile;

pub use config::{EqualizerConfig, HistogramMode, YuvStandard};
pub use core_modules::format::{ColorExtraction, ImageFormat, PixelLayout};
pub use core_modules::histogram::{Cdf, Histogram};
pub use equalizer::{FrameEqualizer, FrameOutcome};
pub use error::{Error, Result};
pub use parallel_pipeline::{FrameStage, ProcessedFrame};
pub use plot::{HistogramSink, PlotPoint, plot_points};
pub use profile::{DurationAverager, DurationSink};
