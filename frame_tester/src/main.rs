use anyhow::Context;
use clap::{Parser, ValueEnum};
use gvision::{ColorExtraction, DurationAverager, EqualizerConfig, FrameEqualizer, HistogramMode};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Channel {
    /// HSV value
    Value,
    /// YUV luma
    Luma,
}

impl From<Channel> for ColorExtraction {
    fn from(channel: Channel) -> Self {
        match channel {
            Channel::Value => ColorExtraction::Value,
            Channel::Luma => ColorExtraction::Luma,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Single,
    Pooled,
}

impl From<Mode> for HistogramMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Single => HistogramMode::Single,
            Mode::Pooled => HistogramMode::Pooled,
        }
    }
}

/// Equalizes a still image with the gvision engine and writes the result.
#[derive(Parser, Debug)]
#[command(name = "frame_tester", version, about)]
struct Args {
    input: PathBuf,
    output: PathBuf,

    /// Derived channel that gets equalized.
    #[arg(long, value_enum, default_value_t = Channel::Value)]
    channel: Channel,

    /// Overrides the histogram mode from the config file.
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Overrides the worker count.
    #[arg(long)]
    workers: Option<usize>,

    /// JSON equalizer config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Plot every frame's histogram with gnuplot.
    #[arg(long)]
    plot: bool,

    /// Equalize the input this many times, for timing.
    #[arg(long, default_value_t = 1)]
    repeat: u32,
}

fn load_config(args: &Args) -> anyhow::Result<EqualizerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str::<EqualizerConfig>(&text)
                .with_context(|| format!("invalid config in {}", path.display()))?
        }
        None => EqualizerConfig::default(),
    };

    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }
    if args.workers.is_some() {
        config.workers = args.workers;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(feature = "plot")]
fn attach_plot(equalizer: FrameEqualizer, series: u32) -> FrameEqualizer {
    match gvision_plot::GnuplotSink::spawn(series) {
        Some(sink) => equalizer.with_histogram_sink(Box::new(sink)),
        None => {
            warn!("gnuplot not found, plotting disabled");
            equalizer
        }
    }
}

#[cfg(not(feature = "plot"))]
fn attach_plot(equalizer: FrameEqualizer, _series: u32) -> FrameEqualizer {
    warn!("built without the plot feature, plotting disabled");
    equalizer
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let plot_series = config.plot_series;

    let averager = Arc::new(DurationAverager::new());
    let mut equalizer = FrameEqualizer::new(config)?.with_duration_sink(averager.clone());
    if args.plot {
        equalizer = attach_plot(equalizer, plot_series);
    }

    let source = image::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?
        .to_rgb8();
    info!(
        width = source.width(),
        height = source.height(),
        workers = equalizer.worker_count(),
        "input loaded"
    );

    let started = Instant::now();
    let mut output = source.clone();
    for _ in 0..args.repeat.max(1) {
        output.clone_from(&source);
        equalizer.equalize_rgb_image(&mut output, args.channel.into())?;
    }
    info!(
        frames = equalizer.frames_equalized(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "equalization done"
    );

    for (key, stats) in averager.snapshot() {
        info!(
            key = %key,
            samples = stats.samples,
            average_us = stats.average().as_micros() as u64,
            "stage average"
        );
    }

    output
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(path = %args.output.display(), "output written");

    equalizer.shutdown();
    Ok(())
}
