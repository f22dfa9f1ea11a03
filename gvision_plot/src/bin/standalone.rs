use anyhow::Context;
use gvision::core_modules::histogram::compute_pdf;
use gvision::{ColorExtraction, HistogramSink, ImageFormat, YuvStandard};
use gvision_plot::GnuplotSink;

const SERIES: u32 = 8;

// Plots the value histogram of a single image file.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: gvision_plot <image>")?;

    let image = image::open(&path)
        .with_context(|| format!("failed to open {path}"))?
        .to_rgb8();
    let (width, height) = image.dimensions();
    let format = ImageFormat::packed_rgb(width, height, ColorExtraction::Value);
    let histogram = compute_pdf(&image, &format, YuvStandard::Studio)?;

    let mut sink = GnuplotSink::spawn_with_args(SERIES, &["-persist"])
        .context("gnuplot is not available on PATH")?;
    sink.emit(&histogram);
    Ok(())
}
