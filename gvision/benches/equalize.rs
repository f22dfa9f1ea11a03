//! Single-threaded vs pooled equalization of synthetic frames.
//!
//! Run with: cargo bench -p gvision

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use gvision::{ColorExtraction, EqualizerConfig, FrameEqualizer, ImageFormat};

fn synthetic_frame(format: &ImageFormat) -> Vec<u8> {
    (0..format.frame_len())
        .map(|i| ((i * 31 + i / 7) % 256) as u8)
        .collect()
}

fn bench_modes(c: &mut Criterion, group_name: &str, make_format: fn(u32, u32) -> ImageFormat) {
    let mut group = c.benchmark_group(group_name);

    for (width, height) in [(320, 240), (1280, 720), (1920, 1080)] {
        let format = make_format(width, height);
        let source = synthetic_frame(&format);
        group.throughput(Throughput::Elements(format.pixel_count()));

        for (name, config) in [
            ("single", EqualizerConfig::single()),
            ("pooled", EqualizerConfig::default()),
        ] {
            let mut equalizer = match FrameEqualizer::new(config) {
                Ok(equalizer) => equalizer,
                Err(err) => panic!("failed to build equalizer: {err}"),
            };
            group.bench_with_input(
                BenchmarkId::new(name, format!("{width}x{height}")),
                &format,
                |b, format| {
                    let mut frame = source.clone();
                    b.iter(|| {
                        frame.copy_from_slice(&source);
                        equalizer.equalize(black_box(&mut frame), format).ok();
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_planar(c: &mut Criterion) {
    bench_modes(c, "planar_yuv420", ImageFormat::planar_yuv420);
}

fn bench_packed_value(c: &mut Criterion) {
    bench_modes(c, "packed_rgb_value", |w, h| {
        ImageFormat::packed_rgb(w, h, ColorExtraction::Value)
    });
}

criterion_group!(benches, bench_planar, bench_packed_value);
criterion_main!(benches);
