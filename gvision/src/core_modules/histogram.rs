// THEORY:
// The `histogram` module is the numeric core of the equalizer. It has three jobs:
//
// 1.  **Sampling (PDF)**: walk a frame region row by row and count how often each
//     0..=255 level of the derived channel occurs. For planar YUV frames that is
//     the Y byte itself; for packed RGB frames the pixel goes through the color
//     model converter first and the HSV value or YUV luma is counted. The result
//     is a raw frequency count, not a probability.
// 2.  **Accumulation (CDF)**: a prefix sum over the 256 buckets, then rescaled
//     with `cdf[i] = floor(i * cdf[i] / total)` into the lookup table used for
//     equalization.
// 3.  **Remapping**: a second full pass over the frame that pushes every sampled
//     pixel's derived channel through the lookup table, converting back to RGB
//     for packed frames.
//
// Sampling only ever reads, which is what lets the worker pool run it on many
// bands of the same frame at once. Remapping writes and stays on the calling
// thread.

use crate::core_modules::format::{ColorExtraction, ImageFormat, PixelLayout};
use crate::core_modules::pixel::pixel::{
    Hsv, Rgb, YuvStandard, hsv_to_rgb, rgb_to_hsv, rgb_to_yuv, yuv_to_rgb,
};
use crate::error::{Error, Result};
use std::ops::Index;

pub const HISTOGRAM_BUCKETS: usize = 256;

pub type Count = u32;

/// Per-level frequency counts of the derived channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    buckets: [Count; HISTOGRAM_BUCKETS],
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    pub const fn new() -> Self {
        Self { buckets: [0; HISTOGRAM_BUCKETS] }
    }

    pub fn clear(&mut self) {
        self.buckets.fill(0);
    }

    pub fn buckets(&self) -> &[Count; HISTOGRAM_BUCKETS] {
        &self.buckets
    }

    #[inline]
    pub fn increment(&mut self, level: u8) {
        self.buckets[level as usize] += 1;
    }

    /// Sum of all buckets, i.e. the number of samples taken.
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|&count| count as u64).sum()
    }

    /// Adds `other` bucket by bucket. Used to merge per-band partial histograms.
    pub fn accumulate(&mut self, other: &Histogram) {
        for (bucket, count) in self.buckets.iter_mut().zip(other.buckets.iter()) {
            *bucket += count;
        }
    }
}

impl Index<usize> for Histogram {
    type Output = Count;

    fn index(&self, level: usize) -> &Count {
        &self.buckets[level]
    }
}

/// Cumulative distribution table, normalized in place into a lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cdf {
    table: [u32; HISTOGRAM_BUCKETS],
}

impl Default for Cdf {
    fn default() -> Self {
        Self { table: [0; HISTOGRAM_BUCKETS] }
    }
}

impl Cdf {
    pub fn table(&self) -> &[u32; HISTOGRAM_BUCKETS] {
        &self.table
    }

    /// Maps a level through the normalized table.
    #[inline]
    pub fn lookup(&self, level: u8) -> u8 {
        self.table[level as usize].min(u8::MAX as u32) as u8
    }
}

impl Index<usize> for Cdf {
    type Output = u32;

    fn index(&self, level: usize) -> &u32 {
        &self.table[level]
    }
}

/// Reduces one pixel to the level of its derived channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSampler {
    layout: PixelLayout,
    extraction: ColorExtraction,
    standard: YuvStandard,
}

impl ChannelSampler {
    pub fn new(format: &ImageFormat, standard: YuvStandard) -> Self {
        Self {
            layout: format.layout,
            extraction: format.extraction,
            standard,
        }
    }

    #[inline]
    pub fn sample(&self, pixel: &[u8]) -> u8 {
        match (self.layout, self.extraction) {
            (PixelLayout::PlanarYuv420, _) => pixel[0],
            (PixelLayout::PackedRgb, ColorExtraction::Value) => {
                value_level(rgb_to_hsv(Rgb::from_bytes(pixel)))
            }
            (PixelLayout::PackedRgb, ColorExtraction::Luma) => {
                luma_level(rgb_to_yuv(Rgb::from_bytes(pixel), self.standard).y)
            }
        }
    }

    /// Rewrites one pixel so its derived channel goes through `cdf`.
    #[inline]
    pub fn remap(&self, pixel: &mut [u8], cdf: &Cdf) {
        match (self.layout, self.extraction) {
            (PixelLayout::PlanarYuv420, _) => pixel[0] = cdf.lookup(pixel[0]),
            (PixelLayout::PackedRgb, ColorExtraction::Value) => {
                let mut hsv = rgb_to_hsv(Rgb::from_bytes(pixel));
                hsv.value = cdf.lookup(value_level(hsv)) as f64 / 255.0;
                hsv_to_rgb(hsv).write_to(pixel);
            }
            (PixelLayout::PackedRgb, ColorExtraction::Luma) => {
                let mut yuv = rgb_to_yuv(Rgb::from_bytes(pixel), self.standard);
                yuv.y = cdf.lookup(luma_level(yuv.y)) as i32;
                yuv_to_rgb(yuv, self.standard).write_to(pixel);
            }
        }
    }
}

#[inline]
fn value_level(hsv: Hsv) -> u8 {
    (hsv.value * 255.0).round().clamp(0.0, 255.0) as u8
}

#[inline]
fn luma_level(y: i32) -> u8 {
    y.clamp(0, 255) as u8
}

/// Computes the histogram of `region` described by `format`.
pub fn compute_pdf(region: &[u8], format: &ImageFormat, standard: YuvStandard) -> Result<Histogram> {
    let mut histogram = Histogram::new();
    compute_pdf_into(region, format, standard, &mut histogram)?;
    Ok(histogram)
}

/// Like [`compute_pdf`] but adds into an existing histogram.
pub fn compute_pdf_into(
    region: &[u8],
    format: &ImageFormat,
    standard: YuvStandard,
    histogram: &mut Histogram,
) -> Result<()> {
    format.validate_buffer(region.len())?;
    accumulate_region(region, format, ChannelSampler::new(format, standard), histogram);
    Ok(())
}

/// Unchecked sampling loop shared by the single-threaded path and the workers.
/// The caller guarantees `region` holds `format.height` rows of
/// `format.bytes_per_line` bytes; zero-height bands are fine.
pub(crate) fn accumulate_region(
    region: &[u8],
    format: &ImageFormat,
    sampler: ChannelSampler,
    histogram: &mut Histogram,
) {
    let bytes_per_pixel = format.bytes_per_pixel();
    let bytes_per_line = format.bytes_per_line as usize;
    if bytes_per_line == 0 {
        return;
    }
    let row_bytes = format.width as usize * bytes_per_pixel;

    for row in region.chunks(bytes_per_line).take(format.height as usize) {
        for pixel in row[..row_bytes].chunks_exact(bytes_per_pixel) {
            histogram.increment(sampler.sample(pixel));
        }
    }
}

/// Prefix sum over the histogram buckets.
pub fn compute_cdf(histogram: &Histogram) -> Cdf {
    let mut cdf = Cdf::default();
    let mut running = 0u32;
    for (slot, &count) in cdf.table.iter_mut().zip(histogram.buckets.iter()) {
        running += count;
        *slot = running;
    }
    cdf
}

/// Rescales the CDF into the equalization lookup table.
/// `total_pixels` must be the number of samples the histogram was built from.
pub fn normalize_cdf(cdf: &mut Cdf, total_pixels: u64) -> Result<()> {
    if total_pixels == 0 {
        return Err(Error::InvalidArgument(
            "cannot normalize a CDF over zero pixels".into(),
        ));
    }
    for (level, slot) in cdf.table.iter_mut().enumerate() {
        *slot = (level as u64 * *slot as u64 / total_pixels) as u32;
    }
    Ok(())
}

/// Rewrites every sampled pixel of `frame` through `cdf`.
pub(crate) fn remap_region(frame: &mut [u8], format: &ImageFormat, sampler: ChannelSampler, cdf: &Cdf) {
    let bytes_per_pixel = format.bytes_per_pixel();
    let bytes_per_line = format.bytes_per_line as usize;
    let row_bytes = format.width as usize * bytes_per_pixel;

    for row in frame.chunks_mut(bytes_per_line).take(format.height as usize) {
        for pixel in row[..row_bytes].chunks_exact_mut(bytes_per_pixel) {
            sampler.remap(pixel, cdf);
        }
    }
}
