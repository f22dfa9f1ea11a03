// THEORY:
// An `ImageFormat` is the immutable description of one raw frame: how wide and
// tall it is, how its bytes are laid out, and (for packed RGB) which derived
// channel gets equalized. The histogram engine and the worker pool never look at
// a buffer without one, and the worker pool hands every band a copy with its
// height and size narrowed to that band.
//
// Validation lives here so that every entry point can reject a bad frame before
// touching a single byte of it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Number of bytes a packed RGB pixel occupies at minimum.
pub const RGB_BYTES: u32 = 3;

/// Byte layout of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelLayout {
    /// Y plane followed by two half-resolution chroma planes (YV12 / I420).
    PlanarYuv420,
    /// Interleaved R, G, B bytes.
    PackedRgb,
}

/// The derived scalar channel that is histogrammed for packed RGB frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorExtraction {
    /// HSV value, max(R, G, B).
    #[default]
    Value,
    /// YUV luma.
    Luma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFormat {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    /// Row stride in bytes.
    pub bytes_per_line: u32,
    /// Bytes covered by `height` rows, i.e. `height * bytes_per_line`.
    pub size: u32,
    /// Only meaningful for `PixelLayout::PackedRgb`.
    pub extraction: ColorExtraction,
}

impl ImageFormat {
    pub fn planar_yuv420(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            layout: PixelLayout::PlanarYuv420,
            bytes_per_line: width,
            size: width.saturating_mul(height),
            extraction: ColorExtraction::Luma,
        }
    }

    pub fn packed_rgb(width: u32, height: u32, extraction: ColorExtraction) -> Self {
        let bytes_per_line = width.saturating_mul(RGB_BYTES);
        Self {
            width,
            height,
            layout: PixelLayout::PackedRgb,
            bytes_per_line,
            size: bytes_per_line.saturating_mul(height),
            extraction,
        }
    }

    /// Overrides the row stride, keeping `size` consistent with it.
    pub fn with_bytes_per_line(mut self, bytes_per_line: u32) -> Self {
        self.bytes_per_line = bytes_per_line;
        self.size = bytes_per_line.saturating_mul(self.height);
        self
    }

    /// Number of samples the histogram is built from.
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Byte step between horizontally adjacent pixels. Luma samples are one
    /// byte wide whatever the stride; `bytes_per_line` only sets the row advance.
    pub fn bytes_per_pixel(&self) -> usize {
        match self.layout {
            PixelLayout::PackedRgb => RGB_BYTES as usize,
            PixelLayout::PlanarYuv420 => 1,
        }
    }

    /// True when there is nothing to sample.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Total length of a full frame in this format. For planar frames this
    /// includes both chroma planes, which the equalizer leaves untouched.
    pub fn frame_len(&self) -> usize {
        match self.layout {
            PixelLayout::PackedRgb => self.size as usize,
            PixelLayout::PlanarYuv420 => {
                let chroma_width = self.width.div_ceil(2) as usize;
                let chroma_height = self.height.div_ceil(2) as usize;
                self.size as usize + 2 * chroma_width * chroma_height
            }
        }
    }

    /// Narrows the format to `rows` rows, as handed to a single band.
    pub fn band(&self, rows: u32) -> Self {
        Self {
            height: rows,
            size: rows.saturating_mul(self.bytes_per_line),
            ..*self
        }
    }

    /// Checks the format invariants on their own.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidArgument(format!(
                "frame dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        let needed_stride = match self.layout {
            PixelLayout::PlanarYuv420 => self.width as u64,
            PixelLayout::PackedRgb => self.width as u64 * RGB_BYTES as u64,
        };
        if (self.bytes_per_line as u64) < needed_stride {
            return Err(Error::UnsupportedFormat(format!(
                "{:?} frame of width {} needs at least {} bytes per line, got {}",
                self.layout, self.width, needed_stride, self.bytes_per_line
            )));
        }
        let frame_bytes = self.height as u64 * self.bytes_per_line as u64;
        if frame_bytes > u32::MAX as u64 {
            return Err(Error::InvalidArgument(format!(
                "{}x{} frame with {} bytes per line does not fit in {} bytes",
                self.width,
                self.height,
                self.bytes_per_line,
                u32::MAX
            )));
        }
        if self.size as u64 != frame_bytes {
            return Err(Error::InvalidArgument(format!(
                "size {} does not match height {} * bytes per line {}",
                self.size, self.height, self.bytes_per_line
            )));
        }
        Ok(())
    }

    /// Checks the format and that `buffer_len` bytes can hold it.
    pub fn validate_buffer(&self, buffer_len: usize) -> Result<()> {
        self.validate()?;
        if buffer_len < self.size as usize {
            return Err(Error::BufferTooSmall {
                needed: self.size as usize,
                actual: buffer_len,
            });
        }
        Ok(())
    }
}
