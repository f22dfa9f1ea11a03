#![allow(dead_code)]

use gvision::{EqualizerConfig, FrameEqualizer, ImageFormat};

pub fn single() -> FrameEqualizer {
    FrameEqualizer::new(EqualizerConfig::single()).unwrap()
}

pub fn pooled(workers: usize) -> FrameEqualizer {
    let config = EqualizerConfig {
        pin_workers: false,
        ..EqualizerConfig::pooled(workers)
    };
    FrameEqualizer::new(config).unwrap()
}

/// Deterministic frame with a skewed, non-uniform level distribution.
pub fn skewed_frame(format: &ImageFormat, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..format.frame_len())
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            // Squaring pushes most samples into the dark end.
            let level = (state % 256) as u64;
            (level * level / 255) as u8
        })
        .collect()
}
