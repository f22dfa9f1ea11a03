mod common;

use common::{pooled, single, skewed_frame};
use gvision::{ColorExtraction, FrameOutcome, ImageFormat};

#[test]
fn all_black_planar_frame() {
    let format = ImageFormat::planar_yuv420(4, 4);

    for mut equalizer in [single(), pooled(3)] {
        let mut frame = vec![0u8; format.frame_len()];
        equalizer.equalize(&mut frame, &format).unwrap();

        let histogram = equalizer.last_histogram().unwrap();
        assert_eq!(histogram[0], 16);
        assert_eq!(histogram.total(), 16);
        assert_eq!(equalizer.last_cdf().unwrap()[0], 0);
        assert!(frame.iter().all(|&byte| byte == 0));
    }
}

#[test]
fn white_and_black_value_pixels() {
    let format = ImageFormat::packed_rgb(2, 1, ColorExtraction::Value);

    for mut equalizer in [single(), pooled(2)] {
        let mut frame = vec![255, 255, 255, 0, 0, 0];
        equalizer.equalize(&mut frame, &format).unwrap();

        let histogram = equalizer.last_histogram().unwrap();
        assert_eq!(histogram[255], 1);
        assert_eq!(histogram[0], 1);
        let cdf = equalizer.last_cdf().unwrap();
        assert_eq!(cdf[0], 0);
        assert_eq!(cdf[255], 255);
        assert_eq!(frame, vec![255, 255, 255, 0, 0, 0]);
    }
}

fn assert_parity(format: ImageFormat, workers: usize) {
    let original = skewed_frame(&format, format.width ^ format.height);
    let mut single = single();
    let mut pooled = pooled(workers);

    let mut single_frame = original.clone();
    let mut pooled_frame = original.clone();
    single.equalize(&mut single_frame, &format).unwrap();
    pooled.equalize(&mut pooled_frame, &format).unwrap();

    assert_eq!(single.last_histogram(), pooled.last_histogram());
    assert_eq!(single.last_cdf(), pooled.last_cdf());
    assert_eq!(single_frame, pooled_frame);
}

#[test]
fn single_and_pooled_agree_on_planar_frames() {
    assert_parity(ImageFormat::planar_yuv420(64, 37), 4);
    assert_parity(ImageFormat::planar_yuv420(7, 3), 5);
}

#[test]
fn single_and_pooled_agree_on_packed_frames() {
    assert_parity(ImageFormat::packed_rgb(31, 19, ColorExtraction::Value), 3);
    assert_parity(ImageFormat::packed_rgb(31, 19, ColorExtraction::Luma), 6);
}

#[test]
fn single_and_pooled_agree_on_padded_strides() {
    let format = ImageFormat::packed_rgb(10, 9, ColorExtraction::Value).with_bytes_per_line(32);
    assert_parity(format, 4);
}

#[test]
fn padding_bytes_are_never_written() {
    let format = ImageFormat::packed_rgb(2, 3, ColorExtraction::Luma).with_bytes_per_line(8);
    let mut frame = skewed_frame(&format, 11);
    let padding: Vec<u8> = frame.chunks(8).map(|row| row[6]).collect();

    let mut equalizer = pooled(2);
    equalizer.equalize(&mut frame, &format).unwrap();

    let after: Vec<u8> = frame.chunks(8).map(|row| row[6]).collect();
    assert_eq!(padding, after);
}

#[test]
fn padded_planar_rows_equalize_luma_and_keep_padding() {
    let format = ImageFormat::planar_yuv420(4, 2).with_bytes_per_line(12);

    for mut equalizer in [single(), pooled(2)] {
        let mut frame = Vec::new();
        for _ in 0..2 {
            frame.extend_from_slice(&[10, 20, 30, 40]);
            frame.extend_from_slice(&[200; 8]);
        }

        equalizer.equalize(&mut frame, &format).unwrap();

        let histogram = equalizer.last_histogram().unwrap();
        assert_eq!(histogram[200], 0);
        assert_eq!(histogram.total(), 8);
        // floor(i * cdf[i] / 8) with cdf 2, 4, 6, 8 at levels 10, 20, 30, 40.
        for row in frame.chunks(12) {
            assert_eq!(&row[..4], &[2, 10, 22, 40]);
            assert!(row[4..].iter().all(|&byte| byte == 200));
        }
    }
}

#[test]
fn chroma_planes_are_left_alone() {
    let format = ImageFormat::planar_yuv420(8, 6);
    let mut frame = skewed_frame(&format, 3);
    let chroma = frame[format.size as usize..].to_vec();

    pooled(4).equalize(&mut frame, &format).unwrap();
    assert_eq!(&frame[format.size as usize..], chroma.as_slice());
}

#[test]
fn remapped_levels_never_exceed_their_source() {
    // floor(i * cdf[i] / total) <= i for every level i.
    let format = ImageFormat::planar_yuv420(32, 32);
    let original = skewed_frame(&format, 42);
    let mut frame = original.clone();
    let mut equalizer = single();
    equalizer.equalize(&mut frame, &format).unwrap();

    let luma = format.size as usize;
    assert!(frame[..luma].iter().zip(&original[..luma]).all(|(after, before)| after <= before));
    assert_eq!(equalizer.frames_equalized(), 1);
}

#[test]
fn uniform_frames_are_fixed_points() {
    for level in [0u8, 1, 99, 254, 255] {
        let format = ImageFormat::packed_rgb(5, 4, ColorExtraction::Value);
        let mut frame = vec![level; format.frame_len()];
        let mut equalizer = pooled(2);
        equalizer.equalize(&mut frame, &format).unwrap();
        assert!(frame.iter().all(|&byte| byte == level), "level {level} moved");
    }
}

#[test]
fn host_boundary_never_fails() {
    let mut equalizer = pooled(2);
    let format = ImageFormat::planar_yuv420(4, 4);

    let mut short = vec![3u8; 4];
    assert_eq!(equalizer.process_frame(&mut short, Some(&format)), FrameOutcome::PassedThrough);
    assert_eq!(short, vec![3u8; 4]);

    let mut frame = skewed_frame(&format, 5);
    assert_eq!(equalizer.process_frame(&mut frame, Some(&format)), FrameOutcome::Equalized);
    assert_eq!(equalizer.process_frame(&mut frame, None), FrameOutcome::Skipped);
}

#[test]
fn previous_histogram_stays_readable() {
    let format = ImageFormat::planar_yuv420(4, 1);
    let mut equalizer = single();

    let mut first = vec![1, 1, 1, 1, 0, 0, 0, 0];
    equalizer.equalize(&mut first, &format).unwrap();
    assert_eq!(equalizer.last_histogram().unwrap()[1], 4);

    let mut second = vec![9, 9, 9, 9, 0, 0, 0, 0];
    equalizer.equalize(&mut second, &format).unwrap();
    let histogram = equalizer.last_histogram().unwrap();
    assert_eq!(histogram[9], 4);
    assert_eq!(histogram[1], 0);
}
