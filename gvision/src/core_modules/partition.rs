// THEORY:
// Partitioning splits a frame into `N` contiguous horizontal bands, one per
// worker. Every band gets `floor(H / N)` rows; the `H mod N` leftover rows are
// all handed to band 0, which therefore starts at row 0 and runs a little
// longer than the rest. Every later band is shifted down by the same leftover
// so that the bands stay disjoint and together cover `[0, H)` exactly once.
//
// Disjoint bands are what make it sound to hand slices of one frame to several
// threads at once, so this is the single place where band math lives.

use std::ops::Range;

/// A contiguous row range of a frame assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub index: usize,
    /// First row of the band.
    pub row_offset: u32,
    /// Number of rows in the band.
    pub rows: u32,
}

impl Band {
    pub fn row_range(&self) -> Range<u32> {
        self.row_offset..self.row_offset + self.rows
    }

    /// Byte range of the band in a frame with the given stride.
    pub fn byte_range(&self, bytes_per_line: u32) -> Range<usize> {
        let start = self.row_offset as usize * bytes_per_line as usize;
        start..start + self.rows as usize * bytes_per_line as usize
    }
}

/// Splits `height` rows into `workers` bands. Returns an empty list when
/// `workers` is zero.
pub fn partition_rows(height: u32, workers: usize) -> Vec<Band> {
    if workers == 0 {
        return Vec::new();
    }
    let band_height = height / workers as u32;
    let remainder = height % workers as u32;

    (0..workers)
        .map(|index| {
            if index == 0 {
                Band { index, row_offset: 0, rows: band_height + remainder }
            } else {
                Band {
                    index,
                    row_offset: remainder + index as u32 * band_height,
                    rows: band_height,
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers_exactly(height: u32, bands: &[Band]) {
        let mut next_row = 0;
        for band in bands {
            assert_eq!(band.row_offset, next_row, "gap or overlap at band {}", band.index);
            next_row += band.rows;
        }
        assert_eq!(next_row, height);
    }

    #[test]
    fn even_split() {
        let bands = partition_rows(12, 4);
        assert_eq!(bands.len(), 4);
        assert!(bands.iter().all(|band| band.rows == 3));
        assert_covers_exactly(12, &bands);
    }

    #[test]
    fn remainder_goes_to_first_band() {
        let bands = partition_rows(10, 4);
        assert_eq!(bands[0], Band { index: 0, row_offset: 0, rows: 4 });
        assert_eq!(bands[1], Band { index: 1, row_offset: 4, rows: 2 });
        assert_eq!(bands[3], Band { index: 3, row_offset: 8, rows: 2 });
        assert_covers_exactly(10, &bands);
    }

    #[test]
    fn more_workers_than_rows() {
        let bands = partition_rows(3, 8);
        assert_eq!(bands[0].rows, 3);
        assert!(bands[1..].iter().all(|band| band.rows == 0));
        assert_covers_exactly(3, &bands);
    }

    #[test]
    fn byte_ranges_follow_stride() {
        let bands = partition_rows(5, 2);
        assert_eq!(bands[0].byte_range(12), 0..36);
        assert_eq!(bands[1].byte_range(12), 36..60);
    }

    #[test]
    fn zero_workers_yield_no_bands() {
        assert!(partition_rows(100, 0).is_empty());
    }
}
