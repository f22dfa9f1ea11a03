// THEORY:
// The visualization seam. A histogram is drawn as a 3D surface by repeating it
// as several identical series side by side, so the backend only ever sees
// `(bucket, series, count)` triples. The library stays free of any particular
// plotting program; `gvision_plot` provides the gnuplot-backed sink.

use crate::core_modules::histogram::{Count, HISTOGRAM_BUCKETS, Histogram};

/// One sample of a plotted histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotPoint {
    pub bucket: usize,
    pub series: u32,
    pub count: Count,
}

/// Flattens `histogram` into `series` copies, series-major.
pub fn plot_points(histogram: &Histogram, series: u32) -> Vec<PlotPoint> {
    let mut points = Vec::with_capacity(series as usize * HISTOGRAM_BUCKETS);
    for series in 0..series {
        for (bucket, &count) in histogram.buckets().iter().enumerate() {
            points.push(PlotPoint { bucket, series, count });
        }
    }
    points
}

/// Receives the merged histogram of every equalized frame. Implementations
/// swallow their own failures.
pub trait HistogramSink: Send {
    fn emit(&mut self, histogram: &Histogram);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_repeat_the_histogram() {
        let mut histogram = Histogram::new();
        histogram.increment(5);
        histogram.increment(5);

        let points = plot_points(&histogram, 3);
        assert_eq!(points.len(), 3 * HISTOGRAM_BUCKETS);
        assert_eq!(points[5], PlotPoint { bucket: 5, series: 0, count: 2 });
        assert_eq!(
            points[2 * HISTOGRAM_BUCKETS + 5],
            PlotPoint { bucket: 5, series: 2, count: 2 }
        );
        assert!(points.iter().filter(|p| p.bucket != 5).all(|p| p.count == 0));
    }

    #[test]
    fn zero_series_is_empty() {
        assert!(plot_points(&Histogram::new(), 0).is_empty());
    }
}
