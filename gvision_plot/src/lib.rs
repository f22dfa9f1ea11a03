// THEORY:
// `gvision_plot` is the text plotting backend for the equalizer's histogram
// seam. It drives an external `gnuplot` process through its stdin: every frame
// gets a 3D `splot` preamble, the `(bucket, series, count)` triples and the
// inline-data terminator `e`.
//
// Plotting is best effort from start to finish. A missing `gnuplot` binary
// means no sink at all, and a pipe that breaks later (the user closed the
// window, the process died) silently turns the sink into a no-op.

use gvision::{Histogram, HistogramSink, plot_points};
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use tracing::{debug, info, warn};

pub const GNUPLOT: &str = "gnuplot";

const SPLOT_PREAMBLE: &str = "set view 70, 45, 1, 1\n\
set hidden3d\n\
set dgrid3d 50,50 qnorm 2\n\
splot '-' with lines\n";

/// Looks `program` up in the directories of `PATH`.
pub fn find_program(program: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// Writes one complete inline `splot` of `histogram` to `out`.
pub fn write_plot<W: Write>(out: &mut W, histogram: &Histogram, series: u32) -> io::Result<()> {
    out.write_all(SPLOT_PREAMBLE.as_bytes())?;
    for point in plot_points(histogram, series) {
        writeln!(out, "{} {} {}", point.bucket, point.series, point.count)?;
    }
    writeln!(out, "e")?;
    out.flush()
}

pub struct GnuplotSink {
    child: Child,
    stdin: Option<ChildStdin>,
    series: u32,
}

impl GnuplotSink {
    /// Starts `gnuplot`. Returns `None` when it is not installed or fails to
    /// start.
    pub fn spawn(series: u32) -> Option<Self> {
        Self::spawn_with_args(series, &[])
    }

    /// Starts `gnuplot` with extra command line arguments, e.g. `-persist`.
    pub fn spawn_with_args(series: u32, args: &[&str]) -> Option<Self> {
        let Some(program) = find_program(GNUPLOT) else {
            debug!("gnuplot not found on PATH");
            return None;
        };

        let mut child = match Command::new(&program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                warn!(error = %err, path = %program.display(), "failed to start gnuplot");
                return None;
            }
        };

        let stdin = child.stdin.take();
        info!(path = %program.display(), series, "gnuplot histogram sink started");
        Some(Self { child, stdin, series })
    }
}

impl HistogramSink for GnuplotSink {
    fn emit(&mut self, histogram: &Histogram) {
        let Some(stdin) = self.stdin.as_mut() else {
            return;
        };
        if let Err(err) = write_plot(stdin, histogram, self.series) {
            debug!(error = %err, "gnuplot pipe closed, plotting disabled");
            self.stdin = None;
        }
    }
}

impl Drop for GnuplotSink {
    fn drop(&mut self) {
        // Closing stdin lets gnuplot exit on its own.
        self.stdin = None;
        if let Err(err) = self.child.wait() {
            debug!(error = %err, "failed to reap gnuplot");
        }
    }
}
