// THEORY:
// Every failure the engine can report is a precondition violation of a single
// call or a start-up failure of the worker pool. Nothing here is retried: a
// frame that fails validation is handed back to the caller untouched, because
// validation always runs before the first byte of the frame is written.

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Frame buffer too small: needed {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("Failed to spawn histogram worker: {0}")]
    ThreadSpawn(#[source] io::Error),

    #[error("Histogram worker {0} panicked")]
    WorkerPanicked(usize),

    #[error("Frame stage is closed")]
    StageClosed,
}
