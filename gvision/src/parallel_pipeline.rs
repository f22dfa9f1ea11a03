// THEORY:
// The `parallel_pipeline` module puts a `FrameEqualizer` behind an async
// boundary so a tokio application can feed it frames without blocking its
// executor.
//
// The equalizer lives on one dedicated OS thread. Frames travel to it through an
// unbounded mpsc channel, each paired with a oneshot sender for the reply, and
// are processed strictly in submission order. Callers hand in borrowed bytes,
// which are copied into a buffer taken from a small recycled pool; the processed
// buffer is handed back with the outcome and can be returned to the pool once
// the caller is done with it.
//
// Shutdown closes the channel. The equalizer thread drains every frame that was
// already queued, tears down its worker pool and only then signals completion.

use crate::config::EqualizerConfig;
use crate::core_modules::format::ImageFormat;
use crate::equalizer::{FrameEqualizer, FrameOutcome};
use crate::error::{Error, Result};
use futures::future::try_join_all;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace};

pub const FRAME_POOL_SIZE: usize = 8;

#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub data: Vec<u8>,
    pub format: Option<ImageFormat>,
    pub frame_id: u64,
    pub timestamp: Instant,
}

#[derive(Debug)]
pub struct ProcessedFrame {
    pub buffer: FrameBuffer,
    pub outcome: FrameOutcome,
}

struct FrameTask {
    frame_buffer: FrameBuffer,
    result_sender: oneshot::Sender<ProcessedFrame>,
}

pub struct FrameStage {
    task_sender: mpsc::UnboundedSender<FrameTask>,
    finished: oneshot::Receiver<u64>,
    frame_buffer_pool: Arc<Mutex<VecDeque<Vec<u8>>>>,
    frame_counter: AtomicU64,
}

impl FrameStage {
    pub fn with_config(config: EqualizerConfig) -> Result<Self> {
        Self::new(FrameEqualizer::new(config)?)
    }

    /// Moves `equalizer` onto its own thread.
    pub fn new(equalizer: FrameEqualizer) -> Result<Self> {
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<FrameTask>();
        let (finished_sender, finished) = oneshot::channel();

        thread::Builder::new()
            .name("gvision-stage".into())
            .spawn(move || {
                let mut equalizer = equalizer;
                while let Some(task) = task_receiver.blocking_recv() {
                    let FrameTask { mut frame_buffer, result_sender } = task;
                    let outcome =
                        equalizer.process_frame(&mut frame_buffer.data, frame_buffer.format.as_ref());
                    trace!(frame_id = frame_buffer.frame_id, ?outcome, "frame processed");
                    let _ = result_sender.send(ProcessedFrame { buffer: frame_buffer, outcome });
                }
                let frames = equalizer.frames_equalized();
                equalizer.shutdown();
                let _ = finished_sender.send(frames);
            })
            .map_err(Error::ThreadSpawn)?;

        let frame_pool = (0..FRAME_POOL_SIZE).map(|_| Vec::new()).collect();

        Ok(Self {
            task_sender,
            finished,
            frame_buffer_pool: Arc::new(Mutex::new(frame_pool)),
            frame_counter: AtomicU64::new(0),
        })
    }

    /// Copies `frame_data` into a pooled buffer and equalizes it.
    pub async fn process_frame(
        &self,
        frame_data: &[u8],
        format: Option<ImageFormat>,
    ) -> Result<ProcessedFrame> {
        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        let frame_buffer = self.get_frame_buffer(frame_data, format, frame_id);
        self.submit(frame_buffer).await
    }

    /// Queues an owned frame and waits for its result.
    pub async fn submit(&self, frame_buffer: FrameBuffer) -> Result<ProcessedFrame> {
        let (result_sender, result_receiver) = oneshot::channel();

        let task = FrameTask {
            frame_buffer,
            result_sender,
        };

        self.task_sender.send(task).map_err(|_| Error::StageClosed)?;

        result_receiver.await.map_err(|_| Error::StageClosed)
    }

    /// Submits every frame at once; results come back in submission order.
    pub async fn process_frames<'a, I>(&self, frames: I, format: ImageFormat) -> Result<Vec<ProcessedFrame>>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        try_join_all(frames.into_iter().map(|data| self.process_frame(data, Some(format)))).await
    }

    fn get_frame_buffer(&self, frame_data: &[u8], format: Option<ImageFormat>, frame_id: u64) -> FrameBuffer {
        let mut buffer = {
            let mut pool = self.frame_buffer_pool.lock().unwrap_or_else(PoisonError::into_inner);
            pool.pop_front().unwrap_or_default()
        };

        buffer.clear();
        buffer.extend_from_slice(frame_data);

        FrameBuffer {
            data: buffer,
            format,
            frame_id,
            timestamp: Instant::now(),
        }
    }

    /// Hands a buffer back for reuse. Buffers beyond the pool size are dropped.
    pub fn return_frame_buffer(&self, buffer: Vec<u8>) {
        let mut pool = self.frame_buffer_pool.lock().unwrap_or_else(PoisonError::into_inner);
        if pool.len() < FRAME_POOL_SIZE {
            pool.push_back(buffer);
        }
    }

    /// Buffers currently waiting in the pool.
    pub fn pooled_buffers(&self) -> usize {
        self.frame_buffer_pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drains queued frames, stops the equalizer and returns how many frames it
    /// equalized over its lifetime.
    pub async fn shutdown(self) -> Result<u64> {
        let Self { task_sender, finished, .. } = self;
        drop(task_sender);
        debug!("frame stage draining");

        let frames = finished.await.map_err(|_| Error::StageClosed)?;
        info!(frames, "frame stage shut down");
        Ok(frames)
    }
}
