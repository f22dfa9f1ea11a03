// THEORY:
// The `HistogramWorkerPool` owns one persistent OS thread per logical core and
// runs the histogram pass of a frame on all of them at once. Its protocol is
// deliberately small:
//
// 1.  **Start-up**: one `WorkerSlot` and one thread per worker, each thread
//     pinned to its own core. Threads block on a shared condition variable.
// 2.  **Dispatch**: the calling thread (the dispatcher) partitions the frame into
//     disjoint row bands, writes one band job into every slot, flips every slot
//     to `Working` and bumps a generation counter with a single broadcast wake.
// 3.  **Work**: each woken thread takes the job out of its own slot, counts its
//     band into its own histogram and flips back to `Standby`.
// 4.  **Barrier**: the dispatcher yields in a loop until every slot reads
//     `Standby` again, then sums the per-band histograms into the caller's one.
// 5.  **Shutdown**: a stop flag plus a final broadcast; threads that wake up and
//     see it leave their loop, and the dispatcher joins them all.
//
// The generation counter turns the condition variable wait into a proper
// predicate wait, so a worker that was not parked yet when the broadcast went
// out still picks the frame up, and spurious wake-ups do not run a band twice.

use crate::core_modules::format::ImageFormat;
use crate::core_modules::histogram::{ChannelSampler, Histogram, accumulate_region};
use crate::core_modules::partition::partition_rows;
use crate::core_modules::pixel::pixel::YuvStandard;
use crate::error::{Error, Result};
use core_affinity::CoreId;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Per-worker lifecycle flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Standby = 0,
    Working = 1,
}

impl WorkerState {
    fn from_raw(raw: u8) -> Self {
        if raw == WorkerState::Working as u8 {
            WorkerState::Working
        } else {
            WorkerState::Standby
        }
    }
}

/// A borrowed view of one band of the frame being processed.
struct BandJob {
    ptr: *const u8,
    len: usize,
    format: ImageFormat,
    sampler: ChannelSampler,
}

// SAFETY: a job only ever points into the frame borrowed by `run_frame`, and
// `run_frame` does not return before every worker has dropped its job and
// reported `Standby`. Workers only read through the pointer.
unsafe impl Send for BandJob {}

struct WorkerContext {
    row_offset: u32,
    job: Option<BandJob>,
    histogram: Histogram,
}

struct WorkerSlot {
    id: usize,
    state: AtomicU8,
    panicked: AtomicBool,
    context: Mutex<WorkerContext>,
}

struct WakeSignal {
    generation: u64,
    stop: bool,
}

struct Shared {
    signal: Mutex<WakeSignal>,
    wake: Condvar,
    slots: Vec<WorkerSlot>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct HistogramWorkerPool {
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
    stopped: bool,
}

impl HistogramWorkerPool {
    /// Starts one worker per logical core, each pinned to its core.
    pub fn detect() -> Result<Self> {
        Self::init(num_cpus::get())
    }

    /// Starts `workers` pinned workers.
    pub fn init(workers: usize) -> Result<Self> {
        Self::with_affinity(workers, true)
    }

    /// Starts `workers` workers, pinning them one per core when `pin` is set and
    /// the platform reports core ids.
    pub fn with_affinity(workers: usize, pin: bool) -> Result<Self> {
        if workers == 0 {
            return Err(Error::InvalidArgument(
                "worker pool needs at least one worker".into(),
            ));
        }

        let slots = (0..workers)
            .map(|id| WorkerSlot {
                id,
                state: AtomicU8::new(WorkerState::Standby as u8),
                panicked: AtomicBool::new(false),
                context: Mutex::new(WorkerContext {
                    row_offset: 0,
                    job: None,
                    histogram: Histogram::new(),
                }),
            })
            .collect();

        let shared = Arc::new(Shared {
            signal: Mutex::new(WakeSignal { generation: 0, stop: false }),
            wake: Condvar::new(),
            slots,
        });

        let core_ids = if pin {
            core_affinity::get_core_ids().unwrap_or_default()
        } else {
            Vec::new()
        };

        let mut pool = Self {
            shared,
            threads: Vec::with_capacity(workers),
            stopped: false,
        };

        for id in 0..workers {
            let shared = Arc::clone(&pool.shared);
            let core = (!core_ids.is_empty()).then(|| core_ids[id % core_ids.len()]);
            let spawned = thread::Builder::new()
                .name(format!("gvision-hist-{id}"))
                .spawn(move || worker_loop(id, shared, core));

            match spawned {
                Ok(handle) => pool.threads.push(handle),
                Err(err) => {
                    // Tear down whatever already started before reporting.
                    pool.stop_and_join();
                    return Err(Error::ThreadSpawn(err));
                }
            }
        }

        info!(workers, pinned = !core_ids.is_empty(), "histogram worker pool started");
        Ok(pool)
    }

    pub fn worker_count(&self) -> usize {
        self.shared.slots.len()
    }

    /// Snapshot of every worker's state.
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.shared
            .slots
            .iter()
            .map(|slot| WorkerState::from_raw(slot.state.load(Ordering::Acquire)))
            .collect()
    }

    /// Row offsets assigned to the workers for the last dispatched frame.
    pub fn band_offsets(&self) -> Vec<u32> {
        self.shared
            .slots
            .iter()
            .map(|slot| lock(&slot.context).row_offset)
            .collect()
    }

    /// Computes the histogram of `frame` on all workers and adds the merged
    /// result into `merged`.
    pub fn run_frame(
        &mut self,
        frame: &[u8],
        format: &ImageFormat,
        standard: YuvStandard,
        merged: &mut Histogram,
    ) -> Result<()> {
        format.validate_buffer(frame.len())?;

        let sampler = ChannelSampler::new(format, standard);
        let bands = partition_rows(format.height, self.worker_count());

        for (slot, band) in self.shared.slots.iter().zip(&bands) {
            let bytes = &frame[band.byte_range(format.bytes_per_line)];
            let mut context = lock(&slot.context);
            context.row_offset = band.row_offset;
            context.job = Some(BandJob {
                ptr: bytes.as_ptr(),
                len: bytes.len(),
                format: format.band(band.rows),
                sampler,
            });
            slot.state.store(WorkerState::Working as u8, Ordering::Release);
        }

        lock(&self.shared.signal).generation += 1;
        self.shared.wake.notify_all();

        for slot in &self.shared.slots {
            while slot.state.load(Ordering::Acquire) != WorkerState::Standby as u8 {
                thread::yield_now();
            }
        }

        let mut failed = None;
        for slot in &self.shared.slots {
            if slot.panicked.swap(false, Ordering::AcqRel) {
                failed.get_or_insert(slot.id);
                continue;
            }
            merged.accumulate(&lock(&slot.context).histogram);
        }

        match failed {
            Some(id) => Err(Error::WorkerPanicked(id)),
            None => Ok(()),
        }
    }

    /// Stops and joins every worker.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        lock(&self.shared.signal).stop = true;
        self.shared.wake.notify_all();

        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                warn!("histogram worker terminated abnormally");
            }
        }
        info!(workers = self.worker_count(), "histogram worker pool shut down");
    }
}

impl Drop for HistogramWorkerPool {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn worker_loop(id: usize, shared: Arc<Shared>, core: Option<CoreId>) {
    if let Some(core) = core {
        if core_affinity::set_for_current(core) {
            debug!(worker = id, core = core.id, "histogram worker pinned");
        } else {
            warn!(worker = id, core = core.id, "failed to pin histogram worker");
        }
    }

    let slot = &shared.slots[id];
    let mut seen_generation = 0;

    loop {
        {
            let mut signal = lock(&shared.signal);
            while signal.generation == seen_generation && !signal.stop {
                signal = shared
                    .wake
                    .wait(signal)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if signal.stop {
                break;
            }
            seen_generation = signal.generation;
        }

        if panic::catch_unwind(AssertUnwindSafe(|| run_band(slot))).is_err() {
            slot.panicked.store(true, Ordering::Release);
        }
        slot.state.store(WorkerState::Standby as u8, Ordering::Release);
    }

    debug!(worker = id, "histogram worker exiting");
}

fn run_band(slot: &WorkerSlot) {
    let mut guard = lock(&slot.context);
    let context = &mut *guard;
    context.histogram.clear();

    if let Some(job) = context.job.take() {
        debug_assert_eq!(job.len, job.format.size as usize, "band length does not match its format");
        // SAFETY: see `BandJob`; the dispatcher keeps the frame borrowed until
        // this worker reports `Standby`.
        let band = unsafe { std::slice::from_raw_parts(job.ptr, job.len) };
        accumulate_region(band, &job.format, job.sampler, &mut context.histogram);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::format::ColorExtraction;
    use crate::core_modules::histogram::compute_pdf;

    fn gradient_frame(format: &ImageFormat) -> Vec<u8> {
        (0..format.frame_len()).map(|i| (i * 7 % 251) as u8).collect()
    }

    #[test]
    fn rejects_zero_workers() {
        assert!(matches!(
            HistogramWorkerPool::with_affinity(0, false),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn pooled_histogram_matches_single_threaded() {
        let format = ImageFormat::planar_yuv420(33, 17);
        let frame = gradient_frame(&format);
        let expected = compute_pdf(&frame, &format, YuvStandard::Studio).unwrap();

        let mut pool = HistogramWorkerPool::with_affinity(4, false).unwrap();
        let mut merged = Histogram::new();
        pool.run_frame(&frame, &format, YuvStandard::Studio, &mut merged).unwrap();
        assert_eq!(merged, expected);
        pool.shutdown();
    }

    #[test]
    fn workers_return_to_standby_between_frames() {
        let format = ImageFormat::packed_rgb(16, 9, ColorExtraction::Value);
        let frame = gradient_frame(&format);
        let mut pool = HistogramWorkerPool::with_affinity(3, false).unwrap();

        for _ in 0..5 {
            let mut merged = Histogram::new();
            pool.run_frame(&frame, &format, YuvStandard::Studio, &mut merged).unwrap();
            assert_eq!(merged.total(), format.pixel_count());
            assert!(pool.worker_states().iter().all(|s| *s == WorkerState::Standby));
        }
    }

    #[test]
    fn band_offsets_follow_partitioning() {
        let format = ImageFormat::planar_yuv420(8, 10);
        let frame = gradient_frame(&format);
        let mut pool = HistogramWorkerPool::with_affinity(4, false).unwrap();
        let mut merged = Histogram::new();
        pool.run_frame(&frame, &format, YuvStandard::Studio, &mut merged).unwrap();
        assert_eq!(pool.band_offsets(), vec![0, 4, 6, 8]);
    }

    #[test]
    fn padded_bands_carry_their_full_stride() {
        let format = ImageFormat::planar_yuv420(6, 11).with_bytes_per_line(16);
        let frame = gradient_frame(&format);
        let expected = compute_pdf(&frame, &format, YuvStandard::Studio).unwrap();

        let mut pool = HistogramWorkerPool::with_affinity(3, false).unwrap();
        let mut merged = Histogram::new();
        pool.run_frame(&frame, &format, YuvStandard::Studio, &mut merged).unwrap();
        assert_eq!(merged, expected);
        assert_eq!(merged.total(), 66);
    }

    #[test]
    fn more_workers_than_rows_still_counts_everything() {
        let format = ImageFormat::planar_yuv420(5, 2);
        let frame = gradient_frame(&format);
        let mut pool = HistogramWorkerPool::with_affinity(6, false).unwrap();
        let mut merged = Histogram::new();
        pool.run_frame(&frame, &format, YuvStandard::Studio, &mut merged).unwrap();
        assert_eq!(merged.total(), 10);
    }

    #[test]
    fn short_buffer_is_rejected_before_dispatch() {
        let format = ImageFormat::planar_yuv420(8, 8);
        let mut pool = HistogramWorkerPool::with_affinity(2, false).unwrap();
        let mut merged = Histogram::new();
        let result = pool.run_frame(&[0u8; 10], &format, YuvStandard::Studio, &mut merged);
        assert!(matches!(result, Err(Error::BufferTooSmall { .. })));
        assert_eq!(merged.total(), 0);
    }
}
