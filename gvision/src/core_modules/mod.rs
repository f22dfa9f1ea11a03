// THEORY:
// The building blocks of the engine, bottom-up: the per-pixel color model
// converter, the frame format descriptor, the histogram/CDF engine, the band
// partitioner, the round-robin scratch pool and the persistent worker pool that
// ties the histogram engine to the partitioner.

pub mod format;
pub mod histogram;
pub mod histogram_pool;
pub mod partition;
pub mod pixel;
pub mod worker_pool;
