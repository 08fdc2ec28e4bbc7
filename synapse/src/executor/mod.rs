//! Execution support for blocking work.
//!
//! The async runtime must never be stalled by a synchronous store client or a
//! file read. [`WorkerPool`] is the single dispatch point for such calls.

mod pool;

pub use pool::{default_worker_count, PoolError, WorkerPool};
