//! In-process job queue and task registry.
//!
//! This crate provides:
//! - A bounded FIFO queue drained by a single worker
//! - The in-memory registry of live task records
//! - Atomic per-URL deduplication of in-flight submissions
//! - Eviction of finished records after a retention window

pub mod error;
pub mod job;
pub mod queue;
pub mod registry;

pub use error::{QueueError, QueueResult};
pub use job::ProcessVideoJob;
pub use queue::{JobQueue, JobReceiver, QueueConfig};
pub use registry::{Claim, TaskRegistry, FINISHED_TASK_RETENTION};
