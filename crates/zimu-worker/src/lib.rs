//! Video processing worker.
//!
//! This crate provides:
//! - The single-consumer job executor with panic isolation
//! - The caption / transcription / summary pipeline
//! - Tag classification shared with the batch endpoint
//! - Structured job logging

pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod logging;
pub mod processor;

#[cfg(test)]
mod testing;

pub use classify::classify_title;
pub use config::WorkerConfig;
pub use context::ProcessingContext;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use processor::process_video;
