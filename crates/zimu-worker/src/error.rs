//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{0}")]
    Media(#[from] zimu_media::MediaError),

    #[error("{0}")]
    Ai(#[from] zimu_ai::AiError),

    #[error("Storage error: {0}")]
    Storage(#[from] zimu_storage::StorageError),

    #[error("{0}")]
    ProcessingFailed(String),
}

impl WorkerError {
    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }
}
