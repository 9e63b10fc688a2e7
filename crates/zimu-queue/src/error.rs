//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue is full ({0} jobs waiting)")]
    QueueFull(usize),

    #[error("Queue is closed")]
    Closed,
}
