//! Bounded FIFO job queue over a tokio channel.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{QueueError, QueueResult};
use crate::job::ProcessVideoJob;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of waiting jobs
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            capacity: std::env::var("QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(256),
        }
    }
}

/// Producer handle; cheap to clone into request handlers.
#[derive(Debug, Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<ProcessVideoJob>,
    capacity: usize,
}

/// Consumer half, owned by the single worker.
#[derive(Debug)]
pub struct JobReceiver {
    receiver: mpsc::Receiver<ProcessVideoJob>,
}

impl JobQueue {
    /// Create a queue and its consumer.
    pub fn new(config: QueueConfig) -> (Self, JobReceiver) {
        let (sender, receiver) = mpsc::channel(config.capacity);
        (
            Self {
                sender,
                capacity: config.capacity,
            },
            JobReceiver { receiver },
        )
    }

    /// Enqueue a job without waiting.
    pub fn enqueue(&self, job: ProcessVideoJob) -> QueueResult<()> {
        let task_id = job.task_id.clone();
        match self.sender.try_send(job) {
            Ok(()) => {
                debug!(task_id = %task_id, pending = self.len(), "Enqueued job");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(task_id = %task_id, capacity = self.capacity, "Queue full, rejecting job");
                Err(QueueError::QueueFull(self.capacity))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(QueueError::Closed),
        }
    }

    /// Number of jobs waiting (not counting the one being processed).
    pub fn len(&self) -> usize {
        self.capacity.saturating_sub(self.sender.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the worker has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl JobReceiver {
    /// Wait for the next job; `None` once every producer is dropped.
    pub async fn recv(&mut self) -> Option<ProcessVideoJob> {
        self.receiver.recv().await
    }
}
