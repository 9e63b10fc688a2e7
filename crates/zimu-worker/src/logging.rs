//! Structured job logging.

use tracing::{error, info, warn, Span};
use zimu_models::ProjectId;

/// Logs job lifecycle events with `task_id` and `operation` fields.
#[derive(Debug, Clone)]
pub struct JobLogger {
    task_id: String,
    operation: String,
}

impl JobLogger {
    pub fn new(task_id: &ProjectId, operation: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(task_id = %self.task_id, operation = %self.operation, "Job started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(task_id = %self.task_id, operation = %self.operation, "Job progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(task_id = %self.task_id, operation = %self.operation, "Job warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(task_id = %self.task_id, operation = %self.operation, "Job error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(task_id = %self.task_id, operation = %self.operation, "Job completed: {}", message);
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span carrying the job fields, for instrumenting the whole pipeline.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("job", task_id = %self.task_id, operation = %self.operation)
    }
}
