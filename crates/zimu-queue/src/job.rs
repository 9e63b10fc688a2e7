//! Job definitions for queue processing.

use serde::{Deserialize, Serialize};
use zimu_models::ProjectId;

/// Summarize one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessVideoJob {
    /// Task (and project) id
    pub task_id: ProjectId,
    /// Normalized video URL
    pub url: String,
}

impl ProcessVideoJob {
    pub fn new(task_id: ProjectId, url: impl Into<String>) -> Self {
        Self {
            task_id,
            url: url.into(),
        }
    }
}
