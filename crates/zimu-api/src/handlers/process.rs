//! Video submission.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use zimu_models::{extract_first_url, normalize_url, Project, ProjectId, Task};
use zimu_queue::{Claim, ProcessVideoJob};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Submission body; `url` may be free text containing a link.
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub task_id: ProjectId,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub reused: bool,
}

/// Queue a video for processing, or return the task already running for it.
pub async fn submit_video(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> ApiResult<Json<ProcessResponse>> {
    let raw = request.url.trim();
    if raw.is_empty() {
        return Err(ApiError::bad_request("Please enter a video URL"));
    }

    let url = extract_first_url(raw)
        .ok_or_else(|| ApiError::bad_request("No valid video URL found, please paste the full link"))?;
    let url = normalize_url(&url);

    let task = match state
        .ctx
        .registry
        .claim(&url, || Task::queued(ProjectId::new(), url.clone()))
        .await
    {
        Claim::Existing(task_id) => {
            info!(task_id = %task_id, url = %url, "Reusing running task");
            metrics::record_job_reused();
            return Ok(Json(ProcessResponse { task_id, reused: true }));
        }
        Claim::Created(task) => task,
    };
    let task_id = task.id.clone();

    // The placeholder makes the job visible after a page reload.
    if let Err(e) = state.ctx.projects.save(Project::placeholder(&task)).await {
        state.ctx.registry.remove(&task_id).await;
        return Err(e.into());
    }

    if let Err(e) = state.queue.enqueue(ProcessVideoJob::new(task_id.clone(), url.clone())) {
        state.ctx.registry.remove(&task_id).await;
        if let Err(cleanup) = state.ctx.projects.delete(&task_id).await {
            error!(task_id = %task_id, error = %cleanup, "Failed to remove placeholder");
        }
        return Err(e.into());
    }

    metrics::record_job_enqueued();
    metrics::set_queue_length(state.queue.len());
    info!(task_id = %task_id, url = %url, "Task queued");

    Ok(Json(ProcessResponse {
        task_id,
        reused: false,
    }))
}
