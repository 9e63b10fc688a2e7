//! Task status polling.

use axum::extract::{Path, State};
use axum::Json;
use zimu_models::{ProjectId, Task};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Live task record for `task_id`.
pub async fn get_status(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<Json<Task>> {
    state
        .ctx
        .registry
        .get(&ProjectId::from_string(task_id))
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Task not found"))
}
