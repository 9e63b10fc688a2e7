//! Project list, detail, edit and delete.
//!
//! Stored projects are merged with live task records on every read, so a
//! job in progress shows its latest state after a page reload.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use zimu_models::{Project, ProjectId, ProjectSummary, Task};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn project_for_task(stored: Option<Project>, task: &Task) -> Project {
    let mut project = stored.unwrap_or_else(|| Project::placeholder(task));
    project.merge_task(task);
    project
}

/// Every project as a list row, newest first.
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<ProjectSummary>>> {
    let mut projects = state.ctx.projects.load().await?;

    for task in state.ctx.registry.snapshot().await {
        let merged = project_for_task(projects.remove(&task.id), &task);
        projects.insert(task.id.clone(), merged);
    }

    let mut rows: Vec<ProjectSummary> = projects.values().map(Project::summary_row).collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(rows))
}

/// Full project record.
pub async fn get_project(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Project>> {
    let id = ProjectId::from_string(id);
    let stored = state.ctx.projects.get(&id).await?;

    match (stored, state.ctx.registry.get(&id).await) {
        (stored, Some(task)) => Ok(Json(project_for_task(stored, &task))),
        (Some(project), None) => Ok(Json(project)),
        (None, None) => Err(ApiError::not_found("Project not found")),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub tag: Option<String>,
    pub favorite: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct UpdateProjectResponse {
    pub ok: bool,
    pub title: String,
    pub tag: String,
    pub favorite: bool,
}

/// Edit title, tag or favorite flag. A blank title is ignored.
pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateProjectRequest>,
) -> ApiResult<Json<UpdateProjectResponse>> {
    let id = ProjectId::from_string(id);
    let title = request
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let tag = request.tag.as_deref().map(|t| t.trim().to_string());

    let project = state
        .ctx
        .projects
        .update(&id, |p| {
            if let Some(title) = &title {
                p.meta.title = title.clone();
            }
            if let Some(tag) = &tag {
                p.tag = tag.clone();
            }
            if let Some(favorite) = request.favorite {
                p.favorite = favorite;
            }
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    // A running job persists its task record at the end; keep the two in step.
    state
        .ctx
        .registry
        .update(&id, |t| {
            if let Some(title) = title {
                t.rename(title);
            }
            if let Some(tag) = tag {
                t.retag(tag);
            }
        })
        .await;

    Ok(Json(UpdateProjectResponse {
        ok: true,
        title: project.meta.title,
        tag: project.tag,
        favorite: project.favorite,
    }))
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Remove a project and its chat session.
pub async fn delete_project(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<OkResponse>> {
    let id = ProjectId::from_string(id);
    if !state.ctx.projects.delete(&id).await? {
        return Err(ApiError::not_found("Project not found"));
    }

    state.chat.remove(&id.session_id()).await;

    // A finished task would otherwise keep the row alive in the list.
    if state.ctx.registry.get(&id).await.is_some_and(|t| !t.is_running()) {
        state.ctx.registry.remove(&id).await;
    }

    info!(project_id = %id, "Project deleted");
    Ok(Json(OkResponse { ok: true }))
}
