//! Batch tagging of untagged projects.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};
use zimu_models::{ProjectId, TaskStatus, UNTITLED_PROJECT};
use zimu_worker::classify::{classify_title, Classification};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClassifyAllResponse {
    pub ok: bool,
    pub classified: usize,
    pub failed: usize,
}

/// Classify every finished, titled project that has no tag yet.
///
/// Model calls run outside the store lock; results are written in one save.
pub async fn classify_all(State(state): State<AppState>) -> ApiResult<Json<ClassifyAllResponse>> {
    let ctx = &state.ctx;
    let tags = ctx.tags.list().await?;
    if tags.is_empty() || !ctx.prompts.has_classify_prompt().await {
        return Err(ApiError::bad_request("Missing tag list or classify_prompt template"));
    }

    let candidates: Vec<(ProjectId, String)> = ctx
        .projects
        .load()
        .await?
        .into_values()
        .filter(|p| p.tag.is_empty() && p.status == TaskStatus::Done)
        .filter(|p| !p.meta.title.is_empty() && p.meta.title != UNTITLED_PROJECT)
        .map(|p| (p.id, p.meta.title))
        .collect();

    let mut assigned = Vec::new();
    let mut failed = 0;
    for (id, title) in candidates {
        match classify_title(ctx.ai.as_ref(), &ctx.prompts, &title, &tags).await {
            Ok(Classification::Tagged(tag)) => {
                info!(project_id = %id, title = %title, tag = %tag, "Batch classified");
                assigned.push((id, tag));
            }
            Ok(other) => {
                warn!(project_id = %id, title = %title, outcome = ?other, "Batch classification rejected");
                failed += 1;
            }
            Err(e) => {
                warn!(project_id = %id, title = %title, error = %e, "Batch classification failed");
                failed += 1;
            }
        }
    }

    let classified = ctx
        .projects
        .modify(|map| {
            let mut count = 0;
            for (id, tag) in assigned {
                // Skip projects deleted or tagged by hand while the batch ran
                if let Some(project) = map.get_mut(&id).filter(|p| p.tag.is_empty()) {
                    project.tag = tag;
                    count += 1;
                }
            }
            count
        })
        .await?;

    info!(classified, failed, "Batch classification finished");
    Ok(Json(ClassifyAllResponse {
        ok: true,
        classified,
        failed,
    }))
}
