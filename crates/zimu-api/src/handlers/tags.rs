//! Tag list management.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub ok: bool,
    pub tags: Vec<String>,
}

pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.ctx.tags.list().await?))
}

pub async fn add_tag(State(state): State<AppState>, Json(request): Json<TagRequest>) -> ApiResult<Json<TagsResponse>> {
    let tags = state.ctx.tags.add(&request.name).await?;
    Ok(Json(TagsResponse { ok: true, tags }))
}

pub async fn remove_tag(
    State(state): State<AppState>,
    Json(request): Json<TagRequest>,
) -> ApiResult<Json<TagsResponse>> {
    let tags = state.ctx.tags.remove(&request.name).await?;
    Ok(Json(TagsResponse { ok: true, tags }))
}
