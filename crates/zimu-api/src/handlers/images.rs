//! Thumbnail and avatar proxy backed by the on-disk image cache.
//!
//! Image hosts reject hotlinked requests, so images are fetched server-side
//! with the video page as `Referer` and cached under a hash of their URL.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::warn;
use zimu_models::{ProjectId, VideoMeta};
use zimu_storage::content_type_for_ext;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";

fn image_response(content_type: &'static str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, IMAGE_CACHE_CONTROL),
        ],
        bytes,
    )
        .into_response()
}

/// Image URL and referer for a project, live task first.
async fn image_source(state: &AppState, id: &ProjectId, pick: fn(&VideoMeta) -> &str) -> ApiResult<(String, String)> {
    let task = state.ctx.registry.get(id).await;
    let stored = state.ctx.projects.get(id).await?;

    let url = task
        .as_ref()
        .map(|t| pick(&t.meta))
        .filter(|u| !u.is_empty())
        .or_else(|| stored.as_ref().map(|p| pick(&p.meta)).filter(|u| !u.is_empty()))
        .map(str::to_string);
    let referer = task
        .as_ref()
        .map(|t| t.video_url.as_str())
        .filter(|u| !u.is_empty())
        .or_else(|| stored.as_ref().map(|p| p.video_url.as_str()))
        .unwrap_or_default()
        .to_string();

    url.map(|url| (url, referer))
        .ok_or_else(|| ApiError::not_found("No image for this project"))
}

async fn proxy_image(state: &AppState, id: String, pick: fn(&VideoMeta) -> &str) -> ApiResult<Response> {
    let id = ProjectId::from_string(id);
    let (url, referer) = image_source(state, &id, pick).await?;

    if let Some(cached) = state.images.lookup(&url).await {
        match tokio::fs::read(&cached.path).await {
            Ok(bytes) => {
                metrics::record_image_cache("hit");
                return Ok(image_response(cached.content_type(), bytes));
            }
            Err(e) => warn!(path = %cached.path.display(), error = %e, "Cached image unreadable, refetching"),
        }
    }

    let image = state.fetcher.fetch(&url, Some(&referer)).await.map_err(|e| {
        metrics::record_image_cache("error");
        warn!(project_id = %id, url = %url, error = %e, "Image fetch failed");
        ApiError::bad_gateway(format!("Failed to fetch image: {}", e))
    })?;
    metrics::record_image_cache("miss");

    if let Err(e) = state.images.store(&url, image.ext, &image.bytes).await {
        warn!(project_id = %id, error = %e, "Failed to cache image");
    }

    Ok(image_response(content_type_for_ext(image.ext), image.bytes))
}

pub async fn get_thumbnail(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    proxy_image(&state, id, |meta| meta.thumbnail.as_str()).await
}

pub async fn get_avatar(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    proxy_image(&state, id, |meta| meta.uploader_avatar.as_str()).await
}
