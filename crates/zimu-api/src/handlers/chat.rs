//! Chat endpoint.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use zimu_models::SessionId;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub message: String,
    /// Only used when the session is first created
    #[serde(default)]
    pub transcript: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

pub async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> ApiResult<Json<ChatResponse>> {
    let session_id = SessionId::from_string(request.session_id);
    let reply = state
        .chat
        .reply(&session_id, &request.message, &request.transcript)
        .await?;
    Ok(Json(ChatResponse { reply }))
}
