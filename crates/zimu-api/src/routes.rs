//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

use crate::handlers::{
    add_tag, chat, classify_all, delete_project, favicon, get_avatar, get_project, get_status, get_thumbnail,
    health, list_projects, list_tags, ready, remove_tag, submit_video, update_project,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let project_routes = Router::new()
        .route("/projects", get(list_projects))
        .route(
            "/projects/:id",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/projects/:id/thumbnail", get(get_thumbnail))
        .route("/projects/:id/avatar", get(get_avatar));

    let api_routes = Router::new()
        .route("/process", post(submit_video))
        .route("/status/:task_id", get(get_status))
        .merge(project_routes)
        .route("/tags", get(list_tags).post(add_tag).delete(remove_tag))
        .route("/classify-all", post(classify_all))
        .route("/chat", post(chat));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .route("/favicon.ico", get(favicon))
        // Everything else is the single-page frontend
        .fallback_service(ServeDir::new(&state.config.static_dir))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
