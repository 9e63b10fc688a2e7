//! Axum HTTP API server.
//!
//! This crate provides:
//! - The JSON API over projects, tags, chat and task status
//! - Thumbnail and avatar proxying through the image cache
//! - Security headers, request ids and request logging
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::ChatService;
pub use state::AppState;
